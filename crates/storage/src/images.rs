//! Filesystem-backed JPEG store.
//!
//! Remote stores only ever hold filenames; the bytes live here, under a
//! single documents root with one flat directory per feature.

use std::path::{Path, PathBuf};

use gotravel_core::error::CoreError;
use gotravel_core::jpeg::encode_jpeg;
use image::DynamicImage;

/// Feature namespace inside the documents root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageCategory {
    /// Travel plan / plan covers and visited-place photos (root directory).
    Documents,
    Albums,
    /// Per-prefecture photos on the Japan map.
    JapanPhotos,
}

impl ImageCategory {
    fn subdirectory(self) -> Option<&'static str> {
        match self {
            Self::Documents => None,
            Self::Albums => Some("Albums"),
            Self::JapanPhotos => Some("JapanPhotos"),
        }
    }
}

/// Stores JPEG blobs by filename inside one category directory.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    dir: PathBuf,
}

impl LocalImageStore {
    /// Store rooted at the documents directory.
    pub fn new(documents_root: impl Into<PathBuf>) -> Self {
        Self::for_category(documents_root, ImageCategory::Documents)
    }

    pub fn for_category(documents_root: impl Into<PathBuf>, category: ImageCategory) -> Self {
        let root = documents_root.into();
        let dir = match category.subdirectory() {
            Some(sub) => root.join(sub),
            None => root,
        };
        Self { dir }
    }

    pub fn directory(&self) -> &Path {
        &self.dir
    }

    /// Generate a fresh `<uuid>.jpg` filename.
    pub fn generate_filename() -> String {
        format!("{}.jpg", uuid::Uuid::new_v4())
    }

    /// Write `jpeg_data` under `filename`, creating the directory on first use.
    pub fn save(&self, jpeg_data: &[u8], filename: &str) -> Result<(), CoreError> {
        let path = self.path_for(filename)?;
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(&path, jpeg_data)?;
        tracing::debug!(path = %path.display(), bytes = jpeg_data.len(), "Saved image");
        Ok(())
    }

    /// Compress `image` at `quality`, store it under a fresh filename and
    /// return that filename.
    pub fn save_image(&self, image: &DynamicImage, quality: f32) -> Result<String, CoreError> {
        let bytes = encode_jpeg(image, quality)?;
        let filename = Self::generate_filename();
        self.save(&bytes, &filename)?;
        Ok(filename)
    }

    /// Read the bytes stored under `filename`, `None` if there are none.
    pub fn load(&self, filename: &str) -> Result<Option<Vec<u8>>, CoreError> {
        let path = self.path_for(filename)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn exists(&self, filename: &str) -> bool {
        self.path_for(filename).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Remove `filename`. Missing files are not an error.
    pub fn delete(&self, filename: &str) -> Result<(), CoreError> {
        let path = self.path_for(filename)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Deleted image");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn path_for(&self, filename: &str) -> Result<PathBuf, CoreError> {
        validate_filename(filename)?;
        Ok(self.dir.join(filename))
    }
}

/// Filenames are flat: no separators, no parent references.
fn validate_filename(filename: &str) -> Result<(), CoreError> {
    if filename.is_empty()
        || filename.contains('/')
        || filename.contains('\\')
        || filename == "."
        || filename.contains("..")
    {
        return Err(CoreError::InvalidPayload(format!(
            "Invalid image filename '{filename}'"
        )));
    }
    Ok(())
}
