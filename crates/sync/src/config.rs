use std::path::PathBuf;

use gotravel_core::jpeg::{COVER_JPEG_QUALITY, PHOTO_JPEG_QUALITY};
use gotravel_migration::DEFAULT_MIGRATION_FLAG_KEY;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is not valid ({value:?}): {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Sync configuration loaded from environment variables.
///
/// Every field has a default suitable for local development.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Root of all on-disk state (default: `./gotravel-data`).
    pub data_dir: PathBuf,
    /// User whose records are migrated. Required by the binary.
    pub user_id: Option<String>,
    /// JPEG quality for rehomed cover images (default: `0.8`).
    pub cover_jpeg_quality: f32,
    /// JPEG quality for rehomed place photos (default: `0.7`).
    pub photo_jpeg_quality: f32,
    /// Key of the persisted completion flag.
    pub migration_flag_key: String,
}

impl SyncConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                            |
    /// |-------------------------------|------------------------------------|
    /// | `GOTRAVEL_DATA_DIR`           | `./gotravel-data`                  |
    /// | `GOTRAVEL_USER_ID`            | (unset)                            |
    /// | `GOTRAVEL_COVER_JPEG_QUALITY` | `0.8`                              |
    /// | `GOTRAVEL_PHOTO_JPEG_QUALITY` | `0.7`                              |
    /// | `GOTRAVEL_MIGRATION_FLAG_KEY` | `hasCompletedCloudKitMigration_v1` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let data_dir = lookup("GOTRAVEL_DATA_DIR")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "./gotravel-data".into());

        let user_id = lookup("GOTRAVEL_USER_ID")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let cover_jpeg_quality =
            parse_quality(&lookup, "GOTRAVEL_COVER_JPEG_QUALITY", COVER_JPEG_QUALITY)?;
        let photo_jpeg_quality =
            parse_quality(&lookup, "GOTRAVEL_PHOTO_JPEG_QUALITY", PHOTO_JPEG_QUALITY)?;

        let migration_flag_key = lookup("GOTRAVEL_MIGRATION_FLAG_KEY")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MIGRATION_FLAG_KEY.into());

        Ok(Self {
            data_dir: PathBuf::from(data_dir),
            user_id,
            cover_jpeg_quality,
            photo_jpeg_quality,
            migration_flag_key,
        })
    }

    pub fn images_dir(&self) -> PathBuf {
        self.data_dir.join("images")
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.data_dir.join("preferences.json")
    }

    pub fn cloudkit_snapshot_path(&self) -> PathBuf {
        self.data_dir.join("cloudkit.json")
    }

    pub fn firestore_snapshot_path(&self) -> PathBuf {
        self.data_dir.join("firestore.json")
    }

    /// Asset staging area for in-flight uploads.
    pub fn staging_dir(&self) -> PathBuf {
        self.data_dir.join("tmp")
    }
}

/// Qualities must lie in `(0.0, 1.0]`.
fn parse_quality(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: f32,
) -> Result<f32, ConfigError> {
    let Some(raw) = lookup(var) else {
        return Ok(default);
    };
    let invalid = |reason: &str| ConfigError::Invalid {
        var,
        value: raw.clone(),
        reason: reason.to_string(),
    };
    let quality: f32 = raw.trim().parse().map_err(|_| invalid("not a number"))?;
    if quality > 0.0 && quality <= 1.0 {
        Ok(quality)
    } else {
        Err(invalid("must be greater than 0.0 and at most 1.0"))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<SyncConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SyncConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("./gotravel-data"));
        assert!(config.user_id.is_none());
        assert_eq!(config.cover_jpeg_quality, 0.8);
        assert_eq!(config.photo_jpeg_quality, 0.7);
        assert_eq!(config.migration_flag_key, "hasCompletedCloudKitMigration_v1");
        assert_eq!(config.firestore_snapshot_path(), PathBuf::from("./gotravel-data/firestore.json"));
    }

    #[test]
    fn overrides_are_read() {
        let config = load(&[
            ("GOTRAVEL_DATA_DIR", "/var/lib/gotravel"),
            ("GOTRAVEL_USER_ID", " u42 "),
            ("GOTRAVEL_COVER_JPEG_QUALITY", "0.85"),
            ("GOTRAVEL_MIGRATION_FLAG_KEY", "hasCompletedCloudKitMigration_v2"),
        ])
        .unwrap();
        assert_eq!(config.images_dir(), PathBuf::from("/var/lib/gotravel/images"));
        assert_eq!(config.user_id.as_deref(), Some("u42"));
        assert_eq!(config.cover_jpeg_quality, 0.85);
        assert_eq!(config.migration_flag_key, "hasCompletedCloudKitMigration_v2");
    }

    #[test]
    fn out_of_range_quality_is_rejected() {
        for bad in ["0", "1.5", "-0.2", "high"] {
            let err = load(&[("GOTRAVEL_PHOTO_JPEG_QUALITY", bad)]).unwrap_err();
            assert!(err.to_string().contains("GOTRAVEL_PHOTO_JPEG_QUALITY"));
        }
        assert_eq!(
            load(&[("GOTRAVEL_PHOTO_JPEG_QUALITY", "1.0")]).unwrap().photo_jpeg_quality,
            1.0
        );
    }
}
