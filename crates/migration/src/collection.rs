//! The two ends of a migration, per entity type.

use async_trait::async_trait;
use gotravel_core::error::CoreError;
use gotravel_core::model::{Plan, TravelPlan, VisitedPlace};

/// A source entity with the image its record carried, if any.
pub type SourceRecord<E> = gotravel_cloudkit::FetchedRecord<E>;

/// Which JPEG quality a rehomed image is written at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRole {
    Cover,
    Photo,
}

/// An entity type the bridge knows how to move.
pub trait Migratable: Clone + Send + Sync + 'static {
    /// Name used in logs and errors.
    const ENTITY: &'static str;
    const IMAGE_ROLE: ImageRole;

    /// `None` for entities that were never assigned an id.
    fn record_id(&self) -> Option<&str>;

    /// Filename of the image already held in local storage.
    fn local_image(&self) -> Option<&str>;

    fn attach_image(&mut self, filename: String);
}

impl Migratable for TravelPlan {
    const ENTITY: &'static str = "TravelPlan";
    const IMAGE_ROLE: ImageRole = ImageRole::Cover;

    fn record_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn local_image(&self) -> Option<&str> {
        self.local_image_file_name.as_deref()
    }

    fn attach_image(&mut self, filename: String) {
        self.local_image_file_name = Some(filename);
    }
}

impl Migratable for Plan {
    const ENTITY: &'static str = "Plan";
    const IMAGE_ROLE: ImageRole = ImageRole::Cover;

    fn record_id(&self) -> Option<&str> {
        Some(self.id.as_str()).filter(|id| !id.is_empty())
    }

    fn local_image(&self) -> Option<&str> {
        self.local_image_file_name.as_deref()
    }

    fn attach_image(&mut self, filename: String) {
        self.local_image_file_name = Some(filename);
    }
}

impl Migratable for VisitedPlace {
    const ENTITY: &'static str = "VisitedPlace";
    const IMAGE_ROLE: ImageRole = ImageRole::Photo;

    fn record_id(&self) -> Option<&str> {
        Some(self.id.as_str()).filter(|id| !id.is_empty())
    }

    fn local_image(&self) -> Option<&str> {
        self.local_photo_file_name.as_deref()
    }

    fn attach_image(&mut self, filename: String) {
        self.local_photo_file_name = Some(filename);
    }
}

/// Where records are read from.
#[async_trait]
pub trait SourceCollection<E: Migratable>: Send + Sync {
    /// Every record of this type owned by `user_id`.
    async fn fetch_all(&self, user_id: &str) -> Result<Vec<SourceRecord<E>>, CoreError>;
}

/// Where records are written to.
#[async_trait]
pub trait TargetCollection<E: Migratable>: Send + Sync {
    async fn exists(&self, id: &str) -> Result<bool, CoreError>;

    /// Write `entity` under its own id.
    async fn insert(&self, entity: &E) -> Result<(), CoreError>;
}
