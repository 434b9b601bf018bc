//! The migration state machine.
//!
//! A single persisted boolean gates the whole run. There is no partial
//! checkpoint: a run that fails (or never finishes) leaves the flag unset
//! and the next run starts over, relying on per-record existence checks
//! to avoid duplicates.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gotravel_core::error::CoreError;
use gotravel_core::jpeg::{COVER_JPEG_QUALITY, PHOTO_JPEG_QUALITY};
use gotravel_core::model::{Plan, TravelPlan, VisitedPlace};
use gotravel_storage::{FlagStore, LocalImageStore};

use crate::collection::{ImageRole, Migratable, SourceCollection, SourceRecord, TargetCollection};
use crate::report::{MigrationReport, TypeReport};

/// Bump the suffix whenever the migration or target schema changes
/// incompatibly.
pub const DEFAULT_MIGRATION_FLAG_KEY: &str = "hasCompletedCloudKitMigration_v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    NotStarted,
    InProgress,
    Completed,
}

pub struct MigrationBridge<S, T> {
    source: Arc<S>,
    target: Arc<T>,
    images: LocalImageStore,
    flags: Arc<dyn FlagStore>,
    flag_key: String,
    cover_quality: f32,
    photo_quality: f32,
    running: AtomicBool,
}

impl<S, T> MigrationBridge<S, T>
where
    S: SourceCollection<TravelPlan> + SourceCollection<Plan> + SourceCollection<VisitedPlace>,
    T: TargetCollection<TravelPlan> + TargetCollection<Plan> + TargetCollection<VisitedPlace>,
{
    pub fn new(
        source: Arc<S>,
        target: Arc<T>,
        images: LocalImageStore,
        flags: Arc<dyn FlagStore>,
    ) -> Self {
        Self {
            source,
            target,
            images,
            flags,
            flag_key: DEFAULT_MIGRATION_FLAG_KEY.to_string(),
            cover_quality: COVER_JPEG_QUALITY,
            photo_quality: PHOTO_JPEG_QUALITY,
            running: AtomicBool::new(false),
        }
    }

    pub fn with_flag_key(mut self, key: impl Into<String>) -> Self {
        self.flag_key = key.into();
        self
    }

    /// JPEG qualities for rehomed covers and photos.
    pub fn with_qualities(mut self, cover: f32, photo: f32) -> Self {
        self.cover_quality = cover;
        self.photo_quality = photo;
        self
    }

    pub fn flag_key(&self) -> &str {
        &self.flag_key
    }

    pub fn state(&self) -> Result<MigrationState, CoreError> {
        if self.flags.get_bool(&self.flag_key)? {
            Ok(MigrationState::Completed)
        } else if self.running.load(Ordering::SeqCst) {
            Ok(MigrationState::InProgress)
        } else {
            Ok(MigrationState::NotStarted)
        }
    }

    /// Clear the completion flag so the next [`run`](Self::run) migrates
    /// again.
    pub fn reset(&self) -> Result<(), CoreError> {
        self.flags.remove(&self.flag_key)?;
        tracing::info!(flag = %self.flag_key, "Migration flag cleared");
        Ok(())
    }

    /// Migrate every TravelPlan, Plan and VisitedPlace owned by `user_id`,
    /// in that order, then set the completion flag.
    ///
    /// Returns immediately when the flag is already set. Any failure aborts
    /// the remaining types and leaves the flag unset.
    pub async fn run(&self, user_id: &str) -> Result<MigrationReport, CoreError> {
        if self.flags.get_bool(&self.flag_key)? {
            tracing::info!(user_id, flag = %self.flag_key, "Migration already completed");
            return Ok(MigrationReport::previously_completed());
        }

        self.running.store(true, Ordering::SeqCst);
        let result = self.run_all(user_id).await;
        self.running.store(false, Ordering::SeqCst);

        match &result {
            Ok(report) => tracing::info!(
                user_id,
                migrated = report.total_migrated(),
                skipped = report.total_skipped(),
                "Migration completed"
            ),
            Err(e) => tracing::error!(user_id, error = %e, "Migration failed; will retry on next run"),
        }
        result
    }

    async fn run_all(&self, user_id: &str) -> Result<MigrationReport, CoreError> {
        tracing::info!(user_id, "Migration started");
        let report = MigrationReport {
            already_completed: false,
            travel_plans: self.migrate_type::<TravelPlan>(user_id).await?,
            plans: self.migrate_type::<Plan>(user_id).await?,
            visited_places: self.migrate_type::<VisitedPlace>(user_id).await?,
        };
        self.flags.set_bool(&self.flag_key, true)?;
        Ok(report)
    }

    /// Write one record to the target without the existence check and
    /// without touching the completion flag.
    pub async fn migrate_single<E>(&self, record: SourceRecord<E>) -> Result<E, CoreError>
    where
        E: Migratable,
        T: TargetCollection<E>,
    {
        let mut entity = record.entity;
        if let Some(image) = &record.image {
            self.rehome_image(&mut entity, image);
        }
        TargetCollection::<E>::insert(&*self.target, &entity).await?;
        tracing::info!(entity = E::ENTITY, record_id = ?entity.record_id(), "Migrated single record");
        Ok(entity)
    }

    async fn migrate_type<E>(&self, user_id: &str) -> Result<TypeReport, CoreError>
    where
        E: Migratable,
        S: SourceCollection<E>,
        T: TargetCollection<E>,
    {
        let records = SourceCollection::<E>::fetch_all(&*self.source, user_id).await?;
        let mut report = TypeReport {
            fetched: records.len(),
            ..TypeReport::default()
        };
        if records.is_empty() {
            tracing::debug!(user_id, entity = E::ENTITY, "Nothing to migrate");
            return Ok(report);
        }
        tracing::info!(user_id, entity = E::ENTITY, count = records.len(), "Migrating records");

        for SourceRecord { mut entity, image } in records {
            let Some(id) = entity.record_id().map(str::to_string) else {
                tracing::warn!(entity = E::ENTITY, "Skipping source record without id");
                report.skipped += 1;
                continue;
            };

            let exists = match TargetCollection::<E>::exists(&*self.target, &id).await {
                Ok(exists) => exists,
                Err(e) => {
                    tracing::warn!(entity = E::ENTITY, record_id = %id, error = %e, "Existence check failed; assuming absent");
                    false
                }
            };
            if exists {
                tracing::debug!(entity = E::ENTITY, record_id = %id, "Already migrated, skipping");
                report.skipped += 1;
                continue;
            }

            if let Some(image) = &image {
                if self.rehome_image(&mut entity, image) {
                    report.images_rehomed += 1;
                }
            }

            TargetCollection::<E>::insert(&*self.target, &entity).await?;
            tracing::debug!(entity = E::ENTITY, record_id = %id, "Migrated record");
            report.migrated += 1;
        }

        tracing::info!(
            user_id,
            entity = E::ENTITY,
            migrated = report.migrated,
            skipped = report.skipped,
            "Finished entity type"
        );
        Ok(report)
    }

    /// Copy `image` into local storage unless the entity already points at a
    /// stored file. Returns whether a file was written; failures are logged
    /// and leave the entity without an image reference.
    fn rehome_image<E: Migratable>(&self, entity: &mut E, image: &image::DynamicImage) -> bool {
        if let Some(existing) = entity.local_image() {
            if self.images.exists(existing) {
                return false;
            }
        }

        let quality = match E::IMAGE_ROLE {
            ImageRole::Cover => self.cover_quality,
            ImageRole::Photo => self.photo_quality,
        };
        match self.images.save_image(image, quality) {
            Ok(filename) => {
                entity.attach_image(filename);
                true
            }
            Err(e) => {
                tracing::warn!(
                    entity = E::ENTITY,
                    record_id = ?entity.record_id(),
                    error = %e,
                    "Failed to rehome image; migrating without it"
                );
                false
            }
        }
    }
}
