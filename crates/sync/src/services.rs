//! Explicit construction of every collaborator the sync run needs.
//!
//! Both remote stores are in-memory databases restored from JSON snapshots
//! under the data directory; a missing snapshot starts empty.

use std::sync::Arc;

use gotravel_cloudkit::{CloudKitStore, MemoryRecordDatabase};
use gotravel_core::auth::StaticAuth;
use gotravel_core::error::CoreError;
use gotravel_firestore::{FirestoreStore, MemoryDocumentDatabase};
use gotravel_migration::MigrationBridge;
use gotravel_storage::{JsonFileFlagStore, LocalImageStore};

use crate::config::SyncConfig;

pub struct Services {
    pub cloudkit_db: Arc<MemoryRecordDatabase>,
    pub firestore_db: Arc<MemoryDocumentDatabase>,
    pub cloudkit: Arc<CloudKitStore>,
    pub firestore: Arc<FirestoreStore>,
    pub bridge: MigrationBridge<CloudKitStore, FirestoreStore>,
}

impl Services {
    /// Restore both stores and wire the bridge for `user_id`.
    pub fn load(config: &SyncConfig, user_id: &str) -> Result<Self, CoreError> {
        let cloudkit_db = Arc::new(MemoryRecordDatabase::load_snapshot(
            &config.cloudkit_snapshot_path(),
        )?);
        let firestore_db = Arc::new(MemoryDocumentDatabase::load_snapshot(
            &config.firestore_snapshot_path(),
        )?);
        tracing::info!(
            data_dir = %config.data_dir.display(),
            "Restored store snapshots"
        );

        let images = LocalImageStore::new(config.images_dir());
        let cloudkit = Arc::new(CloudKitStore::new(cloudkit_db.clone(), config.staging_dir()));
        let firestore = Arc::new(
            FirestoreStore::new(
                firestore_db.clone(),
                Arc::new(StaticAuth::signed_in(user_id)),
                images.clone(),
            )
            .with_photo_quality(config.photo_jpeg_quality),
        );
        let flags = Arc::new(JsonFileFlagStore::new(config.preferences_path()));

        let bridge = MigrationBridge::new(cloudkit.clone(), firestore.clone(), images, flags)
            .with_flag_key(config.migration_flag_key.as_str())
            .with_qualities(config.cover_jpeg_quality, config.photo_jpeg_quality);

        Ok(Self {
            cloudkit_db,
            firestore_db,
            cloudkit,
            firestore,
            bridge,
        })
    }

    /// Write the target store back to disk. The source store is read-only
    /// during a sync and is left as it was.
    pub fn persist(&self, config: &SyncConfig) -> Result<(), CoreError> {
        let path = config.firestore_snapshot_path();
        self.firestore_db.save_snapshot(&path)?;
        tracing::info!(path = %path.display(), "Saved target store snapshot");
        Ok(())
    }
}
