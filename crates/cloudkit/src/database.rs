//! The backend seam. Production binds this to the platform SDK; tests and
//! the sync binary use [`MemoryRecordDatabase`](crate::MemoryRecordDatabase).

use async_trait::async_trait;
use gotravel_core::error::RemoteError;

use crate::record::{DatabaseScope, Query, Record};

#[async_trait]
pub trait RecordDatabase: Send + Sync {
    /// Create or overwrite `record`, uploading any file-backed assets.
    /// Returns the record as stored by the backend.
    async fn save(&self, scope: DatabaseScope, record: Record) -> Result<Record, RemoteError>;

    async fn fetch(&self, scope: DatabaseScope, id: &str) -> Result<Option<Record>, RemoteError>;

    async fn query(&self, scope: DatabaseScope, query: &Query) -> Result<Vec<Record>, RemoteError>;

    /// Delete by id. Deleting a missing record succeeds.
    async fn delete(&self, scope: DatabaseScope, id: &str) -> Result<(), RemoteError>;
}
