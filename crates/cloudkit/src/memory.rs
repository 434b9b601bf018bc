//! In-process [`RecordDatabase`] with failure injection and call counting.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use gotravel_core::error::{CoreError, RemoteError, RemoteErrorKind};
use serde::{Deserialize, Serialize};

use crate::database::RecordDatabase;
use crate::record::{Asset, DatabaseScope, FieldValue, Query, Record};

/// Records held in memory, keyed by scope then id.
#[derive(Debug, Default)]
pub struct MemoryRecordDatabase {
    records: Mutex<HashMap<DatabaseScope, BTreeMap<String, Record>>>,
    /// Queries filtering on these fields fail with the mapped error.
    query_failures: Mutex<HashMap<String, RemoteError>>,
    calls: AtomicUsize,
}

/// Serializable form used by [`MemoryRecordDatabase::save_snapshot`].
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    private: Vec<Record>,
    public: Vec<Record>,
}

impl MemoryRecordDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a remote schema that does not declare `field`.
    pub fn undeclare_field(&self, field: &str) {
        self.fail_queries_on(field, RemoteError::unknown_field(field));
    }

    /// Make every query filtering on `field` fail with `error`.
    pub fn fail_queries_on(&self, field: &str, error: RemoteError) {
        self.lock_failures().insert(field.to_string(), error);
    }

    /// Total number of backend calls served so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Insert a record directly, bypassing call counting.
    pub fn seed(&self, scope: DatabaseScope, record: Record) {
        self.lock_records()
            .entry(scope)
            .or_default()
            .insert(record.id.clone(), record);
    }

    pub fn len(&self, scope: DatabaseScope) -> usize {
        self.lock_records().get(&scope).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.lock_records().values().all(BTreeMap::is_empty)
    }

    /// Restore from a JSON snapshot; a missing file yields an empty database.
    pub fn load_snapshot(path: &Path) -> Result<Self, CoreError> {
        let db = Self::new();
        let raw = match std::fs::read(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(db),
            Err(e) => return Err(e.into()),
        };
        let snapshot: Snapshot = serde_json::from_slice(&raw)
            .map_err(|e| CoreError::LocalStorage(format!("{}: {e}", path.display())))?;
        for record in snapshot.private {
            db.seed(DatabaseScope::Private, record);
        }
        for record in snapshot.public {
            db.seed(DatabaseScope::Public, record);
        }
        Ok(db)
    }

    pub fn save_snapshot(&self, path: &Path) -> Result<(), CoreError> {
        let snapshot = {
            let records = self.lock_records();
            let collect = |scope: DatabaseScope| -> Vec<Record> {
                records
                    .get(&scope)
                    .map(|m| m.values().cloned().collect())
                    .unwrap_or_default()
            };
            Snapshot {
                private: collect(DatabaseScope::Private),
                public: collect(DatabaseScope::Public),
            }
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| CoreError::LocalStorage(e.to_string()))?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    fn lock_records(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<DatabaseScope, BTreeMap<String, Record>>> {
        self.records.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn lock_failures(&self) -> std::sync::MutexGuard<'_, HashMap<String, RemoteError>> {
        self.query_failures.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn count_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Replace file-backed assets with their bytes, as an upload would.
fn upload_assets(record: &mut Record) -> Result<(), RemoteError> {
    for (key, value) in record.fields.iter_mut() {
        if let FieldValue::Asset(asset @ Asset::File(_)) = value {
            let bytes = asset.read().map_err(|e| {
                RemoteError::new(
                    RemoteErrorKind::Other,
                    format!("Asset upload for '{key}' failed: {e}"),
                )
            })?;
            *asset = Asset::Data(bytes);
        }
    }
    Ok(())
}

#[async_trait]
impl RecordDatabase for MemoryRecordDatabase {
    async fn save(&self, scope: DatabaseScope, mut record: Record) -> Result<Record, RemoteError> {
        self.count_call();
        upload_assets(&mut record)?;
        self.lock_records()
            .entry(scope)
            .or_default()
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn fetch(&self, scope: DatabaseScope, id: &str) -> Result<Option<Record>, RemoteError> {
        self.count_call();
        Ok(self
            .lock_records()
            .get(&scope)
            .and_then(|records| records.get(id))
            .cloned())
    }

    async fn query(&self, scope: DatabaseScope, query: &Query) -> Result<Vec<Record>, RemoteError> {
        self.count_call();
        if let Some(err) = self.lock_failures().get(query.predicate.field()) {
            return Err(err.clone());
        }
        Ok(self
            .lock_records()
            .get(&scope)
            .map(|records| {
                records
                    .values()
                    .filter(|r| r.record_type == query.record_type && query.predicate.matches(r))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete(&self, scope: DatabaseScope, id: &str) -> Result<(), RemoteError> {
        self.count_call();
        if let Some(records) = self.lock_records().get_mut(&scope) {
            records.remove(id);
        }
        Ok(())
    }
}
