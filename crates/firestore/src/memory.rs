//! In-process [`DocumentDatabase`] with live listeners, failure injection
//! and call counting.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use futures::StreamExt;
use gotravel_core::error::{CoreError, RemoteError, RemoteErrorKind};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::database::{DocumentDatabase, Filter, SnapshotStream};
use crate::paths::CollectionPath;
use crate::value::{Document, Value};

type Collections = BTreeMap<CollectionPath, BTreeMap<String, Document>>;

struct Listener {
    collection: CollectionPath,
    filter: Option<Filter>,
    tx: mpsc::UnboundedSender<Result<Vec<Document>, RemoteError>>,
}

/// Documents held in memory. Listeners are notified synchronously after
/// each write, in registration order.
#[derive(Default)]
pub struct MemoryDocumentDatabase {
    collections: Mutex<Collections>,
    listeners: Mutex<Vec<Listener>>,
    query_failures: Mutex<HashMap<String, RemoteError>>,
    calls: AtomicUsize,
}

impl MemoryDocumentDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a schema that does not index `field`.
    pub fn undeclare_field(&self, field: &str) {
        self.fail_queries_on(field, RemoteError::unknown_field(field));
    }

    /// Queries and listeners filtering on `field` fail with `error`.
    pub fn fail_queries_on(&self, field: &str, error: RemoteError) {
        lock(&self.query_failures).insert(field.to_string(), error);
    }

    /// Number of backend calls served (listen registrations included).
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Insert a document directly, bypassing call counting.
    pub fn seed(&self, collection: &CollectionPath, document: Document) {
        lock(&self.collections)
            .entry(collection.clone())
            .or_default()
            .insert(document.id.clone(), document);
        self.notify(collection);
    }

    pub fn len(&self, collection: &CollectionPath) -> usize {
        lock(&self.collections).get(collection).map_or(0, BTreeMap::len)
    }

    pub fn document(&self, collection: &CollectionPath, id: &str) -> Option<Document> {
        lock(&self.collections)
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned()
    }

    /// Restore from a JSON snapshot; a missing file yields an empty database.
    pub fn load_snapshot(path: &Path) -> Result<Self, CoreError> {
        let db = Self::new();
        let raw = match std::fs::read(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(db),
            Err(e) => return Err(e.into()),
        };
        let snapshot: BTreeMap<CollectionPath, Vec<Document>> = serde_json::from_slice(&raw)
            .map_err(|e| CoreError::LocalStorage(format!("{}: {e}", path.display())))?;
        {
            let mut collections = lock(&db.collections);
            for (collection, documents) in snapshot {
                let docs = collections.entry(collection).or_default();
                for document in documents {
                    docs.insert(document.id.clone(), document);
                }
            }
        }
        Ok(db)
    }

    pub fn save_snapshot(&self, path: &Path) -> Result<(), CoreError> {
        let snapshot: BTreeMap<CollectionPath, Vec<Document>> = lock(&self.collections)
            .iter()
            .map(|(collection, docs)| (collection.clone(), docs.values().cloned().collect()))
            .collect();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| CoreError::LocalStorage(e.to_string()))?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    fn count_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn check_filter(&self, filter: Option<&Filter>) -> Result<(), RemoteError> {
        match filter.and_then(|f| lock(&self.query_failures).get(f.field()).cloned()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn snapshot_of(&self, collection: &CollectionPath, filter: Option<&Filter>) -> Vec<Document> {
        lock(&self.collections)
            .get(collection)
            .map(|docs| {
                docs.values()
                    .filter(|d| filter.map_or(true, |f| f.matches(d)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Push the current result set to every live listener on `collection`,
    /// dropping listeners whose receiver is gone.
    fn notify(&self, collection: &CollectionPath) {
        let mut listeners = lock(&self.listeners);
        listeners.retain(|listener| {
            if &listener.collection != collection {
                return !listener.tx.is_closed();
            }
            let docs = self.snapshot_of(collection, listener.filter.as_ref());
            listener.tx.send(Ok(docs)).is_ok()
        });
    }

    fn mutate<R>(
        &self,
        collection: &CollectionPath,
        f: impl FnOnce(&mut BTreeMap<String, Document>) -> Result<R, RemoteError>,
    ) -> Result<R, RemoteError> {
        let result = {
            let mut collections = lock(&self.collections);
            f(collections.entry(collection.clone()).or_default())
        };
        if result.is_ok() {
            self.notify(collection);
        }
        result
    }

    fn update_array(
        &self,
        collection: &CollectionPath,
        id: &str,
        field: &str,
        apply: impl FnOnce(&mut Vec<Value>),
    ) -> Result<(), RemoteError> {
        self.mutate(collection, |docs| {
            let doc = docs.get_mut(id).ok_or_else(|| {
                RemoteError::new(
                    RemoteErrorKind::Other,
                    format!("No document {collection}/{id} to update"),
                )
            })?;
            let entry = doc
                .fields
                .entry(field.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            if !matches!(entry, Value::Array(_)) {
                *entry = Value::Array(Vec::new());
            }
            if let Value::Array(items) = entry {
                apply(items);
            }
            Ok(())
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|p| p.into_inner())
}

#[async_trait]
impl DocumentDatabase for MemoryDocumentDatabase {
    async fn set(&self, collection: &CollectionPath, document: Document) -> Result<(), RemoteError> {
        self.count_call();
        self.mutate(collection, |docs| {
            docs.insert(document.id.clone(), document);
            Ok(())
        })
    }

    async fn get(&self, collection: &CollectionPath, id: &str) -> Result<Option<Document>, RemoteError> {
        self.count_call();
        Ok(self.document(collection, id))
    }

    async fn query(
        &self,
        collection: &CollectionPath,
        filter: Option<&Filter>,
    ) -> Result<Vec<Document>, RemoteError> {
        self.count_call();
        self.check_filter(filter)?;
        Ok(self.snapshot_of(collection, filter))
    }

    async fn delete(&self, collection: &CollectionPath, id: &str) -> Result<(), RemoteError> {
        self.count_call();
        self.mutate(collection, |docs| {
            docs.remove(id);
            Ok(())
        })
    }

    async fn array_union(
        &self,
        collection: &CollectionPath,
        id: &str,
        field: &str,
        values: Vec<Value>,
    ) -> Result<(), RemoteError> {
        self.count_call();
        self.update_array(collection, id, field, |items| {
            for value in values {
                if !items.contains(&value) {
                    items.push(value);
                }
            }
        })
    }

    async fn array_remove(
        &self,
        collection: &CollectionPath,
        id: &str,
        field: &str,
        values: Vec<Value>,
    ) -> Result<(), RemoteError> {
        self.count_call();
        self.update_array(collection, id, field, |items| {
            items.retain(|item| !values.contains(item));
        })
    }

    fn listen(&self, collection: &CollectionPath, filter: Option<Filter>) -> SnapshotStream {
        self.count_call();
        let (tx, rx) = mpsc::unbounded_channel();

        match self.check_filter(filter.as_ref()) {
            Err(err) => {
                // Listener fails once and is never registered.
                let _ = tx.send(Err(err));
            }
            Ok(()) => {
                let initial = self.snapshot_of(collection, filter.as_ref());
                let _ = tx.send(Ok(initial));
                lock(&self.listeners).push(Listener {
                    collection: collection.clone(),
                    filter,
                    tx,
                });
            }
        }

        UnboundedReceiverStream::new(rx).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Fields, FieldsBuilder};

    fn doc(id: &str, owner: &str) -> Document {
        Document::new(id, FieldsBuilder::new().set("userId", owner).build())
    }

    #[tokio::test]
    async fn listener_receives_initial_and_updated_snapshots() {
        let db = MemoryDocumentDatabase::new();
        let path = CollectionPath::user_plans("u1");
        db.seed(&path, doc("p1", "u1"));

        let mut stream = db.listen(&path, None);
        assert_eq!(stream.next().await.unwrap().unwrap().len(), 1);

        db.set(&path, doc("p2", "u1")).await.unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap().len(), 2);

        db.delete(&path, "p1").await.unwrap();
        let docs = stream.next().await.unwrap().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "p2");
    }

    #[tokio::test]
    async fn array_union_is_idempotent() {
        let db = MemoryDocumentDatabase::new();
        let path = CollectionPath::shared_travel_plans();
        db.seed(&path, Document::new("t1", Fields::new()));

        for _ in 0..2 {
            db.array_union(&path, "t1", "sharedWith", vec![Value::from("u2")])
                .await
                .unwrap();
        }
        let stored = db.document(&path, "t1").unwrap();
        assert_eq!(stored.fields["sharedWith"], Value::Array(vec![Value::from("u2")]));

        db.array_remove(&path, "t1", "sharedWith", vec![Value::from("u2")])
            .await
            .unwrap();
        let stored = db.document(&path, "t1").unwrap();
        assert_eq!(stored.fields["sharedWith"], Value::Array(Vec::new()));
    }

    #[tokio::test]
    async fn array_union_on_missing_document_fails() {
        let db = MemoryDocumentDatabase::new();
        let path = CollectionPath::shared_travel_plans();
        assert!(db
            .array_union(&path, "nope", "sharedWith", vec![Value::from("u2")])
            .await
            .is_err());
    }

    #[tokio::test]
    async fn failing_listener_yields_single_error() {
        let db = MemoryDocumentDatabase::new();
        db.undeclare_field("sharedWith");
        let mut stream = db.listen(
            &CollectionPath::shared_travel_plans(),
            Some(Filter::array_contains("sharedWith", "u1")),
        );
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(err.is_unknown_field("sharedWith"));
        assert!(stream.next().await.is_none());
    }
}
