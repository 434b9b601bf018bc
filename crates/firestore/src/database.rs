//! The backend seam for the document store.

use async_trait::async_trait;
use futures::stream::BoxStream;
use gotravel_core::error::RemoteError;

use crate::paths::CollectionPath;
use crate::value::{Document, Value};

/// Live query results: the full matching document list, re-delivered on
/// every change.
pub type SnapshotStream = BoxStream<'static, Result<Vec<Document>, RemoteError>>;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Equals { field: String, value: Value },
    ArrayContains { field: String, value: Value },
}

impl Filter {
    pub fn equals(field: &str, value: impl Into<Value>) -> Self {
        Self::Equals {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn array_contains(field: &str, value: impl Into<Value>) -> Self {
        Self::ArrayContains {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Self::Equals { field, .. } | Self::ArrayContains { field, .. } => field,
        }
    }

    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Self::Equals { field, value } => document.fields.get(field) == Some(value),
            Self::ArrayContains { field, value } => matches!(
                document.fields.get(field),
                Some(Value::Array(items)) if items.contains(value)
            ),
        }
    }
}

#[async_trait]
pub trait DocumentDatabase: Send + Sync {
    /// Create or fully overwrite a document.
    async fn set(&self, collection: &CollectionPath, document: Document) -> Result<(), RemoteError>;

    async fn get(&self, collection: &CollectionPath, id: &str) -> Result<Option<Document>, RemoteError>;

    async fn query(
        &self,
        collection: &CollectionPath,
        filter: Option<&Filter>,
    ) -> Result<Vec<Document>, RemoteError>;

    /// Delete by id. Deleting a missing document succeeds.
    async fn delete(&self, collection: &CollectionPath, id: &str) -> Result<(), RemoteError>;

    /// Atomically add `values` to the array `field`, skipping ones already
    /// present. Fails when the document does not exist.
    async fn array_union(
        &self,
        collection: &CollectionPath,
        id: &str,
        field: &str,
        values: Vec<Value>,
    ) -> Result<(), RemoteError>;

    /// Atomically remove `values` from the array `field`.
    async fn array_remove(
        &self,
        collection: &CollectionPath,
        id: &str,
        field: &str,
        values: Vec<Value>,
    ) -> Result<(), RemoteError>;

    /// Subscribe to a live query. The first item is the current result set.
    fn listen(&self, collection: &CollectionPath, filter: Option<Filter>) -> SnapshotStream;
}
