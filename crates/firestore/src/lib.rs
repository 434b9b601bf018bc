//! Firestore-shaped document store: per-user subcollections, a top-level
//! collection for shared travel plans, and live snapshot listeners.
//!
//! Nested lists are stored as arrays of maps with typed timestamps.

pub mod codec;
pub mod database;
pub mod memory;
pub mod observe;
pub mod paths;
pub mod store;
pub mod value;

pub use database::{DocumentDatabase, Filter, SnapshotStream};
pub use memory::MemoryDocumentDatabase;
pub use observe::EntityStream;
pub use paths::CollectionPath;
pub use store::FirestoreStore;
pub use value::{Document, Fields, FieldsBuilder, Value};
