//! CloudKit-shaped record store: typed records with a private/public
//! database split and a file-backed asset side channel.
//!
//! Nested lists are stored as JSON strings inside single fields. The
//! backend itself sits behind [`database::RecordDatabase`].

pub mod codec;
pub mod database;
pub mod memory;
pub mod record;
pub mod store;

pub use database::RecordDatabase;
pub use memory::MemoryRecordDatabase;
pub use record::{Asset, DatabaseScope, FieldValue, Predicate, Query, Record};
pub use store::{CloudKitStore, FetchedRecord};
