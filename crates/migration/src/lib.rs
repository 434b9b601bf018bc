//! One-time transfer of a user's records from the CloudKit-shaped store
//! into the Firestore-shaped store.
//!
//! The bridge is generic over its two ends ([`SourceCollection`] and
//! [`TargetCollection`], one impl per entity type) so either side can be
//! swapped for a test double.

pub mod adapters;
pub mod bridge;
pub mod collection;
pub mod report;

pub use bridge::{MigrationBridge, MigrationState, DEFAULT_MIGRATION_FLAG_KEY};
pub use collection::{ImageRole, Migratable, SourceCollection, SourceRecord, TargetCollection};
pub use report::{MigrationReport, TypeReport};
