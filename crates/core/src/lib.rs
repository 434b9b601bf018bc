//! Domain records and shared primitives for the GoTravel data layer.
//!
//! Pure code: no remote calls, no filesystem access. Store adapters,
//! the local image store and the migration bridge build on these types.

pub mod auth;
pub mod color;
pub mod error;
pub mod jpeg;
pub mod model;
pub mod share_code;
pub mod types;
