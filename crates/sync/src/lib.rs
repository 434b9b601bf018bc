//! Configuration and service wiring for the `gotravel-sync` binary.

pub mod config;
pub mod services;

pub use config::{ConfigError, SyncConfig};
pub use services::Services;
