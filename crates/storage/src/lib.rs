//! On-device persistence: JPEG blobs on the filesystem and the
//! process-wide key/value flags.

pub mod flags;
pub mod images;

pub use flags::{FlagStore, JsonFileFlagStore, MemoryFlagStore};
pub use images::{ImageCategory, LocalImageStore};
