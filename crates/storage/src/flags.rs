//! Process-wide boolean flags (the migration completion gate lives here).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use gotravel_core::error::CoreError;

/// Named boolean key/value storage.
pub trait FlagStore: Send + Sync {
    /// Unset keys read as `false`.
    fn get_bool(&self, key: &str) -> Result<bool, CoreError>;

    fn set_bool(&self, key: &str, value: bool) -> Result<(), CoreError>;

    fn remove(&self, key: &str) -> Result<(), CoreError>;
}

/// Flags persisted as a flat JSON object on disk.
///
/// Every write rewrites the whole file; the file is tiny and writes are rare.
#[derive(Debug)]
pub struct JsonFileFlagStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileFlagStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn read_map(&self) -> Result<serde_json::Map<String, serde_json::Value>, CoreError> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Default::default()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice::<serde_json::Value>(&raw) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            Ok(_) | Err(_) => Err(CoreError::LocalStorage(format!(
                "Preferences file {} is not a JSON object",
                self.path.display()
            ))),
        }
    }

    fn write_map(&self, map: serde_json::Map<String, serde_json::Value>) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(&serde_json::Value::Object(map))
            .map_err(|e| CoreError::LocalStorage(e.to_string()))?;
        std::fs::write(&self.path, bytes)?;
        Ok(())
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl FlagStore for JsonFileFlagStore {
    fn get_bool(&self, key: &str) -> Result<bool, CoreError> {
        let _guard = self.guard();
        Ok(self
            .read_map()?
            .get(key)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false))
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<(), CoreError> {
        let _guard = self.guard();
        let mut map = self.read_map()?;
        map.insert(key.to_string(), serde_json::Value::Bool(value));
        self.write_map(map)
    }

    fn remove(&self, key: &str) -> Result<(), CoreError> {
        let _guard = self.guard();
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(map)?;
        }
        Ok(())
    }
}

/// In-memory flags, for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryFlagStore {
    flags: Mutex<HashMap<String, bool>>,
}

impl MemoryFlagStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FlagStore for MemoryFlagStore {
    fn get_bool(&self, key: &str) -> Result<bool, CoreError> {
        let flags = self.flags.lock().unwrap_or_else(|p| p.into_inner());
        Ok(flags.get(key).copied().unwrap_or(false))
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<(), CoreError> {
        let mut flags = self.flags.lock().unwrap_or_else(|p| p.into_inner());
        flags.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CoreError> {
        let mut flags = self.flags.lock().unwrap_or_else(|p| p.into_inner());
        flags.remove(key);
        Ok(())
    }
}
