//! Key-value media backing the record store.

use std::collections::HashMap;
use std::sync::Mutex;

use super::StoreError;

/// A persistent string-to-string map, shared by every context of a process.
///
/// Implementations must make each call atomic on its own; nothing spans calls.
pub trait KeyValueMedium: Send + Sync {
    /// Short name for logs ("memory", "sqlite").
    fn kind(&self) -> &'static str;

    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Process-local medium. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryMedium {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueMedium for MemoryMedium {
    fn kind(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        entries.remove(key);
        Ok(())
    }
}
