//! In-memory storage implementation.

use super::{Storage, StorageError, StorageResult};
use crate::scene::Snapshot;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage for testing and ephemeral use.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    snapshots: RwLock<HashMap<String, Snapshot>>,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::Other(format!("Lock error: {}", e))
}

impl Storage for MemoryStorage {
    fn save(&self, key: &str, snapshot: &Snapshot) -> StorageResult<()> {
        let mut snapshots = self.snapshots.write().map_err(lock_error)?;
        snapshots.insert(key.to_string(), snapshot.clone());
        Ok(())
    }

    fn load(&self, key: &str) -> StorageResult<Option<Snapshot>> {
        let snapshots = self.snapshots.read().map_err(lock_error)?;
        Ok(snapshots.get(key).cloned())
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        let mut snapshots = self.snapshots.write().map_err(lock_error)?;
        snapshots.remove(key);
        Ok(())
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        let snapshots = self.snapshots.read().map_err(lock_error)?;
        Ok(snapshots.keys().cloned().collect())
    }

    fn exists(&self, key: &str) -> StorageResult<bool> {
        let snapshots = self.snapshots.read().map_err(lock_error)?;
        Ok(snapshots.contains_key(key))
    }
}
