//! Key-value storage for snapshots.
//!
//! One opaque [`Snapshot`] per key, last write wins. A missing key is
//! `Ok(None)`, never an error; only genuine backend failures are errors.

mod autosave;
mod memory;

#[cfg(not(target_arch = "wasm32"))]
mod file;

#[cfg(target_arch = "wasm32")]
mod local;

pub use autosave::{AutoSaver, DEFAULT_AUTOSAVE_INTERVAL_SECS};
pub use memory::MemoryStorage;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStorage;

#[cfg(target_arch = "wasm32")]
pub use local::LocalStorage;

use crate::scene::Snapshot;
use std::sync::Arc;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Thread-safety required of storage backends: `Send + Sync` on native
/// targets, nothing on single-threaded wasm.
#[cfg(not(target_arch = "wasm32"))]
pub trait ThreadSafety: Send + Sync {}

#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync + ?Sized> ThreadSafety for T {}

#[cfg(target_arch = "wasm32")]
pub trait ThreadSafety {}

#[cfg(target_arch = "wasm32")]
impl<T: ?Sized> ThreadSafety for T {}

/// A snapshot store keyed by string.
pub trait Storage: ThreadSafety {
    /// Store a snapshot, replacing any previous value.
    fn save(&self, key: &str, snapshot: &Snapshot) -> StorageResult<()>;

    /// `None` if nothing is stored under `key`.
    fn load(&self, key: &str) -> StorageResult<Option<Snapshot>>;

    /// Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> StorageResult<()>;

    /// All stored keys, in no particular order.
    fn list(&self) -> StorageResult<Vec<String>>;

    fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.load(key)?.is_some())
    }
}

/// Platform storage backend.
#[cfg(not(target_arch = "wasm32"))]
pub type PlatformStorage = FileStorage;

#[cfg(target_arch = "wasm32")]
pub type PlatformStorage = LocalStorage;

/// Create a platform-appropriate storage backend.
#[cfg(not(target_arch = "wasm32"))]
pub fn create_default_storage() -> StorageResult<Arc<PlatformStorage>> {
    Ok(Arc::new(FileStorage::default_location()?))
}

#[cfg(target_arch = "wasm32")]
pub fn create_default_storage() -> StorageResult<Arc<PlatformStorage>> {
    Ok(Arc::new(LocalStorage::new()))
}
