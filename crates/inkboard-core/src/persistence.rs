//! Persistence and export of scene snapshots.
//!
//! [`PersistenceGateway`] moves snapshots between a scene and a [`Storage`]
//! backend, produces export artifacts, and performs the destructive reset.

use crate::history::{HistoryConfig, HistoryRecorder};
use crate::scene::{ExtraProps, RasterFormat, Scene, SceneError, SceneView};
use crate::storage::{Storage, StorageError};
use std::sync::Arc;
use thiserror::Error;

/// Cache key used when none is configured.
pub const DEFAULT_CACHE_KEY: &str = "whiteboard";

/// Base name of exported files.
pub const EXPORT_BASE_NAME: &str = "whiteboard";

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type for persistence operations.
pub type PersistResult<T> = Result<T, PersistError>;

/// A downloadable export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    /// Write the artifact into `dir` under its file name. Returns the path.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn write_to(&self, dir: &std::path::Path) -> crate::storage::StorageResult<std::path::PathBuf> {
        std::fs::create_dir_all(dir)
            .map_err(|e| StorageError::Io(format!("Failed to create {}: {}", dir.display(), e)))?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)
            .map_err(|e| StorageError::Io(format!("Failed to write {}: {}", path.display(), e)))?;
        Ok(path)
    }
}

/// Bridges a scene to durable storage and export formats.
pub struct PersistenceGateway<S: Storage + ?Sized> {
    storage: Arc<S>,
    extra_props: ExtraProps,
}

impl<S: Storage + ?Sized> PersistenceGateway<S> {
    /// Create a gateway. `extra_props` is applied to every snapshot it takes.
    pub fn new(storage: Arc<S>, extra_props: ExtraProps) -> Self {
        Self {
            storage,
            extra_props,
        }
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub fn extra_props(&self) -> &ExtraProps {
        &self.extra_props
    }

    /// Store the current scene under `key`, replacing what was there.
    pub fn save_to_cache(&self, key: &str, scene: &dyn SceneView) -> PersistResult<()> {
        let snapshot = scene.serialize(&self.extra_props)?;
        self.storage.save(key, &snapshot)?;
        log::debug!("Saved {} bytes to '{}'", snapshot.len(), key);
        Ok(())
    }

    /// Restore the scene from `key`.
    ///
    /// Returns `Ok(false)` and leaves the scene alone if nothing is stored.
    /// History is not involved; use [`PersistenceGateway::open`] to load a
    /// board that is recorded.
    pub fn load_from_cache(&self, key: &str, scene: &mut dyn Scene) -> PersistResult<bool> {
        let Some(snapshot) = self.storage.load(key)? else {
            log::debug!("Nothing cached under '{}'", key);
            return Ok(false);
        };
        scene.restore(&snapshot, Box::new(|_| {}))?;
        log::debug!("Loaded '{}'", key);
        Ok(true)
    }

    /// Current scene as `whiteboard.json`. The bytes are exactly the snapshot.
    pub fn export_json(&self, scene: &dyn SceneView) -> PersistResult<ExportArtifact> {
        let snapshot = scene.serialize(&self.extra_props)?;
        Ok(ExportArtifact {
            file_name: format!("{}.json", EXPORT_BASE_NAME),
            mime_type: "application/json",
            bytes: snapshot.as_bytes().to_vec(),
        })
    }

    /// Current scene rendered by the scene's rasterizer.
    pub fn export_raster(&self, scene: &dyn Scene, format: RasterFormat) -> PersistResult<ExportArtifact> {
        let bytes = scene.rasterize(format)?;
        Ok(ExportArtifact {
            file_name: format!("{}.{}", EXPORT_BASE_NAME, format.extension()),
            mime_type: format.mime_type(),
            bytes,
        })
    }

    /// Delete `key`, empty both history stacks and clear the scene.
    ///
    /// Irreversible. Callers must confirm with the user before calling.
    pub fn reset(&self, key: &str, history: &HistoryRecorder, scene: &mut dyn Scene) -> PersistResult<()> {
        self.storage.delete(key)?;
        history.clear();
        scene.clear();
        history.rearm(&*scene)?;
        log::info!("Reset board '{}'", key);
        Ok(())
    }

    /// Attach history to `scene` and load `key` into it as the baseline.
    ///
    /// The first undo never goes back past the loaded content.
    pub fn open(&self, scene: &mut dyn Scene, key: &str, config: HistoryConfig) -> PersistResult<HistoryRecorder> {
        let history = HistoryRecorder::attach(scene, config)?;
        if let Err(err) = self.load_recorded(key, &history, scene) {
            history.detach(scene);
            return Err(err);
        }
        Ok(history)
    }

    /// Restore `key` through `history`, making it the new undo baseline.
    ///
    /// Returns `Ok(false)` and leaves scene and history alone if nothing is
    /// stored.
    pub fn load_recorded(&self, key: &str, history: &HistoryRecorder, scene: &mut dyn Scene) -> PersistResult<bool> {
        let Some(snapshot) = self.storage.load(key)? else {
            return Ok(false);
        };
        history.load(scene, &snapshot, None)?;
        log::debug!("Loaded '{}' as history baseline", key);
        Ok(true)
    }

    /// Stored keys, sorted.
    pub fn list_keys(&self) -> PersistResult<Vec<String>> {
        let mut keys = self.storage.list()?;
        keys.sort();
        Ok(keys)
    }
}

impl<S: Storage + ?Sized> std::fmt::Debug for PersistenceGateway<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceGateway")
            .field("extra_props", &self.extra_props)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, BoardConfig, RestoreMode};
    use crate::scene::Snapshot;
    use crate::shapes::{Rectangle, Shape};
    use crate::storage::{MemoryStorage, StorageResult};
    use kurbo::Point;

    fn gateway() -> PersistenceGateway<MemoryStorage> {
        PersistenceGateway::new(Arc::new(MemoryStorage::new()), ExtraProps::default())
    }

    fn rect(x: f64) -> Shape {
        Shape::Rectangle(Rectangle::new(Point::new(x, 0.0), 50.0, 50.0))
    }

    fn snapshot(board: &Board) -> Snapshot {
        board.serialize(&ExtraProps::default()).unwrap()
    }

    #[test]
    fn test_save_then_load_on_fresh_board() {
        let gateway = gateway();
        let mut board = Board::default();
        board.add(rect(0.0));
        board.add(rect(100.0));
        gateway.save_to_cache("k", &board).unwrap();

        let mut fresh = Board::default();
        assert!(gateway.load_from_cache("k", &mut fresh).unwrap());
        assert_eq!(snapshot(&fresh), snapshot(&board));
    }

    #[test]
    fn test_load_missing_key_is_noop() {
        let gateway = gateway();
        let mut board = Board::default();
        board.add(rect(0.0));
        let before = snapshot(&board);

        assert!(!gateway.load_from_cache("missing", &mut board).unwrap());
        assert_eq!(snapshot(&board), before);
    }

    #[test]
    fn test_export_json_is_snapshot() {
        let gateway = gateway();
        let mut board = Board::default();
        board.add(rect(0.0));

        let artifact = gateway.export_json(&board).unwrap();
        assert_eq!(artifact.file_name, "whiteboard.json");
        assert_eq!(artifact.mime_type, "application/json");
        assert_eq!(artifact.bytes, snapshot(&board).as_bytes());
    }

    #[test]
    fn test_export_raster_without_rasterizer() {
        let gateway = gateway();
        let board = Board::default();
        assert!(matches!(
            gateway.export_raster(&board, RasterFormat::Png),
            Err(PersistError::Scene(SceneError::RasterUnavailable))
        ));
    }

    #[test]
    fn test_write_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = ExportArtifact {
            file_name: "whiteboard.json".into(),
            mime_type: "application/json",
            bytes: b"{}".to_vec(),
        };
        let path = artifact.write_to(&dir.path().join("out")).unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"{}");
    }

    #[test]
    fn test_reset_removes_key_and_history() {
        let gateway = gateway();
        let mut board = Board::default();
        let history = gateway.open(&mut board, "k", HistoryConfig::default()).unwrap();
        board.add(rect(0.0));
        board.add(rect(100.0));
        history.undo(&mut board, None).unwrap();
        gateway.save_to_cache("k", &board).unwrap();

        gateway.reset("k", &history, &mut board).unwrap();

        assert!(board.is_empty());
        assert_eq!((history.undo_len(), history.redo_len()), (0, 0));
        assert!(!gateway.load_from_cache("k", &mut board).unwrap());
        assert!(!history.undo(&mut board, None).unwrap());

        // The first edit after a reset undoes back to the empty board.
        board.add(rect(0.0));
        history.undo(&mut board, None).unwrap();
        assert!(board.is_empty());
        history.detach(&mut board);
    }

    #[test]
    fn test_open_uses_cache_as_baseline() {
        let gateway = gateway();
        let mut original = Board::default();
        original.add(rect(0.0));
        gateway.save_to_cache("k", &original).unwrap();

        let mut board = Board::default();
        let history = gateway.open(&mut board, "k", HistoryConfig::default()).unwrap();
        assert_eq!(board.len(), 1);
        assert!(!history.can_undo());
        assert_eq!(history.pending_snapshot(), snapshot(&board));

        board.add(rect(100.0));
        history.undo(&mut board, None).unwrap();
        assert_eq!(snapshot(&board), snapshot(&original));
        assert!(!history.undo(&mut board, None).unwrap());
        history.detach(&mut board);
    }

    #[test]
    fn test_open_with_deferred_restore() {
        let gateway = gateway();
        let mut original = Board::default();
        original.add(rect(0.0));
        gateway.save_to_cache("k", &original).unwrap();

        let mut board = Board::new(BoardConfig {
            restore_mode: RestoreMode::Deferred,
            ..Default::default()
        });
        let history = gateway.open(&mut board, "k", HistoryConfig::default()).unwrap();
        assert!(history.is_replaying());
        board.flush();

        assert!(!history.is_replaying());
        assert!(!history.can_undo());
        assert_eq!(board.len(), 1);
        history.detach(&mut board);
    }

    #[test]
    fn test_load_recorded_resets_history() {
        let gateway = gateway();
        let mut board = Board::default();
        let history = gateway.open(&mut board, "k", HistoryConfig::default()).unwrap();
        board.add(rect(0.0));
        gateway.save_to_cache("k", &board).unwrap();
        board.add(rect(100.0));
        assert_eq!(history.undo_len(), 2);

        assert!(gateway.load_recorded("k", &history, &mut board).unwrap());
        assert_eq!(board.len(), 1);
        assert!(!history.can_undo());
        assert!(!gateway.load_recorded("other", &history, &mut board).unwrap());
        assert_eq!(board.len(), 1);
        history.detach(&mut board);
    }

    #[test]
    fn test_list_keys_sorted() {
        let gateway = gateway();
        let board = Board::default();
        gateway.save_to_cache("b", &board).unwrap();
        gateway.save_to_cache("a", &board).unwrap();
        assert_eq!(gateway.list_keys().unwrap(), vec!["a", "b"]);
    }

    struct BrokenStorage;

    impl Storage for BrokenStorage {
        fn save(&self, _: &str, _: &Snapshot) -> StorageResult<()> {
            Err(StorageError::Unavailable("quota exceeded".into()))
        }
        fn load(&self, _: &str) -> StorageResult<Option<Snapshot>> {
            Err(StorageError::Io("disk gone".into()))
        }
        fn delete(&self, _: &str) -> StorageResult<()> {
            Err(StorageError::Io("disk gone".into()))
        }
        fn list(&self) -> StorageResult<Vec<String>> {
            Ok(Vec::new())
        }
        fn exists(&self, _: &str) -> StorageResult<bool> {
            Ok(false)
        }
    }

    #[test]
    fn test_storage_failures_surface() {
        let gateway = PersistenceGateway::new(Arc::new(BrokenStorage), ExtraProps::default());
        let mut board = Board::default();

        assert!(matches!(
            gateway.save_to_cache("k", &board),
            Err(PersistError::Storage(StorageError::Unavailable(_)))
        ));
        assert!(matches!(
            gateway.load_from_cache("k", &mut board),
            Err(PersistError::Storage(StorageError::Io(_)))
        ));
        assert!(gateway.open(&mut board, "k", HistoryConfig::default()).is_err());
    }

    #[test]
    fn test_reset_keeps_history_when_delete_fails() {
        let memory = gateway();
        let mut board = Board::default();
        let history = memory.open(&mut board, "k", HistoryConfig::default()).unwrap();
        board.add(rect(0.0));

        let broken = PersistenceGateway::new(Arc::new(BrokenStorage), ExtraProps::default());
        assert!(broken.reset("k", &history, &mut board).is_err());
        assert_eq!(board.len(), 1);
        assert!(history.can_undo());
        history.detach(&mut board);
    }
}
