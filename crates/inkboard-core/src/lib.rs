//! InkBoard core library.
//!
//! Undo/redo history over a scene capability interface, snapshot storage and
//! export, and the reference board scene with its shape model.

pub mod board;
pub mod history;
pub mod persistence;
pub mod scene;
pub mod shapes;
pub mod storage;

pub use board::{Attributes, Board, BoardConfig, Element, Frame, Rasterizer, RestoreMode};
pub use history::{Completion, HistoryConfig, HistoryEvent, HistoryRecorder, HistoryState, RedoPolicy};
pub use persistence::{
    DEFAULT_CACHE_KEY, ExportArtifact, PersistError, PersistResult, PersistenceGateway,
};
pub use scene::{
    ElementId, ExtraProps, ListenerId, RasterFormat, Scene, SceneError, SceneEvent, SceneEventKind,
    SceneResult, SceneView, Snapshot,
};
pub use shapes::{SerializableColor, Shape, ShapeId, ShapeStyle};
pub use storage::{
    AutoSaver, MemoryStorage, PlatformStorage, Storage, StorageError, StorageResult,
    create_default_storage,
};
