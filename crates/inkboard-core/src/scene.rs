//! Scene capability interface.
//!
//! The history and persistence layers never look inside a scene. They hold
//! opaque [`Snapshot`] values and drive the scene through the [`Scene`] trait:
//! serialize, restore, subscribe to mutation events, clear and rasterize.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for scene elements.
pub type ElementId = Uuid;

/// Errors raised by a scene collaborator.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Unknown element: {0}")]
    UnknownElement(ElementId),
    #[error("Raster export failed: {0}")]
    Raster(String),
    #[error("No rasterizer installed")]
    RasterUnavailable,
}

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;

/// Serialized scene state at one instant.
///
/// Cloning is cheap; the text is shared. Two snapshots taken while the scene
/// is unchanged compare equal byte for byte.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Snapshot(Arc<str>);

impl Snapshot {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Snapshot {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<&str> for Snapshot {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Snapshot({} bytes)", self.0.len())
    }
}

/// Allow-list of extra per-element properties included in a snapshot on top
/// of the default geometry and style fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraProps(Vec<String>);

impl ExtraProps {
    /// An allow-list with no extra properties.
    pub fn none() -> Self {
        Self(Vec::new())
    }

    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut props = Self::none();
        for name in names {
            props.insert(name);
        }
        props
    }

    /// Add a property name. Duplicates are ignored.
    pub fn insert(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.contains(&name) {
            self.0.push(name);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Default for ExtraProps {
    fn default() -> Self {
        Self::new(["selectable"])
    }
}

/// Kinds of scene mutation that history listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneEventKind {
    ElementAdded,
    ElementRemoved,
    ElementModified,
    /// The `elementSkewed` event: an element was skewed.
    ElementSkewing,
}

/// Every mutation kind history records.
pub const HISTORY_EVENTS: [SceneEventKind; 4] = [
    SceneEventKind::ElementAdded,
    SceneEventKind::ElementRemoved,
    SceneEventKind::ElementModified,
    SceneEventKind::ElementSkewing,
];

/// A mutation notification emitted by a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneEvent {
    pub kind: SceneEventKind,
    pub element: ElementId,
}

impl SceneEvent {
    pub fn new(kind: SceneEventKind, element: ElementId) -> Self {
        Self { kind, element }
    }
}

/// Handle returned by [`Scene::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Mutation listener. Receives the event and a read-only view of the scene
/// that emitted it.
pub type Listener = Box<dyn FnMut(&SceneEvent, &dyn SceneView)>;

/// Invoked once restored content is in place.
///
/// A scene that fails a restore must drop the callback without calling it.
pub type RestoreCallback = Box<dyn FnOnce(&mut dyn Scene)>;

/// Raster encodings a scene can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RasterFormat {
    #[default]
    Png,
    Jpeg,
}

impl RasterFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            RasterFormat::Png => "image/png",
            RasterFormat::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            RasterFormat::Png => "png",
            RasterFormat::Jpeg => "jpg",
        }
    }

    /// Parse a format name or file extension.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "png" => Some(RasterFormat::Png),
            "jpg" | "jpeg" => Some(RasterFormat::Jpeg),
            _ => None,
        }
    }
}

/// Read-only half of a scene.
pub trait SceneView {
    /// Serialize the whole scene, including the allow-listed extra properties.
    fn serialize(&self, extra: &ExtraProps) -> SceneResult<Snapshot>;
}

/// A mutable scene graph that history and persistence can drive.
pub trait Scene: SceneView {
    /// Replace the entire scene with `snapshot`.
    ///
    /// Parsing errors are returned synchronously. Completion may be deferred;
    /// `on_done` runs once the new content is in place.
    fn restore(&mut self, snapshot: &Snapshot, on_done: RestoreCallback) -> SceneResult<()>;

    /// Schedule a redraw.
    fn request_render(&mut self);

    /// Register `listener` for the given event kinds.
    fn subscribe(&mut self, events: &[SceneEventKind], listener: Listener) -> ListenerId;

    /// Remove a listener. Returns false if it was not registered.
    fn unsubscribe(&mut self, id: ListenerId) -> bool;

    /// Empty the scene. Independent of history.
    fn clear(&mut self);

    /// Encode the current scene as an image.
    fn rasterize(&self, format: RasterFormat) -> SceneResult<Vec<u8>>;
}
