//! Board: the reference scene implementation.
//!
//! A board is an ordered list of elements (back to front). Every mutation
//! goes through a method that emits the matching [`SceneEvent`], so a
//! [`crate::HistoryRecorder`] attached to it sees each edit exactly once.

use crate::scene::{
    ElementId, ExtraProps, Listener, ListenerId, RasterFormat, RestoreCallback, Scene, SceneError,
    SceneEvent, SceneEventKind, SceneResult, SceneView, Snapshot,
};
use crate::shapes::{Group, SerializableColor, Shape, ShapeId, ShapeStyle};
use kurbo::{Rect, Size, Vec2};
use peniko::Color;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::VecDeque;

/// Snapshot format version written by [`Board::serialize`].
pub const SNAPSHOT_VERSION: &str = "1";

/// Per-element properties outside geometry and style. Only names present in
/// the [`ExtraProps`] allow-list are written to snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub selectable: bool,
    pub evented: bool,
    pub visible: bool,
    pub locked: bool,
    pub name: Option<String>,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            selectable: true,
            evented: true,
            visible: true,
            locked: false,
            name: None,
        }
    }
}

impl Attributes {
    /// Every attribute name a snapshot may carry.
    pub const NAMES: [&'static str; 5] = ["selectable", "evented", "visible", "locked", "name"];

    /// Attribute value as JSON, or None for names that are not attributes.
    pub fn get(&self, name: &str) -> Option<Value> {
        match name {
            "selectable" => Some(Value::Bool(self.selectable)),
            "evented" => Some(Value::Bool(self.evented)),
            "visible" => Some(Value::Bool(self.visible)),
            "locked" => Some(Value::Bool(self.locked)),
            "name" => Some(self.name.clone().map_or(Value::Null, Value::String)),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, value: Value) -> SceneResult<()> {
        let invalid = || SceneError::MalformedSnapshot(format!("invalid value for '{}'", name));
        match name {
            "selectable" => self.selectable = value.as_bool().ok_or_else(invalid)?,
            "evented" => self.evented = value.as_bool().ok_or_else(invalid)?,
            "visible" => self.visible = value.as_bool().ok_or_else(invalid)?,
            "locked" => self.locked = value.as_bool().ok_or_else(invalid)?,
            "name" => {
                self.name = match value {
                    Value::Null => None,
                    Value::String(s) => Some(s),
                    _ => return Err(invalid()),
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// A shape on the board plus its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub shape: Shape,
    pub attributes: Attributes,
}

impl Element {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            attributes: Attributes::default(),
        }
    }

    pub fn id(&self) -> ShapeId {
        self.shape.id()
    }

    fn to_value(&self, extra: &ExtraProps) -> SceneResult<Value> {
        let value = serde_json::to_value(&self.shape)
            .map_err(|e| SceneError::Serialization(e.to_string()))?;
        let Value::Object(mut map) = value else {
            return Err(SceneError::Serialization(format!(
                "{} did not serialize to an object",
                self.shape.kind()
            )));
        };
        for name in extra.iter() {
            if let Some(value) = self.attributes.get(name) {
                map.insert(name.to_string(), value);
            }
        }
        Ok(Value::Object(map))
    }

    fn from_value(value: Value) -> SceneResult<Self> {
        let Value::Object(mut map) = value else {
            return Err(SceneError::MalformedSnapshot("object entry is not a map".into()));
        };
        let mut attributes = Attributes::default();
        for name in Attributes::NAMES {
            if let Some(value) = map.remove(name) {
                attributes.set(name, value)?;
            }
        }
        let shape = serde_json::from_value(Value::Object(map))
            .map_err(|e| SceneError::MalformedSnapshot(e.to_string()))?;
        Ok(Self { shape, attributes })
    }
}

/// When a restore's content lands on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestoreMode {
    /// Apply and complete inside `restore`.
    #[default]
    Immediate,
    /// Queue until [`Board::flush`], like a scene that loads images first.
    Deferred,
}

/// Board configuration.
#[derive(Debug, Clone)]
pub struct BoardConfig {
    /// Raster export size.
    pub size: Size,
    pub background: Option<SerializableColor>,
    pub restore_mode: RestoreMode,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            size: Size::new(800.0, 600.0),
            background: Some(SerializableColor::white()),
            restore_mode: RestoreMode::default(),
        }
    }
}

/// What a rasterizer draws: visible shapes back to front.
#[derive(Debug)]
pub struct Frame<'a> {
    pub size: Size,
    pub background: Option<Color>,
    pub shapes: Vec<&'a Shape>,
}

/// Turns a frame into encoded image bytes.
pub trait Rasterizer {
    fn rasterize(&self, frame: &Frame<'_>, format: RasterFormat) -> SceneResult<Vec<u8>>;
}

struct Subscription {
    id: ListenerId,
    events: Vec<SceneEventKind>,
    listener: Listener,
}

/// Parsed snapshot content.
struct Content {
    background: Option<SerializableColor>,
    elements: Vec<Element>,
}

impl Content {
    fn parse(snapshot: &Snapshot) -> SceneResult<Self> {
        let root: Value = serde_json::from_str(snapshot.as_str())
            .map_err(|e| SceneError::MalformedSnapshot(e.to_string()))?;
        let Value::Object(mut root) = root else {
            return Err(SceneError::MalformedSnapshot("snapshot is not a map".into()));
        };
        let Some(Value::Array(objects)) = root.remove("objects") else {
            return Err(SceneError::MalformedSnapshot("missing 'objects' array".into()));
        };
        let background = match root.remove("background") {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                serde_json::from_value(value)
                    .map_err(|e| SceneError::MalformedSnapshot(e.to_string()))?,
            ),
        };
        let elements = objects
            .into_iter()
            .map(Element::from_value)
            .collect::<SceneResult<Vec<_>>>()?;
        Ok(Self {
            background,
            elements,
        })
    }
}

struct PendingRestore {
    content: Content,
    on_done: RestoreCallback,
}

/// An editable board of shapes.
pub struct Board {
    elements: Vec<Element>,
    background: Option<SerializableColor>,
    size: Size,
    restore_mode: RestoreMode,
    subscriptions: Vec<Subscription>,
    next_listener: u64,
    pending_restores: VecDeque<PendingRestore>,
    rasterizer: Option<Box<dyn Rasterizer>>,
    render_requests: u64,
}

impl Default for Board {
    fn default() -> Self {
        Self::new(BoardConfig::default())
    }
}

impl Board {
    pub fn new(config: BoardConfig) -> Self {
        Self {
            elements: Vec::new(),
            background: config.background,
            size: config.size,
            restore_mode: config.restore_mode,
            subscriptions: Vec::new(),
            next_listener: 0,
            pending_restores: VecDeque::new(),
            rasterizer: None,
            render_requests: 0,
        }
    }

    /// Install the rasterizer used by [`Scene::rasterize`].
    pub fn set_rasterizer(&mut self, rasterizer: Box<dyn Rasterizer>) {
        self.rasterizer = Some(rasterizer);
    }

    pub fn set_background(&mut self, background: Option<SerializableColor>) {
        self.background = background;
    }

    pub fn background(&self) -> Option<SerializableColor> {
        self.background
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// Elements back to front.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn get(&self, id: ShapeId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id() == id)
    }

    pub fn ids(&self) -> Vec<ShapeId> {
        self.elements.iter().map(Element::id).collect()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Bounding box of all shapes.
    pub fn bounds(&self) -> Option<Rect> {
        self.elements
            .iter()
            .map(|e| e.shape.bounds())
            .reduce(|a, b| a.union(b))
    }

    /// Number of redraws requested so far.
    pub fn render_requests(&self) -> u64 {
        self.render_requests
    }

    pub fn has_pending_restore(&self) -> bool {
        !self.pending_restores.is_empty()
    }

    /// Add a shape on top.
    pub fn add(&mut self, shape: Shape) -> ShapeId {
        self.add_element(Element::new(shape))
    }

    /// Add a shape with explicit attributes.
    pub fn add_element(&mut self, element: Element) -> ShapeId {
        let id = element.id();
        self.elements.push(element);
        self.emit(SceneEventKind::ElementAdded, id);
        id
    }

    /// Remove a shape. Returns it if it was on the board.
    pub fn remove(&mut self, id: ShapeId) -> Option<Shape> {
        let index = self.index_of(id)?;
        let element = self.elements.remove(index);
        self.emit(SceneEventKind::ElementRemoved, id);
        Some(element.shape)
    }

    /// Edit a shape in place.
    pub fn modify(&mut self, id: ShapeId, edit: impl FnOnce(&mut Shape)) -> SceneResult<()> {
        let index = self.index_of(id).ok_or(SceneError::UnknownElement(id))?;
        edit(&mut self.elements[index].shape);
        self.emit(SceneEventKind::ElementModified, id);
        Ok(())
    }

    pub fn translate(&mut self, id: ShapeId, delta: Vec2) -> SceneResult<()> {
        self.modify(id, |shape| shape.translate(delta))
    }

    pub fn rotate(&mut self, id: ShapeId, degrees: f64) -> SceneResult<()> {
        self.modify(id, |shape| shape.rotate(degrees))
    }

    pub fn set_style(&mut self, id: ShapeId, style: ShapeStyle) -> SceneResult<()> {
        self.modify(id, |shape| *shape.style_mut() = style)
    }

    pub fn set_attributes(&mut self, id: ShapeId, attributes: Attributes) -> SceneResult<()> {
        let index = self.index_of(id).ok_or(SceneError::UnknownElement(id))?;
        self.elements[index].attributes = attributes;
        self.emit(SceneEventKind::ElementModified, id);
        Ok(())
    }

    /// Skew a shape by the given angles in degrees.
    pub fn skew(&mut self, id: ShapeId, skew_x: f64, skew_y: f64) -> SceneResult<()> {
        let index = self.index_of(id).ok_or(SceneError::UnknownElement(id))?;
        self.elements[index].shape.skew(skew_x, skew_y);
        self.emit(SceneEventKind::ElementSkewing, id);
        Ok(())
    }

    /// Bring a shape to the front (topmost).
    pub fn bring_to_front(&mut self, id: ShapeId) -> SceneResult<()> {
        let index = self.index_of(id).ok_or(SceneError::UnknownElement(id))?;
        let element = self.elements.remove(index);
        self.elements.push(element);
        self.emit(SceneEventKind::ElementModified, id);
        Ok(())
    }

    /// Send a shape to the back (bottommost).
    pub fn send_to_back(&mut self, id: ShapeId) -> SceneResult<()> {
        let index = self.index_of(id).ok_or(SceneError::UnknownElement(id))?;
        let element = self.elements.remove(index);
        self.elements.insert(0, element);
        self.emit(SceneEventKind::ElementModified, id);
        Ok(())
    }

    /// Group shapes into one element placed where the frontmost of them was.
    /// Returns None if fewer than two of the ids are on the board.
    pub fn group(&mut self, ids: &[ShapeId]) -> Option<ShapeId> {
        let members: Vec<usize> = self
            .elements
            .iter()
            .enumerate()
            .filter(|(_, e)| ids.contains(&e.id()))
            .map(|(i, _)| i)
            .collect();
        if members.len() < 2 {
            return None;
        }

        let insert_at = members[members.len() - 1] + 1 - members.len();
        let mut children = Vec::with_capacity(members.len());
        for index in members.into_iter().rev() {
            let element = self.elements.remove(index);
            let id = element.id();
            children.push(element.shape);
            self.emit(SceneEventKind::ElementRemoved, id);
        }
        children.reverse();

        let group = Group::new(children);
        let group_id = group.id;
        self.elements
            .insert(insert_at.min(self.elements.len()), Element::new(Shape::Group(group)));
        self.emit(SceneEventKind::ElementAdded, group_id);
        Some(group_id)
    }

    /// Dissolve a group, returning its children to the board in its place.
    pub fn ungroup(&mut self, id: ShapeId) -> Option<Vec<ShapeId>> {
        let index = self.index_of(id)?;
        if !self.elements[index].shape.is_group() {
            return None;
        }
        let Shape::Group(group) = self.elements.remove(index).shape else {
            return None;
        };
        self.emit(SceneEventKind::ElementRemoved, id);

        let mut child_ids = Vec::new();
        for (offset, child) in group.ungroup().into_iter().enumerate() {
            let child_id = child.id();
            self.elements.insert(index + offset, Element::new(child));
            self.emit(SceneEventKind::ElementAdded, child_id);
            child_ids.push(child_id);
        }
        Some(child_ids)
    }

    /// Complete deferred restores in the order they were requested.
    /// Returns how many completed.
    pub fn flush(&mut self) -> usize {
        let mut completed = 0;
        while let Some(pending) = self.pending_restores.pop_front() {
            self.apply_restore(pending.content, pending.on_done);
            completed += 1;
        }
        completed
    }

    fn index_of(&self, id: ShapeId) -> Option<usize> {
        self.elements.iter().position(|e| e.id() == id)
    }

    fn apply_restore(&mut self, content: Content, on_done: RestoreCallback) {
        self.elements.clear();
        self.background = content.background;
        for element in content.elements {
            self.add_element(element);
        }
        self.request_render();
        on_done(self);
    }

    fn emit(&mut self, kind: SceneEventKind, element: ElementId) {
        let event = SceneEvent::new(kind, element);
        let mut subscriptions = std::mem::take(&mut self.subscriptions);
        for sub in subscriptions.iter_mut() {
            if sub.events.contains(&kind) {
                (sub.listener)(&event, &*self);
            }
        }
        subscriptions.append(&mut self.subscriptions);
        self.subscriptions = subscriptions;
    }
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Board")
            .field("elements", &self.elements.len())
            .field("subscriptions", &self.subscriptions.len())
            .field("pending_restores", &self.pending_restores.len())
            .field("restore_mode", &self.restore_mode)
            .finish()
    }
}

impl SceneView for Board {
    fn serialize(&self, extra: &ExtraProps) -> SceneResult<Snapshot> {
        let objects = self
            .elements
            .iter()
            .map(|e| e.to_value(extra))
            .collect::<SceneResult<Vec<_>>>()?;

        let mut root = Map::new();
        root.insert("version".into(), Value::from(SNAPSHOT_VERSION));
        root.insert(
            "background".into(),
            serde_json::to_value(self.background)
                .map_err(|e| SceneError::Serialization(e.to_string()))?,
        );
        root.insert("objects".into(), Value::Array(objects));

        serde_json::to_string(&Value::Object(root))
            .map(Snapshot::from)
            .map_err(|e| SceneError::Serialization(e.to_string()))
    }
}

impl Scene for Board {
    fn restore(&mut self, snapshot: &Snapshot, on_done: RestoreCallback) -> SceneResult<()> {
        let content = Content::parse(snapshot)?;
        match self.restore_mode {
            RestoreMode::Immediate => self.apply_restore(content, on_done),
            RestoreMode::Deferred => self
                .pending_restores
                .push_back(PendingRestore { content, on_done }),
        }
        Ok(())
    }

    fn request_render(&mut self) {
        self.render_requests += 1;
    }

    fn subscribe(&mut self, events: &[SceneEventKind], listener: Listener) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.subscriptions.push(Subscription {
            id,
            events: events.to_vec(),
            listener,
        });
        id
    }

    fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    fn clear(&mut self) {
        self.elements.clear();
        self.request_render();
    }

    fn rasterize(&self, format: RasterFormat) -> SceneResult<Vec<u8>> {
        let rasterizer = self.rasterizer.as_ref().ok_or(SceneError::RasterUnavailable)?;
        let frame = Frame {
            size: self.size,
            background: self.background.map(Color::from),
            shapes: self
                .elements
                .iter()
                .filter(|e| e.attributes.visible)
                .map(|e| &e.shape)
                .collect(),
        };
        rasterizer.rasterize(&frame, format)
    }
}
