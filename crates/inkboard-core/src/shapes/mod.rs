//! Shape definitions for the board.

mod ellipse;
mod group;
mod image;
mod path;
mod rectangle;
mod text;

pub use ellipse::Ellipse;
pub use group::Group;
pub use image::{Image, ImageFormat};
pub use path::Path;
pub use rectangle::Rectangle;
pub use text::Text;

use crate::scene::ElementId;
use kurbo::{Affine, BezPath, Point, Rect, Vec2};
use peniko::Color;
use serde::{Deserialize, Serialize};

/// Unique identifier for shapes.
pub type ShapeId = ElementId;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Parse `#rgb`, `#rrggbb`, `#rrggbbaa` or `transparent`.
    pub fn from_hex(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("transparent") {
            return Some(Self::transparent());
        }
        let hex = text.strip_prefix('#')?;
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(hex.get(range)?, 16).ok();
        match hex.len() {
            3 => Some(Self::new(
                channel(0..1)? * 17,
                channel(1..2)? * 17,
                channel(2..3)? * 17,
                255,
            )),
            6 => Some(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?, 255)),
            8 => Some(Self::new(
                channel(0..2)?,
                channel(2..4)?,
                channel(4..6)?,
                channel(6..8)?,
            )),
            _ => None,
        }
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Style properties for shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeStyle {
    /// Stroke color.
    pub stroke_color: SerializableColor,
    /// Stroke width. Zero disables the stroke.
    pub stroke_width: f64,
    /// Fill color (None = no fill).
    pub fill_color: Option<SerializableColor>,
    /// Overall opacity (0.0 = fully transparent, 1.0 = fully opaque).
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

fn default_opacity() -> f64 {
    1.0
}

impl ShapeStyle {
    /// Get the stroke color with opacity applied.
    pub fn stroke_with_opacity(&self) -> Color {
        with_opacity(self.stroke_color, self.opacity)
    }

    /// Get the fill color with opacity applied.
    pub fn fill_with_opacity(&self) -> Option<Color> {
        self.fill_color.map(|c| with_opacity(c, self.opacity))
    }
}

fn with_opacity(color: SerializableColor, opacity: f64) -> Color {
    let alpha = (color.a as f64 * opacity.clamp(0.0, 1.0)).round() as u8;
    Color::from_rgba8(color.r, color.g, color.b, alpha)
}

impl Default for ShapeStyle {
    fn default() -> Self {
        Self {
            stroke_color: SerializableColor::black(),
            stroke_width: 3.0,
            fill_color: None,
            opacity: 1.0,
        }
    }
}

/// Rotation and skew applied around a shape's center, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Placement {
    #[serde(default)]
    pub angle: f64,
    #[serde(default)]
    pub skew_x: f64,
    #[serde(default)]
    pub skew_y: f64,
}

impl Placement {
    pub fn is_identity(&self) -> bool {
        self.angle == 0.0 && self.skew_x == 0.0 && self.skew_y == 0.0
    }

    /// Transform mapping the unplaced shape onto the board.
    pub fn affine(&self, center: Point) -> Affine {
        if self.is_identity() {
            return Affine::IDENTITY;
        }
        let c = center.to_vec2();
        Affine::translate(c)
            * Affine::rotate(self.angle.to_radians())
            * Affine::skew(self.skew_x.to_radians().tan(), self.skew_y.to_radians().tan())
            * Affine::translate(-c)
    }
}

/// Common trait for all shapes.
pub trait ShapeTrait {
    /// Get the unique identifier.
    fn id(&self) -> ShapeId;

    /// Get the bounding box in board coordinates.
    fn bounds(&self) -> Rect;

    /// Get the outline in board coordinates.
    fn to_path(&self) -> BezPath;

    /// Get the style.
    fn style(&self) -> &ShapeStyle;

    /// Get mutable style.
    fn style_mut(&mut self) -> &mut ShapeStyle;

    /// Apply a transform to this shape's geometry.
    fn transform(&mut self, affine: Affine);
}

/// Enum wrapper for all shape types (for serialization).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    Rectangle(Rectangle),
    Ellipse(Ellipse),
    Path(Path),
    Text(Text),
    Image(Image),
    Group(Group),
}

impl Shape {
    pub fn id(&self) -> ShapeId {
        match self {
            Shape::Rectangle(s) => s.id(),
            Shape::Ellipse(s) => s.id(),
            Shape::Path(s) => s.id(),
            Shape::Text(s) => s.id(),
            Shape::Image(s) => s.id(),
            Shape::Group(s) => s.id(),
        }
    }

    pub fn bounds(&self) -> Rect {
        match self {
            Shape::Rectangle(s) => s.bounds(),
            Shape::Ellipse(s) => s.bounds(),
            Shape::Path(s) => s.bounds(),
            Shape::Text(s) => s.bounds(),
            Shape::Image(s) => s.bounds(),
            Shape::Group(s) => s.bounds(),
        }
    }

    pub fn to_path(&self) -> BezPath {
        match self {
            Shape::Rectangle(s) => s.to_path(),
            Shape::Ellipse(s) => s.to_path(),
            Shape::Path(s) => s.to_path(),
            Shape::Text(s) => s.to_path(),
            Shape::Image(s) => s.to_path(),
            Shape::Group(s) => s.to_path(),
        }
    }

    pub fn style(&self) -> &ShapeStyle {
        match self {
            Shape::Rectangle(s) => s.style(),
            Shape::Ellipse(s) => s.style(),
            Shape::Path(s) => s.style(),
            Shape::Text(s) => s.style(),
            Shape::Image(s) => s.style(),
            Shape::Group(s) => s.style(),
        }
    }

    pub fn style_mut(&mut self) -> &mut ShapeStyle {
        match self {
            Shape::Rectangle(s) => s.style_mut(),
            Shape::Ellipse(s) => s.style_mut(),
            Shape::Path(s) => s.style_mut(),
            Shape::Text(s) => s.style_mut(),
            Shape::Image(s) => s.style_mut(),
            Shape::Group(s) => s.style_mut(),
        }
    }

    pub fn transform(&mut self, affine: Affine) {
        match self {
            Shape::Rectangle(s) => s.transform(affine),
            Shape::Ellipse(s) => s.transform(affine),
            Shape::Path(s) => s.transform(affine),
            Shape::Text(s) => s.transform(affine),
            Shape::Image(s) => s.transform(affine),
            Shape::Group(s) => s.transform(affine),
        }
    }

    /// Placement of shapes that keep rotation and skew as properties.
    /// Paths and groups bake them into their geometry instead.
    pub fn placement_mut(&mut self) -> Option<&mut Placement> {
        match self {
            Shape::Rectangle(s) => Some(&mut s.placement),
            Shape::Ellipse(s) => Some(&mut s.placement),
            Shape::Text(s) => Some(&mut s.placement),
            Shape::Image(s) => Some(&mut s.placement),
            Shape::Path(_) | Shape::Group(_) => None,
        }
    }

    /// Move the shape by `delta`.
    pub fn translate(&mut self, delta: Vec2) {
        self.transform(Affine::translate(delta));
    }

    /// Skew by the given angles in degrees.
    pub fn skew(&mut self, skew_x: f64, skew_y: f64) {
        let center = self.bounds().center();
        match self.placement_mut() {
            Some(placement) => {
                placement.skew_x += skew_x;
                placement.skew_y += skew_y;
            }
            None => self.transform(
                Placement {
                    angle: 0.0,
                    skew_x,
                    skew_y,
                }
                .affine(center),
            ),
        }
    }

    /// Rotate clockwise by `degrees` around the shape center.
    pub fn rotate(&mut self, degrees: f64) {
        let center = self.bounds().center();
        match self.placement_mut() {
            Some(placement) => placement.angle = (placement.angle + degrees) % 360.0,
            None => self.transform(
                Placement {
                    angle: degrees,
                    ..Default::default()
                }
                .affine(center),
            ),
        }
    }

    /// Serialized type tag of this shape.
    pub fn kind(&self) -> &'static str {
        match self {
            Shape::Rectangle(_) => "rectangle",
            Shape::Ellipse(_) => "ellipse",
            Shape::Path(_) => "path",
            Shape::Text(_) => "text",
            Shape::Image(_) => "image",
            Shape::Group(_) => "group",
        }
    }

    /// Check if this shape is a group.
    pub fn is_group(&self) -> bool {
        matches!(self, Shape::Group(_))
    }
}

/// Bounding box of a transformed rectangle.
pub(crate) fn placed_bounds(rect: Rect, placement: &Placement) -> Rect {
    if placement.is_identity() {
        return rect;
    }
    let affine = placement.affine(rect.center());
    affine.transform_rect_bbox(rect)
}
