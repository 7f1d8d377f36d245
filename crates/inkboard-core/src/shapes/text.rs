//! Text shape.

use super::{Placement, ShapeId, ShapeStyle, ShapeTrait, placed_bounds};
use kurbo::{Affine, BezPath, Point, Rect, Shape as KurboShape};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A text box. Layout is approximate: glyphs are treated as fixed-advance
/// cells, which is enough for bounds and greeked raster output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub(crate) id: ShapeId,
    /// Position (top-left corner of the text box).
    pub position: Point,
    /// The text content. Lines are separated by `\n`.
    pub content: String,
    /// Font size in pixels.
    pub font_size: f64,
    /// Line height as a multiple of the font size.
    #[serde(default = "default_line_height")]
    pub line_height: f64,
    #[serde(default)]
    pub placement: Placement,
    /// Style properties. The fill color paints the glyphs.
    pub style: ShapeStyle,
}

fn default_line_height() -> f64 {
    Text::DEFAULT_LINE_HEIGHT
}

impl Text {
    pub const DEFAULT_FONT_SIZE: f64 = 40.0;
    pub const DEFAULT_LINE_HEIGHT: f64 = 1.16;
    /// Approximate glyph advance as a fraction of the font size.
    pub const ADVANCE: f64 = 0.55;

    /// Create a new text shape.
    pub fn new(position: Point, content: impl Into<String>) -> Self {
        let style = ShapeStyle {
            stroke_width: 0.0,
            fill_color: Some(super::SerializableColor::black()),
            ..Default::default()
        };
        Self {
            id: Uuid::new_v4(),
            position,
            content: content.into(),
            font_size: Self::DEFAULT_FONT_SIZE,
            line_height: Self::DEFAULT_LINE_HEIGHT,
            placement: Placement::default(),
            style,
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.content.split('\n')
    }

    /// Width and height of the laid-out text.
    pub fn size(&self) -> (f64, f64) {
        let columns = self.lines().map(|l| l.chars().count()).max().unwrap_or(0);
        let rows = self.lines().count();
        (
            columns as f64 * self.font_size * Self::ADVANCE,
            rows as f64 * self.font_size * self.line_height,
        )
    }

    /// Unplaced text box.
    pub fn as_rect(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size())
    }

    /// Transform applied to the text box when drawn.
    pub fn affine(&self) -> Affine {
        self.placement.affine(self.as_rect().center())
    }
}

impl ShapeTrait for Text {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn bounds(&self) -> Rect {
        placed_bounds(self.as_rect(), &self.placement)
    }

    fn to_path(&self) -> BezPath {
        let mut path = self.as_rect().to_path(0.1);
        path.apply_affine(self.affine());
        path
    }

    fn style(&self) -> &ShapeStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut ShapeStyle {
        &mut self.style
    }

    fn transform(&mut self, affine: Affine) {
        self.position = affine * self.position;
        let scale = affine.as_coeffs();
        self.font_size *= scale[3].abs();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_uses_longest_line() {
        let mut text = Text::new(Point::new(0.0, 0.0), "ab\nabcd");
        text.font_size = 10.0;
        let (width, height) = text.size();
        assert!((width - 22.0).abs() < 1e-9);
        assert!((height - 23.2).abs() < 1e-9);
    }

    #[test]
    fn test_missing_line_height_defaults() {
        let text = Text::new(Point::new(1.0, 2.0), "hello");
        let mut value = serde_json::to_value(&text).unwrap();
        value.as_object_mut().unwrap().remove("line_height");
        let back: Text = serde_json::from_value(value).unwrap();
        assert!((back.line_height - Text::DEFAULT_LINE_HEIGHT).abs() < f64::EPSILON);
    }
}
