//! Rectangles, optionally with rounded corners.

use super::{Placement, ShapeId, ShapeStyle, ShapeTrait, placed_bounds};
use kurbo::{Affine, BezPath, Point, Rect, RoundedRect, Shape as KurboShape};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub(crate) id: ShapeId,
    /// Top-left corner before placement.
    pub position: Point,
    pub width: f64,
    pub height: f64,
    /// Zero draws sharp corners.
    #[serde(default)]
    pub corner_radius: f64,
    #[serde(default)]
    pub placement: Placement,
    pub style: ShapeStyle,
}

impl Rectangle {
    pub fn new(position: Point, width: f64, height: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            width,
            height,
            corner_radius: 0.0,
            placement: Placement::default(),
            style: ShapeStyle::default(),
        }
    }

    /// The rectangle before placement.
    pub fn as_rect(&self) -> Rect {
        Rect::from_origin_size(self.position, (self.width, self.height))
    }
}

impl ShapeTrait for Rectangle {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn bounds(&self) -> Rect {
        placed_bounds(self.as_rect(), &self.placement)
    }

    fn to_path(&self) -> BezPath {
        let rect = self.as_rect();
        let outline = match self.corner_radius {
            r if r > 0.0 => RoundedRect::from_rect(rect, r).to_path(0.1),
            _ => rect.to_path(0.1),
        };
        self.placement.affine(rect.center()) * outline
    }

    fn style(&self) -> &ShapeStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut ShapeStyle {
        &mut self.style
    }

    fn transform(&mut self, affine: Affine) {
        // Translation and axis scale only; rotation and skew live in `placement`.
        let [sx, _, _, sy, _, _] = affine.as_coeffs();
        self.position = affine * self.position;
        self.width *= sx.abs();
        self.height *= sy.abs();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unplaced_bounds() {
        let rect = Rectangle::new(Point::new(10.0, 20.0), 100.0, 50.0);
        assert_eq!(rect.bounds(), Rect::new(10.0, 20.0, 110.0, 70.0));
    }

    #[test]
    fn test_rotated_bounds_grow() {
        let mut rect = Rectangle::new(Point::new(0.0, 0.0), 100.0, 100.0);
        rect.placement.angle = 45.0;
        let bounds = rect.bounds();
        let diagonal = 100.0 * std::f64::consts::SQRT_2;
        assert!((bounds.width() - diagonal).abs() < 1e-9);
        assert!((bounds.center().x - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_corner_radius_rounds_outline() {
        let mut rect = Rectangle::new(Point::ZERO, 40.0, 40.0);
        assert!(rect.to_path().contains(Point::new(0.5, 0.5)));
        rect.corner_radius = 10.0;
        assert!(!rect.to_path().contains(Point::new(0.5, 0.5)));
        assert!(rect.to_path().contains(Point::new(20.0, 20.0)));
    }

    #[test]
    fn test_transform_scales_axes() {
        let mut rect = Rectangle::new(Point::new(10.0, 10.0), 20.0, 10.0);
        rect.transform(Affine::translate((5.0, 0.0)) * Affine::scale_non_uniform(2.0, 3.0));
        assert_eq!(rect.position, Point::new(25.0, 30.0));
        assert!((rect.width - 40.0).abs() < 1e-9);
        assert!((rect.height - 30.0).abs() < 1e-9);
    }
}
