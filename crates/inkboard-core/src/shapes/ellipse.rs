//! Ellipses and circles.

use super::{Placement, ShapeId, ShapeStyle, ShapeTrait};
use kurbo::{Affine, BezPath, Ellipse as KurboEllipse, Point, Rect, Shape as KurboShape};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    pub(crate) id: ShapeId,
    pub center: Point,
    pub radius_x: f64,
    pub radius_y: f64,
    #[serde(default)]
    pub placement: Placement,
    pub style: ShapeStyle,
}

impl Ellipse {
    pub fn new(center: Point, radius_x: f64, radius_y: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            center,
            radius_x,
            radius_y,
            placement: Placement::default(),
            style: ShapeStyle::default(),
        }
    }

    pub fn circle(center: Point, radius: f64) -> Self {
        Self::new(center, radius, radius)
    }

    /// The ellipse with placement applied.
    fn geometry(&self) -> KurboEllipse {
        let unplaced = KurboEllipse::new(self.center, (self.radius_x, self.radius_y), 0.0);
        self.placement.affine(self.center) * unplaced
    }
}

impl ShapeTrait for Ellipse {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn bounds(&self) -> Rect {
        self.geometry().bounding_box()
    }

    fn to_path(&self) -> BezPath {
        self.geometry().to_path(0.1)
    }

    fn style(&self) -> &ShapeStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut ShapeStyle {
        &mut self.style
    }

    fn transform(&mut self, affine: Affine) {
        let [sx, _, _, sy, _, _] = affine.as_coeffs();
        self.center = affine * self.center;
        self.radius_x *= sx.abs();
        self.radius_y *= sy.abs();
    }
}
