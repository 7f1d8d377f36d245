//! Groups of shapes moved and stored as one element.

use super::{Shape, ShapeId, ShapeStyle, ShapeTrait};
use kurbo::{Affine, BezPath, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shapes treated as a single board element. Groups may nest.
///
/// A group has no look of its own: children keep their styles, and the
/// group's style only exists so every shape can hand one out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub(crate) id: ShapeId,
    /// Back to front.
    pub children: Vec<Shape>,
    #[serde(default, skip_serializing)]
    style: ShapeStyle,
}

impl Group {
    pub fn new(children: Vec<Shape>) -> Self {
        Self {
            id: Uuid::new_v4(),
            children,
            style: ShapeStyle::default(),
        }
    }

    pub fn children(&self) -> &[Shape] {
        &self.children
    }

    pub fn ungroup(self) -> Vec<Shape> {
        self.children
    }

    /// Number of non-group shapes, counting through nested groups.
    pub fn leaf_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| match child {
                Shape::Group(group) => group.leaf_count(),
                _ => 1,
            })
            .sum()
    }
}

impl ShapeTrait for Group {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn bounds(&self) -> Rect {
        let mut children = self.children.iter().map(Shape::bounds);
        let first = children.next().unwrap_or(Rect::ZERO);
        children.fold(first, |acc, rect| acc.union(rect))
    }

    fn to_path(&self) -> BezPath {
        self.children.iter().flat_map(Shape::to_path).collect()
    }

    fn style(&self) -> &ShapeStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut ShapeStyle {
        &mut self.style
    }

    fn transform(&mut self, affine: Affine) {
        self.children.iter_mut().for_each(|child| child.transform(affine));
    }
}
