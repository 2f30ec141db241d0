//! Straight line and arrow elements.

use super::{HitTolerance, ShapeId, ShapeStyle, ShapeTrait};
use kurbo::{Affine, Point, Rect};
use serde::{Deserialize, Serialize};

/// A single straight segment from `start` to `end`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub(crate) id: ShapeId,
    pub start: Point,
    pub end: Point,
    pub style: ShapeStyle,
    #[serde(default)]
    pub revision: u64,
}

impl Line {
    pub fn new(id: impl Into<ShapeId>, start: Point, end: Point) -> Self {
        Self {
            id: id.into(),
            start,
            end,
            style: ShapeStyle::default(),
            revision: 0,
        }
    }

    pub fn length(&self) -> f64 {
        (self.end - self.start).hypot()
    }

    pub fn midpoint(&self) -> Point {
        self.start.midpoint(self.end)
    }

    /// Unit direction from start to end, if the segment has length.
    pub fn direction(&self) -> Option<kurbo::Vec2> {
        let v = self.end - self.start;
        let len = v.hypot();
        (len > f64::EPSILON).then(|| v / len)
    }
}

impl ShapeTrait for Line {
    fn id(&self) -> &str {
        &self.id
    }

    fn bounds(&self) -> Rect {
        Rect::from_points(self.start, self.end)
    }

    fn hit_test(&self, point: Point, tolerance: HitTolerance) -> bool {
        let m = tolerance.world_margin();
        self.bounds().inflate(m, m).contains(point)
    }

    fn style(&self) -> &ShapeStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut ShapeStyle {
        &mut self.style
    }

    fn transform(&mut self, affine: Affine) {
        self.start = affine * self.start;
        self.end = affine * self.end;
    }
}
