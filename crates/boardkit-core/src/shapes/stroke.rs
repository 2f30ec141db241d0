//! Point-list elements: freehand strokes, eraser strokes and multi-point paths.

use super::{HitTolerance, ShapeId, ShapeStyle, ShapeTrait, points_bounds};
use kurbo::{Affine, BezPath, Point, Rect};
use serde::{Deserialize, Serialize};

/// Minimum number of points for a stroke to be committed.
pub const MIN_STROKE_POINTS: usize = 2;

/// An ordered series of world points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub(crate) id: ShapeId,
    pub points: Vec<Point>,
    pub style: ShapeStyle,
    #[serde(default)]
    pub revision: u64,
}

impl Stroke {
    /// Create a stroke seeded with a single point.
    pub fn new(id: impl Into<ShapeId>, first: Point) -> Self {
        Self::from_points(id, vec![first])
    }

    pub fn from_points(id: impl Into<ShapeId>, points: Vec<Point>) -> Self {
        Self {
            id: id.into(),
            points,
            style: ShapeStyle::default(),
            revision: 0,
        }
    }

    pub fn add_point(&mut self, point: Point) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether the stroke has enough points to be committed.
    pub fn is_committable(&self) -> bool {
        self.points.len() >= MIN_STROKE_POINTS
    }

    /// Scale every point uniformly about `center`.
    pub fn scale_about(&mut self, center: Point, factor: f64) {
        self.transform(Affine::scale_about(factor, center));
    }

    /// Polyline through the points.
    pub fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        let mut iter = self.points.iter();
        if let Some(first) = iter.next() {
            path.move_to(*first);
            for p in iter {
                path.line_to(*p);
            }
        }
        path
    }
}

impl ShapeTrait for Stroke {
    fn id(&self) -> &str {
        &self.id
    }

    fn bounds(&self) -> Rect {
        points_bounds(&self.points)
    }

    /// True when any sampled point lies within the stroke's screen-scaled
    /// width plus the margin.
    fn hit_test(&self, point: Point, tolerance: HitTolerance) -> bool {
        let radius = self.style.stroke_width / tolerance.zoom + tolerance.margin;
        let radius_sq = radius * radius;
        self.points
            .iter()
            .any(|p| (p.x - point.x).powi(2) + (p.y - point.y).powi(2) <= radius_sq)
    }

    fn style(&self) -> &ShapeStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut ShapeStyle {
        &mut self.style
    }

    fn transform(&mut self, affine: Affine) {
        for point in &mut self.points {
            *point = affine * *point;
        }
    }
}
