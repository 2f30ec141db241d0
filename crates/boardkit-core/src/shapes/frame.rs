//! Box-like elements: rectangle, ellipse, triangle, star.

use super::{HitTolerance, ShapeId, ShapeStyle, ShapeTrait};
use kurbo::{Affine, Point, Rect};
use serde::{Deserialize, Serialize};

/// Geometry shared by every box kind: an anchor plus a signed extent.
///
/// Negative `width`/`height` mean the box was drawn up or to the left and
/// is rendered flipped; bounds are normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxShape {
    pub(crate) id: ShapeId,
    /// Anchor corner (where the drag started).
    pub position: Point,
    pub width: f64,
    pub height: f64,
    pub style: ShapeStyle,
    #[serde(default)]
    pub revision: u64,
}

impl BoxShape {
    pub fn new(id: impl Into<ShapeId>, position: Point, width: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            position,
            width,
            height,
            style: ShapeStyle::default(),
            revision: 0,
        }
    }

    /// The far corner, `anchor + extent`.
    pub fn far_corner(&self) -> Point {
        Point::new(self.position.x + self.width, self.position.y + self.height)
    }

    /// Set the extent so the far corner lands on `point`.
    pub fn set_far_corner(&mut self, point: Point) {
        self.width = point.x - self.position.x;
        self.height = point.y - self.position.y;
    }

    /// Replace the geometry with `rect`, keeping the current flip direction.
    pub fn set_bounds(&mut self, rect: Rect) {
        if self.width < 0.0 {
            self.position.x = rect.x1;
            self.width = -rect.width();
        } else {
            self.position.x = rect.x0;
            self.width = rect.width();
        }
        if self.height < 0.0 {
            self.position.y = rect.y1;
            self.height = -rect.height();
        } else {
            self.position.y = rect.y0;
            self.height = rect.height();
        }
    }

    pub fn has_area(&self) -> bool {
        self.width.abs() > f64::EPSILON && self.height.abs() > f64::EPSILON
    }
}

impl ShapeTrait for BoxShape {
    fn id(&self) -> &str {
        &self.id
    }

    fn bounds(&self) -> Rect {
        Rect::from_points(self.position, self.far_corner())
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
        let far = affine * self.far_corner();
        self.position = affine * self.position;
        self.set_far_corner(far);
    }
}

/// Triangle vertices: apex at the middle of the anchor edge, base on the far
/// edge. A negative height flips it upside down.
pub fn triangle_points(shape: &BoxShape) -> [Point; 3] {
    let p = shape.position;
    let far = shape.far_corner();
    [
        Point::new(p.x + shape.width / 2.0, p.y),
        Point::new(far.x, far.y),
        Point::new(p.x, far.y),
    ]
}

/// Five-pointed star inscribed in the box, alternating outer and inner
/// vertices starting from the top.
pub fn star_points(shape: &BoxShape) -> Vec<Point> {
    const INNER_RATIO: f64 = 0.4;
    let bounds = shape.bounds();
    let center = bounds.center();
    let rx = bounds.width() / 2.0;
    let ry = bounds.height() / 2.0;
    (0..10)
        .map(|i| {
            let angle = -std::f64::consts::FRAC_PI_2 + i as f64 * std::f64::consts::PI / 5.0;
            let scale = if i % 2 == 0 { 1.0 } else { INNER_RATIO };
            Point::new(
                center.x + rx * scale * angle.cos(),
                center.y + ry * scale * angle.sin(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Vec2;

    #[test]
    fn test_negative_extent_bounds_are_normalized() {
        let b = BoxShape::new("a", Point::new(100.0, 50.0), -40.0, -20.0);
        assert_eq!(b.bounds(), Rect::new(60.0, 30.0, 100.0, 50.0));
    }

    #[test]
    fn test_hit_test_uses_zoomed_margin() {
        let b = BoxShape::new("a", Point::new(0.0, 0.0), 100.0, 100.0);
        assert!(b.hit_test(Point::new(50.0, 50.0), HitTolerance::new(1.0)));
        assert!(b.hit_test(Point::new(104.0, 50.0), HitTolerance::new(1.0)));
        // Same screen margin at 2x zoom is only 2.5 world units.
        assert!(!b.hit_test(Point::new(104.0, 50.0), HitTolerance::new(2.0)));
    }

    #[test]
    fn test_translate_keeps_extent() {
        let mut b = BoxShape::new("a", Point::new(10.0, 10.0), 100.0, 50.0);
        b.transform(Affine::translate(Vec2::new(20.0, 20.0)));
        assert_eq!(b.position, Point::new(30.0, 30.0));
        assert!((b.width - 100.0).abs() < 1e-9);
        assert!((b.height - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_set_bounds_keeps_flip() {
        let mut b = BoxShape::new("a", Point::new(100.0, 100.0), -50.0, 50.0);
        b.set_bounds(Rect::new(0.0, 100.0, 80.0, 160.0));
        assert_eq!(b.position, Point::new(80.0, 100.0));
        assert!((b.width + 80.0).abs() < 1e-9);
        assert!((b.height - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_star_has_ten_vertices_inside_bounds() {
        let b = BoxShape::new("s", Point::new(0.0, 0.0), 100.0, 100.0);
        let pts = star_points(&b);
        assert_eq!(pts.len(), 10);
        let bounds = b.bounds().inflate(1e-9, 1e-9);
        assert!(pts.iter().all(|p| bounds.contains(*p)));
    }
}
