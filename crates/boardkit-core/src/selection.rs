//! Selection handles and manipulation state.

use crate::shapes::{Shape, ShapeId};
use kurbo::{Affine, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Handle radius in screen pixels.
pub const HANDLE_RADIUS: f64 = 8.0;
/// Smallest uniform scale a stroke can be resized to.
pub const MIN_STROKE_SCALE: f64 = 0.05;

/// Type of selection handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    /// The end point of a line or arrow.
    Endpoint,
    /// Corner handle of a bounding box.
    Corner(Corner),
}

/// Corner positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    /// Position of this corner on `bounds`.
    pub fn on(self, bounds: Rect) -> Point {
        match self {
            Corner::TopLeft => Point::new(bounds.x0, bounds.y0),
            Corner::TopRight => Point::new(bounds.x1, bounds.y0),
            Corner::BottomLeft => Point::new(bounds.x0, bounds.y1),
            Corner::BottomRight => Point::new(bounds.x1, bounds.y1),
        }
    }

    pub fn opposite(self) -> Corner {
        match self {
            Corner::TopLeft => Corner::BottomRight,
            Corner::TopRight => Corner::BottomLeft,
            Corner::BottomLeft => Corner::TopRight,
            Corner::BottomRight => Corner::TopLeft,
        }
    }
}

/// A selection handle with its position and type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    /// Position in world coordinates.
    pub position: Point,
    pub kind: HandleKind,
}

impl Handle {
    pub fn new(position: Point, kind: HandleKind) -> Self {
        Self { position, kind }
    }

    /// Check if a world point lies within `radius` (world units) of the handle.
    pub fn hit_test(&self, point: Point, radius: f64) -> bool {
        let dx = point.x - self.position.x;
        let dy = point.y - self.position.y;
        dx * dx + dy * dy <= radius * radius
    }
}

/// Get the resize handles for a shape. Text has none. Handles of a rotated
/// element sit on its rotated corners.
pub fn get_handles(shape: &Shape) -> Vec<Handle> {
    let to_drawn = shape.rotation_transform();
    match shape {
        Shape::Line(line) | Shape::Arrow(line) => {
            vec![Handle::new(to_drawn * line.end, HandleKind::Endpoint)]
        }
        Shape::Text(_) => Vec::new(),
        _ => {
            let bounds = shape.local_bounds();
            Corner::ALL
                .iter()
                .map(|&c| Handle::new(to_drawn * c.on(bounds), HandleKind::Corner(c)))
                .collect()
        }
    }
}

/// Find which handle (if any) is hit at the given world point.
/// `zoom` keeps the handle radius constant in screen pixels.
pub fn hit_test_handles(shape: &Shape, point: Point, radius: f64, zoom: f64) -> Option<HandleKind> {
    let radius = radius / zoom.max(f64::EPSILON);
    get_handles(shape)
        .into_iter()
        .find(|h| h.hit_test(point, radius))
        .map(|h| h.kind)
}

/// State of an active resize on a single shape.
#[derive(Debug, Clone)]
pub struct ManipulationState {
    pub shape_id: ShapeId,
    pub handle: HandleKind,
    pub start_point: Point,
    pub current_point: Point,
    /// Shape as it was when the drag began.
    pub original_shape: Shape,
}

impl ManipulationState {
    pub fn new(handle: HandleKind, start_point: Point, original_shape: Shape) -> Self {
        Self {
            shape_id: original_shape.id().to_string(),
            handle,
            start_point,
            current_point: start_point,
            original_shape,
        }
    }

    pub fn delta(&self) -> Vec2 {
        self.current_point - self.start_point
    }

    /// The original shape with the current drag applied.
    pub fn preview(&self) -> Shape {
        apply_resize(&self.original_shape, self.handle, self.delta())
    }
}

/// State for moving every selected shape together.
#[derive(Debug, Clone)]
pub struct MultiMoveState {
    pub start_point: Point,
    pub current_point: Point,
    /// Shapes as they were when the drag began, in selection order.
    pub original_shapes: Vec<Shape>,
}

impl MultiMoveState {
    pub fn new(start_point: Point, original_shapes: Vec<Shape>) -> Self {
        Self {
            start_point,
            current_point: start_point,
            original_shapes,
        }
    }

    pub fn delta(&self) -> Vec2 {
        self.current_point - self.start_point
    }
}

/// Apply a handle drag to a copy of `shape`.
///
/// Box kinds move the dragged corner against the fixed opposite corner.
/// Stroke kinds scale uniformly about their bounding-box center. Lines move
/// their end point. The drag delta is taken into the element's unrotated
/// frame first.
pub fn apply_resize(shape: &Shape, handle: HandleKind, delta: Vec2) -> Shape {
    let delta = match shape.rotation() {
        Some(degrees) => (Affine::rotate(-degrees.to_radians()) * delta.to_point()).to_vec2(),
        None => delta,
    };
    let mut shape = shape.clone();
    match (&mut shape, handle) {
        (Shape::Line(line) | Shape::Arrow(line), HandleKind::Endpoint) => {
            line.end += delta;
        }
        (
            Shape::Rectangle(b) | Shape::Ellipse(b) | Shape::Triangle(b) | Shape::Star(b),
            HandleKind::Corner(corner),
        ) => {
            let bounds = Rect::from_points(b.position, b.far_corner());
            let fixed = corner.opposite().on(bounds);
            let moved = corner.on(bounds) + delta;
            b.set_bounds(Rect::from_points(fixed, moved));
        }
        (
            Shape::Freehand(s) | Shape::Eraser(s) | Shape::Path(s),
            HandleKind::Corner(corner),
        ) => {
            let bounds = crate::shapes::points_bounds(&s.points);
            let center = bounds.center();
            let from = corner.on(bounds) - center;
            let to = from + delta;
            let original = from.hypot();
            if original > f64::EPSILON {
                let factor = (to.hypot() / original).max(MIN_STROKE_SCALE);
                s.scale_about(center, factor);
            }
        }
        _ => {}
    }
    shape
}
