//! Scene store: the ordered list of elements and its undo history.

use crate::shapes::{HitTolerance, Shape, ShapeId, rects_touch};
use kurbo::{Point, Rect};
use std::collections::HashSet;
use thiserror::Error;

/// Default number of undo states to keep.
pub const MAX_UNDO_HISTORY: usize = 50;

/// Errors loading or mutating a scene.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("scene is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("scene must be a JSON array of elements")]
    NotAnArray,
    #[error("element {index} is invalid: {reason}")]
    InvalidElement { index: usize, reason: String },
    #[error("duplicate element id: {0}")]
    DuplicateId(ShapeId),
}

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;

/// What a local edit did to the scene. Shapes the outbound sync call.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneChange {
    /// One element was appended.
    Added(ShapeId),
    /// The listed elements were deleted.
    Removed(Vec<ShapeId>),
    /// Anything else: moves, resizes, multi-element pastes, undo, clear.
    Modified,
}

/// Ordered collection of elements. Array order is z-order (later = on top).
#[derive(Debug, Clone)]
pub struct Scene {
    shapes: Vec<Shape>,
    undo_stack: Vec<Vec<Shape>>,
    redo_stack: Vec<Vec<Shape>>,
    max_undo: usize,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Scene {
    fn eq(&self, other: &Self) -> bool {
        self.shapes == other.shapes
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            shapes: Vec::new(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_undo: MAX_UNDO_HISTORY,
        }
    }

    pub fn with_max_undo(mut self, max_undo: usize) -> Self {
        self.max_undo = max_undo;
        self
    }

    /// Build a scene from elements, rejecting duplicate ids.
    pub fn from_shapes(shapes: Vec<Shape>) -> SceneResult<Self> {
        check_unique(&shapes)?;
        let mut scene = Self::new();
        scene.shapes = shapes;
        Ok(scene)
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn iter(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.iter()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn ids(&self) -> Vec<ShapeId> {
        self.shapes.iter().map(|s| s.id().to_string()).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index_of(id).is_some()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.shapes.iter().position(|s| s.id() == id)
    }

    pub fn get(&self, id: &str) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.id() == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Shape> {
        self.shapes.iter_mut().find(|s| s.id() == id)
    }

    /// Append an element on top.
    pub fn add(&mut self, shape: Shape) -> SceneResult<()> {
        if self.contains(shape.id()) {
            return Err(SceneError::DuplicateId(shape.id().to_string()));
        }
        self.shapes.push(shape);
        Ok(())
    }

    /// Remove every element whose id is listed, returning the removed ones.
    pub fn remove_many(&mut self, ids: &[ShapeId]) -> Vec<Shape> {
        if ids.is_empty() {
            return Vec::new();
        }
        let (removed, kept) = std::mem::take(&mut self.shapes)
            .into_iter()
            .partition(|s| ids.iter().any(|id| id == s.id()));
        self.shapes = kept;
        removed
    }

    pub fn clear(&mut self) {
        self.shapes.clear();
    }

    /// Replace every element wholesale. History is kept.
    pub fn replace(&mut self, shapes: Vec<Shape>) -> SceneResult<()> {
        check_unique(&shapes)?;
        self.shapes = shapes;
        Ok(())
    }

    /// Ids of elements hit by `point`, topmost first.
    pub fn shapes_at_point(&self, point: Point, tolerance: HitTolerance) -> Vec<ShapeId> {
        self.shapes
            .iter()
            .rev()
            .filter(|s| s.hit_test(point, tolerance))
            .map(|s| s.id().to_string())
            .collect()
    }

    /// The topmost element hit by `point`.
    pub fn topmost_at(&self, point: Point, tolerance: HitTolerance) -> Option<&Shape> {
        self.shapes
            .iter()
            .rev()
            .find(|s| s.hit_test(point, tolerance))
    }

    /// Ids of elements whose bounds intersect `rect`; touching edges count.
    pub fn shapes_in_rect(&self, rect: Rect) -> Vec<ShapeId> {
        self.shapes
            .iter()
            .filter(|s| rects_touch(rect, s.bounds()))
            .map(|s| s.id().to_string())
            .collect()
    }

    /// Union of all element bounds.
    pub fn bounds(&self) -> Option<Rect> {
        self.shapes
            .iter()
            .map(Shape::bounds)
            .reduce(|acc, b| acc.union(b))
    }

    /// Move the listed elements to the top, keeping their relative order.
    pub fn bring_to_front(&mut self, ids: &[ShapeId]) {
        let (mut moved, mut rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.shapes)
            .into_iter()
            .partition(|s| ids.iter().any(|id| id == s.id()));
        rest.append(&mut moved);
        self.shapes = rest;
    }

    /// Move the listed elements to the bottom, keeping their relative order.
    pub fn send_to_back(&mut self, ids: &[ShapeId]) {
        let (mut moved, mut rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.shapes)
            .into_iter()
            .partition(|s| ids.iter().any(|id| id == s.id()));
        moved.append(&mut rest);
        self.shapes = moved;
    }

    /// Push current state to undo stack (call before making changes).
    pub fn push_undo(&mut self) {
        self.undo_stack.push(self.shapes.clone());
        self.redo_stack.clear();
        if self.undo_stack.len() > self.max_undo {
            self.undo_stack.remove(0);
        }
    }

    /// Undo the last change. Returns false if there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.undo_stack.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.shapes, snapshot);
        self.redo_stack.push(current);
        true
    }

    /// Redo the last undone change. Returns false if there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.redo_stack.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.shapes, snapshot);
        self.undo_stack.push(current);
        true
    }

    /// Restore the last undo snapshot without recording a redo step.
    /// Used to back out of an edit that failed halfway.
    pub fn rollback(&mut self) -> bool {
        let Some(snapshot) = self.undo_stack.pop() else {
            return false;
        };
        self.shapes = snapshot;
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Serialize as a compact JSON array of element records.
    pub fn to_json(&self) -> SceneResult<String> {
        Ok(serde_json::to_string(&self.shapes)?)
    }

    /// Parse a JSON array of element records.
    pub fn shapes_from_json(json: &str) -> SceneResult<Vec<Shape>> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let serde_json::Value::Array(items) = value else {
            return Err(SceneError::NotAnArray);
        };
        let shapes = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                serde_json::from_value::<Shape>(item).map_err(|e| SceneError::InvalidElement {
                    index,
                    reason: e.to_string(),
                })
            })
            .collect::<SceneResult<Vec<_>>>()?;
        check_unique(&shapes)?;
        Ok(shapes)
    }

    pub fn from_json(json: &str) -> SceneResult<Self> {
        Self::from_shapes(Self::shapes_from_json(json)?)
    }

    /// Replace the elements from JSON. On error the scene is left unchanged.
    pub fn load_json(&mut self, json: &str) -> SceneResult<()> {
        let shapes = Self::shapes_from_json(json)?;
        self.shapes = shapes;
        Ok(())
    }
}

fn check_unique(shapes: &[Shape]) -> SceneResult<()> {
    let mut seen = HashSet::with_capacity(shapes.len());
    for shape in shapes {
        if !seen.insert(shape.id()) {
            return Err(SceneError::DuplicateId(shape.id().to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{BoxShape, Line, Stroke, Text};

    fn rect(id: &str, x: f64, y: f64, w: f64, h: f64) -> Shape {
        Shape::Rectangle(BoxShape::new(id, Point::new(x, y), w, h))
    }

    #[test]
    fn test_add_rejects_duplicate_id() {
        let mut scene = Scene::new();
        scene.add(rect("a", 0.0, 0.0, 10.0, 10.0)).unwrap();
        assert!(matches!(
            scene.add(rect("a", 5.0, 5.0, 10.0, 10.0)),
            Err(SceneError::DuplicateId(_))
        ));
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn test_shapes_at_point_topmost_first() {
        let mut scene = Scene::new();
        scene.add(rect("bottom", 0.0, 0.0, 100.0, 100.0)).unwrap();
        scene.add(rect("top", 50.0, 50.0, 100.0, 100.0)).unwrap();
        let hits = scene.shapes_at_point(Point::new(75.0, 75.0), HitTolerance::new(1.0));
        assert_eq!(hits, vec!["top".to_string(), "bottom".to_string()]);
        let top = scene.topmost_at(Point::new(75.0, 75.0), HitTolerance::new(1.0));
        assert_eq!(top.map(|s| s.id()), Some("top"));
    }

    #[test]
    fn test_remove_many_keeps_order() {
        let mut scene = Scene::new();
        for id in ["a", "b", "c", "d"] {
            scene.add(rect(id, 0.0, 0.0, 1.0, 1.0)).unwrap();
        }
        let removed = scene.remove_many(&["b".into(), "d".into()]);
        assert_eq!(removed.len(), 2);
        assert_eq!(scene.ids(), vec!["a".to_string(), "c".to_string()]);
        assert!(scene.remove_many(&[]).is_empty());
    }

    #[test]
    fn test_z_order_moves() {
        let mut scene = Scene::new();
        for id in ["a", "b", "c"] {
            scene.add(rect(id, 0.0, 0.0, 1.0, 1.0)).unwrap();
        }
        scene.bring_to_front(&["a".into()]);
        assert_eq!(scene.ids(), vec!["b", "c", "a"]);
        scene.send_to_back(&["c".into()]);
        assert_eq!(scene.ids(), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_undo_redo() {
        let mut scene = Scene::new();
        scene.push_undo();
        scene.add(rect("a", 0.0, 0.0, 1.0, 1.0)).unwrap();
        assert!(scene.undo());
        assert!(scene.is_empty());
        assert!(scene.redo());
        assert_eq!(scene.len(), 1);
        assert!(!scene.redo());
    }

    #[test]
    fn test_undo_history_is_bounded() {
        let mut scene = Scene::new().with_max_undo(3);
        for i in 0..5 {
            scene.push_undo();
            scene.add(rect(&format!("r{i}"), 0.0, 0.0, 1.0, 1.0)).unwrap();
        }
        let mut undone = 0;
        while scene.undo() {
            undone += 1;
        }
        assert_eq!(undone, 3);
        assert_eq!(scene.len(), 2);
    }

    #[test]
    fn test_json_round_trip_preserves_order() {
        let mut scene = Scene::new();
        scene.add(rect("r", 10.0, 10.0, 100.0, 50.0)).unwrap();
        scene
            .add(Shape::Line(Line::new("l", Point::ZERO, Point::new(3.0, 4.0))))
            .unwrap();
        scene
            .add(Shape::Freehand(Stroke::from_points(
                "f",
                vec![Point::new(1.0, 1.0), Point::new(2.0, 3.0)],
            )))
            .unwrap();
        scene
            .add(Shape::Text(Text::new("t", Point::new(0.0, 20.0), "hi")))
            .unwrap();
        let json = scene.to_json().unwrap();
        let back = Scene::from_json(&json).unwrap();
        assert_eq!(back, scene);
        assert_eq!(back.ids(), scene.ids());
    }

    #[test]
    fn test_load_json_retains_scene_on_error() {
        let mut scene = Scene::new();
        scene.add(rect("keep", 0.0, 0.0, 1.0, 1.0)).unwrap();

        assert!(matches!(scene.load_json("not json"), Err(SceneError::Json(_))));
        assert!(matches!(scene.load_json(r#"{"id":"x"}"#), Err(SceneError::NotAnArray)));
        assert!(matches!(
            scene.load_json(r#"[{"id":"x","kind":"blob"}]"#),
            Err(SceneError::InvalidElement { index: 0, .. })
        ));
        assert_eq!(scene.ids(), vec!["keep"]);

        scene.load_json("[]").unwrap();
        assert!(scene.is_empty());
    }

    #[test]
    fn test_bounds_union() {
        let mut scene = Scene::new();
        assert!(scene.bounds().is_none());
        scene.add(rect("a", 0.0, 0.0, 10.0, 10.0)).unwrap();
        scene.add(rect("b", 20.0, 20.0, -5.0, 5.0)).unwrap();
        assert_eq!(scene.bounds(), Some(Rect::new(0.0, 0.0, 20.0, 25.0)));
    }
}
