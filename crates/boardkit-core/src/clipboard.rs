//! Element clipboard.
//!
//! Pasting replaces the buffer with the pasted copies, so repeated pastes
//! walk further away from the original instead of stacking on one spot.

use crate::ids::IdGenerator;
use crate::scene::{Scene, SceneResult};
use crate::shapes::{Shape, ShapeId};
use kurbo::Vec2;

/// Offset applied to every pasted element.
pub const PASTE_OFFSET: Vec2 = Vec2::new(20.0, 20.0);

#[derive(Debug, Clone)]
pub struct Clipboard {
    buffer: Vec<Shape>,
    offset: Vec2,
}

impl Default for Clipboard {
    fn default() -> Self {
        Self::new(PASTE_OFFSET)
    }
}

impl Clipboard {
    pub fn new(offset: Vec2) -> Self {
        Self {
            buffer: Vec::new(),
            offset,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn contents(&self) -> &[Shape] {
        &self.buffer
    }

    /// Deep-copy the selected elements, in scene order. The scene is not
    /// touched. Returns how many elements were copied.
    pub fn copy(&mut self, scene: &Scene, selection: &[ShapeId]) -> usize {
        let copied: Vec<Shape> = scene
            .iter()
            .filter(|s| selection.iter().any(|id| id == s.id()))
            .cloned()
            .collect();
        if copied.is_empty() {
            return 0;
        }
        self.buffer = copied;
        self.buffer.len()
    }

    /// Append offset copies with fresh ids to `scene` and return their ids.
    /// An empty buffer pastes nothing.
    pub fn paste(&mut self, scene: &mut Scene, ids: &mut dyn IdGenerator) -> SceneResult<Vec<ShapeId>> {
        if self.buffer.is_empty() {
            return Ok(Vec::new());
        }
        let pasted: Vec<Shape> = self
            .buffer
            .iter()
            .map(|shape| {
                let mut copy = shape.clone();
                copy.set_id(ids.next_id());
                copy.translate(self.offset);
                copy
            })
            .collect();
        let mut new_ids = Vec::with_capacity(pasted.len());
        for shape in &pasted {
            new_ids.push(shape.id().to_string());
            scene.add(shape.clone())?;
        }
        self.buffer = pasted;
        Ok(new_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use crate::shapes::BoxShape;
    use kurbo::Point;

    fn scene_with_rect() -> Scene {
        let mut scene = Scene::new();
        scene
            .add(Shape::Rectangle(BoxShape::new("r", Point::new(10.0, 10.0), 100.0, 50.0)))
            .unwrap();
        scene
    }

    #[test]
    fn test_copy_does_not_mutate_scene() {
        let scene = scene_with_rect();
        let mut clipboard = Clipboard::default();
        assert_eq!(clipboard.copy(&scene, &["r".into()]), 1);
        assert_eq!(scene.len(), 1);
        assert_eq!(clipboard.contents()[0].id(), "r");
    }

    #[test]
    fn test_copy_of_nothing_keeps_buffer() {
        let scene = scene_with_rect();
        let mut clipboard = Clipboard::default();
        clipboard.copy(&scene, &["r".into()]);
        assert_eq!(clipboard.copy(&scene, &[]), 0);
        assert_eq!(clipboard.len(), 1);
    }

    #[test]
    fn test_paste_chains_offsets() {
        let mut scene = scene_with_rect();
        let mut ids = SequentialIds::new("p");
        let mut clipboard = Clipboard::default();
        clipboard.copy(&scene, &["r".into()]);

        let first = clipboard.paste(&mut scene, &mut ids).unwrap();
        let second = clipboard.paste(&mut scene, &mut ids).unwrap();
        assert_eq!(first, vec!["p-1"]);
        assert_eq!(second, vec!["p-2"]);
        assert_eq!(scene.get("p-1").map(Shape::anchor), Some(Point::new(30.0, 30.0)));
        assert_eq!(scene.get("p-2").map(Shape::anchor), Some(Point::new(50.0, 50.0)));
        assert_eq!(scene.len(), 3);
    }

    #[test]
    fn test_paste_empty_buffer_is_noop() {
        let mut scene = scene_with_rect();
        let mut ids = SequentialIds::default();
        let mut clipboard = Clipboard::default();
        assert!(clipboard.paste(&mut scene, &mut ids).unwrap().is_empty());
        assert_eq!(scene.len(), 1);
    }
}
