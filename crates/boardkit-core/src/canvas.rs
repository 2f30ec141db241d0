//! Runtime canvas state: scene, camera, tools, selection and clipboard.

use crate::camera::Camera;
use crate::clipboard::Clipboard;
use crate::ids::{IdGenerator, UuidGenerator};
use crate::scene::{Scene, SceneChange};
use crate::selection::HANDLE_RADIUS;
use crate::shapes::{HIT_MARGIN, HitTolerance, Shape, ShapeId};
use crate::tools::{ToolKind, ToolManager};
use kurbo::{Point, Size};

/// Padding used when fitting the view to the content.
const FIT_PADDING: f64 = 50.0;

/// Everything one engine instance edits. Nothing here is shared.
#[derive(Debug)]
pub struct Canvas {
    pub scene: Scene,
    pub camera: Camera,
    pub tool_manager: ToolManager,
    /// Currently selected shape IDs, in selection order.
    pub selection: Vec<ShapeId>,
    pub clipboard: Clipboard,
    /// Hit margin in screen pixels.
    pub hit_margin: f64,
    /// Resize handle radius in screen pixels.
    pub handle_radius: f64,
    ids: Box<dyn IdGenerator>,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas {
    /// Create a new canvas with an empty scene.
    pub fn new() -> Self {
        Self::with_scene(Scene::new())
    }

    /// Create a canvas with an existing scene.
    pub fn with_scene(scene: Scene) -> Self {
        Self {
            scene,
            camera: Camera::new(),
            tool_manager: ToolManager::new(),
            selection: Vec::new(),
            clipboard: Clipboard::default(),
            hit_margin: HIT_MARGIN,
            handle_radius: HANDLE_RADIUS,
            ids: Box::new(UuidGenerator),
        }
    }

    /// Replace the id source.
    pub fn with_id_generator(mut self, ids: Box<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn next_id(&mut self) -> ShapeId {
        self.ids.next_id()
    }

    pub fn set_viewport_size(&mut self, width: f64, height: f64) {
        self.camera.set_viewport(Size::new(width, height));
    }

    /// Hit tolerance at the current zoom.
    pub fn hit_tolerance(&self) -> HitTolerance {
        HitTolerance::new(self.camera.zoom).with_margin(self.hit_margin)
    }

    /// Topmost element under a world point.
    pub fn hit(&self, world_point: Point) -> Option<&Shape> {
        self.scene.topmost_at(world_point, self.hit_tolerance())
    }

    /// Select a shape (clears previous selection).
    pub fn select(&mut self, id: impl Into<ShapeId>) {
        self.selection.clear();
        self.selection.push(id.into());
    }

    pub fn add_to_selection(&mut self, id: impl Into<ShapeId>) {
        let id = id.into();
        if !self.selection.contains(&id) {
            self.selection.push(id);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn select_all(&mut self) {
        self.selection = self.scene.ids();
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selection.iter().any(|s| s == id)
    }

    /// The selected shapes, in scene order.
    pub fn selected_shapes(&self) -> impl Iterator<Item = &Shape> {
        self.scene.iter().filter(|s| self.is_selected(s.id()))
    }

    /// The single selected shape, if exactly one is selected.
    pub fn single_selected(&self) -> Option<&Shape> {
        match self.selection.as_slice() {
            [id] => self.scene.get(id),
            _ => None,
        }
    }

    /// Drop selected ids that no longer exist in the scene.
    pub fn prune_selection(&mut self) {
        let scene = &self.scene;
        self.selection.retain(|id| scene.contains(id));
    }

    /// Set the current tool.
    pub fn set_tool(&mut self, tool: ToolKind) {
        self.tool_manager.set_tool(tool);
    }

    /// End the active drag gesture of the tool, producing the new shape.
    pub fn finish_drawing(&mut self, point: Point) -> Option<Shape> {
        self.tool_manager.end(point, self.ids.as_mut())
    }

    /// Turn the accumulated path points into one stroke.
    pub fn take_path(&mut self) -> Option<Shape> {
        self.tool_manager.finalize_path(self.ids.as_mut())
    }

    /// Add a freshly created shape on top, with an undo point.
    pub fn commit_shape(&mut self, shape: Shape) -> Option<SceneChange> {
        let id = shape.id().to_string();
        self.scene.push_undo();
        match self.scene.add(shape) {
            Ok(()) => {
                log::debug!("committed element {id}");
                Some(SceneChange::Added(id))
            }
            Err(err) => {
                log::warn!("could not commit element: {err}");
                self.scene.rollback();
                None
            }
        }
    }

    /// Delete selected shapes. No-op with an empty selection.
    pub fn delete_selected(&mut self) -> Option<SceneChange> {
        if self.selection.is_empty() {
            return None;
        }
        self.scene.push_undo();
        let ids = std::mem::take(&mut self.selection);
        let removed: Vec<ShapeId> = self
            .scene
            .remove_many(&ids)
            .iter()
            .map(|s| s.id().to_string())
            .collect();
        if removed.is_empty() {
            self.scene.rollback();
            return None;
        }
        Some(SceneChange::Removed(removed))
    }

    /// Copy the selection into the clipboard.
    pub fn copy_selection(&mut self) -> usize {
        self.clipboard.copy(&self.scene, &self.selection)
    }

    /// Paste the clipboard and select exactly the pasted shapes.
    pub fn paste(&mut self) -> Option<SceneChange> {
        if self.clipboard.is_empty() {
            return None;
        }
        self.scene.push_undo();
        match self.clipboard.paste(&mut self.scene, self.ids.as_mut()) {
            Ok(pasted) => {
                let change = match pasted.as_slice() {
                    [one] => SceneChange::Added(one.clone()),
                    _ => SceneChange::Modified,
                };
                self.selection = pasted;
                Some(change)
            }
            Err(err) => {
                log::warn!("paste failed: {err}");
                self.scene.rollback();
                None
            }
        }
    }

    /// Remove every element.
    pub fn clear(&mut self) -> Option<SceneChange> {
        if self.scene.is_empty() {
            return None;
        }
        self.scene.push_undo();
        let ids = self.scene.ids();
        self.scene.clear();
        self.selection.clear();
        Some(SceneChange::Removed(ids))
    }

    pub fn undo(&mut self) -> Option<SceneChange> {
        let changed = self.scene.undo();
        self.prune_selection();
        changed.then_some(SceneChange::Modified)
    }

    pub fn redo(&mut self) -> Option<SceneChange> {
        let changed = self.scene.redo();
        self.prune_selection();
        changed.then_some(SceneChange::Modified)
    }

    pub fn bring_selection_to_front(&mut self) -> Option<SceneChange> {
        if self.selection.is_empty() {
            return None;
        }
        self.scene.push_undo();
        self.scene.bring_to_front(&self.selection);
        Some(SceneChange::Modified)
    }

    pub fn send_selection_to_back(&mut self) -> Option<SceneChange> {
        if self.selection.is_empty() {
            return None;
        }
        self.scene.push_undo();
        self.scene.send_to_back(&self.selection);
        Some(SceneChange::Modified)
    }

    /// Fit the view to show all shapes.
    pub fn fit_to_content(&mut self) {
        if let Some(bounds) = self.scene.bounds() {
            self.camera.fit_to_bounds(bounds, FIT_PADDING);
        }
    }
}
