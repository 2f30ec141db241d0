//! Pointer and keyboard handling: the interaction state machine.
//!
//! Pointer positions arrive in view coordinates and are mapped to world
//! coordinates through the canvas camera. The active tool decides which
//! state a pointer-down enters.

use crate::canvas::Canvas;
use crate::input::{Command, InputState, KeyEvent, Modifiers, PointerEvent};
use crate::scene::SceneChange;
use crate::selection::{ManipulationState, MultiMoveState, hit_test_handles};
use crate::shapes::{Shape, ShapeId};
use crate::tools::ToolKind;
use kurbo::{Point, Rect};

/// Marquee rectangle in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionRect {
    pub start: Point,
    pub current: Point,
}

impl SelectionRect {
    pub fn to_rect(&self) -> Rect {
        Rect::from_points(self.start, self.current)
    }
}

/// An open inline text editor.
#[derive(Debug, Clone, PartialEq)]
pub struct TextEdit {
    /// Baseline origin of the text.
    pub position: Point,
    /// Current draft content.
    pub content: String,
    /// The text element being re-edited, if any.
    pub editing: Option<ShapeId>,
}

/// Interaction states. Exactly one is active at a time.
#[derive(Debug, Clone, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    FreehandDrawing,
    ShapeDrawing,
    LineDrawing,
    PathAccumulating,
    Panning,
    Selecting(SelectionRect),
    DraggingSelection(MultiMoveState),
    Resizing(ManipulationState),
    TextEditing(TextEdit),
}

impl InteractionState {
    pub fn name(&self) -> &'static str {
        match self {
            InteractionState::Idle => "idle",
            InteractionState::FreehandDrawing => "freehand-drawing",
            InteractionState::ShapeDrawing => "shape-drawing",
            InteractionState::LineDrawing => "line-drawing",
            InteractionState::PathAccumulating => "path-accumulating",
            InteractionState::Panning => "panning",
            InteractionState::Selecting(_) => "selecting",
            InteractionState::DraggingSelection(_) => "dragging-selection",
            InteractionState::Resizing(_) => "resizing",
            InteractionState::TextEditing(_) => "text-editing",
        }
    }

    /// Whether a pointer button is currently held for a gesture.
    pub fn is_pointer_gesture(&self) -> bool {
        !matches!(
            self,
            InteractionState::Idle
                | InteractionState::PathAccumulating
                | InteractionState::TextEditing(_)
        )
    }
}

/// Translates input events into canvas operations.
#[derive(Debug, Default)]
pub struct EventHandler {
    state: InteractionState,
    input: InputState,
    /// Last pointer position in world coordinates, for the path preview.
    pointer_world: Option<Point>,
    /// Ignore every input that would change the scene.
    pub read_only: bool,
}

impl EventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    /// Last known pointer position in world coordinates.
    pub fn pointer_world(&self) -> Option<Point> {
        self.pointer_world
    }

    /// The marquee, while selecting.
    pub fn selection_rect(&self) -> Option<SelectionRect> {
        match &self.state {
            InteractionState::Selecting(rect) => Some(*rect),
            _ => None,
        }
    }

    /// The open text editor, if any.
    pub fn text_edit(&self) -> Option<&TextEdit> {
        match &self.state {
            InteractionState::TextEditing(edit) => Some(edit),
            _ => None,
        }
    }

    /// Dispatch a pointer event. Wheel events are handled by the caller.
    pub fn handle_pointer(&mut self, canvas: &mut Canvas, event: PointerEvent) -> Option<SceneChange> {
        self.input.handle_pointer_event(event);
        match event {
            PointerEvent::Down {
                position,
                modifiers,
            } => self.handle_press(canvas, position, modifiers),
            PointerEvent::Move { position } => self.handle_move(canvas, position),
            PointerEvent::Up { position } => self.handle_release(canvas, position),
            PointerEvent::Wheel { .. } => None,
        }
    }

    /// Handle a press event (pointer down) at a view position.
    fn handle_press(
        &mut self,
        canvas: &mut Canvas,
        view_point: Point,
        modifiers: Modifiers,
    ) -> Option<SceneChange> {
        let world_point = canvas.camera.screen_to_world(view_point);
        self.pointer_world = Some(world_point);

        // Clicking anywhere closes an open text editor.
        let mut change = None;
        if matches!(self.state, InteractionState::TextEditing(_)) {
            change = self.commit_text(canvas);
        }

        let tool = canvas.tool_manager.current_tool;
        if tool == ToolKind::Pan {
            self.state = InteractionState::Panning;
            return change;
        }
        if self.read_only {
            return change;
        }

        match tool {
            ToolKind::Pan => {}
            ToolKind::Freehand | ToolKind::Eraser => {
                canvas.tool_manager.begin(world_point);
                self.state = InteractionState::FreehandDrawing;
            }
            ToolKind::Rectangle | ToolKind::Ellipse | ToolKind::Triangle | ToolKind::Star => {
                canvas.tool_manager.begin(world_point);
                self.state = InteractionState::ShapeDrawing;
            }
            ToolKind::Line | ToolKind::Arrow => {
                canvas.tool_manager.begin(world_point);
                self.state = InteractionState::LineDrawing;
            }
            ToolKind::Path => {
                canvas.tool_manager.push_path_point(world_point);
                self.state = InteractionState::PathAccumulating;
            }
            ToolKind::Text => {
                let existing = canvas
                    .hit(world_point)
                    .and_then(Shape::as_text)
                    .map(|t| (t.id.clone(), t.position, t.content.clone()));
                let edit = match existing {
                    Some((id, position, content)) => {
                        canvas.select(id.clone());
                        TextEdit {
                            position,
                            content,
                            editing: Some(id),
                        }
                    }
                    None => TextEdit {
                        position: world_point,
                        content: String::new(),
                        editing: None,
                    },
                };
                self.state = InteractionState::TextEditing(edit);
            }
            ToolKind::Select => self.press_select(canvas, world_point, modifiers),
        }
        change
    }

    fn press_select(&mut self, canvas: &mut Canvas, world_point: Point, modifiers: Modifiers) {
        // Resize handles of a single selected shape take priority.
        if let Some(shape) = canvas.single_selected() {
            if let Some(handle) =
                hit_test_handles(shape, world_point, canvas.handle_radius, canvas.camera.zoom)
            {
                self.state = InteractionState::Resizing(ManipulationState::new(
                    handle,
                    world_point,
                    shape.clone(),
                ));
                return;
            }
        }

        let hit = canvas.hit(world_point).map(|s| s.id().to_string());
        match hit {
            Some(id) => {
                if modifiers.extends_selection() {
                    canvas.add_to_selection(id);
                } else if !canvas.is_selected(&id) {
                    canvas.select(id);
                }
                let originals: Vec<Shape> = canvas.selected_shapes().cloned().collect();
                self.state =
                    InteractionState::DraggingSelection(MultiMoveState::new(world_point, originals));
            }
            None => {
                if !modifiers.extends_selection() {
                    canvas.clear_selection();
                }
                self.state = InteractionState::Selecting(SelectionRect {
                    start: world_point,
                    current: world_point,
                });
            }
        }
    }

    /// Handle a pointer move at a view position.
    fn handle_move(&mut self, canvas: &mut Canvas, view_point: Point) -> Option<SceneChange> {
        let world_point = canvas.camera.screen_to_world(view_point);
        self.pointer_world = Some(world_point);

        match &mut self.state {
            InteractionState::Panning => {
                canvas.camera.pan(self.input.pointer_delta());
            }
            InteractionState::FreehandDrawing
            | InteractionState::ShapeDrawing
            | InteractionState::LineDrawing => {
                canvas.tool_manager.update(world_point);
            }
            InteractionState::Selecting(rect) => {
                rect.current = world_point;
            }
            InteractionState::DraggingSelection(mm) => {
                mm.current_point = world_point;
                let delta = mm.delta();
                for original in &mm.original_shapes {
                    if let Some(shape) = canvas.scene.get_mut(original.id()) {
                        let mut moved = original.clone();
                        moved.translate(delta);
                        *shape = moved;
                    }
                }
            }
            InteractionState::Resizing(manip) => {
                manip.current_point = world_point;
                let preview = manip.preview();
                if let Some(shape) = canvas.scene.get_mut(&manip.shape_id) {
                    *shape = preview;
                }
            }
            InteractionState::Idle
            | InteractionState::PathAccumulating
            | InteractionState::TextEditing(_) => {}
        }
        // Drags mutate the scene live but report once, on release.
        None
    }

    /// Handle a release event (pointer up) at a view position.
    fn handle_release(&mut self, canvas: &mut Canvas, view_point: Point) -> Option<SceneChange> {
        let world_point = canvas.camera.screen_to_world(view_point);
        self.pointer_world = Some(world_point);

        match std::mem::take(&mut self.state) {
            InteractionState::FreehandDrawing
            | InteractionState::ShapeDrawing
            | InteractionState::LineDrawing => {
                let shape = canvas.finish_drawing(world_point)?;
                canvas.commit_shape(shape)
            }
            InteractionState::Selecting(mut rect) => {
                rect.current = world_point;
                for id in canvas.scene.shapes_in_rect(rect.to_rect()) {
                    canvas.add_to_selection(id);
                }
                None
            }
            InteractionState::DraggingSelection(mm) => {
                let delta = mm.delta();
                if delta.hypot() <= f64::EPSILON {
                    return None;
                }
                // Restore the originals so the undo point predates the drag.
                for original in &mm.original_shapes {
                    if let Some(shape) = canvas.scene.get_mut(original.id()) {
                        *shape = original.clone();
                    }
                }
                canvas.scene.push_undo();
                for original in &mm.original_shapes {
                    if let Some(shape) = canvas.scene.get_mut(original.id()) {
                        let mut moved = original.clone();
                        moved.translate(delta);
                        moved.bump_revision();
                        *shape = moved;
                    }
                }
                Some(SceneChange::Modified)
            }
            InteractionState::Resizing(manip) => {
                if manip.delta().hypot() <= f64::EPSILON {
                    return None;
                }
                let mut resized = manip.preview();
                resized.bump_revision();
                if let Some(shape) = canvas.scene.get_mut(&manip.shape_id) {
                    *shape = manip.original_shape.clone();
                }
                canvas.scene.push_undo();
                if let Some(shape) = canvas.scene.get_mut(&manip.shape_id) {
                    *shape = resized;
                }
                Some(SceneChange::Modified)
            }
            state @ (InteractionState::PathAccumulating | InteractionState::TextEditing(_)) => {
                self.state = state;
                None
            }
            InteractionState::Panning | InteractionState::Idle => None,
        }
    }

    /// Handle a key press.
    pub fn handle_key(&mut self, canvas: &mut Canvas, event: &KeyEvent) -> Option<SceneChange> {
        let command = event.command()?;

        if matches!(self.state, InteractionState::TextEditing(_)) {
            // The host's text input owns every other key while editing.
            if command == Command::Cancel {
                self.cancel(canvas);
            }
            return None;
        }
        if command == Command::Cancel {
            self.cancel(canvas);
            return None;
        }
        if self.state.is_pointer_gesture() {
            return None;
        }

        match command {
            Command::Copy => {
                let copied = canvas.copy_selection();
                log::debug!("copied {copied} element(s)");
                None
            }
            Command::SelectAll => {
                canvas.select_all();
                None
            }
            _ if self.read_only => None,
            Command::FinalizePath => self.finalize_path(canvas),
            Command::DeleteSelection => canvas.delete_selected(),
            Command::Paste => canvas.paste(),
            Command::Undo => canvas.undo(),
            Command::Redo => canvas.redo(),
            Command::Cancel => None,
        }
    }

    /// Commit the accumulated path as one element.
    pub fn finalize_path(&mut self, canvas: &mut Canvas) -> Option<SceneChange> {
        if matches!(self.state, InteractionState::PathAccumulating) {
            self.state = InteractionState::Idle;
        }
        if self.read_only {
            canvas.tool_manager.cancel_path();
            return None;
        }
        let shape = canvas.take_path()?;
        canvas.commit_shape(shape)
    }

    /// Replace the draft text of the open editor.
    pub fn set_text_draft(&mut self, content: &str) {
        if let InteractionState::TextEditing(edit) = &mut self.state {
            edit.content = content.to_string();
        }
    }

    /// Close the text editor, committing its draft. Blank drafts create
    /// nothing; a blank re-edit deletes the element.
    pub fn commit_text(&mut self, canvas: &mut Canvas) -> Option<SceneChange> {
        let InteractionState::TextEditing(edit) = std::mem::take(&mut self.state) else {
            return None;
        };
        if self.read_only {
            return None;
        }
        match edit.editing {
            Some(id) => {
                let current = canvas.scene.get(&id).and_then(Shape::as_text)?;
                if current.content == edit.content {
                    return None;
                }
                canvas.scene.push_undo();
                if edit.content.trim().is_empty() {
                    canvas.scene.remove_many(std::slice::from_ref(&id));
                    canvas.prune_selection();
                    return Some(SceneChange::Removed(vec![id]));
                }
                if let Some(shape) = canvas.scene.get_mut(&id) {
                    if let Some(text) = shape.as_text_mut() {
                        text.content = edit.content;
                    }
                    shape.bump_revision();
                }
                Some(SceneChange::Modified)
            }
            None => {
                if edit.content.trim().is_empty() {
                    return None;
                }
                let id = canvas.next_id();
                let shape = canvas
                    .tool_manager
                    .create_text(id, edit.position, &edit.content)?;
                canvas.commit_shape(shape)
            }
        }
    }

    /// Cancel key: abort any gesture, discard the path and clear the selection.
    pub fn cancel(&mut self, canvas: &mut Canvas) {
        match std::mem::take(&mut self.state) {
            InteractionState::DraggingSelection(mm) => {
                for original in mm.original_shapes {
                    if let Some(shape) = canvas.scene.get_mut(original.id()) {
                        *shape = original;
                    }
                }
            }
            InteractionState::Resizing(manip) => {
                if let Some(shape) = canvas.scene.get_mut(&manip.shape_id) {
                    *shape = manip.original_shape;
                }
            }
            _ => {}
        }
        canvas.tool_manager.cancel();
        canvas.tool_manager.cancel_path();
        canvas.clear_selection();
    }

    /// Drop any in-progress pointer gesture without restoring anything.
    /// Called after the scene was replaced underneath it.
    pub fn abort_gesture(&mut self, canvas: &mut Canvas) {
        if self.state.is_pointer_gesture() && !matches!(self.state, InteractionState::Panning)
        {
            log::debug!("aborting {} after scene replacement", self.state.name());
            self.state = InteractionState::Idle;
            canvas.tool_manager.cancel();
        }
        if let InteractionState::TextEditing(edit) = &mut self.state {
            if let Some(id) = &edit.editing {
                if !canvas.scene.contains(id) {
                    edit.editing = None;
                }
            }
        }
        canvas.prune_selection();
    }

    /// Switch tools. An open text editor is committed first; other gestures
    /// and the path accumulator are discarded.
    pub fn set_tool(&mut self, canvas: &mut Canvas, tool: ToolKind) -> Option<SceneChange> {
        let change = self.commit_text(canvas);
        if self.state.is_pointer_gesture() || matches!(self.state, InteractionState::PathAccumulating) {
            self.cancel(canvas);
        }
        self.state = InteractionState::Idle;
        canvas.set_tool(tool);
        change
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Vec2;

    #[test]
    fn test_pan_follows_each_move() {
        let mut canvas = Canvas::new();
        canvas.set_tool(ToolKind::Pan);
        let mut handler = EventHandler::new();

        handler.handle_pointer(
            &mut canvas,
            PointerEvent::Down {
                position: Point::new(50.0, 50.0),
                modifiers: Modifiers::NONE,
            },
        );
        for (x, y) in [(60.0, 50.0), (70.0, 45.0), (75.0, 45.0)] {
            handler.handle_pointer(&mut canvas, PointerEvent::Move { position: Point::new(x, y) });
        }
        assert_eq!(handler.state().name(), "panning");
        assert_eq!(canvas.camera.offset, Vec2::new(25.0, -5.0));

        handler.handle_pointer(&mut canvas, PointerEvent::Up { position: Point::new(90.0, 90.0) });
        assert_eq!(canvas.camera.offset, Vec2::new(25.0, -5.0));
        assert!(matches!(handler.state(), InteractionState::Idle));
    }
}
