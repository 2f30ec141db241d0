//! The embeddable engine: one canvas, one interaction state machine and
//! one sync bridge, wired together.
//!
//! Hosts feed pointer and key events in view coordinates, call
//! [`Engine::poll_remote`] to apply inbound pushes, and repaint whenever
//! [`Engine::take_repaint`] reports a change.

use crate::canvas::Canvas;
use crate::clipboard::Clipboard;
use crate::config::EngineConfig;
use crate::event_handler::{EventHandler, InteractionState};
use crate::ids::IdGenerator;
use crate::input::{KeyEvent, Modifiers, PointerEvent};
use crate::scene::{Scene, SceneChange, SceneResult};
use crate::shapes::{SerializableColor, ShapeId};
use crate::sync::{Inbound, Persistence, PersistenceResult, SyncBridge};
use crate::tools::ToolKind;
use kurbo::Point;
use std::fmt;
use std::rc::Rc;

/// Zoom factor per wheel notch.
pub const WHEEL_ZOOM_STEP: f64 = 1.1;

/// Called with the serialized scene whenever the committed scene changes.
pub type SceneChangeCallback = Box<dyn FnMut(&str)>;

pub struct Engine {
    canvas: Canvas,
    events: EventHandler,
    sync: SyncBridge,
    config: EngineConfig,
    on_scene_change: Option<SceneChangeCallback>,
    needs_repaint: bool,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("scene_id", &self.config.scene_id)
            .field("elements", &self.canvas.scene.len())
            .field("state", &self.events.state().name())
            .field("needs_repaint", &self.needs_repaint)
            .finish()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(err) => {
                log::warn!("{err}");
                config.repaired()
            }
        };
        let mut canvas = Canvas::with_scene(Scene::new().with_max_undo(config.max_undo));
        canvas.camera.min_zoom = config.min_zoom;
        canvas.camera.max_zoom = config.max_zoom;
        canvas.hit_margin = config.hit_margin;
        canvas.handle_radius = config.handle_radius;
        canvas.clipboard = Clipboard::new(config.paste_offset);
        canvas.tool_manager.current_style.color = config.stroke_color;

        if let Some(json) = &config.initial_scene {
            if let Err(err) = canvas.scene.load_json(json) {
                log::warn!("ignoring initial scene: {err}");
            }
        }

        let mut sync = SyncBridge::new(config.scene_id.clone(), config.merge_policy);
        if let Err(err) = sync.mark_synced(&canvas.scene) {
            log::warn!("could not fingerprint initial scene: {err}");
        }

        let mut events = EventHandler::new();
        events.read_only = config.read_only;

        log::info!(
            "engine ready for scene {} with {} element(s)",
            config.scene_id,
            canvas.scene.len()
        );

        Self {
            canvas,
            events,
            sync,
            config,
            on_scene_change: None,
            needs_repaint: true,
        }
    }

    /// Replace the element id source.
    pub fn with_id_generator(mut self, ids: Box<dyn IdGenerator>) -> Self {
        self.canvas = self.canvas.with_id_generator(ids);
        self
    }

    /// Register the host callback for committed scene changes.
    pub fn on_scene_change(&mut self, callback: impl FnMut(&str) + 'static) {
        self.on_scene_change = Some(Box::new(callback));
    }

    /// Subscribe to a persistence collaborator.
    pub fn connect(&mut self, persistence: Rc<dyn Persistence>) -> PersistenceResult<()> {
        self.sync.connect(persistence)
    }

    pub fn disconnect(&mut self) {
        self.sync.disconnect();
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn scene(&self) -> &Scene {
        &self.canvas.scene
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn interaction(&self) -> &EventHandler {
        &self.events
    }

    pub fn state(&self) -> &InteractionState {
        self.events.state()
    }

    pub fn sync(&self) -> &SyncBridge {
        &self.sync
    }

    pub fn selection(&self) -> &[ShapeId] {
        &self.canvas.selection
    }

    pub fn is_read_only(&self) -> bool {
        self.config.read_only
    }

    pub fn needs_repaint(&self) -> bool {
        self.needs_repaint
    }

    /// Return and clear the repaint flag.
    pub fn take_repaint(&mut self) -> bool {
        std::mem::take(&mut self.needs_repaint)
    }

    pub fn scene_json(&self) -> SceneResult<String> {
        self.canvas.scene.to_json()
    }

    pub fn set_viewport_size(&mut self, width: f64, height: f64) {
        self.canvas.set_viewport_size(width, height);
        self.needs_repaint = true;
    }

    pub fn pointer_down(&mut self, position: Point, modifiers: Modifiers) {
        self.handle_pointer(PointerEvent::Down {
            position,
            modifiers,
        });
    }

    pub fn pointer_move(&mut self, position: Point) {
        self.handle_pointer(PointerEvent::Move { position });
    }

    pub fn pointer_up(&mut self, position: Point) {
        self.handle_pointer(PointerEvent::Up { position });
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) {
        if let PointerEvent::Wheel { position, delta } = event {
            self.zoom_at(position, WHEEL_ZOOM_STEP.powf(delta));
            return;
        }
        let change = self.events.handle_pointer(&mut self.canvas, event);
        self.needs_repaint = true;
        self.commit(change);
    }

    pub fn key_down(&mut self, event: &KeyEvent) {
        let change = self.events.handle_key(&mut self.canvas, event);
        self.needs_repaint = true;
        self.commit(change);
    }

    /// Zoom by `factor` keeping the world point under `view_point` fixed.
    pub fn zoom_at(&mut self, view_point: Point, factor: f64) {
        self.canvas.camera.zoom_at(view_point, factor);
        self.needs_repaint = true;
    }

    pub fn set_rotation(&mut self, degrees: f64) {
        self.canvas.camera.set_rotation(degrees);
        self.needs_repaint = true;
    }

    pub fn fit_to_content(&mut self) {
        self.canvas.fit_to_content();
        self.needs_repaint = true;
    }

    pub fn reset_view(&mut self) {
        self.canvas.camera.reset();
        self.needs_repaint = true;
    }

    pub fn tool(&self) -> ToolKind {
        self.canvas.tool_manager.current_tool
    }

    pub fn set_tool(&mut self, tool: ToolKind) {
        let change = self.events.set_tool(&mut self.canvas, tool);
        self.needs_repaint = true;
        self.commit(change);
    }

    /// Color of elements drawn from now on.
    pub fn set_stroke_color(&mut self, color: SerializableColor) {
        self.canvas.tool_manager.current_style.color = color;
    }

    pub fn set_stroke_width(&mut self, width: f64) {
        if width.is_finite() && width > 0.0 {
            self.canvas.tool_manager.current_style.stroke_width = width;
        }
    }

    /// Update the draft of the open text editor.
    pub fn set_text_draft(&mut self, content: &str) {
        self.events.set_text_draft(content);
        self.needs_repaint = true;
    }

    /// Commit the open text editor with `content`.
    pub fn commit_text(&mut self, content: &str) {
        self.events.set_text_draft(content);
        let change = self.events.commit_text(&mut self.canvas);
        self.needs_repaint = true;
        self.commit(change);
    }

    pub fn finalize_path(&mut self) {
        let change = self.events.finalize_path(&mut self.canvas);
        self.needs_repaint = true;
        self.commit(change);
    }

    /// Abort the current gesture, discard the path and clear the selection.
    pub fn cancel(&mut self) {
        self.events.cancel(&mut self.canvas);
        self.needs_repaint = true;
    }

    pub fn select_all(&mut self) {
        self.canvas.select_all();
        self.needs_repaint = true;
    }

    pub fn copy(&mut self) -> usize {
        self.canvas.copy_selection()
    }

    pub fn paste(&mut self) {
        self.mutate(Canvas::paste);
    }

    pub fn delete_selection(&mut self) {
        self.mutate(Canvas::delete_selected);
    }

    pub fn undo(&mut self) {
        self.mutate(Canvas::undo);
    }

    pub fn redo(&mut self) {
        self.mutate(Canvas::redo);
    }

    /// Whether undo would change anything. Always false when read-only.
    pub fn can_undo(&self) -> bool {
        !self.events.read_only && self.canvas.scene.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        !self.events.read_only && self.canvas.scene.can_redo()
    }

    pub fn bring_to_front(&mut self) {
        self.mutate(Canvas::bring_selection_to_front);
    }

    pub fn send_to_back(&mut self) {
        self.mutate(Canvas::send_selection_to_back);
    }

    /// Remove every element.
    pub fn clear(&mut self) {
        self.mutate(Canvas::clear);
    }

    /// Replace the scene with a serialized one, as a local edit. On error the
    /// current scene is kept.
    pub fn load_scene(&mut self, json: &str) -> SceneResult<()> {
        if self.config.read_only {
            return Ok(());
        }
        let shapes = Scene::shapes_from_json(json)?;
        self.events.abort_gesture(&mut self.canvas);
        self.canvas.scene.push_undo();
        self.canvas.scene.replace(shapes)?;
        self.canvas.prune_selection();
        self.needs_repaint = true;
        self.commit(Some(SceneChange::Modified));
        Ok(())
    }

    /// Apply queued inbound pushes. Every push is a full scene, so only the
    /// newest one is applied. Returns 1 if it changed the scene, else 0.
    pub fn poll_remote(&mut self) -> usize {
        let mut inbound = self.sync.take_inbound();
        let Some(latest) = inbound.pop() else {
            return 0;
        };
        if !inbound.is_empty() {
            log::debug!("skipping {} superseded remote push(es)", inbound.len());
        }
        match self.apply_remote_json(&latest) {
            Ok(Inbound::Replaced | Inbound::Merged { .. }) => 1,
            _ => 0,
        }
    }

    /// Apply one serialized scene pushed by the remote side. Malformed
    /// payloads are logged and leave the scene untouched.
    pub fn apply_remote_json(&mut self, payload: &str) -> SceneResult<Inbound> {
        let outcome = match self.sync.receive(&mut self.canvas.scene, payload) {
            Ok(outcome) => outcome,
            Err(err) => {
                log::warn!("ignoring remote scene push: {err}");
                return Err(err);
            }
        };
        if outcome == Inbound::Echo {
            return Ok(outcome);
        }

        self.events.abort_gesture(&mut self.canvas);
        self.needs_repaint = true;
        if outcome == (Inbound::Merged { diverged: true }) {
            self.commit(Some(SceneChange::Modified));
        } else {
            self.notify(payload);
        }
        Ok(outcome)
    }

    fn mutate(&mut self, edit: fn(&mut Canvas) -> Option<SceneChange>) {
        if self.config.read_only {
            log::debug!("read-only engine ignored an edit");
            return;
        }
        if self.events.state().is_pointer_gesture() {
            return;
        }
        let change = edit(&mut self.canvas);
        self.needs_repaint = true;
        self.commit(change);
    }

    /// Forward a committed local change through the bridge and to the host.
    fn commit(&mut self, change: Option<SceneChange>) {
        let Some(change) = change else {
            return;
        };
        match self.sync.publish(&self.canvas.scene, &change) {
            Ok(Some(json)) => self.notify(&json),
            Ok(None) => {}
            Err(err) => log::warn!("could not serialize scene: {err}"),
        }
    }

    fn notify(&mut self, json: &str) {
        if let Some(callback) = self.on_scene_change.as_mut() {
            callback(json);
        }
    }
}
