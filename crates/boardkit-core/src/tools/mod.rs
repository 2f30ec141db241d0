//! Tool system for the whiteboard.

use crate::ids::IdGenerator;
use crate::shapes::{
    BoxShape, Cap, DEFAULT_FONT_SIZE, Line, MIN_STROKE_POINTS, Shape, ShapeId, ShapeStyle, Stroke, Text,
};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Placeholder id carried by preview shapes that are not in the scene.
pub const PREVIEW_ID: &str = "__preview__";

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ToolKind {
    #[default]
    Select,
    Pan,
    Freehand,
    Eraser,
    Rectangle,
    Ellipse,
    Triangle,
    Star,
    Line,
    Arrow,
    Path,
    Text,
}

impl ToolKind {
    /// Tools that record a point per pointer move.
    pub fn draws_stroke(self) -> bool {
        matches!(self, ToolKind::Freehand | ToolKind::Eraser)
    }

    /// Tools that drag out an anchor plus extent.
    pub fn draws_box(self) -> bool {
        matches!(
            self,
            ToolKind::Rectangle | ToolKind::Ellipse | ToolKind::Triangle | ToolKind::Star
        )
    }

    pub fn draws_line(self) -> bool {
        matches!(self, ToolKind::Line | ToolKind::Arrow)
    }
}

/// State of a drag interaction.
#[derive(Debug, Clone, Default)]
pub enum ToolState {
    #[default]
    Idle,
    Active {
        /// Starting point of the interaction.
        start: Point,
        /// Current point of the interaction.
        current: Point,
    },
}

/// Manages the current tool, its in-progress geometry and the style
/// applied to new shapes.
#[derive(Debug, Clone)]
pub struct ToolManager {
    pub current_tool: ToolKind,
    pub state: ToolState,
    /// Accumulated points for freehand and eraser strokes.
    stroke_points: Vec<Point>,
    /// Points placed so far with the path tool.
    path_points: Vec<Point>,
    /// Current style to apply to new shapes.
    pub current_style: ShapeStyle,
    /// Font size for new text.
    pub font_size: f64,
}

impl Default for ToolManager {
    fn default() -> Self {
        Self {
            current_tool: ToolKind::default(),
            state: ToolState::default(),
            stroke_points: Vec::new(),
            path_points: Vec::new(),
            current_style: ShapeStyle::default(),
            font_size: DEFAULT_FONT_SIZE,
        }
    }
}

impl ToolManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the current tool. Any in-progress drag or path is discarded.
    pub fn set_tool(&mut self, tool: ToolKind) {
        if tool != self.current_tool {
            log::debug!("tool changed: {:?} -> {:?}", self.current_tool, tool);
        }
        self.current_tool = tool;
        self.cancel();
        self.cancel_path();
    }

    /// Begin a drag interaction.
    pub fn begin(&mut self, point: Point) {
        self.stroke_points.clear();
        if self.current_tool.draws_stroke() {
            self.stroke_points.push(point);
        }
        self.state = ToolState::Active {
            start: point,
            current: point,
        };
    }

    /// Update the current interaction.
    pub fn update(&mut self, point: Point) {
        if let ToolState::Active { current, .. } = &mut self.state {
            *current = point;
            if self.current_tool.draws_stroke() && self.stroke_points.last() != Some(&point) {
                self.stroke_points.push(point);
            }
        }
    }

    /// End the current interaction and return the committed shape, if the
    /// geometry is valid.
    pub fn end(&mut self, point: Point, ids: &mut dyn IdGenerator) -> Option<Shape> {
        let ToolState::Active { start, .. } = self.state else {
            return None;
        };
        self.update(point);
        let shape = self.create_shape(start, point).filter(is_committable);
        self.cancel();
        shape.map(|mut s| {
            s.set_id(ids.next_id());
            s
        })
    }

    /// Cancel the current drag interaction.
    pub fn cancel(&mut self) {
        self.state = ToolState::Idle;
        self.stroke_points.clear();
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, ToolState::Active { .. })
    }

    /// The shape the current drag would commit, with a placeholder id.
    pub fn preview_shape(&self) -> Option<Shape> {
        match self.state {
            ToolState::Active { start, current } => self.create_shape(start, current),
            ToolState::Idle => None,
        }
    }

    pub fn stroke_points(&self) -> &[Point] {
        &self.stroke_points
    }

    /// Append a point to the path accumulator.
    pub fn push_path_point(&mut self, point: Point) {
        self.path_points.push(point);
    }

    pub fn path_points(&self) -> &[Point] {
        &self.path_points
    }

    pub fn has_path(&self) -> bool {
        !self.path_points.is_empty()
    }

    /// Commit the accumulated path. Fewer than two points commit nothing.
    /// The accumulator is cleared either way.
    pub fn finalize_path(&mut self, ids: &mut dyn IdGenerator) -> Option<Shape> {
        let points = std::mem::take(&mut self.path_points);
        if points.len() < MIN_STROKE_POINTS {
            log::debug!("discarding path with {} point(s)", points.len());
            return None;
        }
        let mut stroke = Stroke::from_points(ids.next_id(), points);
        stroke.style = self.style_for(ToolKind::Path);
        Some(Shape::Path(stroke))
    }

    /// Discard the accumulated path.
    pub fn cancel_path(&mut self) {
        self.path_points.clear();
    }

    /// Create a text shape with the current style, unless `content` is blank.
    pub fn create_text(&self, id: ShapeId, position: Point, content: &str) -> Option<Shape> {
        if content.trim().is_empty() {
            return None;
        }
        let mut text = Text::new(id, position, content).with_font_size(self.font_size);
        text.style = self.style_for(ToolKind::Text);
        Some(Shape::Text(text))
    }

    /// Current style adjusted for what `tool` produces.
    fn style_for(&self, tool: ToolKind) -> ShapeStyle {
        let mut style = self.current_style.clone();
        if tool != ToolKind::Rectangle {
            style.corner_radius = None;
        }
        if tool == ToolKind::Arrow {
            style.end_cap = Cap::Arrow;
        }
        style
    }

    fn create_shape(&self, start: Point, end: Point) -> Option<Shape> {
        let tool = self.current_tool;
        let mut shape = match tool {
            ToolKind::Freehand => Shape::Freehand(Stroke::from_points(
                PREVIEW_ID,
                self.stroke_points.clone(),
            )),
            ToolKind::Eraser => {
                Shape::Eraser(Stroke::from_points(PREVIEW_ID, self.stroke_points.clone()))
            }
            ToolKind::Rectangle | ToolKind::Ellipse | ToolKind::Triangle | ToolKind::Star => {
                let mut frame = BoxShape::new(PREVIEW_ID, start, 0.0, 0.0);
                frame.set_far_corner(end);
                match tool {
                    ToolKind::Rectangle => Shape::Rectangle(frame),
                    ToolKind::Ellipse => Shape::Ellipse(frame),
                    ToolKind::Triangle => Shape::Triangle(frame),
                    _ => Shape::Star(frame),
                }
            }
            ToolKind::Line => Shape::Line(Line::new(PREVIEW_ID, start, end)),
            ToolKind::Arrow => Shape::Arrow(Line::new(PREVIEW_ID, start, end)),
            ToolKind::Select | ToolKind::Pan | ToolKind::Path | ToolKind::Text => return None,
        };
        *shape.style_mut() = self.style_for(tool);
        Some(shape)
    }
}

/// Whether freshly drawn geometry is worth committing.
fn is_committable(shape: &Shape) -> bool {
    match shape {
        Shape::Freehand(s) | Shape::Eraser(s) | Shape::Path(s) => s.is_committable(),
        Shape::Rectangle(b) | Shape::Ellipse(b) | Shape::Triangle(b) | Shape::Star(b) => {
            b.has_area()
        }
        Shape::Line(l) | Shape::Arrow(l) => l.length() > f64::EPSILON,
        Shape::Text(t) => !t.is_blank(),
    }
}
