//! Element definitions for the whiteboard.
//!
//! Every drawable element is a [`Shape`]: a tagged union whose variants carry
//! the geometry payload for their kind. On the wire an element is a flat
//! record (see [`ElementRecord`]).

mod frame;
mod line;
mod record;
mod stroke;
mod text;

pub use frame::{BoxShape, star_points, triangle_points};
pub use line::Line;
pub use record::{ElementKind, ElementRecord, RecordError};
pub use stroke::{MIN_STROKE_POINTS, Stroke};
pub use text::{DEFAULT_FONT_SIZE, Text};

use kurbo::{Affine, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hit margin in screen pixels.
pub const HIT_MARGIN: f64 = 5.0;

/// Unique identifier for elements. Opaque: foreign scenes may use any string.
pub type ShapeId = String;

/// Serializable color representation (RGBA8), stored as a CSS hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub const fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub const fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Parse `#rgb`, `#rrggbb`, `#rrggbbaa` or `transparent`.
    pub fn parse(color: &str) -> Option<Self> {
        let color = color.trim();
        if color.eq_ignore_ascii_case("transparent") {
            return Some(Self::transparent());
        }
        let hex = color.strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            3 => {
                let r = channel(&hex[0..1])? * 17;
                let g = channel(&hex[1..2])? * 17;
                let b = channel(&hex[2..3])? * 17;
                Some(Self::new(r, g, b, 255))
            }
            6 => Some(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                255,
            )),
            8 => Some(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                channel(&hex[6..8])?,
            )),
            _ => None,
        }
    }
}

impl Default for SerializableColor {
    fn default() -> Self {
        Self::black()
    }
}

impl fmt::Display for SerializableColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl TryFrom<String> for SerializableColor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid color: {value}"))
    }
}

impl From<SerializableColor> for String {
    fn from(color: SerializableColor) -> Self {
        color.to_string()
    }
}

/// Dash pattern for outlines and strokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DashPattern {
    #[default]
    Solid,
    Dashed,
    Dotted,
    DashDot,
    LongDash,
}

impl DashPattern {
    /// Dash lengths as multiples of the stroke width (empty = solid).
    pub fn segments(&self, stroke_width: f64) -> Vec<f64> {
        let w = stroke_width.max(1.0);
        match self {
            DashPattern::Solid => Vec::new(),
            DashPattern::Dashed => vec![4.0 * w, 3.0 * w],
            DashPattern::Dotted => vec![w, 2.0 * w],
            DashPattern::DashDot => vec![4.0 * w, 2.0 * w, w, 2.0 * w],
            DashPattern::LongDash => vec![8.0 * w, 3.0 * w],
        }
    }
}

/// Brush treatment. Affects rendering only, never stored geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BrushType {
    #[default]
    Pen,
    Marker,
    Highlighter,
    Calligraphy,
}

/// Decoration drawn at a line end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cap {
    #[default]
    None,
    Arrow,
    Circle,
}

/// Style properties shared by every element kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeStyle {
    /// Stroke (and text) color.
    pub color: SerializableColor,
    /// Stroke width in world units.
    pub stroke_width: f64,
    pub dash: DashPattern,
    pub brush: BrushType,
    pub start_cap: Cap,
    pub end_cap: Cap,
    /// Corner radius, rectangles only.
    pub corner_radius: Option<f64>,
    /// Rotation in degrees about the bounding-box center.
    pub rotation: Option<f64>,
}

impl Default for ShapeStyle {
    fn default() -> Self {
        Self {
            color: SerializableColor::black(),
            stroke_width: 2.0,
            dash: DashPattern::Solid,
            brush: BrushType::Pen,
            start_cap: Cap::None,
            end_cap: Cap::None,
            corner_radius: None,
            rotation: None,
        }
    }
}

impl ShapeStyle {
    /// Style with the given color and defaults otherwise.
    pub fn with_color(color: SerializableColor) -> Self {
        Self {
            color,
            ..Self::default()
        }
    }
}

/// Tolerance used when hit-testing a point against an element.
///
/// The margin is in screen pixels; it is divided by `zoom` where the hit
/// area must stay constant on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitTolerance {
    pub zoom: f64,
    pub margin: f64,
}

impl HitTolerance {
    pub fn new(zoom: f64) -> Self {
        Self {
            zoom: zoom.max(f64::EPSILON),
            margin: HIT_MARGIN,
        }
    }

    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    /// Margin converted to world units.
    pub fn world_margin(&self) -> f64 {
        self.margin / self.zoom
    }
}

/// Axis-aligned bounds over a set of points.
pub fn points_bounds(points: &[Point]) -> Rect {
    let Some(first) = points.first() else {
        return Rect::ZERO;
    };
    points
        .iter()
        .skip(1)
        .fold(Rect::from_points(*first, *first), |r, p| r.union_pt(*p))
}

/// Closed-interval rectangle intersection: touching edges count.
pub fn rects_touch(a: Rect, b: Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}

/// Common behaviour of every element payload.
pub trait ShapeTrait {
    /// Get the unique identifier.
    fn id(&self) -> &str;

    /// Get the bounding box in world coordinates (sign-normalized).
    fn bounds(&self) -> Rect;

    /// Check if a point (in world coordinates) hits this element.
    fn hit_test(&self, point: Point, tolerance: HitTolerance) -> bool;

    /// Get the style.
    fn style(&self) -> &ShapeStyle;

    /// Get mutable style.
    fn style_mut(&mut self) -> &mut ShapeStyle;

    /// Apply a transform to the geometry.
    fn transform(&mut self, affine: Affine);
}

/// Tagged union over all element kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ElementRecord", into = "ElementRecord")]
pub enum Shape {
    Freehand(Stroke),
    Eraser(Stroke),
    Path(Stroke),
    Rectangle(BoxShape),
    Ellipse(BoxShape),
    Triangle(BoxShape),
    Star(BoxShape),
    Line(Line),
    Arrow(Line),
    Text(Text),
}

impl Shape {
    fn inner(&self) -> &dyn ShapeTrait {
        match self {
            Shape::Freehand(s) | Shape::Eraser(s) | Shape::Path(s) => s,
            Shape::Rectangle(s) | Shape::Ellipse(s) | Shape::Triangle(s) | Shape::Star(s) => s,
            Shape::Line(s) | Shape::Arrow(s) => s,
            Shape::Text(s) => s,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn ShapeTrait {
        match self {
            Shape::Freehand(s) | Shape::Eraser(s) | Shape::Path(s) => s,
            Shape::Rectangle(s) | Shape::Ellipse(s) | Shape::Triangle(s) | Shape::Star(s) => s,
            Shape::Line(s) | Shape::Arrow(s) => s,
            Shape::Text(s) => s,
        }
    }

    pub fn id(&self) -> &str {
        self.inner().id()
    }

    /// Rotation in degrees, when the element is drawn rotated.
    pub fn rotation(&self) -> Option<f64> {
        self.style()
            .rotation
            .filter(|deg| deg.is_finite() && deg % 360.0 != 0.0)
    }

    /// Bounds of the geometry before rotation.
    pub fn local_bounds(&self) -> Rect {
        self.inner().bounds()
    }

    /// Maps stored geometry to where it is drawn. Elements rotate about the
    /// center of their local bounds.
    pub fn rotation_transform(&self) -> Affine {
        match self.rotation() {
            Some(degrees) => Affine::rotate_about(degrees.to_radians(), self.local_bounds().center()),
            None => Affine::IDENTITY,
        }
    }

    /// Axis-aligned bounds of the element as drawn.
    pub fn bounds(&self) -> Rect {
        let local = self.local_bounds();
        match self.rotation() {
            Some(_) => self.rotation_transform().transform_rect_bbox(local),
            None => local,
        }
    }

    pub fn hit_test(&self, point: Point, tolerance: HitTolerance) -> bool {
        let local = match self.rotation() {
            Some(_) => self.rotation_transform().inverse() * point,
            None => point,
        };
        self.inner().hit_test(local, tolerance)
    }

    pub fn style(&self) -> &ShapeStyle {
        self.inner().style()
    }

    pub fn style_mut(&mut self) -> &mut ShapeStyle {
        self.inner_mut().style_mut()
    }

    pub fn transform(&mut self, affine: Affine) {
        self.inner_mut().transform(affine);
    }

    /// Translate the whole element by a world-space delta.
    pub fn translate(&mut self, delta: Vec2) {
        self.transform(Affine::translate(delta));
    }

    /// Wire name of the element kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Shape::Freehand(_) => "freehand",
            Shape::Eraser(_) => "eraser",
            Shape::Path(_) => "path",
            Shape::Rectangle(_) => "rectangle",
            Shape::Ellipse(_) => "ellipse",
            Shape::Triangle(_) => "triangle",
            Shape::Star(_) => "star",
            Shape::Line(_) => "line",
            Shape::Arrow(_) => "arrow",
            Shape::Text(_) => "text",
        }
    }

    /// Stroke-like kinds whose geometry is a point list.
    pub fn is_stroke(&self) -> bool {
        matches!(self, Shape::Freehand(_) | Shape::Eraser(_) | Shape::Path(_))
    }

    /// Kinds whose geometry is anchor plus signed width/height.
    pub fn is_box(&self) -> bool {
        matches!(
            self,
            Shape::Rectangle(_) | Shape::Ellipse(_) | Shape::Triangle(_) | Shape::Star(_)
        )
    }

    pub fn is_linear(&self) -> bool {
        matches!(self, Shape::Line(_) | Shape::Arrow(_))
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Shape::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut Text> {
        match self {
            Shape::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Primary position: top-left for boxes, start for lines, first point
    /// for strokes, baseline origin for text.
    pub fn anchor(&self) -> Point {
        match self {
            Shape::Freehand(s) | Shape::Eraser(s) | Shape::Path(s) => {
                s.points.first().copied().unwrap_or(Point::ZERO)
            }
            Shape::Rectangle(s) | Shape::Ellipse(s) | Shape::Triangle(s) | Shape::Star(s) => {
                s.position
            }
            Shape::Line(s) | Shape::Arrow(s) => s.start,
            Shape::Text(s) => s.position,
        }
    }

    /// Local revision counter used by per-element merging.
    pub fn revision(&self) -> u64 {
        match self {
            Shape::Freehand(s) | Shape::Eraser(s) | Shape::Path(s) => s.revision,
            Shape::Rectangle(s) | Shape::Ellipse(s) | Shape::Triangle(s) | Shape::Star(s) => {
                s.revision
            }
            Shape::Line(s) | Shape::Arrow(s) => s.revision,
            Shape::Text(s) => s.revision,
        }
    }

    pub fn bump_revision(&mut self) {
        match self {
            Shape::Freehand(s) | Shape::Eraser(s) | Shape::Path(s) => s.revision += 1,
            Shape::Rectangle(s) | Shape::Ellipse(s) | Shape::Triangle(s) | Shape::Star(s) => {
                s.revision += 1
            }
            Shape::Line(s) | Shape::Arrow(s) => s.revision += 1,
            Shape::Text(s) => s.revision += 1,
        }
    }

    /// Replace the identifier. Used when pasting or committing a preview.
    pub fn set_id(&mut self, id: ShapeId) {
        match self {
            Shape::Freehand(s) | Shape::Eraser(s) | Shape::Path(s) => s.id = id,
            Shape::Rectangle(s) | Shape::Ellipse(s) | Shape::Triangle(s) | Shape::Star(s) => {
                s.id = id
            }
            Shape::Line(s) | Shape::Arrow(s) => s.id = id,
            Shape::Text(s) => s.id = id,
        }
    }
}
