//! Flat wire record for elements.
//!
//! The in-memory [`Shape`] is a tagged union; the serialized scene is a JSON
//! array of flat records whose optional fields depend on `kind`.

use super::{
    BoxShape, BrushType, Cap, DashPattern, Line, SerializableColor, Shape, ShapeId, ShapeStyle,
    Stroke, Text,
};
use super::text::DEFAULT_FONT_SIZE;
use kurbo::Point;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors converting a record into a [`Shape`].
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("element {id}: missing `{field}` for kind {kind}")]
    MissingField {
        id: ShapeId,
        kind: &'static str,
        field: &'static str,
    },
    #[error("element {0}: point list is empty")]
    NoPoints(ShapeId),
}

/// Element kinds as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementKind {
    #[serde(alias = "freehand-stroke")]
    Freehand,
    #[serde(alias = "eraser-stroke")]
    Eraser,
    #[serde(alias = "multi-point-path")]
    Path,
    Rectangle,
    Ellipse,
    Triangle,
    Star,
    Line,
    Arrow,
    Text,
}

impl ElementKind {
    fn name(self) -> &'static str {
        match self {
            ElementKind::Freehand => "freehand",
            ElementKind::Eraser => "eraser",
            ElementKind::Path => "path",
            ElementKind::Rectangle => "rectangle",
            ElementKind::Ellipse => "ellipse",
            ElementKind::Triangle => "triangle",
            ElementKind::Star => "star",
            ElementKind::Line => "line",
            ElementKind::Arrow => "arrow",
            ElementKind::Text => "text",
        }
    }
}

fn default_stroke_width() -> f64 {
    ShapeStyle::default().stroke_width
}

/// One serialized element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementRecord {
    pub id: ShapeId,
    pub kind: ElementKind,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<Point>>,
    #[serde(default)]
    pub color: SerializableColor,
    #[serde(default = "default_stroke_width")]
    pub stroke_width: f64,
    #[serde(default)]
    pub line_dash_pattern: DashPattern,
    #[serde(default)]
    pub brush_type: BrushType,
    #[serde(default)]
    pub start_cap: Cap,
    #[serde(default)]
    pub end_cap: Cap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corner_radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default)]
    pub revision: u64,
}

impl ElementRecord {
    fn bare(id: &str, kind: ElementKind, anchor: Point, style: &ShapeStyle, revision: u64) -> Self {
        Self {
            id: id.to_string(),
            kind,
            x: anchor.x,
            y: anchor.y,
            width: None,
            height: None,
            end_x: None,
            end_y: None,
            points: None,
            color: style.color,
            stroke_width: style.stroke_width,
            line_dash_pattern: style.dash,
            brush_type: style.brush,
            start_cap: style.start_cap,
            end_cap: style.end_cap,
            corner_radius: style.corner_radius,
            rotation: style.rotation,
            text: None,
            font_size: None,
            revision,
        }
    }

    fn style(&self) -> ShapeStyle {
        ShapeStyle {
            color: self.color,
            stroke_width: self.stroke_width,
            dash: self.line_dash_pattern,
            brush: self.brush_type,
            start_cap: self.start_cap,
            end_cap: self.end_cap,
            corner_radius: self.corner_radius,
            rotation: self.rotation,
        }
    }

    fn require(&self, value: Option<f64>, field: &'static str) -> Result<f64, RecordError> {
        value.ok_or_else(|| RecordError::MissingField {
            id: self.id.clone(),
            kind: self.kind.name(),
            field,
        })
    }

    fn to_stroke(&self) -> Result<Stroke, RecordError> {
        let points = match &self.points {
            Some(points) if !points.is_empty() => points.clone(),
            Some(_) => return Err(RecordError::NoPoints(self.id.clone())),
            None => {
                return Err(RecordError::MissingField {
                    id: self.id.clone(),
                    kind: self.kind.name(),
                    field: "points",
                });
            }
        };
        let mut stroke = Stroke::from_points(self.id.clone(), points);
        stroke.style = self.style();
        stroke.revision = self.revision;
        Ok(stroke)
    }

    fn to_box(&self) -> Result<BoxShape, RecordError> {
        let width = self.require(self.width, "width")?;
        let height = self.require(self.height, "height")?;
        let mut shape = BoxShape::new(self.id.clone(), Point::new(self.x, self.y), width, height);
        shape.style = self.style();
        shape.revision = self.revision;
        Ok(shape)
    }

    fn to_line(&self) -> Result<Line, RecordError> {
        let end = Point::new(
            self.require(self.end_x, "endX")?,
            self.require(self.end_y, "endY")?,
        );
        let mut line = Line::new(self.id.clone(), Point::new(self.x, self.y), end);
        line.style = self.style();
        line.revision = self.revision;
        Ok(line)
    }

    fn to_text(&self) -> Result<Text, RecordError> {
        let content = self.text.clone().ok_or_else(|| RecordError::MissingField {
            id: self.id.clone(),
            kind: self.kind.name(),
            field: "text",
        })?;
        let mut text = Text::new(self.id.clone(), Point::new(self.x, self.y), content)
            .with_font_size(self.font_size.unwrap_or(DEFAULT_FONT_SIZE));
        text.style = self.style();
        text.revision = self.revision;
        Ok(text)
    }
}

impl TryFrom<ElementRecord> for Shape {
    type Error = RecordError;

    fn try_from(record: ElementRecord) -> Result<Self, Self::Error> {
        Ok(match record.kind {
            ElementKind::Freehand => Shape::Freehand(record.to_stroke()?),
            ElementKind::Eraser => Shape::Eraser(record.to_stroke()?),
            ElementKind::Path => Shape::Path(record.to_stroke()?),
            ElementKind::Rectangle => Shape::Rectangle(record.to_box()?),
            ElementKind::Ellipse => Shape::Ellipse(record.to_box()?),
            ElementKind::Triangle => Shape::Triangle(record.to_box()?),
            ElementKind::Star => Shape::Star(record.to_box()?),
            ElementKind::Line => Shape::Line(record.to_line()?),
            ElementKind::Arrow => Shape::Arrow(record.to_line()?),
            ElementKind::Text => Shape::Text(record.to_text()?),
        })
    }
}

impl From<&Shape> for ElementRecord {
    fn from(shape: &Shape) -> Self {
        let kind = match shape {
            Shape::Freehand(_) => ElementKind::Freehand,
            Shape::Eraser(_) => ElementKind::Eraser,
            Shape::Path(_) => ElementKind::Path,
            Shape::Rectangle(_) => ElementKind::Rectangle,
            Shape::Ellipse(_) => ElementKind::Ellipse,
            Shape::Triangle(_) => ElementKind::Triangle,
            Shape::Star(_) => ElementKind::Star,
            Shape::Line(_) => ElementKind::Line,
            Shape::Arrow(_) => ElementKind::Arrow,
            Shape::Text(_) => ElementKind::Text,
        };
        let mut record =
            ElementRecord::bare(shape.id(), kind, shape.anchor(), shape.style(), shape.revision());
        match shape {
            Shape::Freehand(s) | Shape::Eraser(s) | Shape::Path(s) => {
                record.points = Some(s.points.clone());
            }
            Shape::Rectangle(s) | Shape::Ellipse(s) | Shape::Triangle(s) | Shape::Star(s) => {
                record.width = Some(s.width);
                record.height = Some(s.height);
            }
            Shape::Line(s) | Shape::Arrow(s) => {
                record.end_x = Some(s.end.x);
                record.end_y = Some(s.end.y);
            }
            Shape::Text(s) => {
                record.text = Some(s.content.clone());
                record.font_size = Some(s.font_size);
            }
        }
        record
    }
}

impl From<Shape> for ElementRecord {
    fn from(shape: Shape) -> Self {
        ElementRecord::from(&shape)
    }
}
