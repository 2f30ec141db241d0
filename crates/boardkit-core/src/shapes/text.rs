//! Text shape.

use super::{HitTolerance, ShapeId, ShapeStyle, ShapeTrait};
use kurbo::{Affine, Point, Rect};
use serde::{Deserialize, Serialize};

/// Default font size in world units.
pub const DEFAULT_FONT_SIZE: f64 = 20.0;

/// Average glyph advance as a fraction of the font size.
const CHAR_WIDTH_FACTOR: f64 = 0.6;
/// Line height as a fraction of the font size.
const LINE_HEIGHT_FACTOR: f64 = 1.2;

/// A block of text anchored at the baseline of its first line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub(crate) id: ShapeId,
    /// Baseline origin of the first line.
    pub position: Point,
    pub content: String,
    pub font_size: f64,
    pub style: ShapeStyle,
    #[serde(default)]
    pub revision: u64,
}

impl Text {
    pub fn new(id: impl Into<ShapeId>, position: Point, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            position,
            content: content.into(),
            font_size: DEFAULT_FONT_SIZE,
            style: ShapeStyle::default(),
            revision: 0,
        }
    }

    pub fn with_font_size(mut self, font_size: f64) -> Self {
        self.font_size = font_size;
        self
    }

    /// Number of lines, never less than one.
    pub fn line_count(&self) -> usize {
        self.content.lines().count().max(1)
    }

    pub fn line_height(&self) -> f64 {
        self.font_size * LINE_HEIGHT_FACTOR
    }

    /// Baseline of each line, in world coordinates.
    pub fn line_origins(&self) -> impl Iterator<Item = (Point, &str)> {
        let step = self.line_height();
        let origin = self.position;
        self.content
            .lines()
            .enumerate()
            .map(move |(i, line)| (Point::new(origin.x, origin.y + i as f64 * step), line))
    }

    /// Whether the content is blank and would not be committed.
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

impl ShapeTrait for Text {
    fn id(&self) -> &str {
        &self.id
    }

    /// Estimated from the font size, since no font metrics are available.
    fn bounds(&self) -> Rect {
        let longest = self
            .content
            .lines()
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0);
        let width = longest as f64 * CHAR_WIDTH_FACTOR * self.font_size;
        let height = self.line_count() as f64 * self.line_height();
        let top = self.position.y - self.font_size;
        Rect::new(self.position.x, top, self.position.x + width, top + height)
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
        self.position = affine * self.position;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimated_bounds() {
        let text = Text::new("t", Point::new(10.0, 30.0), "hello\nhi");
        let b = text.bounds();
        assert!((b.x0 - 10.0).abs() < 1e-9);
        assert!((b.y0 - 10.0).abs() < 1e-9);
        assert!((b.width() - 5.0 * 0.6 * 20.0).abs() < 1e-9);
        assert!((b.height() - 2.0 * 1.2 * 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_text_has_one_line() {
        let text = Text::new("t", Point::ZERO, "");
        assert_eq!(text.line_count(), 1);
        assert!(text.is_blank());
        assert!((text.bounds().width()).abs() < f64::EPSILON);
    }

    #[test]
    fn test_line_origins_step_by_line_height() {
        let text = Text::new("t", Point::new(0.0, 0.0), "a\nb").with_font_size(10.0);
        let origins: Vec<_> = text.line_origins().collect();
        assert_eq!(origins.len(), 2);
        assert_eq!(origins[1].1, "b");
        assert!((origins[1].0.y - 12.0).abs() < 1e-9);
    }
}
