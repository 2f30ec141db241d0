//! Scene painter.
//!
//! Every frame is a full redraw: nothing is cached between frames.

use crate::surface::{RenderTarget, Surface};
use boardkit_core::config::BackgroundImage;
use boardkit_core::event_handler::{EventHandler, TextEdit};
use boardkit_core::selection::get_handles;
use boardkit_core::shapes::{
    BrushType, Cap, Line, SerializableColor, Shape, ShapeStyle, ShapeTrait, Stroke as StrokeShape, Text,
    star_points, triangle_points,
};
use boardkit_core::{Canvas, Engine};
use kurbo::{
    BezPath, Cap as StrokeCap, Circle, Ellipse, Join, Point, Rect, RoundedRect, Shape as _,
    Size, Stroke, Vec2,
};
use peniko::Color;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Surface unavailable: {0}")]
    SurfaceUnavailable(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Opacity applied to highlighter strokes.
pub const HIGHLIGHTER_ALPHA: f32 = 0.4;

/// Padding around the fitted background image, in pixels.
pub const BACKGROUND_PADDING: f64 = 20.0;

/// Length of the arrowhead sides relative to the stroke width.
const ARROW_HEAD_FACTOR: f64 = 4.0;
const MIN_ARROW_HEAD: f64 = 10.0;

/// Whether a frame was drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Painted,
    /// No surface could be acquired; the frame was dropped.
    Skipped,
}

/// Everything one frame needs.
#[derive(Debug, Clone)]
pub struct RenderContext<'a> {
    /// The canvas to render.
    pub canvas: &'a Canvas,
    /// Interaction state for the in-progress overlays.
    pub interaction: Option<&'a EventHandler>,
    pub background_color: Color,
    pub background_image: Option<&'a BackgroundImage>,
    /// Selection highlight color.
    pub selection_color: Color,
}

impl<'a> RenderContext<'a> {
    pub fn new(canvas: &'a Canvas) -> Self {
        Self {
            canvas,
            interaction: None,
            background_color: Color::WHITE,
            background_image: None,
            selection_color: Color::from_rgba8(59, 130, 246, 255),
        }
    }

    /// Context for the current state of an engine.
    pub fn from_engine(engine: &'a Engine) -> Self {
        let config = engine.config();
        Self {
            interaction: Some(engine.interaction()),
            background_color: to_color(config.background_color),
            background_image: config.background_image.as_ref(),
            ..Self::new(engine.canvas())
        }
    }
}

pub fn to_color(color: SerializableColor) -> Color {
    Color::from_rgba8(color.r, color.g, color.b, color.a)
}

/// Stroke color after the brush treatment.
fn brush_color(style: &ShapeStyle) -> Color {
    let color = style.color;
    match style.brush {
        BrushType::Highlighter => {
            let alpha = (f32::from(color.a) * HIGHLIGHTER_ALPHA).round() as u8;
            Color::from_rgba8(color.r, color.g, color.b, alpha)
        }
        BrushType::Pen | BrushType::Marker | BrushType::Calligraphy => to_color(color),
    }
}

/// Erasers paint the board color. A transparent board erases to white.
fn eraser_color(background: Color) -> Color {
    if background.to_rgba8().a == 0 {
        Color::WHITE
    } else {
        background
    }
}

/// Draws a board onto a [`Surface`].
#[derive(Debug, Default)]
pub struct SceneRenderer {
    zoom: f64,
    frames: u64,
}

impl SceneRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames painted so far.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Acquire a surface from `target` and paint a full frame. A failed
    /// acquisition skips the frame.
    pub fn render(&mut self, target: &mut dyn RenderTarget, ctx: &RenderContext) -> RenderOutcome {
        match target.acquire() {
            Ok(surface) => {
                self.paint(surface, ctx);
                RenderOutcome::Painted
            }
            Err(err) => {
                log::warn!("skipping frame: {err}");
                RenderOutcome::Skipped
            }
        }
    }

    /// Paint a full frame onto `surface`.
    pub fn paint(&mut self, surface: &mut dyn Surface, ctx: &RenderContext) {
        let camera = &ctx.canvas.camera;
        self.zoom = camera.zoom;
        self.frames += 1;

        surface.clear();
        if ctx.background_color.to_rgba8().a == 255 {
            let size = surface.size();
            surface.fill_rect(
                Rect::from_origin_size(Point::ZERO, size),
                ctx.background_color,
            );
        }

        surface.save();
        surface.transform(camera.transform());

        if let Some(image) = ctx.background_image {
            surface.draw_image(&image.source, fit_background(image.size(), surface.size()));
        }

        let text_edit = ctx.interaction.and_then(EventHandler::text_edit);
        let editing = text_edit.and_then(|edit| edit.editing.as_deref());

        for shape in ctx.canvas.scene.iter() {
            // The element under the text editor is drawn as its draft.
            if editing == Some(shape.id()) {
                continue;
            }
            self.render_shape(surface, shape, ctx.background_color);
        }

        if let Some(preview) = ctx.canvas.tool_manager.preview_shape() {
            self.render_shape(surface, &preview, ctx.background_color);
        }

        let pointer = ctx.interaction.and_then(EventHandler::pointer_world);
        self.render_path_preview(surface, ctx, pointer);

        if let Some(edit) = text_edit {
            self.render_text_draft(surface, ctx, edit);
        }

        for shape in ctx.canvas.selected_shapes() {
            self.render_shape_handles(surface, shape, ctx);
        }

        if let Some(marquee) = ctx.interaction.and_then(EventHandler::selection_rect) {
            self.render_selection_rect(surface, marquee.to_rect(), ctx.selection_color);
        }

        surface.restore();
    }

    fn render_shape(&self, surface: &mut dyn Surface, shape: &Shape, background: Color) {
        let style = shape.style();
        let rotated = shape.rotation().is_some();
        if rotated {
            surface.save();
            surface.transform(shape.rotation_transform());
        }

        match shape {
            Shape::Freehand(s) | Shape::Path(s) => {
                self.render_stroke(surface, s, brush_color(style));
            }
            Shape::Eraser(s) => self.render_stroke(surface, s, eraser_color(background)),
            Shape::Rectangle(b) => {
                let rect = b.bounds();
                let path = match style.corner_radius {
                    Some(radius) if radius > 0.0 => RoundedRect::from_rect(rect, radius).to_path(0.1),
                    _ => rect.to_path(0.1),
                };
                self.render_path(surface, &path, style);
            }
            Shape::Ellipse(b) => {
                let path = Ellipse::from_rect(b.bounds()).to_path(0.1);
                self.render_path(surface, &path, style);
            }
            Shape::Triangle(b) => {
                self.render_path(surface, &polygon(&triangle_points(b)), style);
            }
            Shape::Star(b) => {
                self.render_path(surface, &polygon(&star_points(b)), style);
            }
            Shape::Line(line) | Shape::Arrow(line) => self.render_line(surface, line, style),
            Shape::Text(text) => render_text(surface, text),
        }

        if rotated {
            surface.restore();
        }
    }

    /// Render a shape path with the given style.
    fn render_path(&self, surface: &mut dyn Surface, path: &BezPath, style: &ShapeStyle) {
        surface.stroke_path(path, &stroke_for(style), to_color(style.color));
    }

    /// Every brush is a round-capped polyline. Only the color differs.
    fn render_stroke(&self, surface: &mut dyn Surface, stroke: &StrokeShape, color: Color) {
        let width = stroke.style.stroke_width;
        match stroke.points.as_slice() {
            [] => {}
            [only] => {
                let dot = Circle::new(*only, width / 2.0).to_path(0.1);
                surface.fill_path(&dot, color);
            }
            _ => {
                let pen = stroke_for(&stroke.style)
                    .with_caps(StrokeCap::Round)
                    .with_join(Join::Round);
                surface.stroke_path(&stroke.to_path(), &pen, color);
            }
        }
    }

    fn render_line(&self, surface: &mut dyn Surface, line: &Line, style: &ShapeStyle) {
        let color = to_color(style.color);
        let mut path = BezPath::new();
        path.move_to(line.start);
        path.line_to(line.end);
        surface.stroke_path(&path, &stroke_for(style), color);

        let Some(direction) = line.direction() else {
            return;
        };
        render_cap(surface, style.start_cap, line.start, -direction, style, color);
        render_cap(surface, style.end_cap, line.end, direction, style, color);
    }

    /// Points placed so far plus the live segment to the pointer.
    fn render_path_preview(&self, surface: &mut dyn Surface, ctx: &RenderContext, pointer: Option<Point>) {
        let points = ctx.canvas.tool_manager.path_points();
        let Some(last) = points.last() else {
            return;
        };
        let style = &ctx.canvas.tool_manager.current_style;
        let color = to_color(style.color);

        if points.len() > 1 {
            let preview = StrokeShape::from_points("preview", points.to_vec());
            surface.stroke_path(&preview.to_path(), &stroke_for(style), color);
        }

        if let Some(pointer) = pointer {
            let mut live = BezPath::new();
            live.move_to(*last);
            live.line_to(pointer);
            let dash = 4.0 / self.zoom;
            let stroke = Stroke::new(style.stroke_width).with_dashes(0.0, [dash, dash]);
            surface.stroke_path(&live, &stroke, color);
        }

        let radius = 3.0 / self.zoom;
        for point in points {
            surface.fill_path(&Circle::new(*point, radius).to_path(0.1), color);
        }
    }

    fn render_text_draft(&self, surface: &mut dyn Surface, ctx: &RenderContext, edit: &TextEdit) {
        let tools = &ctx.canvas.tool_manager;
        let mut draft = Text::new("draft", edit.position, edit.content.as_str())
            .with_font_size(tools.font_size);
        draft.style.color = tools.current_style.color;
        if let Some(original) = edit
            .editing
            .as_deref()
            .and_then(|id| ctx.canvas.scene.get(id))
            .and_then(Shape::as_text)
        {
            draft.font_size = original.font_size;
            draft.style = original.style.clone();
        }
        render_text(surface, &draft);

        // Editor frame, so an empty draft is still visible.
        let frame = draft.bounds().inflate(4.0 / self.zoom, 4.0 / self.zoom);
        let dash = 4.0 / self.zoom;
        let stroke = Stroke::new(1.0 / self.zoom).with_dashes(0.0, [dash, dash]);
        surface.stroke_path(&frame.to_path(0.1), &stroke, ctx.selection_color);
    }

    /// Dashed bounds (not for lines) and the resize handles of one shape.
    /// Sizes are divided by zoom to stay constant on screen.
    fn render_shape_handles(&self, surface: &mut dyn Surface, shape: &Shape, ctx: &RenderContext) {
        let stroke_width = 1.0 / self.zoom;
        let dash_len = 4.0 / self.zoom;

        if !shape.is_linear() {
            let stroke = Stroke::new(stroke_width).with_dashes(0.0, [dash_len, dash_len]);
            surface.stroke_path(&shape.bounds().to_path(0.1), &stroke, ctx.selection_color);
        }

        let radius = ctx.canvas.handle_radius / self.zoom;
        for handle in get_handles(shape) {
            let circle = Circle::new(handle.position, radius).to_path(0.1);
            surface.fill_path(&circle, Color::WHITE);
            surface.stroke_path(&circle, &Stroke::new(1.5 / self.zoom), ctx.selection_color);
        }
    }

    fn render_selection_rect(&self, surface: &mut dyn Surface, rect: Rect, selection_color: Color) {
        let path = rect.to_path(0.1);
        surface.fill_path(&path, selection_color.with_alpha(0.1));

        let stroke_width = 1.0 / self.zoom;
        let dash_len = 4.0 / self.zoom;
        let stroke = Stroke::new(stroke_width).with_dashes(0.0, [dash_len, dash_len]);
        surface.stroke_path(&path, &stroke, selection_color);
    }
}

/// World-space rectangle for the background image: the image scaled to fit
/// the surface minus padding, centered on the world origin.
pub fn fit_background(image: Size, surface: Size) -> Rect {
    let available = Size::new(
        (surface.width - 2.0 * BACKGROUND_PADDING).max(0.0),
        (surface.height - 2.0 * BACKGROUND_PADDING).max(0.0),
    );
    let scale = if image.width > 0.0 && image.height > 0.0 {
        (available.width / image.width).min(available.height / image.height)
    } else {
        0.0
    };
    Rect::from_center_size(Point::ZERO, image * scale)
}

fn stroke_for(style: &ShapeStyle) -> Stroke {
    let stroke = Stroke::new(style.stroke_width);
    let dashes = style.dash.segments(style.stroke_width);
    if dashes.is_empty() {
        stroke
    } else {
        stroke.with_dashes(0.0, dashes)
    }
}

fn render_text(surface: &mut dyn Surface, text: &Text) {
    let color = to_color(text.style.color);
    for (origin, line) in text.line_origins() {
        if !line.is_empty() {
            surface.fill_text(line, origin, text.font_size, color);
        }
    }
}

fn render_cap(
    surface: &mut dyn Surface,
    cap: Cap,
    tip: Point,
    direction: Vec2,
    style: &ShapeStyle,
    color: Color,
) {
    let size = (style.stroke_width * ARROW_HEAD_FACTOR).max(MIN_ARROW_HEAD);
    match cap {
        Cap::None => {}
        Cap::Arrow => {
            let back = tip - direction * size;
            let normal = Vec2::new(-direction.y, direction.x) * (size / 2.0);
            let mut head = BezPath::new();
            head.move_to(back + normal);
            head.line_to(tip);
            head.line_to(back - normal);
            let pen = Stroke::new(style.stroke_width)
                .with_caps(StrokeCap::Round)
                .with_join(Join::Round);
            surface.stroke_path(&head, &pen, color);
        }
        Cap::Circle => {
            let dot = Circle::new(tip, size / 3.0).to_path(0.1);
            surface.fill_path(&dot, color);
        }
    }
}

fn polygon(points: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    let mut iter = points.iter();
    if let Some(first) = iter.next() {
        path.move_to(*first);
        for point in iter {
            path.line_to(*point);
        }
        path.close_path();
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_background_keeps_aspect() {
        let rect = fit_background(Size::new(400.0, 200.0), Size::new(240.0, 240.0));
        assert_eq!(rect.size(), Size::new(200.0, 100.0));
        assert_eq!(rect.center(), Point::ZERO);
    }

    #[test]
    fn test_fit_background_degenerate_image() {
        let rect = fit_background(Size::ZERO, Size::new(100.0, 100.0));
        assert_eq!(rect.area(), 0.0);
    }

    #[test]
    fn test_dashed_style() {
        let style = ShapeStyle {
            dash: boardkit_core::shapes::DashPattern::Dashed,
            ..ShapeStyle::default()
        };
        assert!(!stroke_for(&style).dash_pattern.is_empty());
        assert!(stroke_for(&ShapeStyle::default()).dash_pattern.is_empty());
    }

    #[test]
    fn test_polygon_closes() {
        let path = polygon(&[Point::ZERO, Point::new(1.0, 0.0), Point::new(0.0, 1.0)]);
        assert_eq!(path.elements().len(), 4);
        assert!(polygon(&[]).elements().is_empty());
    }
}
