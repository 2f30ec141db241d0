//! Drawing surface abstraction.
//!
//! Any 2D backend (canvas element, tiny-skia pixmap, GPU scene builder)
//! can draw a board by implementing [`Surface`]. Coordinates passed to the
//! drawing calls are in the space set up by the current transform.

use crate::renderer::{RenderResult, RendererError};
use kurbo::{Affine, BezPath, Point, Rect, Size, Stroke};
use peniko::Color;

/// A 2D drawing surface.
pub trait Surface {
    /// Surface size in pixels.
    fn size(&self) -> Size;

    /// Clear every pixel to transparent and reset the transform.
    fn clear(&mut self);

    fn fill_rect(&mut self, rect: Rect, color: Color);

    fn stroke_path(&mut self, path: &BezPath, stroke: &Stroke, color: Color);

    fn fill_path(&mut self, path: &BezPath, color: Color);

    /// Draw one line of text with its baseline starting at `origin`.
    fn fill_text(&mut self, text: &str, origin: Point, font_size: f64, color: Color);

    /// Draw the image identified by `source` stretched into `dest`.
    fn draw_image(&mut self, source: &str, dest: Rect);

    /// Push the current transform.
    fn save(&mut self);

    /// Pop the transform pushed by the matching [`Surface::save`].
    fn restore(&mut self);

    /// Concatenate `affine` onto the current transform.
    fn transform(&mut self, affine: Affine);
}

/// Something a surface can be borrowed from for one frame.
pub trait RenderTarget {
    fn acquire(&mut self) -> RenderResult<&mut dyn Surface>;
}

/// A recorded drawing call. Colors are stored as RGBA8.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear,
    FillRect {
        rect: Rect,
        color: [u8; 4],
    },
    StrokePath {
        path: BezPath,
        width: f64,
        dashes: Vec<f64>,
        color: [u8; 4],
    },
    FillPath {
        path: BezPath,
        color: [u8; 4],
    },
    FillText {
        text: String,
        origin: Point,
        font_size: f64,
        color: [u8; 4],
    },
    DrawImage {
        source: String,
        dest: Rect,
    },
    Save,
    Restore,
    Transform(Affine),
}

impl DrawCommand {
    pub fn name(&self) -> &'static str {
        match self {
            DrawCommand::Clear => "clear",
            DrawCommand::FillRect { .. } => "fill-rect",
            DrawCommand::StrokePath { .. } => "stroke-path",
            DrawCommand::FillPath { .. } => "fill-path",
            DrawCommand::FillText { .. } => "fill-text",
            DrawCommand::DrawImage { .. } => "draw-image",
            DrawCommand::Save => "save",
            DrawCommand::Restore => "restore",
            DrawCommand::Transform(_) => "transform",
        }
    }

    /// The color this command paints with, if any.
    pub fn color(&self) -> Option<[u8; 4]> {
        match self {
            DrawCommand::FillRect { color, .. }
            | DrawCommand::StrokePath { color, .. }
            | DrawCommand::FillPath { color, .. }
            | DrawCommand::FillText { color, .. } => Some(*color),
            _ => None,
        }
    }
}

pub(crate) fn rgba8(color: Color) -> [u8; 4] {
    let rgba = color.to_rgba8();
    [rgba.r, rgba.g, rgba.b, rgba.a]
}

/// Surface that records every call instead of drawing. Used by tests and
/// headless hosts.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    size: Size,
    commands: Vec<DrawCommand>,
    depth: usize,
    available: bool,
}

impl RecordingSurface {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            commands: Vec::new(),
            depth: 0,
            available: true,
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Current save depth. Zero after a balanced frame.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Make [`RenderTarget::acquire`] fail, as a lost surface would.
    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    pub fn resize(&mut self, size: Size) {
        self.size = size;
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> Size {
        self.size
    }

    fn clear(&mut self) {
        self.commands.clear();
        self.depth = 0;
        self.commands.push(DrawCommand::Clear);
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::FillRect {
            rect,
            color: rgba8(color),
        });
    }

    fn stroke_path(&mut self, path: &BezPath, stroke: &Stroke, color: Color) {
        self.commands.push(DrawCommand::StrokePath {
            path: path.clone(),
            width: stroke.width,
            dashes: stroke.dash_pattern.to_vec(),
            color: rgba8(color),
        });
    }

    fn fill_path(&mut self, path: &BezPath, color: Color) {
        self.commands.push(DrawCommand::FillPath {
            path: path.clone(),
            color: rgba8(color),
        });
    }

    fn fill_text(&mut self, text: &str, origin: Point, font_size: f64, color: Color) {
        self.commands.push(DrawCommand::FillText {
            text: text.to_string(),
            origin,
            font_size,
            color: rgba8(color),
        });
    }

    fn draw_image(&mut self, source: &str, dest: Rect) {
        self.commands.push(DrawCommand::DrawImage {
            source: source.to_string(),
            dest,
        });
    }

    fn save(&mut self) {
        self.depth += 1;
        self.commands.push(DrawCommand::Save);
    }

    fn restore(&mut self) {
        if self.depth == 0 {
            log::warn!("restore without matching save");
            return;
        }
        self.depth -= 1;
        self.commands.push(DrawCommand::Restore);
    }

    fn transform(&mut self, affine: Affine) {
        self.commands.push(DrawCommand::Transform(affine));
    }
}

impl RenderTarget for RecordingSurface {
    fn acquire(&mut self) -> RenderResult<&mut dyn Surface> {
        if !self.available {
            return Err(RendererError::SurfaceUnavailable(
                "recording surface disabled".into(),
            ));
        }
        Ok(self)
    }
}
