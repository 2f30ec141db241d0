//! BoardKit Render Library
//!
//! Paints a board through the [`Surface`] trait, so any 2D backend can host
//! it. [`RecordingSurface`] records draw calls for tests and headless use.

mod renderer;
mod surface;

pub use renderer::{
    BACKGROUND_PADDING, HIGHLIGHTER_ALPHA, RenderContext, RenderOutcome, RenderResult,
    RendererError, SceneRenderer, fit_background, to_color,
};
pub use surface::{DrawCommand, RecordingSurface, RenderTarget, Surface};
