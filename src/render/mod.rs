//! Render contexts: owned, per-render GPU/CPU state with a one-time
//! instance upload and a single mutable time parameter.

pub mod cpu;
#[cfg(feature = "gpu")]
pub mod gpu;
pub mod pipeline;

use crate::compile::instances::{NoteInstance, RenderParams, StaticQuad};
use crate::foundation::core::{Canvas, FrameRgb};
use crate::foundation::error::NotefallResult;

/// Everything a render context needs to draw the whole video: the immutable
/// parameters, the compiled note instances and the static overlay. Uploaded
/// once at construction, never again.
#[derive(Clone, Debug)]
pub struct Scene {
    /// Immutable render configuration.
    pub params: RenderParams,
    /// Compiled, positional note instances.
    pub instances: Vec<NoteInstance>,
    /// Unanimated overlay quads (strike line, lane markers).
    pub statics: Vec<StaticQuad>,
}

/// A render context owns the persistent instance buffer and the per-frame
/// time parameter. Lifetime is scoped to one video render; teardown is
/// deterministic via `Drop` on every exit path.
pub trait RenderContext {
    /// The fixed surface size this context renders at.
    fn canvas(&self) -> Canvas;

    /// Clear the surface, set the time scalar and evaluate the animation
    /// contract across all instances. Blocks until the frame is
    /// materialized. Never re-uploads instance data.
    fn render_frame(&mut self, time: f64) -> NotefallResult<()>;

    /// Extract the last rendered frame as a contiguous, top-left-origin RGB
    /// buffer. The internal surface is bottom-left-origin; this call
    /// performs the vertical flip.
    fn read_frame(&mut self) -> NotefallResult<FrameRgb>;
}

/// Which render context implementation to construct.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    /// Row-parallel CPU rasterizer (always available).
    Cpu,
    /// wgpu headless device (requires the `gpu` cargo feature).
    Gpu,
}

/// Construct a render context for the scene. Fails with a resource-init
/// error before any frame is produced if the surface or program cannot be
/// prepared.
pub fn create_context(kind: BackendKind, scene: Scene) -> NotefallResult<Box<dyn RenderContext>> {
    match kind {
        BackendKind::Cpu => Ok(Box::new(cpu::CpuContext::new(scene)?)),
        #[cfg(feature = "gpu")]
        BackendKind::Gpu => Ok(Box::new(gpu::GpuContext::new(scene)?)),
        #[cfg(not(feature = "gpu"))]
        BackendKind::Gpu => Err(crate::foundation::error::NotefallError::resource_init(
            "gpu backend requested but the `gpu` feature is not enabled",
        )),
    }
}
