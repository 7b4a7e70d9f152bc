//! Notefall renders a falling-notes ("Rock-Band style") drum visualization
//! video from a sequence of timed note events, muxed with an optional audio
//! track.
//!
//! # Pipeline overview
//!
//! 1. **Compile**: `Vec<Note> -> Vec<NoteInstance>` (one-shot, order
//!    preserving; all geometry and colors precomputed)
//! 2. **Upload**: the instance array lives in the render context for the
//!    whole video; it is uploaded exactly once and never mutated
//! 3. **Animate**: every frame is a pure function of a single time scalar:
//!    `animate_instance(instance, t, params)` yields position, visibility
//!    and alpha with no iteration-order dependency
//! 4. **Encode**: frames stream to the system `ffmpeg` binary in lock-step;
//!    the encoder's stdin is the backpressure boundary
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Deterministic**: rendering a frame depends only on the compiled
//!   instances and the frame's time value; permuting the input notes
//!   produces a pixel-identical image.
//! - **One upload**: per-frame data transfer never scales with the note
//!   count; the only per-frame mutable state is the time scalar.
#![forbid(unsafe_code)]

mod animate;
mod compile;
mod encode;
mod foundation;
mod geom;
mod notes;
mod render;

pub use animate::contract::{NoteQuad, animate_instance, visible_quads};
pub use compile::instances::{
    NoteInstance, RenderParams, StaticQuad, compile_instances, compile_static_elements,
};
pub use encode::ffmpeg::{
    AudioInput, EncodeConfig, FfmpegEncoder, default_mp4_config, ensure_parent_dir,
    is_ffmpeg_on_path,
};
pub use foundation::core::{Canvas, Fps, FrameIndex, FrameRgb};
pub use foundation::error::{NotefallError, NotefallResult};
pub use geom::coords::{
    ALPHA_FLOOR, NDC_CULL_MARGIN, alpha_fade, corner_coverage, fall_position_pixels,
    lookahead_seconds, norm_to_pixel_x, norm_to_pixel_y, passthrough_seconds, pixel_to_norm_x,
    pixel_to_norm_y, pixels_to_norm_h, pixels_to_norm_w, smoothstep, velocity_brightness,
};
pub use notes::model::{Note, derive_duration, notes_from_json, remap_lanes, used_lanes};
pub use render::cpu::CpuContext;
#[cfg(feature = "gpu")]
pub use render::gpu::GpuContext;
pub use render::pipeline::{RenderOpts, RenderStats, build_scene, render_frames, render_to_mp4};
pub use render::{BackendKind, RenderContext, Scene, create_context};
