//! The outer render loop: one logical thread generating, reading back and
//! streaming frames in lock-step.

use std::path::Path;
use std::time::{Duration, Instant};

use tracing::info;

use crate::compile::instances::{RenderParams, compile_instances, compile_static_elements};
use crate::encode::ffmpeg::{AudioInput, FfmpegEncoder, default_mp4_config};
use crate::foundation::core::{Canvas, FrameIndex, FrameRgb, Fps};
use crate::foundation::error::{NotefallError, NotefallResult};
use crate::notes::model::{Note, derive_duration, remap_lanes};
use crate::render::{BackendKind, Scene, create_context};

/// Bounded wait for ffmpeg to finalize the container after the last frame.
const FINISH_TIMEOUT: Duration = Duration::from_secs(60);

/// Options for one video render.
#[derive(Clone, Debug)]
pub struct RenderOpts {
    /// Output surface size.
    pub canvas: Canvas,
    /// Fixed frame rate for the whole stream.
    pub fps: Fps,
    /// Fall speed multiplier (1.0 = 40% of screen height per second).
    pub fall_speed_multiplier: f32,
    /// Note corner radius in pixels.
    pub corner_radius: f32,
    /// Tail after the last note so it can fall off screen.
    pub tail_seconds: f64,
    /// Explicit duration; when `None` it is derived as
    /// `max(note.time) + tail_seconds`.
    pub duration_override: Option<f64>,
    /// Draw the static overlay (strike line, lane markers).
    pub draw_overlay: bool,
    /// Which render context implementation to use.
    pub backend: BackendKind,
}

impl RenderOpts {
    /// Defaults matching the original renderer.
    pub fn new(canvas: Canvas, fps: Fps) -> Self {
        Self {
            canvas,
            fps,
            fall_speed_multiplier: 1.0,
            corner_radius: 8.0,
            tail_seconds: 3.0,
            duration_override: None,
            draw_overlay: true,
            backend: BackendKind::Cpu,
        }
    }
}

/// Summary of a completed render.
#[derive(Clone, Copy, Debug)]
pub struct RenderStats {
    /// Frames generated and handed to the sink, in order.
    pub frames: u64,
    /// Wall-clock time for the whole loop.
    pub elapsed: Duration,
}

/// Compile notes and parameters into a scene plus the total duration.
///
/// Shared by the streaming loop and the single-frame CLI path so the two
/// cannot drift apart.
pub fn build_scene(notes: &[Note], opts: &RenderOpts) -> NotefallResult<(Scene, f64)> {
    let params = RenderParams::new(opts.canvas, opts.fall_speed_multiplier, opts.corner_radius)?;

    // Compact sparse lane ids so empty columns do not waste screen width.
    let notes = remap_lanes(notes);
    let (instances, num_lanes) = compile_instances(&notes, &params)?;
    let statics = if opts.draw_overlay {
        compile_static_elements(num_lanes, &params)
    } else {
        Vec::new()
    };

    let duration = opts
        .duration_override
        .unwrap_or_else(|| derive_duration(&notes, opts.tail_seconds));
    if !(duration.is_finite() && duration > 0.0) {
        return Err(NotefallError::configuration(format!(
            "render duration must be > 0, got {duration}"
        )));
    }

    Ok((
        Scene {
            params,
            instances,
            statics,
        },
        duration,
    ))
}

/// Render every frame and hand each one to `sink` in generation order.
///
/// This is the loop the whole design optimizes: instances upload once at
/// context construction, each iteration only moves one time scalar to the
/// context and one frame buffer out of it. The sink is called strictly in
/// frame order; if it blocks (an encoder pipe at capacity), the loop blocks
/// with it. There is no in-memory frame queue.
pub fn render_frames(
    notes: &[Note],
    opts: &RenderOpts,
    mut sink: impl FnMut(FrameIndex, &FrameRgb) -> NotefallResult<()>,
) -> NotefallResult<RenderStats> {
    let (scene, duration) = build_scene(notes, opts)?;
    let total_frames = opts.fps.frames_for_duration(duration);
    info!(
        notes = scene.instances.len(),
        total_frames, duration, "rendering"
    );

    let mut ctx = create_context(opts.backend, scene)?;

    let started = Instant::now();
    let mut last_progress = started;
    for n in 0..total_frames {
        let frame_idx = FrameIndex(n);
        let t = opts.fps.frame_to_secs(frame_idx);
        ctx.render_frame(t)?;
        let frame = ctx.read_frame()?;
        sink(frame_idx, &frame)?;

        let now = Instant::now();
        if now.duration_since(last_progress) >= Duration::from_secs(1) {
            let elapsed = now.duration_since(started).as_secs_f64();
            let achieved = (n + 1) as f64 / elapsed;
            info!(
                frame = n,
                total_frames,
                fps = format!("{achieved:.1}"),
                "progress"
            );
            last_progress = now;
        }
    }

    Ok(RenderStats {
        frames: total_frames,
        elapsed: started.elapsed(),
    })
}

/// Render the full video to an mp4 file, optionally muxing an audio asset.
///
/// On any failure the encoder process is terminated and the render context
/// released; no partial output file is left at the destination path.
pub fn render_to_mp4(
    notes: &[Note],
    out_path: &Path,
    audio: Option<AudioInput>,
    opts: &RenderOpts,
) -> NotefallResult<RenderStats> {
    if opts.fps.den != 1 {
        return Err(NotefallError::configuration(
            "mp4 encoding requires an integer frame rate",
        ));
    }

    let mut cfg = default_mp4_config(
        out_path,
        opts.canvas.width,
        opts.canvas.height,
        opts.fps.num,
    );
    cfg.audio = audio;

    let mut encoder = FfmpegEncoder::spawn(cfg)?;
    let stats = render_frames(notes, opts, |_, frame| encoder.write_frame(frame))?;
    // An error above drops `encoder`, which kills the child process and
    // removes the temporary output.
    encoder.finish(FINISH_TIMEOUT)?;

    info!(
        frames = stats.frames,
        elapsed = format!("{:.2}s", stats.elapsed.as_secs_f64()),
        out = %out_path.display(),
        "render complete"
    );
    Ok(stats)
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
