//! One-shot compilation of the note list into GPU-ready instance records.
//!
//! Everything that does not depend on playback time is computed here exactly
//! once: lane layout, normalized geometry, color normalization and velocity
//! brightness. The output array is positional (instance `i` corresponds to
//! note `i`) and is never mutated after upload.

use crate::foundation::core::Canvas;
use crate::foundation::error::{NotefallError, NotefallResult};
use crate::geom::coords::{
    lookahead_seconds, passthrough_seconds, pixel_to_norm_x, pixel_to_norm_y, pixels_to_norm_h,
    pixels_to_norm_w, velocity_brightness,
};
use crate::notes::model::{Note, used_lanes};

/// Fixed height of a regular lane note, in pixels.
const NOTE_HEIGHT_PIXELS: f32 = 60.0;

/// Fixed height of the full-width bar variant, in pixels.
const BAR_HEIGHT_PIXELS: f32 = 30.0;

/// Process-wide immutable render configuration, computed once from the
/// surface size and fall speed and validated before any surface work begins.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderParams {
    /// Surface width in pixels.
    pub width: u32,
    /// Surface height in pixels.
    pub height: u32,
    /// Fall speed in pixels per second, > 0.
    pub pixels_per_second: f32,
    /// Strike line position, top-origin pixels.
    pub strike_line_y_pixels: f32,
    /// Strike line position in normalized device coordinates.
    pub strike_line_y_norm: f32,
    /// Regular note height in pixels.
    pub note_height_pixels: f32,
    /// Full-width bar height in pixels.
    pub bar_height_pixels: f32,
    /// Seconds a note may be visible before its strike moment.
    pub lookahead_seconds: f32,
    /// Seconds a note stays visible after its strike moment.
    pub passthrough_seconds: f32,
    /// Rounded corner radius in pixels, >= 0.
    pub corner_radius: f32,
}

impl RenderParams {
    /// Derive parameters the way the drum renderer always has: fall speed is
    /// 40% of the screen height per second (times the multiplier) and the
    /// strike line sits at 85% of the height.
    pub fn new(
        canvas: Canvas,
        fall_speed_multiplier: f32,
        corner_radius: f32,
    ) -> NotefallResult<Self> {
        let height = canvas.height as f32;
        Self::from_raw(
            canvas,
            height * 0.4 * fall_speed_multiplier,
            height * 0.85,
            NOTE_HEIGHT_PIXELS,
            BAR_HEIGHT_PIXELS,
            corner_radius,
        )
    }

    /// Fully explicit constructor; every configuration error is caught here,
    /// before any resource is allocated.
    pub fn from_raw(
        canvas: Canvas,
        pixels_per_second: f32,
        strike_line_y_pixels: f32,
        note_height_pixels: f32,
        bar_height_pixels: f32,
        corner_radius: f32,
    ) -> NotefallResult<Self> {
        let height = canvas.height as f32;
        if !pixels_per_second.is_finite() || pixels_per_second <= 0.0 {
            return Err(NotefallError::configuration(format!(
                "pixels_per_second must be > 0, got {pixels_per_second}"
            )));
        }
        if !(0.0..=height).contains(&strike_line_y_pixels) {
            return Err(NotefallError::configuration(format!(
                "strike line {strike_line_y_pixels}px outside surface height {height}px"
            )));
        }
        if note_height_pixels <= 0.0 || bar_height_pixels <= 0.0 {
            return Err(NotefallError::configuration(
                "note/bar heights must be > 0",
            ));
        }
        if corner_radius < 0.0 {
            return Err(NotefallError::configuration("corner radius must be >= 0"));
        }

        let lookahead = lookahead_seconds(strike_line_y_pixels, pixels_per_second);
        let passthrough = passthrough_seconds(
            height,
            strike_line_y_pixels,
            note_height_pixels,
            pixels_per_second,
        );
        if lookahead <= 0.0 {
            return Err(NotefallError::configuration(format!(
                "non-positive lookahead window {lookahead}s"
            )));
        }
        if passthrough <= 0.0 {
            return Err(NotefallError::configuration(format!(
                "non-positive passthrough window {passthrough}s"
            )));
        }

        Ok(Self {
            width: canvas.width,
            height: canvas.height,
            pixels_per_second,
            strike_line_y_pixels,
            strike_line_y_norm: pixel_to_norm_y(strike_line_y_pixels, height),
            note_height_pixels,
            bar_height_pixels,
            lookahead_seconds: lookahead,
            passthrough_seconds: passthrough,
            corner_radius,
        })
    }

    /// The surface this configuration renders to.
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }
}

/// GPU-resident per-note record, uploaded once and reused for every frame.
///
/// Layout mirrors the instanced vertex attributes:
/// `base_rect` = (x, y_at_strike, width, height) in normalized device
/// coordinates with y the rectangle's bottom edge at the moment it reaches
/// the strike line; `timing` = (start_time, reserved).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoteInstance {
    /// (x, y_at_strike, width, height) in NDC.
    pub base_rect: [f32; 4],
    /// Linear RGB in [0, 1], velocity brightness pre-applied.
    pub color: [f32; 3],
    /// (start_time seconds, reserved).
    pub timing: [f32; 2],
    /// Same rectangle in pixel units, for resolution-independent corner
    /// rounding.
    pub size_pixels: [f32; 2],
}

/// An unanimated overlay rectangle (strike line, lane markers), compiled
/// once and drawn identically on every frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StaticQuad {
    /// (x, y_bottom, width, height) in NDC.
    pub rect: [f32; 4],
    /// Linear RGB in [0, 1].
    pub color: [f32; 3],
    /// Rectangle size in pixels.
    pub size_pixels: [f32; 2],
}

/// Compile the full note list into instance records.
///
/// Returns the ordered instance array plus the number of distinct regular
/// lanes (minimum 1). Order preserving, no sorting, no deduplication; empty
/// input yields an empty, well-typed array.
pub fn compile_instances(
    notes: &[Note],
    params: &RenderParams,
) -> NotefallResult<(Vec<NoteInstance>, u32)> {
    let width = params.width as f32;
    let height = params.height as f32;

    let num_lanes = used_lanes(notes).len().max(1) as u32;
    let lane_width_pixels = width / num_lanes as f32;

    let mut instances = Vec::with_capacity(notes.len());
    for note in notes {
        note.validate()?;

        let (x_norm, w_norm, w_pixels, h_pixels) = if note.lane == -1 {
            (-1.0, 2.0, width, params.bar_height_pixels)
        } else {
            let x_pixels = note.lane as f32 * lane_width_pixels;
            (
                pixel_to_norm_x(x_pixels, width),
                pixels_to_norm_w(lane_width_pixels, width),
                lane_width_pixels,
                params.note_height_pixels,
            )
        };
        let h_norm = pixels_to_norm_h(h_pixels, height);

        let brightness = velocity_brightness(note.velocity);
        let color = [
            f32::from(note.color[0]) / 255.0 * brightness,
            f32::from(note.color[1]) / 255.0 * brightness,
            f32::from(note.color[2]) / 255.0 * brightness,
        ];

        instances.push(NoteInstance {
            base_rect: [x_norm, params.strike_line_y_norm, w_norm, h_norm],
            color,
            timing: [note.time as f32, 0.0],
            size_pixels: [w_pixels, h_pixels],
        });
    }

    Ok((instances, num_lanes))
}

/// Compile the static overlay: one white strike line bar plus a dim vertical
/// marker at every lane boundary. These never animate.
pub fn compile_static_elements(num_lanes: u32, params: &RenderParams) -> Vec<StaticQuad> {
    let width = params.width as f32;
    let height = params.height as f32;
    let mut quads = Vec::with_capacity(num_lanes as usize + 2);

    let marker_w = 2.0_f32;
    for i in 0..=num_lanes {
        let x_pixels = (i as f32 * width / num_lanes as f32) - marker_w / 2.0;
        quads.push(StaticQuad {
            rect: [
                pixel_to_norm_x(x_pixels, width),
                -1.0,
                pixels_to_norm_w(marker_w, width),
                2.0,
            ],
            color: [0.3, 0.3, 0.3],
            size_pixels: [marker_w, height],
        });
    }

    let line_h = 4.0_f32;
    quads.push(StaticQuad {
        rect: [
            -1.0,
            pixel_to_norm_y(params.strike_line_y_pixels + line_h / 2.0, height),
            2.0,
            pixels_to_norm_h(line_h, height),
        ],
        color: [1.0, 1.0, 1.0],
        size_pixels: [width, line_h],
    });

    quads
}

#[cfg(test)]
#[path = "../../tests/unit/compile/instances.rs"]
mod tests;
