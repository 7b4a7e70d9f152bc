//! The per-frame animation contract.
//!
//! Conceptually this runs once per instance per frame, in parallel: a pure,
//! branch-light function of `(instance, current_time, params)`. The CPU
//! backend evaluates it directly; the GPU backend executes the same logic in
//! `notes.wgsl`. Reordering instances must not change the rendered image, so
//! the contract carries no shared state and backends composite commutatively.

use crate::compile::instances::{NoteInstance, RenderParams};
use crate::geom::coords::{
    NDC_CULL_MARGIN, alpha_fade, fall_position_pixels, pixel_to_norm_y,
};

/// Screen-space output of the contract for one visible instance: the
/// animated rectangle, its color and its fade alpha, ready for compositing
/// with the rounded-corner mask.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoteQuad {
    /// (x, y_bottom, width, height) in NDC, Y animated for this frame.
    pub rect: [f32; 4],
    /// Linear RGB in [0, 1].
    pub color: [f32; 3],
    /// Fade alpha in [ALPHA_FLOOR, 1].
    pub alpha: f32,
    /// Rectangle size in pixels, for corner rounding.
    pub size_pixels: [f32; 2],
}

/// Evaluate one instance at one time value.
///
/// Returns `None` when the instance contributes nothing visible this frame:
/// outside the `[-lookahead, passthrough]` time window, or outside the
/// extended NDC margin after animation. Only the rectangle's Y animates; X,
/// width and height are fixed at compile time.
pub fn animate_instance(
    instance: &NoteInstance,
    current_time: f32,
    params: &RenderParams,
) -> Option<NoteQuad> {
    let delta = current_time - instance.timing[0];
    if delta < -params.lookahead_seconds || delta > params.passthrough_seconds {
        return None;
    }

    let y_pixels = fall_position_pixels(
        current_time,
        instance.timing[0],
        params.strike_line_y_pixels,
        params.pixels_per_second,
    );
    let y_norm = pixel_to_norm_y(y_pixels, params.height as f32);
    if !(-NDC_CULL_MARGIN..=NDC_CULL_MARGIN).contains(&y_norm) {
        return None;
    }

    let alpha = alpha_fade(y_pixels, params.strike_line_y_pixels, params.height as f32);

    let mut rect = instance.base_rect;
    rect[1] = y_norm;
    Some(NoteQuad {
        rect,
        color: instance.color,
        alpha,
        size_pixels: instance.size_pixels,
    })
}

/// Linear, index-free sweep over all instances for one frame.
///
/// This is the reference evaluation of the contract; backends may evaluate
/// it in any order or in parallel and must produce the same image.
pub fn visible_quads(
    instances: &[NoteInstance],
    current_time: f32,
    params: &RenderParams,
) -> Vec<NoteQuad> {
    instances
        .iter()
        .filter_map(|i| animate_instance(i, current_time, params))
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/animate/contract.rs"]
mod tests;
