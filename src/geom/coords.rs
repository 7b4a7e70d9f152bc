//! Pure coordinate and timing math shared by every backend.
//!
//! Pixel coordinates are top-left origin (y grows downward); normalized
//! device coordinates span [-1, 1] with +1 at the top of the screen. The
//! internal render surface is bottom-left origin; the flip happens only at
//! frame readback, never here.

/// Alpha never drops below this floor, so notes fade but never vanish.
pub const ALPHA_FLOOR: f32 = 0.2;

/// Extended NDC margin tolerating partially-offscreen rectangles before a
/// note is culled.
pub const NDC_CULL_MARGIN: f32 = 1.2;

/// Pixel row -> normalized Y: `1 - 2 * (p / h)`. Row 0 maps to +1.0 (top),
/// row `h` to -1.0 (bottom).
pub fn pixel_to_norm_y(p: f32, h: f32) -> f32 {
    1.0 - 2.0 * (p / h)
}

/// Exact inverse of [`pixel_to_norm_y`]: `((1 - n) / 2) * h`.
pub fn norm_to_pixel_y(n: f32, h: f32) -> f32 {
    ((1.0 - n) / 2.0) * h
}

/// Pixel column -> normalized X: `2 * (p / w) - 1`. Column 0 maps to -1.0.
pub fn pixel_to_norm_x(p: f32, w: f32) -> f32 {
    2.0 * (p / w) - 1.0
}

/// Exact inverse of [`pixel_to_norm_x`].
pub fn norm_to_pixel_x(n: f32, w: f32) -> f32 {
    ((n + 1.0) / 2.0) * w
}

/// Pixel span -> normalized width (NDC spans 2.0 units).
pub fn pixels_to_norm_w(w_pixels: f32, w: f32) -> f32 {
    (w_pixels / w) * 2.0
}

/// Pixel span -> normalized height.
pub fn pixels_to_norm_h(h_pixels: f32, h: f32) -> f32 {
    (h_pixels / h) * 2.0
}

/// Seconds a note is visible before its strike moment: the time it takes to
/// fall from the top edge to the strike line.
pub fn lookahead_seconds(strike_pixels: f32, pixels_per_second: f32) -> f32 {
    strike_pixels / pixels_per_second
}

/// Seconds a note remains visible after its strike moment: the time to
/// travel from the strike line past the bottom edge, including its own
/// height.
pub fn passthrough_seconds(
    height: f32,
    strike_pixels: f32,
    note_height_pixels: f32,
    pixels_per_second: f32,
) -> f32 {
    ((height - strike_pixels) + note_height_pixels) / pixels_per_second
}

/// Fall position: where the note's bottom edge sits at `current_time`, in
/// top-origin pixels.
///
/// At `current_time == start_time` the note is exactly at the strike line; a
/// note in the future sits above it (smaller y), a note in the past has
/// crossed below it (larger y).
pub fn fall_position_pixels(
    current_time: f32,
    start_time: f32,
    strike_pixels: f32,
    pixels_per_second: f32,
) -> f32 {
    strike_pixels + (current_time - start_time) * pixels_per_second
}

/// Alpha fade: full opacity at or above the strike line, then a linear ramp
/// down to [`ALPHA_FLOOR`] as the note travels from the strike line to the
/// bottom edge, clamped at the floor beyond it.
pub fn alpha_fade(y_pixels: f32, strike_pixels: f32, height: f32) -> f32 {
    if y_pixels <= strike_pixels {
        return 1.0;
    }
    let max_distance = height - strike_pixels;
    if max_distance <= 0.0 {
        return ALPHA_FLOOR;
    }
    let fade_progress = ((y_pixels - strike_pixels) / max_distance).min(1.0);
    1.0 - (1.0 - ALPHA_FLOOR) * fade_progress
}

/// Hermite smooth step between two edges, clamped to [0, 1].
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge0 >= edge1 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Rounded-corner coverage for one pixel.
///
/// `offset` is the pixel's absolute offset from the rectangle center and
/// `half_size` the rectangle's half extent, both in pixels. Pixels within
/// `half_size - radius` on either axis are fully covered; pixels in the
/// corner region are covered by a smooth step of distance from the corner's
/// circular boundary, giving a one-pixel anti-aliased edge. Evaluable
/// independently per pixel.
pub fn corner_coverage(offset: [f32; 2], half_size: [f32; 2], radius: f32) -> f32 {
    if offset[0] > half_size[0] || offset[1] > half_size[1] {
        return 0.0;
    }
    if radius <= 0.0 {
        return 1.0;
    }
    let corner_start = [
        (half_size[0] - radius).max(0.0),
        (half_size[1] - radius).max(0.0),
    ];
    if offset[0] <= corner_start[0] || offset[1] <= corner_start[1] {
        return 1.0;
    }
    let dx = offset[0] - corner_start[0];
    let dy = offset[1] - corner_start[1];
    let dist = (dx * dx + dy * dy).sqrt();
    1.0 - smoothstep(radius - 1.0, radius, dist)
}

/// Velocity -> brightness multiplier: `0.3 + 0.7 * (v / 127)`, so quiet
/// hits stay visible while loud hits render at full intensity.
pub fn velocity_brightness(velocity: u8) -> f32 {
    0.3 + 0.7 * (f32::from(velocity.min(127)) / 127.0)
}

#[cfg(test)]
#[path = "../../tests/unit/geom/coords.rs"]
mod tests;
