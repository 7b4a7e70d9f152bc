use crate::foundation::error::{NotefallError, NotefallResult};

/// Zero-based frame number within a render.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Frame rate as an exact rational (e.g. 30000/1001 for NTSC).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator, must be > 0.
    pub num: u32,
    /// Denominator, must be > 0.
    pub den: u32,
}

impl Fps {
    /// Validating constructor.
    pub fn new(num: u32, den: u32) -> NotefallResult<Self> {
        if den == 0 {
            return Err(NotefallError::configuration("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(NotefallError::configuration("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Integer frame rates (the common case for this renderer).
    pub fn whole(num: u32) -> NotefallResult<Self> {
        Self::new(num, 1)
    }

    /// Frames per second as a float.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Playback time of a given frame index, in seconds.
    pub fn frame_to_secs(self, frame: FrameIndex) -> f64 {
        (frame.0 as f64) * f64::from(self.den) / f64::from(self.num)
    }

    /// Total frame count for a duration, truncating like the original
    /// `int(duration * fps)`.
    pub fn frames_for_duration(self, duration_secs: f64) -> u64 {
        (duration_secs * self.as_f64()).max(0.0) as u64
    }
}

/// Output surface size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Validating constructor; zero-sized surfaces are a configuration error.
    pub fn new(width: u32, height: u32) -> NotefallResult<Self> {
        if width == 0 || height == 0 {
            return Err(NotefallError::configuration(
                "canvas width/height must be non-zero",
            ));
        }
        Ok(Self { width, height })
    }

    /// Bytes in one interleaved RGB frame of this size.
    pub fn rgb_len(self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// One rendered frame: row-major interleaved RGB, top-left origin,
/// `width * height * 3` bytes, always contiguous.
///
/// Produced by [`crate::RenderContext::read_frame`] and consumed once by the
/// streaming encoder; it is not retained afterward.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRgb {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Interleaved RGB bytes, row 0 = top scanline.
    pub data: Vec<u8>,
}

impl FrameRgb {
    /// Check the byte layout against the declared dimensions.
    pub fn validate(&self) -> NotefallResult<()> {
        let expected = self.width as usize * self.height as usize * 3;
        if self.data.len() != expected {
            return Err(NotefallError::frame_shape(format!(
                "frame data is {} bytes, expected {} ({}x{}x3)",
                self.data.len(),
                expected,
                self.width,
                self.height
            )));
        }
        Ok(())
    }

    /// The RGB triple at a pixel, for inspection and tests.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = (y as usize * self.width as usize + x as usize) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
