//! Uniform hue colorization.
//!
//! Normalized depth is spread along a hue sweep at full saturation and value.
//! Neighbouring depths map to neighbouring hues, which stay distinguishable
//! after lossy recompression, resizing and colour-space round trips that
//! would smear a single grey channel.
//!
//! Hue is quantized in *levels*: each 60° sector of the colour wheel holds
//! 255 levels (one channel ramps while the other two sit at 0 and 255), so a
//! sweep of `H` degrees has `round(H / 60 * 255)` levels. The default 300°
//! sweep gives 1275 levels, five times the resolution of the grey encoding.
//! The part of the wheel beyond the sweep is a guard band separating the far
//! end from the near end.

use crate::{CodecError, CodecVariant, DepthBounds, DepthCodec, RemapCurve, NO_READING};

/// Levels per 60° sector.
const SECTOR_STEPS: u32 = 255;

/// Levels in a full turn of the colour wheel.
const FULL_CIRCLE: u32 = 6 * SECTOR_STEPS;

/// Pixels darker or greyer than this are read as the sentinel.
const MIN_CHROMA: i32 = 128;

/// Hue-based depth codec with fixed saturation and value (both 1.0).
///
/// The sentinel is black, which has zero value and therefore lies outside
/// the sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HueColorizationCodec {
    curve: RemapCurve,
    sweep_degrees: f32,
    levels: u32,
}

impl HueColorizationCodec {
    /// Create a codec sweeping `sweep_degrees` of hue, starting at red.
    ///
    /// The sweep must stay inside `(0, 360)` so the far end never wraps onto
    /// the near end.
    pub fn new(sweep_degrees: f32, curve: RemapCurve) -> Result<Self, CodecError> {
        if !sweep_degrees.is_finite() || sweep_degrees <= 0.0 || sweep_degrees >= 360.0 {
            return Err(CodecError::invalid_param(format!(
                "hue sweep must be inside (0, 360) degrees, got {sweep_degrees}"
            )));
        }
        let levels = (f64::from(sweep_degrees) / 60.0 * f64::from(SECTOR_STEPS)).round() as u32;
        if levels == 0 {
            return Err(CodecError::invalid_param(format!(
                "hue sweep of {sweep_degrees} degrees is too narrow to encode depth"
            )));
        }
        Ok(Self {
            curve,
            sweep_degrees,
            // Keep at least one level of guard band.
            levels: levels.min(FULL_CIRCLE - 1),
        })
    }

    /// Configured sweep in degrees.
    #[must_use]
    pub fn sweep_degrees(&self) -> f32 {
        self.sweep_degrees
    }

    /// Hue level to RGB at full saturation and value.
    fn level_to_rgb(level: u32) -> [u8; 3] {
        let offset = (level % SECTOR_STEPS) as u8;
        let falling = 255 - offset;
        match level / SECTOR_STEPS {
            0 => [255, offset, 0],
            1 => [falling, 255, 0],
            2 => [0, 255, offset],
            3 => [0, falling, 255],
            4 => [offset, 0, 255],
            _ => [255, 0, falling],
        }
    }

    /// Recover the hue of a pixel in level units, `[0, FULL_CIRCLE)`.
    /// Returns `None` for pixels without enough value or chroma to carry a hue.
    fn rgb_to_level(rgb: [u8; 3]) -> Option<f64> {
        let [r, g, b] = rgb.map(i32::from);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let chroma = max - min;
        if max < MIN_CHROMA || chroma < MIN_CHROMA {
            return None;
        }

        let sector = SECTOR_STEPS as i32;
        let (base, num) = if max == r {
            (0, g - b)
        } else if max == g {
            (2 * sector, b - r)
        } else {
            (4 * sector, r - g)
        };
        let mut level = f64::from(base) + f64::from(sector * num) / f64::from(chroma);
        if level < 0.0 {
            level += f64::from(FULL_CIRCLE);
        }
        Some(level)
    }

    /// Fold hues that fell into the guard band onto the nearer end of the sweep.
    fn snap_to_sweep(&self, level: f64) -> f64 {
        let levels = f64::from(self.levels);
        if level <= levels {
            return level;
        }
        let guard = f64::from(FULL_CIRCLE) - levels;
        if level - levels <= guard / 2.0 {
            levels
        } else {
            0.0
        }
    }
}

impl Default for HueColorizationCodec {
    fn default() -> Self {
        Self {
            curve: RemapCurve::Linear,
            sweep_degrees: crate::DEFAULT_HUE_SWEEP_DEGREES,
            levels: 5 * SECTOR_STEPS,
        }
    }
}

impl DepthCodec for HueColorizationCodec {
    fn variant(&self) -> CodecVariant {
        CodecVariant::HueColorization
    }

    fn curve(&self) -> RemapCurve {
        self.curve
    }

    fn sentinel(&self) -> [u8; 3] {
        [0, 0, 0]
    }

    fn levels(&self) -> u32 {
        self.levels + 1
    }

    fn encode_sample(&self, d: u16, bounds: DepthBounds) -> [u8; 3] {
        match bounds.normalize(d) {
            Some(t) => {
                let y = self.curve.apply(t).clamp(0.0, 1.0);
                let level = (y * f64::from(self.levels)).round() as u32;
                Self::level_to_rgb(level.min(self.levels))
            }
            None => self.sentinel(),
        }
    }

    fn decode_pixel(&self, rgb: [u8; 3], bounds: DepthBounds) -> u16 {
        let Some(level) = Self::rgb_to_level(rgb) else {
            return NO_READING;
        };
        let y = self.snap_to_sweep(level) / f64::from(self.levels);
        bounds.denormalize(self.curve.inverse(y))
    }

    fn error_bound(&self, bounds: DepthBounds) -> u32 {
        bounds.quantization_bound(self.levels)
    }
}
