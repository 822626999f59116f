//! Distance window and the shared depth normalization policy.

use crate::CodecError;

/// Default sensor unit: one raw depth step per millimetre.
pub const DEFAULT_DEPTH_UNIT_SCALE: f64 = 0.001;

/// Raw sample value meaning "the sensor produced no reading".
pub const NO_READING: u16 = 0;

/// Integer depth bounds the codecs clamp to, in raw sensor units.
///
/// Always satisfies `min_value < max_value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthBounds {
    min_value: u16,
    max_value: u16,
}

impl DepthBounds {
    /// Validate a pair of raw bounds.
    pub fn new(min_value: u16, max_value: u16) -> Result<Self, CodecError> {
        if min_value >= max_value {
            return Err(CodecError::InvalidRange {
                min_value: min_value.into(),
                max_value: max_value.into(),
            });
        }
        Ok(Self {
            min_value,
            max_value,
        })
    }

    #[must_use]
    pub fn min_value(&self) -> u16 {
        self.min_value
    }

    #[must_use]
    pub fn max_value(&self) -> u16 {
        self.max_value
    }

    /// Number of raw units covered, `max - min`.
    #[must_use]
    pub fn span(&self) -> u32 {
        u32::from(self.max_value - self.min_value)
    }

    /// Clamp a valid sample into the window. Returns `None` for `NO_READING`.
    #[must_use]
    pub fn clamp(&self, d: u16) -> Option<u16> {
        if d == NO_READING {
            return None;
        }
        Some(d.clamp(self.min_value, self.max_value))
    }

    /// Map a sample to `t in [0, 1]`. Returns `None` for `NO_READING`.
    #[must_use]
    pub fn normalize(&self, d: u16) -> Option<f64> {
        let d = self.clamp(d)?;
        Some(f64::from(d - self.min_value) / f64::from(self.span()))
    }

    /// Map `t in [0, 1]` back to a raw sample, rounding to the nearest unit.
    #[must_use]
    pub fn denormalize(&self, t: f64) -> u16 {
        let offset = (t.clamp(0.0, 1.0) * f64::from(self.span())).round() as u32;
        (u32::from(self.min_value) + offset).min(u32::from(self.max_value)) as u16
    }

    /// Worst-case round-trip error when `t` is quantized into `levels` steps.
    #[must_use]
    pub fn quantization_bound(&self, levels: u32) -> u32 {
        self.span().div_ceil(levels.max(1))
    }
}

/// Operator-selected distance window in real-world units (metres), plus the
/// sensor's depth unit scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceRange {
    min_distance: f64,
    max_distance: f64,
    depth_unit_scale: f64,
    bounds: DepthBounds,
}

impl DistanceRange {
    /// Build a range, converting distances to raw bounds:
    /// `value = round(distance / depth_unit_scale)`.
    ///
    /// Fails when the distances are not finite, negative, inverted, or do not
    /// fit the 16-bit depth domain at the given scale.
    pub fn new(
        min_distance: f64,
        max_distance: f64,
        depth_unit_scale: f64,
    ) -> Result<Self, CodecError> {
        if !depth_unit_scale.is_finite() || depth_unit_scale <= 0.0 {
            return Err(CodecError::invalid_distance(format!(
                "depth unit scale must be positive, got {depth_unit_scale}"
            )));
        }
        if !min_distance.is_finite() || !max_distance.is_finite() || min_distance < 0.0 {
            return Err(CodecError::invalid_distance(format!(
                "distances must be finite and non-negative, got {min_distance}..{max_distance}"
            )));
        }
        if min_distance >= max_distance {
            return Err(CodecError::invalid_distance(format!(
                "min distance {min_distance} must be below max distance {max_distance}"
            )));
        }

        let min_value = to_raw(min_distance, depth_unit_scale)?;
        let max_value = to_raw(max_distance, depth_unit_scale)?;
        let bounds = DepthBounds::new(min_value, max_value)?;

        Ok(Self {
            min_distance,
            max_distance,
            depth_unit_scale,
            bounds,
        })
    }

    /// Range in metres at the default 1 mm sensor unit.
    pub fn meters(min_distance: f64, max_distance: f64) -> Result<Self, CodecError> {
        Self::new(min_distance, max_distance, DEFAULT_DEPTH_UNIT_SCALE)
    }

    /// Same distances, re-expressed for a sensor with a different unit.
    pub fn with_scale(&self, depth_unit_scale: f64) -> Result<Self, CodecError> {
        Self::new(self.min_distance, self.max_distance, depth_unit_scale)
    }

    #[must_use]
    pub fn min_distance(&self) -> f64 {
        self.min_distance
    }

    #[must_use]
    pub fn max_distance(&self) -> f64 {
        self.max_distance
    }

    #[must_use]
    pub fn depth_unit_scale(&self) -> f64 {
        self.depth_unit_scale
    }

    /// Raw bounds the codecs clamp to.
    #[must_use]
    pub fn bounds(&self) -> DepthBounds {
        self.bounds
    }

    #[must_use]
    pub fn min_value(&self) -> u16 {
        self.bounds.min_value
    }

    #[must_use]
    pub fn max_value(&self) -> u16 {
        self.bounds.max_value
    }
}

fn to_raw(distance: f64, scale: f64) -> Result<u16, CodecError> {
    let raw = (distance / scale).round();
    if raw > f64::from(u16::MAX) {
        return Err(CodecError::invalid_distance(format!(
            "{distance} m is outside the sensor depth domain at {scale} m/unit"
        )));
    }
    Ok(raw as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scenario_bounds() {
        let range = DistanceRange::new(0.0, 6.0, 0.001).unwrap();
        assert_eq!(range.min_value(), 0);
        assert_eq!(range.max_value(), 6000);
    }

    #[test]
    fn test_rounding_to_raw() {
        let range = DistanceRange::new(0.25, 1.5, 0.0001).unwrap();
        assert_eq!(range.min_value(), 2500);
        assert_eq!(range.max_value(), 15000);
    }

    #[test]
    fn test_rejects_inverted_or_empty() {
        assert!(matches!(
            DistanceRange::meters(2.0, 1.0),
            Err(CodecError::InvalidDistance(_))
        ));
        assert!(DistanceRange::meters(1.0, 1.0).is_err());
        // Distinct distances that collapse onto the same raw unit.
        assert!(matches!(
            DistanceRange::meters(1.0, 1.0002),
            Err(CodecError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_rejects_out_of_domain() {
        assert!(DistanceRange::meters(0.0, 70.0).is_err());
        assert!(DistanceRange::new(0.0, 6.0, 0.0).is_err());
        assert!(DistanceRange::new(-1.0, 6.0, 0.001).is_err());
        assert!(DistanceRange::new(0.0, f64::NAN, 0.001).is_err());
    }

    #[test]
    fn test_with_scale_recomputes_bounds() {
        let range = DistanceRange::meters(0.5, 4.0).unwrap();
        let fine = range.with_scale(0.0001).unwrap();
        assert_eq!(fine.min_value(), 5000);
        assert_eq!(fine.max_value(), 40000);
        assert_eq!(fine.min_distance(), 0.5);
    }

    #[test]
    fn test_bounds_validation() {
        assert!(DepthBounds::new(10, 10).is_err());
        assert!(DepthBounds::new(11, 10).is_err());
        assert!(DepthBounds::new(10, 11).is_ok());
    }

    #[test]
    fn test_normalize_clamps_and_skips_invalid() {
        let bounds = DepthBounds::new(1000, 3000).unwrap();
        assert_eq!(bounds.normalize(0), None);
        assert_eq!(bounds.normalize(1), Some(0.0));
        assert_eq!(bounds.normalize(2000), Some(0.5));
        assert_eq!(bounds.normalize(60000), Some(1.0));
    }

    #[test]
    fn test_denormalize() {
        let bounds = DepthBounds::new(1000, 3000).unwrap();
        assert_eq!(bounds.denormalize(0.0), 1000);
        assert_eq!(bounds.denormalize(0.5), 2000);
        assert_eq!(bounds.denormalize(1.0), 3000);
        assert_eq!(bounds.denormalize(2.0), 3000);
    }

    #[test]
    fn test_quantization_bound() {
        let bounds = DepthBounds::new(0, 6000).unwrap();
        assert_eq!(bounds.quantization_bound(255), 24);
        assert_eq!(bounds.quantization_bound(1275), 5);
    }
}
