//! Closed set of codec implementations, dispatched by variant.

use crate::{
    CodecConfig, CodecError, CodecVariant, ColorImage, DepthBounds, DepthBuffer, DepthCodec,
    HueColorizationCodec, LinearCodec, RemapCurve,
};

/// One built codec of any known variant.
///
/// New variants are added here and to [`CodecVariant`]; every dispatch is an
/// exhaustive `match`, so the compiler points at each place to extend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Codec {
    Linear(LinearCodec),
    HueColorization(HueColorizationCodec),
}

impl CodecConfig {
    /// Build the codec described by this configuration.
    pub fn build(&self) -> Result<Codec, CodecError> {
        Ok(match self.variant {
            CodecVariant::Linear => Codec::Linear(LinearCodec::new(self.curve)),
            CodecVariant::HueColorization => Codec::HueColorization(HueColorizationCodec::new(
                self.hue_sweep_degrees,
                self.curve,
            )?),
        })
    }
}

impl Codec {
    /// Configuration that rebuilds this exact codec.
    #[must_use]
    pub fn config(&self) -> CodecConfig {
        match self {
            Self::Linear(c) => CodecConfig::new(CodecVariant::Linear).curve(c.curve()),
            Self::HueColorization(c) => CodecConfig::new(CodecVariant::HueColorization)
                .curve(c.curve())
                .hue_sweep(c.sweep_degrees()),
        }
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::Linear(LinearCodec::default())
    }
}

impl DepthCodec for Codec {
    fn variant(&self) -> CodecVariant {
        match self {
            Self::Linear(c) => c.variant(),
            Self::HueColorization(c) => c.variant(),
        }
    }

    fn curve(&self) -> RemapCurve {
        match self {
            Self::Linear(c) => c.curve(),
            Self::HueColorization(c) => c.curve(),
        }
    }

    fn sentinel(&self) -> [u8; 3] {
        match self {
            Self::Linear(c) => c.sentinel(),
            Self::HueColorization(c) => c.sentinel(),
        }
    }

    fn levels(&self) -> u32 {
        match self {
            Self::Linear(c) => c.levels(),
            Self::HueColorization(c) => c.levels(),
        }
    }

    fn encode_sample(&self, d: u16, bounds: DepthBounds) -> [u8; 3] {
        match self {
            Self::Linear(c) => c.encode_sample(d, bounds),
            Self::HueColorization(c) => c.encode_sample(d, bounds),
        }
    }

    fn decode_pixel(&self, rgb: [u8; 3], bounds: DepthBounds) -> u16 {
        match self {
            Self::Linear(c) => c.decode_pixel(rgb, bounds),
            Self::HueColorization(c) => c.decode_pixel(rgb, bounds),
        }
    }

    // Whole-buffer calls dispatch once so the per-pixel loop is monomorphic.
    fn encode(
        &self,
        depth: &DepthBuffer,
        min_value: u16,
        max_value: u16,
    ) -> Result<ColorImage, CodecError> {
        match self {
            Self::Linear(c) => c.encode(depth, min_value, max_value),
            Self::HueColorization(c) => c.encode(depth, min_value, max_value),
        }
    }

    fn decode_into(
        &self,
        image: &ColorImage,
        min_value: u16,
        max_value: u16,
        out: &mut DepthBuffer,
    ) -> Result<(), CodecError> {
        match self {
            Self::Linear(c) => c.decode_into(image, min_value, max_value, out),
            Self::HueColorization(c) => c.decode_into(image, min_value, max_value, out),
        }
    }

    fn error_bound(&self, bounds: DepthBounds) -> u32 {
        match self {
            Self::Linear(c) => c.error_bound(bounds),
            Self::HueColorization(c) => c.error_bound(bounds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(width: u32, min: u16, max: u16) -> DepthBuffer {
        let span = u32::from(max - min);
        let data = (0..width)
            .map(|x| (u32::from(min) + span * x / (width - 1)) as u16)
            .collect();
        DepthBuffer::new(width, 1, data).unwrap()
    }

    #[test]
    fn test_build_from_config() {
        let linear = CodecConfig::new(CodecVariant::Linear).build().unwrap();
        assert_eq!(linear.variant(), CodecVariant::Linear);

        let hue = CodecConfig::new(CodecVariant::HueColorization)
            .curve(RemapCurve::EaseOutQuad)
            .build()
            .unwrap();
        assert_eq!(hue.variant(), CodecVariant::HueColorization);
        assert_eq!(hue.curve(), RemapCurve::EaseOutQuad);
    }

    #[test]
    fn test_build_rejects_bad_sweep() {
        let config = CodecConfig::new(CodecVariant::HueColorization).hue_sweep(360.0);
        assert!(matches!(config.build(), Err(CodecError::InvalidParam(_))));
        // The sweep is ignored by the linear codec.
        assert!(config.variant(CodecVariant::Linear).build().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        for variant in CodecVariant::ALL {
            let config = CodecConfig::new(variant)
                .curve(RemapCurve::EaseOutQuad)
                .hue_sweep(270.0);
            let codec = config.build().unwrap();
            let rebuilt = codec.config().build().unwrap();
            assert_eq!(codec, rebuilt);
        }
    }

    #[test]
    fn test_dispatch_matches_inner() {
        let depth = ramp(64, 1, 6000);
        let inner = HueColorizationCodec::default();
        let wrapped = Codec::HueColorization(inner);
        assert_eq!(
            wrapped.encode(&depth, 0, 6000).unwrap(),
            inner.encode(&depth, 0, 6000).unwrap()
        );
    }

    #[test]
    fn test_every_variant_roundtrips_within_bound() {
        for variant in CodecVariant::ALL {
            let codec = CodecConfig::new(variant).build().unwrap();
            let depth = ramp(500, 400, 5400);
            let bounds = DepthBounds::new(400, 5400).unwrap();
            let image = codec.encode(&depth, 400, 5400).unwrap();
            let decoded = codec.decode(&image, 400, 5400).unwrap();
            let bound = codec.error_bound(bounds);
            for (got, want) in decoded.data.iter().zip(&depth.data) {
                assert!(u32::from(got.abs_diff(*want)) <= bound, "{variant}: {got} vs {want}");
            }
        }
    }

    #[test]
    fn test_variants_differ() {
        let depth = ramp(16, 1, 6000);
        let linear = Codec::default().encode(&depth, 0, 6000).unwrap();
        let hue = CodecConfig::new(CodecVariant::HueColorization)
            .build()
            .unwrap()
            .encode(&depth, 0, 6000)
            .unwrap();
        assert_ne!(linear, hue);
    }
}
