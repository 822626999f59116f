//! Grey-level depth encoding.

use crate::{CodecVariant, DepthBounds, DepthCodec, RemapCurve, NO_READING};

/// Code reserved for samples without a reading.
const SENTINEL_CODE: u8 = 0;

/// Highest code offset; valid samples use codes `1..=255`.
const MAX_STEP: f64 = 254.0;

/// Encodes normalized depth as a grey intensity replicated on all three
/// channels, so it survives RGB/YUV conversions in the transport.
///
/// Code `0` (black) is reserved for "no reading"; valid samples map to
/// `1 + round(f(t) * 254)`. That leaves 255 levels spread uniformly over the
/// configured distance window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinearCodec {
    curve: RemapCurve,
}

impl LinearCodec {
    #[must_use]
    pub fn new(curve: RemapCurve) -> Self {
        Self { curve }
    }

    fn code(&self, t: f64) -> u8 {
        let y = self.curve.apply(t).clamp(0.0, 1.0);
        1 + (y * MAX_STEP).round() as u8
    }
}

impl DepthCodec for LinearCodec {
    fn variant(&self) -> CodecVariant {
        CodecVariant::Linear
    }

    fn curve(&self) -> RemapCurve {
        self.curve
    }

    fn sentinel(&self) -> [u8; 3] {
        [SENTINEL_CODE; 3]
    }

    fn levels(&self) -> u32 {
        255
    }

    fn encode_sample(&self, d: u16, bounds: DepthBounds) -> [u8; 3] {
        match bounds.normalize(d) {
            Some(t) => [self.code(t); 3],
            None => self.sentinel(),
        }
    }

    fn decode_pixel(&self, rgb: [u8; 3], bounds: DepthBounds) -> u16 {
        // Average the channels; chroma drift from the transport cancels out.
        let sum: u32 = rgb.iter().map(|&c| u32::from(c)).sum();
        let code = ((sum + 1) / 3) as u8;
        if code == SENTINEL_CODE {
            return NO_READING;
        }
        let y = f64::from(code - 1) / MAX_STEP;
        bounds.denormalize(self.curve.inverse(y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ColorImage, DepthBuffer};

    fn roundtrip(codec: &LinearCodec, d: u16, bounds: DepthBounds) -> u16 {
        codec.decode_pixel(codec.encode_sample(d, bounds), bounds)
    }

    #[test]
    fn test_roundtrip_bound() {
        let codec = LinearCodec::default();
        for (min, max) in [(0u16, 6000u16), (500, 4500), (1, 2), (0, 65535), (1000, 1254)] {
            let bounds = DepthBounds::new(min, max).unwrap();
            let bound = bounds.quantization_bound(255);
            for d in min.max(1)..=max {
                let err = roundtrip(&codec, d, bounds).abs_diff(d);
                assert!(err <= bound as u16, "range {min}..{max}: d={d} err={err} > {bound}");
            }
        }
    }

    #[test]
    fn test_scenario_a() {
        let codec = LinearCodec::default();
        let bounds = DepthBounds::new(0, 6000).unwrap();
        let decoded = roundtrip(&codec, 3000, bounds);
        assert!(decoded.abs_diff(3000) <= 24, "decoded {decoded}");
    }

    #[test]
    fn test_monotonic() {
        for curve in [RemapCurve::Linear, RemapCurve::EaseOutQuad] {
            let codec = LinearCodec::new(curve);
            let bounds = DepthBounds::new(200, 9000).unwrap();
            let mut prev = 0;
            for d in 200..=9000 {
                let decoded = roundtrip(&codec, d, bounds);
                assert!(decoded >= prev, "{curve}: d={d} decoded {decoded} < {prev}");
                prev = decoded;
            }
        }
    }

    #[test]
    fn test_sentinel_never_produced_by_valid_samples() {
        let codec = LinearCodec::default();
        let bounds = DepthBounds::new(0, 6000).unwrap();
        assert_eq!(codec.encode_sample(0, bounds), [0, 0, 0]);
        for d in 1..=6000 {
            assert_ne!(codec.encode_sample(d, bounds), codec.sentinel());
        }
        // The nearest valid sample still decodes inside the window.
        assert_eq!(codec.encode_sample(1, bounds), [1, 1, 1]);
    }

    #[test]
    fn test_sentinel_stability() {
        for curve in [RemapCurve::Linear, RemapCurve::EaseOutQuad] {
            let codec = LinearCodec::new(curve);
            for (min, max) in [(0u16, 6000u16), (300, 301), (10000, 65535)] {
                let bounds = DepthBounds::new(min, max).unwrap();
                assert_eq!(roundtrip(&codec, 0, bounds), 0);
            }
        }
    }

    #[test]
    fn test_clamping() {
        let codec = LinearCodec::default();
        let bounds = DepthBounds::new(1000, 3000).unwrap();
        for d in [1u16, 500, 999] {
            assert_eq!(codec.encode_sample(d, bounds), codec.encode_sample(1000, bounds));
        }
        for d in [3001u16, 40000, u16::MAX] {
            assert_eq!(codec.encode_sample(d, bounds), codec.encode_sample(3000, bounds));
        }
    }

    #[test]
    fn test_endpoints_use_full_code_range() {
        let codec = LinearCodec::default();
        let bounds = DepthBounds::new(1000, 3000).unwrap();
        assert_eq!(codec.encode_sample(1000, bounds), [1, 1, 1]);
        assert_eq!(codec.encode_sample(3000, bounds), [255, 255, 255]);
        assert_eq!(roundtrip(&codec, 1000, bounds), 1000);
        assert_eq!(roundtrip(&codec, 3000, bounds), 3000);
    }

    #[test]
    fn test_decode_tolerates_chroma_drift() {
        let codec = LinearCodec::default();
        let bounds = DepthBounds::new(0, 2540).unwrap();
        // Code 128 decodes to 127 * 10 units.
        assert_eq!(codec.decode_pixel([128, 128, 128], bounds), 1270);
        assert_eq!(codec.decode_pixel([127, 129, 128], bounds), 1270);
        // Near-black noise is still treated as no reading.
        assert_eq!(codec.decode_pixel([1, 0, 0], bounds), 0);
    }

    #[test]
    fn test_encode_buffer_shape() {
        let codec = LinearCodec::default();
        let depth = DepthBuffer::new(3, 2, vec![0, 1000, 2000, 3000, 4000, 5000]).unwrap();
        let image = codec.encode(&depth, 0, 6000).unwrap();
        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(image.data.len(), 18);
        assert_eq!(&image.data[..3], &[0, 0, 0]);
    }

    #[test]
    fn test_decode_accepts_bgr() {
        let codec = LinearCodec::default();
        let depth = DepthBuffer::new(2, 2, vec![0, 1500, 3000, 4500]).unwrap();
        let image = codec.encode(&depth, 0, 6000).unwrap();
        let from_rgb = codec.decode(&image, 0, 6000).unwrap();
        let from_bgr = codec.decode(&image.to_bgr(), 0, 6000).unwrap();
        assert_eq!(from_rgb, from_bgr);
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let codec = LinearCodec::default();
        let depth = DepthBuffer::zeroed(2, 2);
        assert!(codec.encode(&depth, 100, 100).is_err());
        let image = ColorImage::black(2, 2);
        assert!(codec.decode(&image, 200, 100).is_err());
    }

    #[test]
    fn test_decode_into_shape_mismatch() {
        let codec = LinearCodec::default();
        let image = ColorImage::black(4, 4);
        let mut out = DepthBuffer::zeroed(4, 3);
        let err = codec.decode_into(&image, 0, 6000, &mut out).unwrap_err();
        assert!(matches!(err, crate::CodecError::ShapeMismatch { .. }));
    }
}
