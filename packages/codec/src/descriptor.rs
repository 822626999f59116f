//! Versioned side-channel description of an encoded depth stream.
//!
//! The codec variant, remap curve and depth bounds are not embedded in the
//! pixels, so the sender publishes a [`StreamDescriptor`] out of band
//! (whenever it changes) and the receiver rebuilds the matching codec from it.

use serde::{Deserialize, Serialize};

use crate::{Codec, CodecConfig, CodecError, DepthBounds, PixelFormat};

/// Current descriptor format version.
pub const DESCRIPTOR_VERSION: u32 = 1;

/// How the encoded depth map sits inside each published frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameLayout {
    /// The frame is the encoded depth map alone.
    #[default]
    DepthOnly,
    /// Encoded depth on the left half, colour camera image on the right.
    SideBySide,
}

/// Everything a receiver needs to decode a stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Format version, checked on parse.
    pub version: u32,
    /// Codec variant, curve and parameters.
    pub codec: CodecConfig,
    /// Lower depth bound in raw sensor units.
    pub min_value: u16,
    /// Upper depth bound in raw sensor units.
    pub max_value: u16,
    /// Metres per raw depth unit.
    pub depth_unit_scale: f64,
    /// Width of the depth region before any resize to the colour size.
    pub depth_width: u32,
    /// Height of the depth region before any resize to the colour size.
    pub depth_height: u32,
    /// Placement of the depth map in the frame.
    pub layout: FrameLayout,
    /// Channel order of published frames.
    pub pixel_format: PixelFormat,
}

impl StreamDescriptor {
    /// Describe a stream encoded with `codec` between `bounds`.
    #[must_use]
    pub fn new(codec: &Codec, bounds: DepthBounds, depth_unit_scale: f64) -> Self {
        Self {
            version: DESCRIPTOR_VERSION,
            codec: codec.config(),
            min_value: bounds.min_value(),
            max_value: bounds.max_value(),
            depth_unit_scale,
            depth_width: 0,
            depth_height: 0,
            layout: FrameLayout::DepthOnly,
            pixel_format: PixelFormat::Rgb,
        }
    }

    /// Set the depth map dimensions.
    #[must_use]
    pub fn depth_size(mut self, width: u32, height: u32) -> Self {
        self.depth_width = width;
        self.depth_height = height;
        self
    }

    /// Set the frame layout.
    #[must_use]
    pub fn layout(mut self, layout: FrameLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Set the published channel order.
    #[must_use]
    pub fn pixel_format(mut self, pixel_format: PixelFormat) -> Self {
        self.pixel_format = pixel_format;
        self
    }

    /// Validated depth bounds.
    pub fn bounds(&self) -> Result<DepthBounds, CodecError> {
        DepthBounds::new(self.min_value, self.max_value)
    }

    /// Rebuild the sender's codec.
    pub fn build_codec(&self) -> Result<Codec, CodecError> {
        self.codec.build()
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, CodecError> {
        serde_json::to_string(self).map_err(|e| CodecError::Descriptor(e.to_string()))
    }

    /// Parse and validate a descriptor.
    pub fn from_json(json: &str) -> Result<Self, CodecError> {
        let descriptor: Self =
            serde_json::from_str(json).map_err(|e| CodecError::Descriptor(e.to_string()))?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Check version, bounds and codec parameters.
    pub fn validate(&self) -> Result<(), CodecError> {
        if self.version != DESCRIPTOR_VERSION {
            return Err(CodecError::UnsupportedVersion(self.version));
        }
        self.bounds()?;
        self.build_codec()?;
        if !self.depth_unit_scale.is_finite() || self.depth_unit_scale <= 0.0 {
            return Err(CodecError::invalid_distance(format!(
                "depth unit scale must be positive, got {}",
                self.depth_unit_scale
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CodecVariant, RemapCurve};

    fn sample() -> StreamDescriptor {
        let codec = CodecConfig::new(CodecVariant::HueColorization)
            .curve(RemapCurve::EaseOutQuad)
            .build()
            .unwrap();
        StreamDescriptor::new(&codec, DepthBounds::new(0, 6000).unwrap(), 0.001)
            .depth_size(640, 480)
            .layout(FrameLayout::SideBySide)
            .pixel_format(PixelFormat::Bgr)
    }

    #[test]
    fn test_json_roundtrip() {
        let descriptor = sample();
        let json = descriptor.to_json().unwrap();
        assert!(json.contains("\"variant\":\"hue_colorization\""));
        assert!(json.contains("\"curve\":\"ease_out_quad\""));
        assert!(json.contains("\"layout\":\"side_by_side\""));
        assert_eq!(StreamDescriptor::from_json(&json).unwrap(), descriptor);
    }

    #[test]
    fn test_rebuilds_same_codec() {
        let descriptor = sample();
        let codec = descriptor.build_codec().unwrap();
        assert_eq!(codec.config(), descriptor.codec);
    }

    #[test]
    fn test_rejects_unknown_version() {
        let mut descriptor = sample();
        descriptor.version = 2;
        let json = serde_json::to_string(&descriptor).unwrap();
        assert!(matches!(
            StreamDescriptor::from_json(&json),
            Err(CodecError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn test_rejects_bad_bounds() {
        let mut descriptor = sample();
        descriptor.min_value = 7000;
        let json = serde_json::to_string(&descriptor).unwrap();
        assert!(matches!(
            StreamDescriptor::from_json(&json),
            Err(CodecError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            StreamDescriptor::from_json("{\"version\":1}"),
            Err(CodecError::Descriptor(_))
        ));
    }
}
