//! Core configuration types for depth codecs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{CodecError, RemapCurve};

/// Default hue sweep: red through magenta, leaving a 60° guard band before red.
pub const DEFAULT_HUE_SWEEP_DEGREES: f32 = 300.0;

/// Channel order of a colour image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// RGB with 8 bits per channel (24 bits per pixel).
    Rgb,
    /// BGR with 8 bits per channel (24 bits per pixel).
    Bgr,
}

impl Default for PixelFormat {
    fn default() -> Self {
        Self::Rgb
    }
}

/// Identity of a depth codec, agreed on by both ends of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodecVariant {
    /// Grey intensity, uniform precision, 255 valid levels.
    Linear,
    /// Hue sweep at full saturation and value.
    HueColorization,
}

impl CodecVariant {
    /// All known variants, in menu order.
    pub const ALL: [CodecVariant; 2] = [CodecVariant::Linear, CodecVariant::HueColorization];

    /// Short name used on the command line and in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::HueColorization => "hue",
        }
    }
}

impl Default for CodecVariant {
    fn default() -> Self {
        Self::Linear
    }
}

impl fmt::Display for CodecVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CodecVariant {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "hue" | "hue_colorization" | "huecolorization" => Ok(Self::HueColorization),
            other => Err(CodecError::invalid_param(format!("unknown codec '{other}'"))),
        }
    }
}

/// Everything a receiver needs to rebuild the exact codec instance used by
/// the sender, apart from the depth bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Encoding strategy.
    pub variant: CodecVariant,
    /// Precision distribution applied before channel encoding.
    pub curve: RemapCurve,
    /// Hue sweep in degrees, only read by the hue codec.
    pub hue_sweep_degrees: f32,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            variant: CodecVariant::Linear,
            curve: RemapCurve::Linear,
            hue_sweep_degrees: DEFAULT_HUE_SWEEP_DEGREES,
        }
    }
}

impl CodecConfig {
    /// Create a configuration for the given variant with default parameters.
    #[must_use]
    pub fn new(variant: CodecVariant) -> Self {
        Self {
            variant,
            ..Default::default()
        }
    }

    /// Set the codec variant.
    #[must_use]
    pub fn variant(mut self, variant: CodecVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Set the remap curve.
    #[must_use]
    pub fn curve(mut self, curve: RemapCurve) -> Self {
        self.curve = curve;
        self
    }

    /// Set the hue sweep in degrees.
    #[must_use]
    pub fn hue_sweep(mut self, degrees: f32) -> Self {
        self.hue_sweep_degrees = degrees;
        self
    }
}
