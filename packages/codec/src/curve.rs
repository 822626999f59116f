//! Remap curves that redistribute precision across the distance range.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CodecError;

/// Monotonic mapping `[0, 1] -> [0, 1]` applied to normalized depth before
/// channel encoding, and inverted after decoding.
///
/// Every curve satisfies `f(0) = 0`, `f(1) = 1` and is strictly increasing,
/// so it can be paired with any codec variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemapCurve {
    /// Identity. Precision is uniform in real-world distance.
    #[default]
    Linear,
    /// `x * (2 - x)`: steeper near 0, so more codes land near the near plane.
    EaseOutQuad,
}

impl RemapCurve {
    /// Forward mapping used by encoders. Input is clamped to `[0, 1]`.
    #[must_use]
    pub fn apply(&self, x: f64) -> f64 {
        let x = x.clamp(0.0, 1.0);
        match self {
            Self::Linear => x,
            Self::EaseOutQuad => x * (2.0 - x),
        }
    }

    /// Analytic inverse used by decoders. Input is clamped to `[0, 1]`.
    #[must_use]
    pub fn inverse(&self, y: f64) -> f64 {
        let y = y.clamp(0.0, 1.0);
        match self {
            Self::Linear => y,
            Self::EaseOutQuad => 1.0 - (1.0 - y).sqrt(),
        }
    }

    /// Short name used on the command line and in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::EaseOutQuad => "ease-out",
        }
    }
}

impl fmt::Display for RemapCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RemapCurve {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linear" | "identity" => Ok(Self::Linear),
            "ease-out" | "ease_out" | "ease_out_quad" | "easeoutquad" => Ok(Self::EaseOutQuad),
            other => Err(CodecError::invalid_param(format!("unknown curve '{other}'"))),
        }
    }
}
