//! Runtime-switchable codec selection.

use std::fmt;

use crate::{
    Codec, CodecConfig, CodecError, CodecVariant, ColorImage, DepthBuffer, DepthCodec, RemapCurve,
};

type ChangeCallback = Box<dyn Fn(CodecVariant) + Send + Sync>;

/// Holds the active codec and lets an operator switch it between frames.
///
/// Switching needs `&mut self`, so it can never race with an `encode` running
/// on the same selector: every frame sees exactly one codec. Change callbacks
/// run synchronously inside [`CodecSelector::select`] (and
/// [`CodecSelector::apply`]) when the variant actually changes.
pub struct CodecSelector {
    config: CodecConfig,
    codec: Codec,
    callbacks: Vec<ChangeCallback>,
}

impl CodecSelector {
    /// Create a selector with the codec described by `config` active.
    pub fn new(config: CodecConfig) -> Result<Self, CodecError> {
        Ok(Self {
            codec: config.build()?,
            config,
            callbacks: Vec::new(),
        })
    }

    /// Currently active variant.
    #[must_use]
    pub fn active(&self) -> CodecVariant {
        self.config.variant
    }

    /// Currently active codec instance.
    #[must_use]
    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    /// Full configuration of the active codec.
    #[must_use]
    pub fn config(&self) -> CodecConfig {
        self.config
    }

    /// Register a callback fired with the new variant after each switch.
    pub fn on_change(&mut self, callback: impl Fn(CodecVariant) + Send + Sync + 'static) {
        self.callbacks.push(Box::new(callback));
    }

    /// Switch to `variant`, keeping curve and hue sweep.
    ///
    /// Returns whether the variant changed. On error the previous codec stays
    /// active.
    pub fn select(&mut self, variant: CodecVariant) -> Result<bool, CodecError> {
        self.apply(self.config.variant(variant))
    }

    /// Change the remap curve of the active codec.
    pub fn set_curve(&mut self, curve: RemapCurve) -> Result<(), CodecError> {
        self.apply(self.config.curve(curve)).map(|_| ())
    }

    /// Change the hue sweep. Takes effect whenever the hue codec is active.
    pub fn set_hue_sweep(&mut self, degrees: f32) -> Result<(), CodecError> {
        self.apply(self.config.hue_sweep(degrees)).map(|_| ())
    }

    /// Replace the whole configuration. Returns whether the variant changed.
    pub fn apply(&mut self, config: CodecConfig) -> Result<bool, CodecError> {
        let codec = config.build()?;
        let changed = config.variant != self.config.variant;
        self.config = config;
        self.codec = codec;
        if changed {
            for callback in &self.callbacks {
                callback(config.variant);
            }
        }
        Ok(changed)
    }

    /// Encode with the active codec.
    pub fn encode(
        &self,
        depth: &DepthBuffer,
        min_value: u16,
        max_value: u16,
    ) -> Result<ColorImage, CodecError> {
        self.codec.encode(depth, min_value, max_value)
    }

    /// Decode with the active codec.
    pub fn decode(
        &self,
        image: &ColorImage,
        min_value: u16,
        max_value: u16,
    ) -> Result<DepthBuffer, CodecError> {
        self.codec.decode(image, min_value, max_value)
    }
}

impl Default for CodecSelector {
    fn default() -> Self {
        Self {
            config: CodecConfig::default(),
            codec: Codec::default(),
            callbacks: Vec::new(),
        }
    }
}

impl fmt::Debug for CodecSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecSelector")
            .field("config", &self.config)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}
