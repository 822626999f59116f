//! Operator-facing stream configuration, editable while the pipeline runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use spacestream_codec::{CodecConfig, CodecVariant, DistanceRange, RemapCurve};
use tokio::sync::watch;

/// Everything an operator can change about a running stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamConfig {
    /// Codec variant, curve and hue sweep.
    pub codec: CodecConfig,
    /// Near end of the distance window, metres.
    pub min_distance: f64,
    /// Far end of the distance window, metres.
    pub max_distance: f64,
    /// Run a 3x3 median over the encoded map.
    pub median_filter: bool,
    /// Place the colour image next to the encoded depth when available.
    pub compose_color: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            codec: CodecConfig::default(),
            min_distance: 0.0,
            max_distance: 6.0,
            median_filter: false,
            compose_color: true,
        }
    }
}

impl StreamConfig {
    /// Check that the codec can be built and the window is usable at the
    /// given sensor unit.
    pub fn validate(&self, depth_unit_scale: f64) -> Result<()> {
        self.codec.build()?;
        self.range(depth_unit_scale)?;
        Ok(())
    }

    /// Distance window converted to raw bounds at `depth_unit_scale`.
    pub fn range(&self, depth_unit_scale: f64) -> Result<DistanceRange> {
        Ok(DistanceRange::new(
            self.min_distance,
            self.max_distance,
            depth_unit_scale,
        )?)
    }
}

/// Cloneable handle for editing a running pipeline's configuration.
///
/// Edits are validated before they are published, so the pipeline only ever
/// observes configurations that were valid when submitted. The pipeline picks
/// them up between frames.
#[derive(Debug, Clone)]
pub struct ConfigHandle {
    tx: Arc<watch::Sender<StreamConfig>>,
    /// `f64` bits of the unit edits are validated at, shared by all clones.
    depth_unit_scale: Arc<AtomicU64>,
}

impl ConfigHandle {
    /// Create a handle and the receiver the pipeline watches.
    ///
    /// Edits are validated at `depth_unit_scale` until the pipeline reports a
    /// different sensor unit.
    pub fn new(
        initial: StreamConfig,
        depth_unit_scale: f64,
    ) -> (Self, watch::Receiver<StreamConfig>) {
        let (tx, rx) = watch::channel(initial);
        (
            Self {
                tx: Arc::new(tx),
                depth_unit_scale: Arc::new(AtomicU64::new(depth_unit_scale.to_bits())),
            },
            rx,
        )
    }

    /// Sensor unit edits are validated at, metres per raw unit.
    pub fn depth_unit_scale(&self) -> f64 {
        f64::from_bits(self.depth_unit_scale.load(Ordering::Acquire))
    }

    pub(crate) fn set_depth_unit_scale(&self, scale: f64) {
        self.depth_unit_scale.store(scale.to_bits(), Ordering::Release);
    }

    /// Put `accepted` back if `rejected` is still the published value.
    ///
    /// Returns whether the value was replaced. A newer edit made after
    /// `rejected` is left alone.
    pub(crate) fn roll_back(&self, rejected: &StreamConfig, accepted: StreamConfig) -> bool {
        self.tx.send_if_modified(|current| {
            if current == rejected {
                *current = accepted;
                true
            } else {
                false
            }
        })
    }

    /// Current configuration.
    pub fn current(&self) -> StreamConfig {
        *self.tx.borrow()
    }

    /// Another receiver, for observers other than the pipeline.
    pub fn subscribe(&self) -> watch::Receiver<StreamConfig> {
        self.tx.subscribe()
    }

    /// Edit the configuration. Invalid edits are rejected and nothing is
    /// published.
    pub fn update(&self, edit: impl FnOnce(&mut StreamConfig)) -> Result<StreamConfig> {
        let mut next = self.current();
        edit(&mut next);
        next.validate(self.depth_unit_scale())?;
        self.tx.send_replace(next);
        Ok(next)
    }

    /// Switch codec variant.
    pub fn set_codec(&self, variant: CodecVariant) -> Result<StreamConfig> {
        self.update(|cfg| cfg.codec = cfg.codec.variant(variant))
    }

    /// Switch remap curve.
    pub fn set_curve(&self, curve: RemapCurve) -> Result<StreamConfig> {
        self.update(|cfg| cfg.codec = cfg.codec.curve(curve))
    }

    /// Change the distance window, in metres.
    pub fn set_range(&self, min_distance: f64, max_distance: f64) -> Result<StreamConfig> {
        self.update(|cfg| {
            cfg.min_distance = min_distance;
            cfg.max_distance = max_distance;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spacestream_codec::DEFAULT_DEPTH_UNIT_SCALE;

    #[test]
    fn test_defaults() {
        let cfg = StreamConfig::default();
        assert_eq!(cfg.codec.variant, CodecVariant::Linear);
        assert_eq!(cfg.codec.curve, RemapCurve::Linear);
        let range = cfg.range(DEFAULT_DEPTH_UNIT_SCALE).unwrap();
        assert_eq!((range.min_value(), range.max_value()), (0, 6000));
    }

    #[test]
    fn test_update_publishes() {
        let (handle, rx) = ConfigHandle::new(StreamConfig::default(), DEFAULT_DEPTH_UNIT_SCALE);
        handle.set_codec(CodecVariant::HueColorization).unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow().codec.variant, CodecVariant::HueColorization);
    }

    #[test]
    fn test_invalid_range_is_rejected() {
        let (handle, rx) = ConfigHandle::new(StreamConfig::default(), DEFAULT_DEPTH_UNIT_SCALE);
        assert!(handle.set_range(3.0, 1.0).is_err());
        assert!(handle.set_range(0.0, 90.0).is_err());
        assert!(!rx.has_changed().unwrap());
        assert_eq!(handle.current(), StreamConfig::default());
    }

    #[test]
    fn test_invalid_sweep_is_rejected() {
        let (handle, _rx) = ConfigHandle::new(StreamConfig::default(), DEFAULT_DEPTH_UNIT_SCALE);
        let err = handle.update(|cfg| {
            cfg.codec = cfg
                .codec
                .variant(CodecVariant::HueColorization)
                .hue_sweep(400.0)
        });
        assert!(err.is_err());
        assert_eq!(handle.current().codec.variant, CodecVariant::Linear);
        assert_eq!(handle.current().codec.hue_sweep_degrees, 300.0);
    }

    #[test]
    fn test_clones_share_state() {
        let (handle, _rx) = ConfigHandle::new(StreamConfig::default(), DEFAULT_DEPTH_UNIT_SCALE);
        let other = handle.clone();
        other.set_curve(RemapCurve::EaseOutQuad).unwrap();
        assert_eq!(handle.current().codec.curve, RemapCurve::EaseOutQuad);
    }

    #[test]
    fn test_validates_at_reported_unit() {
        let (handle, _rx) = ConfigHandle::new(StreamConfig::default(), DEFAULT_DEPTH_UNIT_SCALE);
        let other = handle.clone();
        handle.set_depth_unit_scale(0.0001);
        assert_eq!(other.depth_unit_scale(), 0.0001);

        // 7 m is 70000 units at 0.1 mm.
        assert!(other.set_range(0.0, 7.0).is_err());
        assert_eq!(other.current().max_distance, 6.0);
        assert!(other.set_range(0.0, 6.5).is_ok());
    }

    #[test]
    fn test_roll_back_restores_accepted() {
        let (handle, mut rx) = ConfigHandle::new(StreamConfig::default(), DEFAULT_DEPTH_UNIT_SCALE);
        let accepted = handle.current();
        let rejected = handle.set_range(0.0, 7.0).unwrap();
        rx.borrow_and_update();

        assert!(handle.roll_back(&rejected, accepted));
        assert_eq!(handle.current(), accepted);
        assert!(rx.has_changed().unwrap());

        // Edits build on the restored value.
        let next = handle.set_codec(CodecVariant::HueColorization).unwrap();
        assert_eq!(next.max_distance, 6.0);
        assert_eq!(next.codec.variant, CodecVariant::HueColorization);
    }

    #[test]
    fn test_roll_back_keeps_newer_edit() {
        let (handle, _rx) = ConfigHandle::new(StreamConfig::default(), DEFAULT_DEPTH_UNIT_SCALE);
        let accepted = handle.current();
        let rejected = handle.set_range(0.0, 7.0).unwrap();
        let newer = handle.set_range(0.5, 3.0).unwrap();

        assert!(!handle.roll_back(&rejected, accepted));
        assert_eq!(handle.current(), newer);
    }
}
