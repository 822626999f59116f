//! Capture → encode → compose → publish loop.

use std::time::Duration;

use anyhow::{Context, Result};
use spacestream_codec::{
    CodecSelector, CodecVariant, DepthBounds, DistanceRange, FrameLayout, PixelFormat,
    StreamDescriptor, DEFAULT_DEPTH_UNIT_SCALE,
};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::compose;
use crate::config::{ConfigHandle, StreamConfig};
use crate::publisher::FramePublisher;
use crate::source::DepthSource;

/// Builder for a [`Pipeline`].
pub struct PipelineBuilder<S, P> {
    source: S,
    publisher: P,
    config: StreamConfig,
    fps: Option<u32>,
    depth_unit_scale: f64,
}

impl<S: DepthSource, P: FramePublisher> PipelineBuilder<S, P> {
    /// Create a builder with the default configuration.
    pub fn new(source: S, publisher: P) -> Self {
        Self {
            source,
            publisher,
            config: StreamConfig::default(),
            fps: None,
            depth_unit_scale: DEFAULT_DEPTH_UNIT_SCALE,
        }
    }

    /// Set the initial configuration.
    pub fn config(mut self, config: StreamConfig) -> Self {
        self.config = config;
        self
    }

    /// Pace `run` to at most `fps` frames per second. Without a rate the
    /// loop runs as fast as the source delivers.
    pub fn fps(mut self, fps: u32) -> Self {
        self.fps = (fps > 0).then_some(fps);
        self
    }

    /// Sensor unit assumed until a frame reports its own.
    pub fn depth_unit_scale(mut self, scale: f64) -> Self {
        self.depth_unit_scale = scale;
        self
    }

    /// Validate the configuration and build the pipeline.
    pub fn build(self) -> Result<Pipeline<S, P>> {
        let range = self
            .config
            .range(self.depth_unit_scale)
            .context("invalid distance range")?;
        let selector = CodecSelector::new(self.config.codec).context("invalid codec")?;
        let (handle, config_rx) = ConfigHandle::new(self.config, self.depth_unit_scale);

        Ok(Pipeline {
            source: self.source,
            publisher: self.publisher,
            selector,
            config: self.config,
            config_rx,
            handle,
            range,
            descriptor: None,
            frame_interval: self
                .fps
                .map(|fps| Duration::from_secs_f64(1.0 / f64::from(fps))),
            started: false,
            frames: 0,
        })
    }
}

/// What happened to one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    /// Index of this frame among published frames.
    pub sequence: u64,
    /// Capture timestamp reported by the source.
    pub timestamp_us: u64,
    /// Codec the frame was encoded with.
    pub variant: CodecVariant,
    /// Raw bounds the frame was clamped to.
    pub bounds: DepthBounds,
    /// Layout of the published frame.
    pub layout: FrameLayout,
    /// Published frame width.
    pub width: u32,
    /// Published frame height.
    pub height: u32,
    /// Depth samples that carried a reading.
    pub valid_samples: usize,
}

/// Streams frames from a [`DepthSource`] to a [`FramePublisher`].
///
/// Configuration edits made through [`Pipeline::config_handle`] are applied
/// between frames, never during one.
pub struct Pipeline<S, P> {
    source: S,
    publisher: P,
    selector: CodecSelector,
    config: StreamConfig,
    config_rx: watch::Receiver<StreamConfig>,
    handle: ConfigHandle,
    range: DistanceRange,
    descriptor: Option<StreamDescriptor>,
    frame_interval: Option<Duration>,
    started: bool,
    frames: u64,
}

impl<S: DepthSource, P: FramePublisher> Pipeline<S, P> {
    /// Handle for editing the configuration while the pipeline runs.
    pub fn config_handle(&self) -> ConfigHandle {
        self.handle.clone()
    }

    /// Configuration applied to the most recent frame.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Current distance window.
    pub fn range(&self) -> &DistanceRange {
        &self.range
    }

    /// Last descriptor announced to the publisher.
    pub fn descriptor(&self) -> Option<&StreamDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Frames published so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Register a callback fired with the new variant whenever the codec
    /// changes.
    pub fn on_codec_change(&mut self, callback: impl Fn(CodecVariant) + Send + Sync + 'static) {
        self.selector.on_change(callback);
    }

    /// Set up the publisher and announce the initial configuration.
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }
        self.publisher.setup().context("publisher setup failed")?;
        self.started = true;

        let descriptor = self.describe(0, 0, FrameLayout::DepthOnly);
        self.announce(descriptor)?;
        tracing::info!(
            "Pipeline started: source={}, codec={}, range={}..{} m",
            self.source.name(),
            self.selector.active(),
            self.range.min_distance(),
            self.range.max_distance()
        );
        Ok(())
    }

    /// Apply a pending configuration edit, if any.
    ///
    /// An edit that cannot be applied is logged and rolled back in the
    /// handle, so later edits build on the configuration still in force.
    /// Returns whether an edit was applied.
    pub fn apply_pending(&mut self) -> bool {
        if !self.config_rx.has_changed().unwrap_or(false) {
            return false;
        }
        let next = *self.config_rx.borrow_and_update();
        if next == self.config {
            return false;
        }

        let range = match next.range(self.range.depth_unit_scale()) {
            Ok(range) => range,
            Err(e) => {
                tracing::warn!("Rejected configuration change: {:#}", e);
                self.handle.roll_back(&next, self.config);
                return false;
            }
        };
        let before = self.selector.active();
        if let Err(e) = self.selector.apply(next.codec) {
            tracing::warn!("Rejected configuration change: {}", e);
            self.handle.roll_back(&next, self.config);
            return false;
        }
        if before != self.selector.active() {
            tracing::info!("Codec changed: {} -> {}", before, self.selector.active());
        }
        if range != self.range {
            tracing::info!(
                "Range changed: {}..{} m ({}..{})",
                range.min_distance(),
                range.max_distance(),
                range.min_value(),
                range.max_value()
            );
        }

        self.range = range;
        self.config = next;
        true
    }

    /// Read, encode and publish one frame.
    ///
    /// Returns `Ok(None)` when the source had nothing to deliver.
    pub fn process_frame(&mut self) -> Result<Option<FrameReport>> {
        self.start()?;
        self.apply_pending();

        let Some(frame) = self.source.read()? else {
            return Ok(None);
        };

        if let Some(scale) = frame.depth_unit_scale {
            if scale != self.range.depth_unit_scale() {
                self.range = self
                    .range
                    .with_scale(scale)
                    .with_context(|| format!("range does not fit sensor unit {scale}"))?;
                self.handle.set_depth_unit_scale(scale);
                tracing::debug!(
                    "Depth unit {} m, bounds {}..{}",
                    scale,
                    self.range.min_value(),
                    self.range.max_value()
                );
            }
        }

        let bounds = self.range.bounds();
        let mut encoded =
            self.selector
                .encode(&frame.depth, bounds.min_value(), bounds.max_value())?;
        if self.config.median_filter {
            encoded = compose::median_filter_3x3(&encoded);
        }

        let (layout, mut image) = match &frame.color {
            Some(color) if self.config.compose_color => {
                let depth = compose::resize(&encoded, color.width, color.height)?;
                (FrameLayout::SideBySide, compose::side_by_side(&depth, color)?)
            }
            _ => (FrameLayout::DepthOnly, encoded),
        };
        if self.publisher.wants_bgr() {
            image = image.to_bgr();
        }

        let descriptor = self.describe(frame.depth.width, frame.depth.height, layout);
        self.announce(descriptor)?;
        self.publisher.send(&image)?;

        let report = FrameReport {
            sequence: self.frames,
            timestamp_us: frame.timestamp_us,
            variant: self.selector.active(),
            bounds,
            layout,
            width: image.width,
            height: image.height,
            valid_samples: frame.depth.valid_count(),
        };
        self.frames += 1;
        Ok(Some(report))
    }

    /// Process frames until the source is exhausted or `cancel` fires.
    ///
    /// Returns the number of frames published. The publisher is released on
    /// the way out, also on error.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<u64> {
        let result = self.run_loop(&cancel).await;
        self.release();
        result.map(|()| self.frames)
    }

    async fn run_loop(&mut self, cancel: &CancellationToken) -> Result<()> {
        self.start()?;

        let mut ticker = self.frame_interval.map(|period| {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });

        loop {
            if self.source.is_exhausted() {
                tracing::info!("Source {} exhausted", self.source.name());
                return Ok(());
            }

            match ticker.as_mut() {
                Some(interval) => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = interval.tick() => {}
                    }
                }
                None => {
                    if cancel.is_cancelled() {
                        break;
                    }
                    tokio::task::yield_now().await;
                }
            }

            if let Some(report) = self.process_frame()? {
                tracing::trace!(
                    "Frame {} ({}x{}, {}, {} valid)",
                    report.sequence,
                    report.width,
                    report.height,
                    report.variant,
                    report.valid_samples
                );
            }
        }

        tracing::info!("Pipeline cancelled after {} frames", self.frames);
        Ok(())
    }

    /// Release the publisher. Safe to call more than once.
    pub fn release(&mut self) {
        if self.started {
            self.publisher.release();
            self.started = false;
        }
    }

    fn describe(&self, width: u32, height: u32, layout: FrameLayout) -> StreamDescriptor {
        let pixel_format = if self.publisher.wants_bgr() {
            PixelFormat::Bgr
        } else {
            PixelFormat::Rgb
        };
        StreamDescriptor::new(
            self.selector.codec(),
            self.range.bounds(),
            self.range.depth_unit_scale(),
        )
        .depth_size(width, height)
        .layout(layout)
        .pixel_format(pixel_format)
    }

    fn announce(&mut self, descriptor: StreamDescriptor) -> Result<()> {
        if self.descriptor == Some(descriptor) {
            return Ok(());
        }
        self.publisher.announce(&descriptor)?;
        tracing::debug!(
            "Announced {} {:?} {}x{} bounds {}..{}",
            descriptor.codec.variant,
            descriptor.layout,
            descriptor.depth_width,
            descriptor.depth_height,
            descriptor.min_value,
            descriptor.max_value
        );
        self.descriptor = Some(descriptor);
        Ok(())
    }
}
