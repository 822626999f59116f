//! Depth frame sources.
//!
//! The pipeline only needs something that yields one depth buffer (and
//! optionally a matching colour image) per call. Hardware sources live
//! behind feature flags; [`SyntheticDepthSource`] renders a deterministic
//! test scene and needs no device.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spacestream_codec::{ColorImage, DepthBuffer, DEFAULT_DEPTH_UNIT_SCALE};

/// One captured frame.
#[derive(Debug, Clone)]
pub struct DepthFrame {
    /// Capture timestamp in microseconds.
    pub timestamp_us: u64,
    /// Raw depth samples in sensor units.
    pub depth: DepthBuffer,
    /// Colour image from the same instant, if the source has one.
    pub color: Option<ColorImage>,
    /// Metres per raw depth unit, when the source reports it per frame.
    pub depth_unit_scale: Option<f64>,
}

/// Anything that yields depth frames.
pub trait DepthSource: Send {
    /// Read the next frame. `Ok(None)` means no frame was ready this time.
    fn read(&mut self) -> Result<Option<DepthFrame>>;

    /// True once the source will never produce another frame.
    fn is_exhausted(&self) -> bool {
        false
    }

    /// Human-readable name for logs.
    fn name(&self) -> &str;
}

impl<T: DepthSource + ?Sized> DepthSource for Box<T> {
    fn read(&mut self) -> Result<Option<DepthFrame>> {
        (**self).read()
    }

    fn is_exhausted(&self) -> bool {
        (**self).is_exhausted()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Deterministic test scene: a tilted floor-to-wall plane, a far band beyond
/// typical ranges, and a sphere orbiting in front, with random sensor
/// dropouts.
#[derive(Debug, Clone)]
pub struct SyntheticDepthSource {
    width: u32,
    height: u32,
    depth_unit_scale: f64,
    dropout: f64,
    seed: u64,
    with_color: bool,
    frame_limit: Option<u64>,
    next_index: u64,
}

impl SyntheticDepthSource {
    /// Frame interval the timestamps advance by (30 fps).
    pub const FRAME_INTERVAL_US: u64 = 33_333;

    /// Create a source of the given size with a 1 mm depth unit.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            depth_unit_scale: DEFAULT_DEPTH_UNIT_SCALE,
            dropout: 0.02,
            seed: 0x5eed,
            with_color: true,
            frame_limit: None,
            next_index: 0,
        }
    }

    /// Fraction of pixels without a reading.
    pub fn dropout(mut self, fraction: f64) -> Self {
        self.dropout = fraction.clamp(0.0, 1.0);
        self
    }

    /// Seed for the dropout pattern.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Whether frames carry a colour image.
    pub fn with_color(mut self, with_color: bool) -> Self {
        self.with_color = with_color;
        self
    }

    /// Stop after `frames` frames.
    pub fn frame_limit(mut self, frames: u64) -> Self {
        self.frame_limit = Some(frames);
        self
    }

    /// Report a different sensor unit. The scene keeps its size in metres.
    pub fn depth_unit_scale(mut self, scale: f64) -> Self {
        self.depth_unit_scale = scale;
        self
    }

    /// Render frame `index`. The same index always gives the same frame.
    pub fn frame_at(&self, index: u64) -> DepthFrame {
        let mut rng = StdRng::seed_from_u64(self.seed ^ index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        let (w, h) = (self.width, self.height);

        // Sphere centre orbits the middle of the image.
        let phase = index as f64 * 0.1;
        let cx = w as f64 * (0.5 + 0.25 * phase.cos());
        let cy = h as f64 * (0.5 + 0.2 * phase.sin());
        let radius = w.min(h) as f64 * 0.2;

        let mut depth = Vec::with_capacity((w * h) as usize);
        for y in 0..h {
            for x in 0..w {
                let metres = if rng.random::<f64>() < self.dropout {
                    None
                } else {
                    Some(self.scene_depth(x, y, cx, cy, radius))
                };
                depth.push(metres.map_or(0, |m| self.to_raw(m)));
            }
        }

        let color = self.with_color.then(|| self.color_at(index));

        DepthFrame {
            timestamp_us: index * Self::FRAME_INTERVAL_US,
            depth: DepthBuffer {
                width: w,
                height: h,
                data: depth,
            },
            color,
            depth_unit_scale: Some(self.depth_unit_scale),
        }
    }

    fn scene_depth(&self, x: u32, y: u32, cx: f64, cy: f64, radius: f64) -> f64 {
        let (w, h) = (self.width as f64, self.height as f64);
        // Top eighth of the image is a far wall beyond the usual window.
        if (y as f64) < h / 8.0 {
            return 8.0;
        }
        let dx = x as f64 - cx;
        let dy = y as f64 - cy;
        let r2 = dx * dx + dy * dy;
        if r2 < radius * radius {
            // Front surface of a sphere centred 1.5 m away.
            let bulge = (1.0 - r2 / (radius * radius)).sqrt();
            return 1.5 - 0.3 * bulge;
        }
        // Plane receding from 1 m at the bottom to 5 m near the top,
        // with a slight left-right tilt.
        let v = 1.0 - y as f64 / h;
        1.0 + 4.0 * v + 0.25 * (x as f64 / w)
    }

    fn to_raw(&self, metres: f64) -> u16 {
        (metres / self.depth_unit_scale)
            .round()
            .clamp(1.0, f64::from(u16::MAX)) as u16
    }

    fn color_at(&self, index: u64) -> ColorImage {
        let (w, h) = (self.width, self.height);
        let shift = (index % 256) as u32;
        let mut data = Vec::with_capacity((w * h * 3) as usize);
        for y in 0..h {
            for x in 0..w {
                data.push(((x * 255) / w.max(1)) as u8);
                data.push(((y * 255) / h.max(1)) as u8);
                data.push(((x + y + shift) % 256) as u8);
            }
        }
        ColorImage {
            width: w,
            height: h,
            pixel_format: spacestream_codec::PixelFormat::Rgb,
            data,
        }
    }
}

impl DepthSource for SyntheticDepthSource {
    fn read(&mut self) -> Result<Option<DepthFrame>> {
        if self.is_exhausted() {
            return Ok(None);
        }
        let frame = self.frame_at(self.next_index);
        self.next_index += 1;
        Ok(Some(frame))
    }

    fn is_exhausted(&self) -> bool {
        self.frame_limit
            .is_some_and(|limit| self.next_index >= limit)
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_are_deterministic() {
        let source = SyntheticDepthSource::new(32, 24);
        assert_eq!(source.frame_at(3).depth, source.frame_at(3).depth);
        assert_ne!(source.frame_at(3).depth, source.frame_at(4).depth);
    }

    #[test]
    fn test_frame_shape() {
        let frame = SyntheticDepthSource::new(40, 30).frame_at(0);
        assert_eq!(frame.depth.dimensions(), (40, 30));
        assert_eq!(frame.depth.data.len(), 1200);
        let color = frame.color.unwrap();
        assert_eq!(color.dimensions(), (40, 30));
        assert_eq!(color.data.len(), 3600);
        assert_eq!(frame.depth_unit_scale, Some(0.001));
    }

    #[test]
    fn test_dropout_produces_holes() {
        let none = SyntheticDepthSource::new(64, 64).dropout(0.0).frame_at(0);
        assert_eq!(none.depth.valid_count(), 64 * 64);

        let some = SyntheticDepthSource::new(64, 64).dropout(0.25).frame_at(0);
        let holes = 64 * 64 - some.depth.valid_count();
        assert!(holes > 600 && holes < 1500, "holes = {holes}");
    }

    #[test]
    fn test_scene_spans_beyond_default_window() {
        let frame = SyntheticDepthSource::new(64, 64).dropout(0.0).frame_at(0);
        let max = *frame.depth.data.iter().max().unwrap();
        let min = *frame.depth.data.iter().min().unwrap();
        assert_eq!(max, 8000);
        assert!(min >= 1000 && min < 1500);
    }

    #[test]
    fn test_frame_limit() {
        let mut source = SyntheticDepthSource::new(8, 8).frame_limit(2);
        assert!(source.read().unwrap().is_some());
        assert!(source.read().unwrap().is_some());
        assert!(source.is_exhausted());
        assert!(source.read().unwrap().is_none());
    }

    #[test]
    fn test_timestamps_advance() {
        let mut source = SyntheticDepthSource::new(8, 8);
        let a = source.read().unwrap().unwrap();
        let b = source.read().unwrap().unwrap();
        assert_eq!(b.timestamp_us - a.timestamp_us, SyntheticDepthSource::FRAME_INTERVAL_US);
    }

    #[test]
    fn test_scale_changes_raw_units() {
        let frame = SyntheticDepthSource::new(16, 16)
            .dropout(0.0)
            .depth_unit_scale(0.0001)
            .frame_at(0);
        assert_eq!(*frame.depth.data.iter().max().unwrap(), 65535);
        assert_eq!(frame.depth_unit_scale, Some(0.0001));
    }
}
