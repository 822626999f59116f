//! Receiving side: turn published frames back into depth.

use anyhow::{Context, Result};
use spacestream_codec::{
    Codec, ColorImage, DepthBounds, DepthBuffer, DepthCodec, FrameLayout, StreamDescriptor,
};

use crate::compose;

/// Decodes frames described by a [`StreamDescriptor`].
#[derive(Debug, Clone)]
pub struct StreamReceiver {
    descriptor: StreamDescriptor,
    codec: Codec,
    bounds: DepthBounds,
}

impl StreamReceiver {
    /// Validate `descriptor` and build its codec.
    pub fn new(descriptor: StreamDescriptor) -> Result<Self> {
        descriptor.validate().context("invalid stream descriptor")?;
        Ok(Self {
            codec: descriptor.build_codec()?,
            bounds: descriptor.bounds()?,
            descriptor,
        })
    }

    /// Parse a JSON descriptor as received on the side channel.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::new(StreamDescriptor::from_json(json)?)
    }

    /// Switch to a new descriptor. No-op when it is unchanged.
    pub fn update(&mut self, descriptor: StreamDescriptor) -> Result<()> {
        if descriptor != self.descriptor {
            *self = Self::new(descriptor)?;
            tracing::debug!(
                "Receiver switched to {} {}..{}",
                descriptor.codec.variant,
                descriptor.min_value,
                descriptor.max_value
            );
        }
        Ok(())
    }

    pub fn descriptor(&self) -> &StreamDescriptor {
        &self.descriptor
    }

    /// Worst-case decode error in raw units, for the identity curve.
    pub fn error_bound(&self) -> u32 {
        self.codec.error_bound(self.bounds)
    }

    /// Decode untagged pixel bytes in the descriptor's channel order.
    pub fn decode_raw(&self, width: u32, height: u32, data: Vec<u8>) -> Result<DepthBuffer> {
        let image = ColorImage::new(width, height, self.descriptor.pixel_format, data)?;
        self.decode(&image)
    }

    /// Decode a received frame into raw depth at the sender's depth size.
    pub fn decode(&self, frame: &ColorImage) -> Result<DepthBuffer> {
        let depth_region = match self.descriptor.layout {
            FrameLayout::DepthOnly => frame.clone(),
            FrameLayout::SideBySide => {
                if frame.width % 2 != 0 {
                    anyhow::bail!("side-by-side frame has odd width {}", frame.width);
                }
                compose::crop(frame, 0, 0, frame.width / 2, frame.height)?
            }
        };

        let (w, h) = (self.descriptor.depth_width, self.descriptor.depth_height);
        let depth_region = if w > 0 && h > 0 {
            compose::resize(&depth_region, w, h)?
        } else {
            depth_region
        };

        Ok(self.codec.decode(
            &depth_region,
            self.bounds.min_value(),
            self.bounds.max_value(),
        )?)
    }
}
