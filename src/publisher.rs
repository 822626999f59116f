//! Frame publishers: where finished colour frames go.
//!
//! Shared-texture senders (Spout, Syphon and friends) sit behind
//! [`FramePublisher`]. The in-process [`ChannelPublisher`] hands frames to an
//! async consumer and is what the binary and tests use.

use anyhow::Result;
use spacestream_codec::{ColorImage, StreamDescriptor};
use tokio::sync::mpsc;

/// Sink for finished frames.
pub trait FramePublisher: Send {
    /// Acquire transport resources. Called once before the first frame.
    fn setup(&mut self) -> Result<()> {
        Ok(())
    }

    /// Publish the stream configuration. Called before the first frame and
    /// again whenever codec, range or layout change.
    fn announce(&mut self, descriptor: &StreamDescriptor) -> Result<()>;

    /// Publish one frame.
    fn send(&mut self, frame: &ColorImage) -> Result<()>;

    /// Release transport resources. Called once when the pipeline stops.
    fn release(&mut self) {}

    /// Whether frames should be handed over in BGR order.
    fn wants_bgr(&self) -> bool {
        false
    }
}

/// A frame together with the configuration it was encoded with.
#[derive(Debug, Clone)]
pub struct PublishedFrame {
    /// Monotonic frame counter.
    pub sequence: u64,
    /// Stream configuration in force for this frame.
    pub descriptor: StreamDescriptor,
    /// The frame itself.
    pub image: ColorImage,
}

/// Publishes into a bounded tokio channel.
///
/// When the consumer falls behind, new frames are dropped rather than
/// queued, so latency stays bounded.
pub struct ChannelPublisher {
    tx: mpsc::Sender<PublishedFrame>,
    descriptor: Option<StreamDescriptor>,
    bgr: bool,
    sequence: u64,
    dropped: u64,
}

impl ChannelPublisher {
    /// Create a publisher and the receiving end of its channel.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<PublishedFrame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                tx,
                descriptor: None,
                bgr: false,
                sequence: 0,
                dropped: 0,
            },
            rx,
        )
    }

    /// Request BGR frames, as shared-texture senders expect.
    pub fn bgr(mut self, bgr: bool) -> Self {
        self.bgr = bgr;
        self
    }

    /// Frames dropped because the consumer lagged.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl FramePublisher for ChannelPublisher {
    fn announce(&mut self, descriptor: &StreamDescriptor) -> Result<()> {
        self.descriptor = Some(*descriptor);
        Ok(())
    }

    fn send(&mut self, frame: &ColorImage) -> Result<()> {
        let Some(descriptor) = self.descriptor else {
            anyhow::bail!("frame published before any stream descriptor");
        };
        let published = PublishedFrame {
            sequence: self.sequence,
            descriptor,
            image: frame.clone(),
        };
        self.sequence += 1;

        match self.tx.try_send(published) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped += 1;
                tracing::debug!("Consumer lagging, dropped frame ({} total)", self.dropped);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                anyhow::bail!("frame consumer closed")
            }
        }
    }

    fn release(&mut self) {
        if self.dropped > 0 {
            tracing::info!("Channel publisher released, {} frames dropped", self.dropped);
        }
    }

    fn wants_bgr(&self) -> bool {
        self.bgr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spacestream_codec::{Codec, DepthBounds};

    fn descriptor() -> StreamDescriptor {
        StreamDescriptor::new(&Codec::default(), DepthBounds::new(0, 6000).unwrap(), 0.001)
    }

    #[test]
    fn test_send_requires_descriptor() {
        let (mut publisher, _rx) = ChannelPublisher::new(2);
        assert!(publisher.send(&ColorImage::black(2, 2)).is_err());
    }

    #[tokio::test]
    async fn test_frames_carry_descriptor() {
        let (mut publisher, mut rx) = ChannelPublisher::new(4);
        publisher.announce(&descriptor()).unwrap();
        publisher.send(&ColorImage::black(2, 2)).unwrap();
        publisher.send(&ColorImage::black(2, 2)).unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.sequence, 0);
        assert_eq!(second.sequence, 1);
        assert_eq!(first.descriptor, descriptor());
    }

    #[test]
    fn test_drops_when_full() {
        let (mut publisher, _rx) = ChannelPublisher::new(1);
        publisher.announce(&descriptor()).unwrap();
        publisher.send(&ColorImage::black(1, 1)).unwrap();
        publisher.send(&ColorImage::black(1, 1)).unwrap();
        assert_eq!(publisher.dropped(), 1);
    }

    #[test]
    fn test_closed_consumer_is_an_error() {
        let (mut publisher, rx) = ChannelPublisher::new(1);
        drop(rx);
        publisher.announce(&descriptor()).unwrap();
        assert!(publisher.send(&ColorImage::black(1, 1)).is_err());
    }
}
