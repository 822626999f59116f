//! spacestream - stream depth sensor data into real-time engines.
//!
//! Depth frames are encoded into 8-bit colour images with one of the codecs
//! in [`codec`], optionally placed next to the colour camera image, and handed
//! to a [`FramePublisher`]. The receiving side rebuilds the codec from the
//! [`StreamDescriptor`] announced alongside the frames.
//!
//! ```no_run
//! use spacestream::{ChannelPublisher, PipelineBuilder, SyntheticDepthSource};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let (publisher, mut frames) = ChannelPublisher::new(4);
//! let mut pipeline = PipelineBuilder::new(SyntheticDepthSource::new(640, 480), publisher)
//!     .fps(30)
//!     .build()?;
//!
//! tokio::spawn(async move {
//!     while let Some(frame) = frames.recv().await {
//!         println!("frame {} ({})", frame.sequence, frame.descriptor.codec.variant);
//!     }
//! });
//! pipeline.run(CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

pub use spacestream_codec as codec;

pub mod compose;
pub mod config;
pub mod pipeline;
pub mod publisher;
pub mod receiver;
pub mod source;

#[cfg(feature = "realsense")]
pub mod realsense;

pub use codec::{
    CodecConfig, CodecVariant, DepthCodec, DistanceRange, FrameLayout, RemapCurve,
    StreamDescriptor,
};
pub use config::{ConfigHandle, StreamConfig};
pub use pipeline::{FrameReport, Pipeline, PipelineBuilder};
pub use publisher::{ChannelPublisher, FramePublisher, PublishedFrame};
pub use receiver::StreamReceiver;
pub use source::{DepthFrame, DepthSource, SyntheticDepthSource};

#[cfg(feature = "realsense")]
pub use realsense::{list_devices, RealSenseSource};
