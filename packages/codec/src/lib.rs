//! Depth codecs for streaming 16-bit depth through 8-bit colour video.
//!
//! Real-time engines that consume shared-texture or video streams cannot take
//! raw 16-bit depth buffers. This crate packs each depth sample, clamped to an
//! operator-chosen distance window, into an RGB pixel, and provides the
//! inverse transform a receiving application applies to recover the depth up
//! to a documented quantization error.
//!
//! - [`LinearCodec`]: grey intensity, 255 uniform levels, lowest overhead
//! - [`HueColorizationCodec`]: hue sweep at full saturation, 1275 levels at
//!   the default 300° sweep, robust to lossy recompression
//!
//! Both can be combined with any [`RemapCurve`] to move precision towards the
//! near plane.
//!
//! # Quick Start
//!
//! ```
//! use spacestream_codec::{CodecConfig, CodecVariant, DepthBuffer, DepthCodec, DistanceRange};
//!
//! // 0–6 m at a 1 mm sensor unit: bounds 0..6000
//! let range = DistanceRange::meters(0.0, 6.0).unwrap();
//! let codec = CodecConfig::new(CodecVariant::HueColorization).build().unwrap();
//!
//! let depth = DepthBuffer::new(2, 1, vec![0, 3000]).unwrap();
//! let image = codec.encode(&depth, range.min_value(), range.max_value()).unwrap();
//!
//! // Receiving side, same configuration
//! let back = codec.decode(&image, range.min_value(), range.max_value()).unwrap();
//! assert_eq!(back.data[0], 0);
//! assert!(u32::from(back.data[1].abs_diff(3000)) <= codec.error_bound(range.bounds()));
//! ```
//!
//! # Architecture
//!
//! Every codec implements [`DepthCodec`], which owns the shared clamping and
//! "no reading" policy. [`Codec`] is the closed set of built codecs that the
//! [`CodecSelector`] switches between, and [`StreamDescriptor`] carries the
//! configuration to the receiver.

mod codec;
mod curve;
mod descriptor;
mod error;
mod frame;
mod hue;
mod linear;
mod range;
mod selector;
mod traits;
mod types;

pub use codec::Codec;
pub use curve::RemapCurve;
pub use descriptor::{FrameLayout, StreamDescriptor, DESCRIPTOR_VERSION};
pub use error::CodecError;
pub use frame::{ColorImage, DepthBuffer};
pub use hue::HueColorizationCodec;
pub use linear::LinearCodec;
pub use range::{DepthBounds, DistanceRange, DEFAULT_DEPTH_UNIT_SCALE, NO_READING};
pub use selector::CodecSelector;
pub use traits::DepthCodec;
pub use types::{CodecConfig, CodecVariant, PixelFormat, DEFAULT_HUE_SWEEP_DEGREES};
