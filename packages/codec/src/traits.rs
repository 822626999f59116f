//! The encode/decode contract shared by every depth codec.

use crate::{CodecError, CodecVariant, ColorImage, DepthBounds, DepthBuffer, RemapCurve};

/// A reversible mapping from raw depth samples to RGB pixels.
///
/// Implementors only describe the per-pixel mapping; the provided methods
/// handle bounds validation, buffer shapes and channel order, so every codec
/// shares the same clamping and "no reading" policy:
///
/// - a sample of `0` encodes to [`DepthCodec::sentinel`] and decodes back to `0`
/// - other samples are clamped into `[min_value, max_value]` before encoding
///
/// Codecs are immutable once built, so a single instance can be shared
/// between threads.
///
/// # Example
///
/// ```
/// use spacestream_codec::{CodecConfig, CodecVariant, DepthBuffer, DepthCodec};
///
/// let codec = CodecConfig::new(CodecVariant::Linear).build().unwrap();
/// let depth = DepthBuffer::new(2, 1, vec![0, 3000]).unwrap();
///
/// let image = codec.encode(&depth, 0, 6000).unwrap();
/// let decoded = codec.decode(&image, 0, 6000).unwrap();
/// assert_eq!(decoded.data[0], 0);
/// assert!(decoded.data[1].abs_diff(3000) <= 24);
/// ```
pub trait DepthCodec: Send + Sync {
    /// Identity of this codec, exchanged with the receiver.
    fn variant(&self) -> CodecVariant;

    /// Remap curve applied before channel encoding.
    fn curve(&self) -> RemapCurve;

    /// Colour written for samples without a reading.
    fn sentinel(&self) -> [u8; 3];

    /// Number of distinct codes available to valid samples.
    fn levels(&self) -> u32;

    /// Encode one sample. `bounds` has already been validated.
    fn encode_sample(&self, d: u16, bounds: DepthBounds) -> [u8; 3];

    /// Decode one RGB pixel. Sentinel pixels decode to `0`.
    fn decode_pixel(&self, rgb: [u8; 3], bounds: DepthBounds) -> u16;

    /// Encode a depth buffer into an RGB image of the same dimensions.
    fn encode(
        &self,
        depth: &DepthBuffer,
        min_value: u16,
        max_value: u16,
    ) -> Result<ColorImage, CodecError> {
        let bounds = DepthBounds::new(min_value, max_value)?;
        depth.check_len()?;

        let mut data = Vec::with_capacity(depth.data.len() * 3);
        for &d in &depth.data {
            data.extend_from_slice(&self.encode_sample(d, bounds));
        }
        ColorImage::from_rgb(depth.width, depth.height, data)
    }

    /// Decode an image produced by [`DepthCodec::encode`] with the same bounds.
    fn decode(
        &self,
        image: &ColorImage,
        min_value: u16,
        max_value: u16,
    ) -> Result<DepthBuffer, CodecError> {
        let mut out = DepthBuffer::zeroed(image.width, image.height);
        self.decode_into(image, min_value, max_value, &mut out)?;
        Ok(out)
    }

    /// Decode into a caller-provided buffer, which must match the image size.
    fn decode_into(
        &self,
        image: &ColorImage,
        min_value: u16,
        max_value: u16,
        out: &mut DepthBuffer,
    ) -> Result<(), CodecError> {
        let bounds = DepthBounds::new(min_value, max_value)?;
        image.check_len()?;
        if image.dimensions() != out.dimensions() {
            return Err(CodecError::dimensions(out.dimensions(), image.dimensions()));
        }
        out.check_len()?;

        for (slot, rgb) in out.data.iter_mut().zip(image.rgb_pixels()) {
            *slot = self.decode_pixel(rgb, bounds);
        }
        Ok(())
    }

    /// Worst-case round-trip error for in-range samples with the identity curve.
    fn error_bound(&self, bounds: DepthBounds) -> u32 {
        bounds.quantization_bound(self.levels())
    }
}
