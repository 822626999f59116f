//! Depth buffers and colour images exchanged with the codecs.

use crate::{CodecError, PixelFormat};

/// A grid of raw depth samples in sensor units.
///
/// A sample of `0` means the sensor produced no reading for that pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthBuffer {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major samples, `width * height` entries.
    pub data: Vec<u16>,
}

impl DepthBuffer {
    /// Wrap existing samples, checking that they fill the grid exactly.
    pub fn new(width: u32, height: u32, data: Vec<u16>) -> Result<Self, CodecError> {
        let expected = pixel_count(width, height);
        if data.len() != expected {
            return Err(CodecError::buffer_len(expected, data.len()));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A buffer with every sample set to "no reading".
    #[must_use]
    pub fn zeroed(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; pixel_count(width, height)],
        }
    }

    /// Sample at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` lies outside the buffer.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> u16 {
        self.data[index(x, y, self.width, self.height)]
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of samples that carry a reading.
    #[must_use]
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|&&d| d != 0).count()
    }

    pub(crate) fn check_len(&self) -> Result<(), CodecError> {
        let expected = pixel_count(self.width, self.height);
        if self.data.len() != expected {
            return Err(CodecError::buffer_len(expected, self.data.len()));
        }
        Ok(())
    }
}

/// An 8-bit, three channel colour image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Channel order of `data`.
    pub pixel_format: PixelFormat,
    /// Interleaved pixel data, `width * height * 3` bytes.
    pub data: Vec<u8>,
}

impl ColorImage {
    /// Create an image, checking the data length against the dimensions.
    pub fn new(
        width: u32,
        height: u32,
        pixel_format: PixelFormat,
        data: Vec<u8>,
    ) -> Result<Self, CodecError> {
        let expected = pixel_count(width, height) * 3;
        if data.len() != expected {
            return Err(CodecError::buffer_len(expected, data.len()));
        }
        Ok(Self {
            width,
            height,
            pixel_format,
            data,
        })
    }

    /// Create an image from RGB data.
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Result<Self, CodecError> {
        Self::new(width, height, PixelFormat::Rgb, data)
    }

    /// Create an image from BGR data.
    pub fn from_bgr(width: u32, height: u32, data: Vec<u8>) -> Result<Self, CodecError> {
        Self::new(width, height, PixelFormat::Bgr, data)
    }

    /// A black RGB image.
    #[must_use]
    pub fn black(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixel_format: PixelFormat::Rgb,
            data: vec![0; pixel_count(width, height) * 3],
        }
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Pixel at `(x, y)` as `[r, g, b]`, independent of the stored order.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` lies outside the image.
    #[must_use]
    pub fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = index(x, y, self.width, self.height) * 3;
        let px = [self.data[idx], self.data[idx + 1], self.data[idx + 2]];
        match self.pixel_format {
            PixelFormat::Rgb => px,
            PixelFormat::Bgr => [px[2], px[1], px[0]],
        }
    }

    /// Iterate over all pixels as `[r, g, b]`.
    pub fn rgb_pixels(&self) -> impl Iterator<Item = [u8; 3]> + '_ {
        let bgr = self.pixel_format == PixelFormat::Bgr;
        self.data.chunks_exact(3).map(move |px| {
            if bgr {
                [px[2], px[1], px[0]]
            } else {
                [px[0], px[1], px[2]]
            }
        })
    }

    /// Convert to RGB order. Returns a clone if already RGB.
    #[must_use]
    pub fn to_rgb(&self) -> ColorImage {
        match self.pixel_format {
            PixelFormat::Rgb => self.clone(),
            PixelFormat::Bgr => self.swapped(PixelFormat::Rgb),
        }
    }

    /// Convert to BGR order. Returns a clone if already BGR.
    #[must_use]
    pub fn to_bgr(&self) -> ColorImage {
        match self.pixel_format {
            PixelFormat::Bgr => self.clone(),
            PixelFormat::Rgb => self.swapped(PixelFormat::Bgr),
        }
    }

    fn swapped(&self, pixel_format: PixelFormat) -> ColorImage {
        let mut data = self.data.clone();
        for px in data.chunks_exact_mut(3) {
            px.swap(0, 2);
        }
        ColorImage {
            width: self.width,
            height: self.height,
            pixel_format,
            data,
        }
    }

    pub(crate) fn check_len(&self) -> Result<(), CodecError> {
        let expected = pixel_count(self.width, self.height) * 3;
        if self.data.len() != expected {
            return Err(CodecError::buffer_len(expected, self.data.len()));
        }
        Ok(())
    }
}

fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

fn index(x: u32, y: u32, width: u32, height: u32) -> usize {
    assert!(x < width && y < height, "({x}, {y}) outside {width}x{height}");
    y as usize * width as usize + x as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_buffer_rejects_wrong_length() {
        let err = DepthBuffer::new(4, 4, vec![0; 15]).unwrap_err();
        assert!(matches!(err, CodecError::ShapeMismatch { .. }));
        assert!(DepthBuffer::new(4, 4, vec![0; 16]).is_ok());
    }

    #[test]
    fn test_color_image_rejects_wrong_length() {
        let err = ColorImage::from_rgb(2, 2, vec![0; 11]).unwrap_err();
        assert!(matches!(err, CodecError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_bgr_swap() {
        let rgb = ColorImage::from_rgb(2, 1, vec![255, 10, 0, 1, 2, 3]).unwrap();
        let bgr = rgb.to_bgr();
        assert_eq!(bgr.pixel_format, PixelFormat::Bgr);
        assert_eq!(bgr.data, vec![0, 10, 255, 3, 2, 1]);
        // Logical colour is unchanged by the reorder.
        assert_eq!(bgr.rgb_at(0, 0), [255, 10, 0]);
        assert_eq!(bgr.to_rgb(), rgb);
    }

    #[test]
    fn test_valid_count() {
        let depth = DepthBuffer::new(3, 1, vec![0, 500, 1200]).unwrap();
        assert_eq!(depth.valid_count(), 2);
        assert_eq!(depth.get(2, 0), 1200);
    }

    #[test]
    #[should_panic(expected = "outside 3x2")]
    fn test_get_rejects_column_past_row_end() {
        // (3, 0) would alias (0, 1) without the column check.
        let depth = DepthBuffer::new(3, 2, vec![1, 2, 3, 4, 5, 6]).unwrap();
        let _ = depth.get(3, 0);
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn test_rgb_at_large_coordinates() {
        let image = ColorImage::black(2, 2);
        let _ = image.rgb_at(u32::MAX, u32::MAX);
    }

    #[test]
    fn test_index_uses_wide_arithmetic() {
        let depth = DepthBuffer::new(4, 3, (0..12).collect()).unwrap();
        assert_eq!(depth.get(3, 2), 11);
        let image = ColorImage::from_rgb(1, 2, vec![0, 0, 0, 7, 8, 9]).unwrap();
        assert_eq!(image.rgb_at(0, 1), [7, 8, 9]);
    }
}
