//! Image plumbing around the codec: post-filtering, resizing and layout of
//! the published frame.

use anyhow::{Context, Result};
use image::imageops::{self, FilterType};
use image::RgbImage;
use spacestream_codec::ColorImage;

/// View a codec image as an `image` buffer (RGB order).
pub fn to_rgb_image(image: &ColorImage) -> Result<RgbImage> {
    let rgb = image.to_rgb();
    RgbImage::from_raw(rgb.width, rgb.height, rgb.data)
        .with_context(|| format!("image data does not fill {}x{}", image.width, image.height))
}

/// Convert an `image` buffer back into a codec image.
pub fn from_rgb_image(image: RgbImage) -> Result<ColorImage> {
    let (width, height) = image.dimensions();
    Ok(ColorImage::from_rgb(width, height, image.into_raw())?)
}

/// Resize with nearest-neighbour sampling.
///
/// Interpolating filters would blend neighbouring codes (and the sentinel)
/// into colours that decode to depths present nowhere in the scene.
pub fn resize(image: &ColorImage, width: u32, height: u32) -> Result<ColorImage> {
    if image.dimensions() == (width, height) {
        return Ok(image.clone());
    }
    let rgb = to_rgb_image(image)?;
    from_rgb_image(imageops::resize(&rgb, width, height, FilterType::Nearest))
}

/// Place `left` and `right` next to each other. Heights must match.
pub fn side_by_side(left: &ColorImage, right: &ColorImage) -> Result<ColorImage> {
    if left.height != right.height {
        anyhow::bail!(
            "cannot place {}x{} next to {}x{}",
            left.width,
            left.height,
            right.width,
            right.height
        );
    }
    let mut out = RgbImage::new(left.width + right.width, left.height);
    imageops::replace(&mut out, &to_rgb_image(left)?, 0, 0);
    imageops::replace(&mut out, &to_rgb_image(right)?, i64::from(left.width), 0);
    from_rgb_image(out)
}

/// Cut the `width x height` region at `(x, y)`.
pub fn crop(image: &ColorImage, x: u32, y: u32, width: u32, height: u32) -> Result<ColorImage> {
    let right = x.checked_add(width);
    let bottom = y.checked_add(height);
    if right.is_none_or(|r| r > image.width) || bottom.is_none_or(|b| b > image.height) {
        anyhow::bail!(
            "crop {}x{}+{}+{} outside {}x{} image",
            width,
            height,
            x,
            y,
            image.width,
            image.height
        );
    }
    let rgb = to_rgb_image(image)?;
    from_rgb_image(imageops::crop_imm(&rgb, x, y, width, height).to_image())
}

/// 3x3 median per channel, edges replicated.
///
/// Removes the single-pixel seams that depth-to-colour alignment leaves in
/// RealSense frames.
pub fn median_filter_3x3(image: &ColorImage) -> ColorImage {
    let (w, h) = (image.width as i64, image.height as i64);
    if w == 0 || h == 0 {
        return image.clone();
    }
    let mut data = vec![0u8; image.data.len()];
    let at = |x: i64, y: i64, c: usize| {
        let x = x.clamp(0, w - 1);
        let y = y.clamp(0, h - 1);
        image.data[((y * w + x) * 3) as usize + c]
    };

    let mut window = [0u8; 9];
    for y in 0..h {
        for x in 0..w {
            for c in 0..3 {
                let mut i = 0;
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        window[i] = at(x + dx, y + dy, c);
                        i += 1;
                    }
                }
                window.sort_unstable();
                data[((y * w + x) * 3) as usize + c] = window[4];
            }
        }
    }

    ColorImage {
        width: image.width,
        height: image.height,
        pixel_format: image.pixel_format,
        data,
    }
}
