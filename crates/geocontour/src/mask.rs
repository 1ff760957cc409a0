//! Mask decoding.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP, TIFF) and produces a
//! single-channel image whose bright pixels are foreground. Color masks
//! are reduced to luminance first, so any non-black label color counts as
//! foreground at the default threshold.

use image::GrayImage;

use crate::types::GeoContourError;

/// Decode raw image bytes into a single-channel mask.
///
/// # Errors
///
/// Returns [`GeoContourError::EmptyInput`] if `bytes` is empty.
/// Returns [`GeoContourError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
#[must_use = "returns the decoded mask"]
pub fn decode_mask(bytes: &[u8]) -> Result<GrayImage, GeoContourError> {
    if bytes.is_empty() {
        return Err(GeoContourError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    Ok(img.to_luma8())
}

/// Number of pixels strictly above `threshold`.
#[must_use]
pub fn foreground_pixel_count(mask: &GrayImage, threshold: u8) -> u64 {
    mask.pixels()
        .map(|p| u64::from(u8::from(p.0[0] > threshold)))
        .sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Encode an RGBA image as PNG bytes.
    fn encode_png(img: &image::RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .ok();
        buf
    }

    #[test]
    fn empty_input_returns_error() {
        let result = decode_mask(&[]);
        assert!(matches!(result, Err(GeoContourError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_returns_image_decode_error() {
        let result = decode_mask(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(GeoContourError::ImageDecode(_))));
    }

    #[test]
    fn output_dimensions_match_input() {
        let img = image::RgbaImage::from_fn(17, 31, |_, _| image::Rgba([0, 0, 0, 255]));
        let mask = decode_mask(&encode_png(&img)).unwrap();
        assert_eq!(mask.width(), 17);
        assert_eq!(mask.height(), 31);
    }

    #[test]
    fn colored_label_is_foreground() {
        let img = image::RgbaImage::from_fn(4, 4, |x, _| {
            if x < 2 {
                image::Rgba([0, 0, 200, 255])
            } else {
                image::Rgba([0, 0, 0, 255])
            }
        });
        let mask = decode_mask(&encode_png(&img)).unwrap();
        assert_eq!(foreground_pixel_count(&mask, 0), 8);
    }

    #[test]
    fn threshold_is_strict() {
        let mut mask = GrayImage::new(3, 1);
        mask.put_pixel(0, 0, image::Luma([10]));
        mask.put_pixel(1, 0, image::Luma([11]));
        assert_eq!(foreground_pixel_count(&mask, 10), 1);
        assert_eq!(foreground_pixel_count(&mask, 0), 2);
    }
}
