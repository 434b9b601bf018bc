//! JPEG compression for cover images and place photos.
//!
//! Callers choose the quality; nothing here recompresses stored bytes.

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;

use crate::error::CoreError;

/// Quality used for travel plan and plan cover images.
pub const COVER_JPEG_QUALITY: f32 = 0.8;

/// Quality used for visited-place photos.
pub const PHOTO_JPEG_QUALITY: f32 = 0.7;

const INVALID_IMAGE_DATA: &str = "invalid image data";

/// Map a `0.0..=1.0` quality onto the encoder's `1..=100` scale.
pub fn quality_percent(quality: f32) -> u8 {
    (quality.clamp(0.01, 1.0) * 100.0).round() as u8
}

/// Compress `image` to JPEG bytes.
///
/// Fails with [`CoreError::InvalidPayload`] for empty images or when the
/// encoder rejects the pixel data.
pub fn encode_jpeg(image: &DynamicImage, quality: f32) -> Result<Vec<u8>, CoreError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(CoreError::InvalidPayload(INVALID_IMAGE_DATA.into()));
    }

    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut bytes, quality_percent(quality));
    rgb.write_with_encoder(encoder)
        .map_err(|e| CoreError::InvalidPayload(format!("{INVALID_IMAGE_DATA}: {e}")))?;
    Ok(bytes)
}

/// Decode stored image bytes (JPEG or PNG).
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, CoreError> {
    image::load_from_memory(bytes)
        .map_err(|e| CoreError::InvalidPayload(format!("{INVALID_IMAGE_DATA}: {e}")))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use image::{Rgba, RgbaImage};

    use super::*;

    fn sample(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([200, 40, 90, 128])))
    }

    #[test]
    fn encoded_jpeg_keeps_dimensions() {
        let bytes = encode_jpeg(&sample(32, 20), COVER_JPEG_QUALITY).unwrap();
        let decoded = decode_image(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 20));
    }

    #[test]
    fn empty_image_is_invalid_payload() {
        assert_matches!(
            encode_jpeg(&sample(0, 0), COVER_JPEG_QUALITY),
            Err(CoreError::InvalidPayload(_))
        );
    }

    #[test]
    fn garbage_bytes_do_not_decode() {
        assert_matches!(decode_image(b"not an image"), Err(CoreError::InvalidPayload(_)));
    }

    #[test]
    fn quality_maps_to_percent() {
        assert_eq!(quality_percent(0.85), 85);
        assert_eq!(quality_percent(0.7), 70);
        assert_eq!(quality_percent(2.0), 100);
        assert_eq!(quality_percent(0.0), 1);
    }
}
