//! Image preprocessing ahead of text recognition.
//!
//! Scanned documents arrive as phone photos and flatbed scans with uneven
//! lighting. Recognition accuracy improves measurably if we first convert to
//! true grayscale and boost contrast, so that is the only transformation we
//! apply: per-pixel luminance (unweighted RGB mean) pushed through a fixed
//! contrast curve, written back to all three color channels.

use std::io::Cursor;

use image::{ImageFormat, Rgba};

use super::error::ScanError;
use crate::data_url::data_url;

/// MIME type of every preprocessed image we produce.
const PREPROCESSED_MIME_TYPE: &str = "image/png";

/// A grayscale, contrast-enhanced re-encoding of a scan source.
///
/// Lives only for the duration of one scan: created here, consumed by the
/// recognition engine, then dropped.
#[derive(Debug)]
pub struct PreprocessedImage {
    /// Always `image/png`, whatever the source format was.
    pub mime_type: &'static str,

    /// Raster width, unchanged from the source.
    pub width: u32,

    /// Raster height, unchanged from the source.
    pub height: u32,

    /// The PNG-encoded pixel data.
    pub data: Vec<u8>,
}

impl PreprocessedImage {
    /// Convert to a `data:` URL, for engines that take URL inputs.
    pub fn to_data_url(&self) -> String {
        data_url(self.mime_type, &self.data)
    }
}

/// Apply the contrast curve to a single luminance value.
///
/// `factor = 259 * (C + 255) / (255 * (259 - C))`, then
/// `factor * (luminance - 128) + 128`, clamped to the 0–255 channel range.
/// The raw formula overshoots at both ends, so the clamp is load-bearing.
pub fn contrast_value(luminance: f32, contrast: f32) -> u8 {
    let factor = (259.0 * (contrast + 255.0)) / (255.0 * (259.0 - contrast));
    (factor * (luminance - 128.0) + 128.0).round().clamp(0.0, 255.0) as u8
}

/// Decode a raster image and return its grayscale, contrast-enhanced PNG
/// re-encoding. Alpha is preserved untouched.
///
/// The input must already be a raster image (PNG, JPEG, WebP, GIF). Paginated
/// document formats are the caller's problem: render page 1 to a raster
/// first. Anything undecodable fails with [`ScanError::ImageDecode`].
pub fn preprocess_image(source: &[u8], contrast: f32) -> Result<PreprocessedImage, ScanError> {
    let decoded = image::load_from_memory(source)
        .map_err(|err| ScanError::image_decode_with_source("unreadable scan source", err))?;

    let mut pixels = decoded.into_rgba8();
    for pixel in pixels.pixels_mut() {
        let Rgba([r, g, b, a]) = *pixel;
        let luminance = (f32::from(r) + f32::from(g) + f32::from(b)) / 3.0;
        let value = contrast_value(luminance, contrast);
        *pixel = Rgba([value, value, value, a]);
    }

    let (width, height) = pixels.dimensions();
    let mut encoded = Cursor::new(Vec::new());
    pixels
        .write_to(&mut encoded, ImageFormat::Png)
        .map_err(|err| {
            ScanError::image_decode_with_source("could not re-encode preprocessed image", err)
        })?;

    Ok(PreprocessedImage {
        mime_type: PREPROCESSED_MIME_TYPE,
        width,
        height,
        data: encoded.into_inner(),
    })
}

#[cfg(test)]
mod tests {
    use image::{ImageBuffer, Rgba};

    use super::*;

    /// Encode a small RGBA test image as PNG bytes.
    fn png_bytes(pixels: &[[u8; 4]], width: u32, height: u32) -> Vec<u8> {
        let buffer: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::from_fn(width, height, |x, y| {
            Rgba(pixels[(y * width + x) as usize])
        });
        let mut out = std::io::Cursor::new(Vec::new());
        buffer
            .write_to(&mut out, ImageFormat::Png)
            .expect("test image should encode");
        out.into_inner()
    }

    #[test]
    fn contrast_transform_is_bounded() {
        for luminance in 0..=255u16 {
            let value = contrast_value(f32::from(luminance), 1.5);
            // `u8` already proves the upper bound; make the intent explicit.
            assert!(u16::from(value) <= 255, "luminance {luminance} overshot");
        }
    }

    #[test]
    fn contrast_transform_brightens_and_darkens_around_midpoint() {
        assert!(contrast_value(200.0, 1.5) > 200);
        assert!(contrast_value(50.0, 1.5) < 50);
        assert_eq!(contrast_value(128.0, 1.5), 128);
    }

    #[test]
    fn preprocess_produces_grayscale_png_with_same_dimensions() {
        let source = png_bytes(
            &[
                [200, 10, 90, 255],
                [0, 0, 0, 255],
                [255, 255, 255, 255],
                [12, 130, 240, 128],
            ],
            2,
            2,
        );
        let preprocessed = preprocess_image(&source, 1.5).expect("valid PNG should preprocess");
        assert_eq!(preprocessed.mime_type, "image/png");
        assert_eq!((preprocessed.width, preprocessed.height), (2, 2));

        let round_trip = image::load_from_memory(&preprocessed.data)
            .expect("preprocessed output should decode")
            .into_rgba8();
        assert_eq!(round_trip.dimensions(), (2, 2));
        for pixel in round_trip.pixels() {
            let Rgba([r, g, b, _]) = *pixel;
            assert_eq!(r, g);
            assert_eq!(g, b);
        }
        // Alpha must survive the transform.
        assert_eq!(round_trip.get_pixel(1, 1).0[3], 128);
    }

    #[test]
    fn undecodable_source_is_an_image_decode_error() {
        let err = preprocess_image(b"definitely not an image", 1.5)
            .expect_err("garbage bytes should not decode");
        assert!(matches!(err, ScanError::ImageDecode { .. }));
    }

    #[test]
    fn data_url_round_trip() {
        let source = png_bytes(&[[255, 255, 255, 255]], 1, 1);
        let preprocessed = preprocess_image(&source, 1.5).expect("valid PNG should preprocess");
        let url = preprocessed.to_data_url();
        assert!(url.starts_with("data:image/png;base64,"));
    }
}
