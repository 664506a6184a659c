//! A recognition engine with canned output.
//!
//! Used by tests and `--engine fixed` dry runs: the image still goes through
//! preprocessing, but recognition returns pre-supplied text and confidence
//! instead of invoking a real engine.

use async_trait::async_trait;

use super::{RecognitionResult, TextRecognizer};
use crate::scan::error::ScanError;
use crate::scan::preprocess::PreprocessedImage;
use crate::scan::progress::ProgressReporter;

/// Engine that always recognizes the same text.
pub struct FixedRecognizer {
    text: String,
    confidence: f32,
}

impl FixedRecognizer {
    pub fn new(text: String, confidence: f32) -> Self {
        Self { text, confidence }
    }
}

#[async_trait]
impl TextRecognizer for FixedRecognizer {
    async fn recognize(
        &self,
        _image: &PreprocessedImage,
        _language: &str,
        progress: &ProgressReporter,
    ) -> Result<RecognitionResult, ScanError> {
        // Emit one mid-recognition event so progress plumbing is exercised.
        progress.report(50);
        Ok(RecognitionResult {
            text: self.text.clone(),
            confidence: self.confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ImageBuffer, ImageFormat, Rgba};

    use super::*;

    #[tokio::test]
    async fn returns_canned_text_and_reports_progress() {
        let buffer: ImageBuffer<Rgba<u8>, Vec<u8>> =
            ImageBuffer::from_pixel(1, 1, Rgba([0, 0, 0, 255]));
        let mut out = Cursor::new(Vec::new());
        buffer
            .write_to(&mut out, ImageFormat::Png)
            .expect("test image should encode");
        let image = crate::scan::preprocess::preprocess_image(&out.into_inner(), 1.5)
            .expect("test image should preprocess");

        let engine = FixedRecognizer::new("CC 12345678".to_string(), 88.0);
        let progress = ProgressReporter::disabled();
        let result = engine
            .recognize(&image, "spa", &progress)
            .await
            .expect("fixed engine cannot fail");
        assert_eq!(result.text, "CC 12345678");
        assert_eq!(result.confidence, 88.0);
        assert_eq!(progress.position(), 50);
    }
}
