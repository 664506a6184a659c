//! The document scan pipeline.
//!
//! One scan takes a raster image through four stages: preprocessing
//! (grayscale + contrast), text recognition (a pluggable engine), text
//! cleanup, and field extraction. Preprocessing and extraction are
//! synchronous and CPU-cheap; recognition is the only stage that suspends,
//! so the pipeline is a single async call with no internal concurrency.
//!
//! Nothing is shared between scans. The recognizer is an explicit parameter
//! with its own lifecycle, and dropping the returned future cancels the scan
//! best-effort: engine child processes are killed and no partial result
//! escapes.

pub mod cleaner;
pub mod error;
pub mod extract;
pub mod preprocess;
pub mod progress;
pub mod record;

pub use cleaner::clean_text;
pub use error::ScanError;
pub use extract::extract_fields;
pub use preprocess::{PreprocessedImage, preprocess_image};
pub use progress::ProgressReporter;
pub use record::{AttentionType, ExtractedRecord, ID_NOT_DETECTED, UNKNOWN_PATIENT};

use crate::engines::TextRecognizer;
use crate::prelude::*;

/// Default recognition language, as an engine language code.
pub const DEFAULT_RECOGNITION_LANGUAGE: &str = "spa";

/// Default contrast constant for preprocessing.
pub const DEFAULT_CONTRAST_FACTOR: f32 = 1.5;

/// Per-scan configuration.
#[derive(Clone, Debug)]
pub struct ScanOptions {
    /// Language model the recognition engine should load.
    pub recognition_language: String,

    /// Contrast constant for the preprocessing transform.
    pub contrast_factor: f32,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            recognition_language: DEFAULT_RECOGNITION_LANGUAGE.to_string(),
            contrast_factor: DEFAULT_CONTRAST_FACTOR,
        }
    }
}

/// Run one scan end to end: preprocess, recognize, clean, extract.
///
/// `source` must be a raster image (PNG, JPEG, WebP, GIF); paginated
/// document formats must be rasterized by the caller first. Progress is
/// reported through `progress` on a monotonic 0–100 scale.
///
/// The only errors are [`ScanError::ImageDecode`] and
/// [`ScanError::RecognitionEngine`]; an unparseable but recognized document
/// is not an error and extracts to sentinel values instead. No timeout is
/// imposed here; wrap the future if you need one.
#[instrument(level = "debug", skip_all, fields(bytes = source.len()))]
pub async fn scan_document(
    recognizer: &dyn TextRecognizer,
    source: &[u8],
    options: &ScanOptions,
    progress: &ProgressReporter,
) -> Result<ExtractedRecord, ScanError> {
    progress.report(0);
    let preprocessed = preprocess_image(source, options.contrast_factor)?;
    debug!(
        width = preprocessed.width,
        height = preprocessed.height,
        "preprocessed scan source"
    );

    let recognition = recognizer
        .recognize(&preprocessed, &options.recognition_language, progress)
        .await?;
    debug!(
        confidence = recognition.confidence,
        chars = recognition.text.len(),
        "recognition complete"
    );

    let cleaned = clean_text(&recognition.text);
    let record = extract_fields(&cleaned, recognition.confidence);
    progress.report(100);
    Ok(record)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ImageBuffer, ImageFormat, Rgba};

    use super::*;
    use crate::engines::FixedRecognizer;

    fn blank_png() -> Vec<u8> {
        let buffer: ImageBuffer<Rgba<u8>, Vec<u8>> =
            ImageBuffer::from_pixel(4, 4, Rgba([255, 255, 255, 255]));
        let mut out = Cursor::new(Vec::new());
        buffer
            .write_to(&mut out, ImageFormat::Png)
            .expect("test image should encode");
        out.into_inner()
    }

    #[tokio::test]
    async fn scans_end_to_end_with_fixed_engine() {
        let recognizer = FixedRecognizer::new(
            "NOMBRE COMPLETO Juan Perez\nCC 12345678\nDiagnóstico: Gripe común".to_string(),
            92.4,
        );
        let progress = ProgressReporter::disabled();
        let record = scan_document(
            &recognizer,
            &blank_png(),
            &ScanOptions::default(),
            &progress,
        )
        .await
        .expect("fixed-engine scan should succeed");

        assert_eq!(record.name, "Juan Perez");
        assert_eq!(record.national_id, "12345678");
        assert_eq!(record.clinical_notes, "Diagnóstico: Gripe común");
        assert_eq!(record.confidence, 92);
        assert_eq!(progress.position(), 100);
    }

    #[tokio::test]
    async fn recognition_text_is_cleaned_before_extraction() {
        // Stray symbols around the label must not defeat extraction.
        let recognizer = FixedRecognizer::new("Nombre:|  Maria\\Lopez".to_string(), 80.0);
        let progress = ProgressReporter::disabled();
        let record = scan_document(
            &recognizer,
            &blank_png(),
            &ScanOptions::default(),
            &progress,
        )
        .await
        .expect("fixed-engine scan should succeed");
        assert_eq!(record.name, "MariaLopez");
    }

    #[tokio::test]
    async fn corrupt_source_fails_before_recognition() {
        let recognizer = FixedRecognizer::new("unused".to_string(), 100.0);
        let progress = ProgressReporter::disabled();
        let err = scan_document(
            &recognizer,
            b"not an image",
            &ScanOptions::default(),
            &progress,
        )
        .await
        .expect_err("garbage bytes should fail to decode");
        assert!(matches!(err, ScanError::ImageDecode { .. }));
    }
}
