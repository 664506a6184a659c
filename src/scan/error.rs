//! Error types for the scan pipeline.
//!
//! Only two things can actually fail during a scan: decoding the source
//! image, and the recognition engine itself. Everything downstream of
//! recognition degrades to sentinel values instead of erroring, because
//! partial or garbage input is the normal case for photographed paper
//! documents and the workflow must always produce a record for human review.

use thiserror::Error;

/// Errors surfaced by [`scan_document`](crate::scan::scan_document).
///
/// Both variants propagate unchanged to the caller; the pipeline performs no
/// internal retry or recovery beyond releasing temp files and engine
/// processes.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The scan source could not be decoded into pixel data, or the
    /// preprocessed image could not be re-encoded.
    #[error("could not decode scan image: {message}")]
    ImageDecode {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The text-recognition engine failed, crashed, or was misconfigured.
    #[error("recognition engine failed: {message}")]
    RecognitionEngine {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ScanError {
    /// Create an `ImageDecode` error.
    pub fn image_decode<S: Into<String>>(message: S) -> Self {
        Self::ImageDecode {
            message: message.into(),
            source: None,
        }
    }

    /// Create an `ImageDecode` error with an underlying cause.
    pub fn image_decode_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ImageDecode {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a `RecognitionEngine` error.
    pub fn recognition_engine<S: Into<String>>(message: S) -> Self {
        Self::RecognitionEngine {
            message: message.into(),
            source: None,
        }
    }

    /// Create a `RecognitionEngine` error with an underlying cause.
    pub fn recognition_engine_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::RecognitionEngine {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
