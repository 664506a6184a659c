//! Extract structured patient fields from scanned medical documents and IDs.
//!
//! The heart of the crate is a four-stage scan pipeline: normalize a raster
//! image (grayscale + contrast), run a pluggable text-recognition engine,
//! clean the recognized text, and extract fields (patient name, national ID,
//! attention type, clinical notes) with an ordered chain of labeled-pattern
//! heuristics. Extraction is best-effort by design: garbage input produces a
//! record full of sentinel values, never an error.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use medscan::engines::FixedRecognizer;
//! use medscan::{ProgressReporter, ScanOptions, scan_document};
//!
//! # async fn scan_one(image_bytes: &[u8]) -> Result<(), medscan::ScanError> {
//! let recognizer = FixedRecognizer::new("NOMBRE COMPLETO Juan Perez".to_string(), 96.0);
//! let progress = ProgressReporter::new(|percent| eprintln!("{percent}%"));
//! let record =
//!     scan_document(&recognizer, image_bytes, &ScanOptions::default(), &progress).await?;
//! println!("{} ({})", record.name, record.national_id);
//! # Ok(())
//! # }
//! ```
//!
//! The `medscan` binary wraps the same pipeline for batch work: a JSONL/CSV
//! stream of `{id, path}` records in, a stream of scan-result records out.

pub mod batch;
pub mod cmd;
pub mod data_url;
pub mod engines;
pub mod io;
pub mod prelude;
pub mod scan;
pub mod ui;

pub use engines::{RecognitionResult, TextRecognizer, engine_for_name};
pub use scan::{
    AttentionType, ExtractedRecord, ProgressReporter, ScanError, ScanOptions, scan_document,
};
