//! Tesseract recognition engine.
//!
//! Wraps the `tesseract` CLI tool: the preprocessed image is written to a
//! temporary file, tesseract produces plain text plus a TSV with per-word
//! confidences, and the document confidence is the mean word confidence.
//! One child process per scan, so concurrent scans never share engine state;
//! the process is killed if the scan future is dropped.

use std::{
    fs::{File, read_to_string},
    io::Write as _,
};

use async_trait::async_trait;
use tokio::process::Command;

use super::{RecognitionResult, TextRecognizer, with_cpu_permit};
use crate::prelude::*;
use crate::scan::error::ScanError;
use crate::scan::preprocess::PreprocessedImage;
use crate::scan::progress::ProgressReporter;

/// Recognition engine wrapping the `tesseract` CLI tool.
#[non_exhaustive]
pub struct TesseractRecognizer {}

impl TesseractRecognizer {
    /// Create a new `tesseract` engine. Requires the `tesseract` binary (and
    /// the requested language's traineddata) on the PATH at scan time.
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    #[instrument(level = "debug", skip_all, fields(language = %language))]
    async fn recognize(
        &self,
        image: &PreprocessedImage,
        language: &str,
        progress: &ProgressReporter,
    ) -> Result<RecognitionResult, ScanError> {
        let extension = mime_guess::get_mime_extensions_str(image.mime_type)
            .and_then(|extensions| extensions.first())
            .ok_or_else(|| {
                ScanError::recognition_engine(format!(
                    "cannot determine extension for {}",
                    image.mime_type
                ))
            })?;

        // Write our input to a temporary file.
        let tmpdir = tempfile::TempDir::with_prefix("medscan").map_err(|err| {
            ScanError::recognition_engine_with_source("cannot create temporary directory", err)
        })?;
        let input_path = tmpdir.path().join(format!("input.{}", extension));
        let output_base = tmpdir.path().join("output");
        let mut input_file = File::create(&input_path).map_err(|err| {
            ScanError::recognition_engine_with_source("cannot create tesseract input file", err)
        })?;
        input_file.write_all(&image.data).map_err(|err| {
            ScanError::recognition_engine_with_source("cannot write tesseract input file", err)
        })?;
        input_file.flush().map_err(|err| {
            ScanError::recognition_engine_with_source("cannot flush tesseract input file", err)
        })?;

        // The CLI tool emits no incremental progress events, so the caller
        // only sees the pipeline's 0 and 100 brackets.
        let output = with_cpu_permit(|| async {
            Command::new("tesseract")
                .arg(&input_path)
                .arg(&output_base)
                .args(["-l", language])
                .args(["txt", "tsv"])
                .kill_on_drop(true)
                .output()
                .await
                .map_err(|err| {
                    ScanError::recognition_engine_with_source("cannot run tesseract", err)
                })
        })
        .await?;
        check_for_engine_failure("tesseract", &output)?;

        let text = read_to_string(output_base.with_extension("txt")).map_err(|err| {
            ScanError::recognition_engine_with_source("cannot read tesseract output file", err)
        })?;
        let confidence = read_to_string(output_base.with_extension("tsv"))
            .map(|tsv| mean_word_confidence(&tsv))
            .unwrap_or_else(|err| {
                warn!("cannot read tesseract TSV output: {err}");
                0.0
            });
        progress.report(99);

        Ok(RecognitionResult { text, confidence })
    }
}

/// Report an engine process failure, including any error output.
fn check_for_engine_failure(
    command_name: &str,
    output: &std::process::Output,
) -> Result<(), ScanError> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    error!(command_name, output = %stderr, "engine command failed");
    match output.status.code() {
        Some(exit_code) => Err(ScanError::recognition_engine(format!(
            "{command_name} failed with exit code {exit_code} and error output:\n{stderr}"
        ))),
        None => Err(ScanError::recognition_engine(format!(
            "{command_name} failed with error output:\n{stderr}"
        ))),
    }
}

/// Mean confidence over word rows in tesseract TSV output.
///
/// Word rows carry a 0–100 `conf` value; structural rows (pages, blocks,
/// lines) carry -1 and are skipped. No words means confidence 0.
fn mean_word_confidence(tsv: &str) -> f32 {
    let mut total = 0.0f32;
    let mut count = 0u32;
    for line in tsv.lines().skip(1) {
        let Some(conf_field) = line.split('\t').nth(10) else {
            continue;
        };
        let Ok(conf) = conf_field.trim().parse::<f32>() else {
            continue;
        };
        if conf >= 0.0 {
            total += conf;
            count += 1;
        }
    }
    if count == 0 { 0.0 } else { total / count as f32 }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TSV_HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    #[test]
    fn mean_confidence_skips_structural_rows() {
        let tsv = format!(
            "{TSV_HEADER}\n\
             1\t1\t0\t0\t0\t0\t0\t0\t100\t100\t-1\t\n\
             5\t1\t1\t1\t1\t1\t0\t0\t50\t20\t90\tNOMBRE\n\
             5\t1\t1\t1\t1\t2\t55\t0\t50\t20\t70\tJuan\n"
        );
        assert_eq!(mean_word_confidence(&tsv), 80.0);
    }

    #[test]
    fn mean_confidence_is_zero_without_words() {
        let tsv = format!("{TSV_HEADER}\n1\t1\t0\t0\t0\t0\t0\t0\t100\t100\t-1\t\n");
        assert_eq!(mean_word_confidence(&tsv), 0.0);
        assert_eq!(mean_word_confidence(""), 0.0);
    }

    #[test]
    fn mean_confidence_ignores_malformed_rows() {
        let tsv = format!("{TSV_HEADER}\nnot a real row\n5\t1\t1\t1\t1\t1\t0\t0\t9\t9\t60\tok\n");
        assert_eq!(mean_word_confidence(&tsv), 60.0);
    }
}
