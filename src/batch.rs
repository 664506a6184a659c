//! Batch scanning of record streams.
//!
//! One input record per document. A scan failure becomes a `failed` output
//! record instead of aborting the batch, because one corrupt photo must not
//! sink a pile of paperwork; the caller decides afterwards how many failures
//! it tolerates.

use std::sync::{Arc, Mutex};

use anyhow::bail;
use futures::StreamExt as _;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::data_url::decode_data_url;
use crate::engines::TextRecognizer;
use crate::io::BoxedStream;
use crate::prelude::*;
use crate::scan::{
    AttentionType, ExtractedRecord, ID_NOT_DETECTED, ProgressReporter, ScanOptions,
    UNKNOWN_PATIENT, scan_document,
};
use crate::ui::Ui;

/// An input record describing a document to scan.
#[derive(Clone, Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct ScanInput {
    /// The caller's ID for this document, echoed into the output.
    pub id: String,

    /// Path to a raster image file, or an inline `data:` URL payload.
    /// Paginated formats (PDF) are rejected; render page 1 to an image
    /// first.
    pub path: String,
}

/// Output status of a scanned document.
#[derive(Clone, Copy, Debug, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    /// The scan succeeded and identified the patient.
    Ok,

    /// The scan succeeded, but neither a name nor a national ID was found;
    /// the record needs human attention.
    Incomplete,

    /// The scan failed; see `errors`.
    Failed,
}

/// An output record describing one scanned document.
///
/// All extraction fields are absent on failure. `Option` fields serialize as
/// `null`/empty rather than being skipped, so CSV columns stay aligned.
#[derive(Clone, Debug, JsonSchema, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ScanOutput {
    /// The ID of the input record.
    pub id: String,

    /// The status of this scan.
    pub status: ScanStatus,

    /// Any errors that occurred during scanning.
    pub errors: Option<String>,

    /// The input path, echoed back.
    pub path: String,

    /// Extracted patient name, or the unknown-patient sentinel.
    pub name: Option<String>,

    /// Extracted national ID, or the not-detected sentinel.
    pub national_id: Option<String>,

    /// Attention-type classification.
    pub attention_type: Option<AttentionType>,

    /// Merged diagnostic sections or fallback excerpt.
    pub clinical_notes: Option<String>,

    /// Recognition confidence, 0–100.
    pub confidence: Option<u8>,
}

impl ScanOutput {
    fn from_record(input: &ScanInput, record: ExtractedRecord) -> Self {
        let identified =
            record.name != UNKNOWN_PATIENT || record.national_id != ID_NOT_DETECTED;
        Self {
            id: input.id.clone(),
            status: if identified {
                ScanStatus::Ok
            } else {
                ScanStatus::Incomplete
            },
            errors: None,
            path: input.path.clone(),
            name: Some(record.name),
            national_id: Some(record.national_id),
            attention_type: Some(record.attention_type),
            clinical_notes: Some(record.clinical_notes),
            confidence: Some(record.confidence),
        }
    }

    fn from_error(input: &ScanInput, err: anyhow::Error) -> Self {
        Self {
            id: input.id.clone(),
            status: ScanStatus::Failed,
            errors: Some(format!("{err:?}")),
            path: input.path.clone(),
            name: None,
            national_id: None,
            attention_type: None,
            clinical_notes: None,
            confidence: None,
        }
    }
}

/// Scan a stream of input records, up to `jobs` at a time.
///
/// Per-document scan failures are reported as `failed` records; only
/// malformed input records abort the stream.
pub fn scan_stream(
    input: BoxedStream<Result<ScanInput>>,
    engine: Arc<dyn TextRecognizer>,
    options: ScanOptions,
    jobs: usize,
    ui: Ui,
) -> BoxedStream<Result<ScanOutput>> {
    let options = Arc::new(options);
    input
        .map(move |input| {
            let engine = engine.clone();
            let options = options.clone();
            let ui = ui.clone();
            async move {
                let input = input?;
                Ok(scan_file(&input, engine.as_ref(), &options, &ui).await)
            }
        })
        .buffered(jobs)
        .boxed()
}

/// Scan one document and report the outcome as a record.
#[instrument(level = "debug", skip_all, fields(id = %input.id))]
pub async fn scan_file(
    input: &ScanInput,
    engine: &dyn TextRecognizer,
    options: &ScanOptions,
    ui: &Ui,
) -> ScanOutput {
    let bar = ui.new_scan_bar(&input.id);
    let bar_for_sink = bar.clone();
    let progress = ProgressReporter::new(move |percent| {
        bar_for_sink.set_position(u64::from(percent));
    });

    let result = scan_file_inner(input, engine, options, &progress).await;
    bar.finish_and_clear();
    match result {
        Ok(record) => ScanOutput::from_record(input, record),
        Err(err) => {
            warn!(id = %input.id, "scan failed: {err:?}");
            ScanOutput::from_error(input, err)
        }
    }
}

async fn scan_file_inner(
    input: &ScanInput,
    engine: &dyn TextRecognizer,
    options: &ScanOptions,
    progress: &ProgressReporter,
) -> Result<ExtractedRecord> {
    let source = read_source(&input.path).await?;
    let record = scan_document(engine, &source, options, progress)
        .await
        .with_context(|| format!("failed to scan {:?}", input.path))?;
    Ok(record)
}

/// Load a scan source from a filesystem path or an inline `data:` URL.
async fn read_source(path: &str) -> Result<Vec<u8>> {
    let bytes = match decode_data_url(path) {
        Some((_mime_type, data)) => data,
        None => tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {path:?}"))?,
    };
    // The pipeline only takes raster images. Catch the one paginated format
    // people actually feed it and say what to do instead.
    if bytes.starts_with(b"%PDF-") {
        bail!("{path:?} is a PDF; render its first page to a raster image before scanning");
    }
    Ok(bytes)
}

/// Counters accumulated while writing batch output.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScanCounters {
    /// How many records we processed.
    pub total: usize,

    /// How many scans failed outright.
    pub failed: usize,

    /// How many scans identified nobody.
    pub incomplete: usize,
}

impl ScanCounters {
    /// Wrap a stream so it updates counters as records flow through.
    pub fn wrap_stream(
        stream: BoxedStream<Result<ScanOutput>>,
    ) -> (BoxedStream<Result<ScanOutput>>, Arc<Mutex<ScanCounters>>) {
        let counters = Arc::new(Mutex::new(ScanCounters::default()));
        let counters_clone = counters.clone();
        let stream = stream
            .map(move |output| {
                let output = output?;
                counters_clone
                    .lock()
                    .expect("lock poisoned")
                    .update(&output);
                Ok(output)
            })
            .boxed();
        (stream, counters)
    }

    fn update(&mut self, output: &ScanOutput) {
        self.total += 1;
        match output.status {
            ScanStatus::Ok => {}
            ScanStatus::Incomplete => self.incomplete += 1,
            ScanStatus::Failed => self.failed += 1,
        }
    }

    /// Display totals and enforce the allowed failure rate.
    pub fn finish(self, ui: &Ui, allowed_failure_rate: f32) -> Result<()> {
        if self.incomplete > 0 {
            ui.display_message(
                "⚠️",
                &format!("{} scans identified no patient", self.incomplete),
            );
        }
        if self.failed > 0 {
            ui.display_message("❌", &format!("{} scans failed", self.failed));
        }
        if self.total == 0 {
            return Ok(());
        }
        let failure_rate = self.failed as f32 / self.total as f32;
        if failure_rate > allowed_failure_rate {
            bail!(
                "{}/{} ({:.2}%) of scans failed, but only {:.2}% were allowed",
                self.failed,
                self.total,
                failure_rate * 100.0,
                allowed_failure_rate * 100.0
            );
        }
        Ok(())
    }
}
