//! The `scan` subcommand.

use clap::Args;
use futures::{Stream as _, StreamExt as _};

use crate::{
    batch::{ScanCounters, ScanInput, scan_stream},
    engines::engine_for_name,
    io::{read_records, write_records},
    prelude::*,
    scan::{DEFAULT_CONTRAST_FACTOR, DEFAULT_RECOGNITION_LANGUAGE, ScanOptions},
    ui::Ui,
};

use super::StreamOpts;

/// Options for the `scan` subcommand.
#[derive(Debug, Args)]
pub struct ScanOpts {
    /// Input records (JSONL or CSV) with `id` and `path` fields. Reads
    /// standard input if omitted.
    pub input_path: Option<PathBuf>,

    /// Recognition engine: `tesseract` or `fixed`.
    #[clap(long, default_value = "tesseract")]
    pub engine: String,

    /// Language model the recognition engine should load.
    #[clap(long = "lang", default_value = DEFAULT_RECOGNITION_LANGUAGE)]
    pub recognition_language: String,

    /// Contrast constant applied while preprocessing scan images.
    #[clap(long, default_value_t = DEFAULT_CONTRAST_FACTOR)]
    pub contrast: f32,

    /// File with the canned recognition text for `--engine fixed`.
    #[clap(long)]
    pub fixed_text: Option<PathBuf>,

    #[clap(flatten)]
    pub stream_opts: StreamOpts,

    /// Output file (JSONL or CSV). Writes to standard output if omitted.
    #[clap(short = 'o', long = "output")]
    pub output_path: Option<PathBuf>,
}

/// The `scan` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_scan(ui: Ui, opts: &ScanOpts) -> Result<()> {
    let fixed_text = match &opts.fixed_text {
        Some(path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?,
        ),
        None => None,
    };
    let engine = engine_for_name(&opts.engine, fixed_text)?;
    let options = ScanOptions {
        recognition_language: opts.recognition_language.clone(),
        contrast_factor: opts.contrast,
    };

    // Open up our input stream and parse into records.
    let input = read_records::<ScanInput>(opts.input_path.as_deref()).await?;
    let input = opts.stream_opts.apply_stream_input_opts(input);

    // Configure our progress bar. Input streams know their length, since
    // record lists are read whole.
    let record_count = input.size_hint().1.unwrap_or(0) as u64;
    let pb = ui.new_batch_bar("Scanning documents", "Scanned documents", record_count);

    let output = scan_stream(
        input,
        engine,
        options,
        opts.stream_opts.job_count(),
        ui.clone(),
    );
    let (output, counters) = ScanCounters::wrap_stream(output);
    let output = pb.wrap_stream(output).boxed();
    write_records(opts.output_path.as_deref(), output).await?;

    let counters = counters.lock().expect("lock poisoned").to_owned();
    counters.finish(&ui, opts.stream_opts.allowed_failure_rate)
}
