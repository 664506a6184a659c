//! Record-stream I/O.
//!
//! Batch subcommands read a stream of input records from a file or standard
//! input, and write a stream of output records to a file or standard output.
//! Both ends speak JSONL and CSV; the format is chosen by file extension,
//! falling back to a peek at the first byte for extension-less input.
//!
//! Inputs are small record lists (one line per document), so we read them
//! whole and parse synchronously instead of maintaining a fully streaming
//! reader stack.

use std::pin::Pin;

use futures::{Stream, StreamExt as _, stream};
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};

use crate::prelude::*;

/// A type alias for a boxed stream, to keep signatures readable.
pub type BoxedStream<Item> = Pin<Box<dyn Stream<Item = Item> + Send>>;

/// Record formats we read and write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RecordFormat {
    Jsonl,
    Csv,
}

/// Pick a format from a path's extension, if it has a recognizable one.
fn format_for_path(path: Option<&Path>) -> Option<RecordFormat> {
    let extension = path?.extension()?.to_str()?;
    match extension.to_ascii_lowercase().as_str() {
        "csv" => Some(RecordFormat::Csv),
        "jsonl" | "json" => Some(RecordFormat::Jsonl),
        _ => None,
    }
}

/// JSONL records start with an object brace; anything else is CSV.
fn format_for_content(content: &str) -> RecordFormat {
    match content.trim_start().as_bytes().first() {
        Some(b'{') => RecordFormat::Jsonl,
        _ => RecordFormat::Csv,
    }
}

/// Read a record stream from a [`Path`] or from standard input.
pub async fn read_records<T>(path: Option<&Path>) -> Result<BoxedStream<Result<T>>>
where
    T: DeserializeOwned + Send + 'static,
{
    let content = match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buffer)
                .await
                .context("failed to read standard input")?;
            buffer
        }
    };

    let format = format_for_path(path).unwrap_or_else(|| format_for_content(&content));
    let records = match format {
        RecordFormat::Jsonl => content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str::<T>(line)
                    .with_context(|| format!("failed to parse input record: {line}"))
            })
            .collect::<Vec<_>>(),
        RecordFormat::Csv => csv::Reader::from_reader(content.as_bytes())
            .deserialize::<T>()
            .map(|record| record.context("failed to parse input CSV record"))
            .collect::<Vec<_>>(),
    };
    Ok(stream::iter(records).boxed())
}

/// Write a record stream to a [`Path`] or to standard output.
///
/// JSONL records are written as they arrive; CSV output is buffered through
/// the CSV writer and flushed at the end so headers come out once.
pub async fn write_records<T>(
    path: Option<&Path>,
    mut records: BoxedStream<Result<T>>,
) -> Result<()>
where
    T: Serialize,
{
    let format = format_for_path(path).unwrap_or(RecordFormat::Jsonl);
    let mut writer: Pin<Box<dyn tokio::io::AsyncWrite + Send>> = match path {
        Some(path) => Box::pin(
            tokio::fs::File::create(path)
                .await
                .with_context(|| format!("failed to create {}", path.display()))?,
        ),
        None => Box::pin(tokio::io::stdout()),
    };

    match format {
        RecordFormat::Jsonl => {
            while let Some(record) = records.next().await {
                let mut line = serde_json::to_string(&record?)
                    .context("failed to serialize output record")?;
                line.push('\n');
                writer.write_all(line.as_bytes()).await?;
            }
        }
        RecordFormat::Csv => {
            let mut csv_writer = csv::Writer::from_writer(Vec::new());
            while let Some(record) = records.next().await {
                csv_writer
                    .serialize(record?)
                    .context("failed to serialize output CSV record")?;
            }
            let buffer = csv_writer
                .into_inner()
                .map_err(|err| anyhow::anyhow!("failed to flush CSV output: {err}"))?;
            writer.write_all(&buffer).await?;
        }
    }
    writer.flush().await?;
    Ok(())
}
