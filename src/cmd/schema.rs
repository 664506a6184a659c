//! The `schema` subcommand.

use clap::{Args, ValueEnum};
use schemars::schema_for;

use crate::{
    batch::{ScanInput, ScanOutput},
    prelude::*,
    scan::ExtractedRecord,
};

/// Options for the `schema` subcommand.
#[derive(Debug, Args)]
pub struct SchemaOpts {
    /// Which record format to print.
    #[clap(long, value_enum, default_value = "scan-output")]
    pub format: SchemaFormat,

    /// Output file. Writes to standard output if omitted.
    #[clap(short = 'o', long = "output")]
    pub output_path: Option<PathBuf>,
}

/// Record formats we can describe.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum SchemaFormat {
    /// Input records accepted by `scan`.
    ScanInput,

    /// Output records produced by `scan`.
    ScanOutput,

    /// The bare extracted-record payload.
    ExtractedRecord,
}

/// The `schema` subcommand.
pub async fn cmd_schema(opts: &SchemaOpts) -> Result<()> {
    let schema = match opts.format {
        SchemaFormat::ScanInput => schema_for!(ScanInput),
        SchemaFormat::ScanOutput => schema_for!(ScanOutput),
        SchemaFormat::ExtractedRecord => schema_for!(ExtractedRecord),
    };
    let json =
        serde_json::to_string_pretty(&schema).context("failed to serialize schema")?;
    match &opts.output_path {
        Some(path) => tokio::fs::write(path, format!("{json}\n"))
            .await
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}
