//! Command-line entry points.

use clap::Args;
use futures::StreamExt as _;

use crate::{io::BoxedStream, prelude::*};

pub mod scan;
pub mod schema;

/// Common options for subcommands that process record streams.
#[derive(Debug, Clone, Args)]
pub struct StreamOpts {
    /// Limit processing to the first N records.
    #[clap(long)]
    take_first: Option<usize>,

    /// Max number of scans to run at a time. Defaults to the CPU count.
    #[clap(short = 'j', long = "jobs")]
    jobs: Option<usize>,

    /// What portion of scans may fail before the run itself fails, as a
    /// number between 0.0 and 1.0.
    #[clap(long, default_value = "0.01")]
    allowed_failure_rate: f32,
}

impl StreamOpts {
    /// How many scans to run concurrently.
    pub fn job_count(&self) -> usize {
        self.jobs.unwrap_or_else(num_cpus::get)
    }

    /// Apply any necessary stream opts to our input stream.
    pub fn apply_stream_input_opts<T>(
        &self,
        input: BoxedStream<Result<T>>,
    ) -> BoxedStream<Result<T>>
    where
        T: 'static,
    {
        if let Some(take_first) = self.take_first {
            input.take(take_first).boxed()
        } else {
            input
        }
    }
}
