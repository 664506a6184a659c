//! Text-recognition engine interface.

use std::sync::{Arc, LazyLock};

use anyhow::anyhow;
use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::prelude::*;
use crate::scan::error::ScanError;
use crate::scan::preprocess::PreprocessedImage;
use crate::scan::progress::ProgressReporter;

pub mod fixed;
pub mod tesseract;

pub use fixed::FixedRecognizer;
pub use tesseract::TesseractRecognizer;

/// What a recognition engine returns for one preprocessed image.
#[derive(Clone, Debug)]
pub struct RecognitionResult {
    /// The recognized text, line structure intact.
    pub text: String,

    /// Engine confidence, 0–100. A calibration signal only: low confidence
    /// never rejects a scan.
    pub confidence: f32,
}

/// A pluggable text-recognition engine.
///
/// Implementations must be safe to call from concurrent scans: no mutable
/// engine state may be shared between calls. Engines that wrap a
/// non-reentrant backend should spawn one backend instance per call (as the
/// tesseract engine does with its child process) or serialize calls
/// internally.
#[async_trait]
pub trait TextRecognizer: Send + Sync + 'static {
    /// Recognize text in a preprocessed image.
    ///
    /// `language` is the engine language code to load (e.g. `"spa"`).
    /// Engines map whatever internal progress events they have onto
    /// `progress`; engines without events may report nothing, since the
    /// pipeline still brackets the scan with 0 and 100.
    async fn recognize(
        &self,
        image: &PreprocessedImage,
        language: &str,
        progress: &ProgressReporter,
    ) -> Result<RecognitionResult, ScanError>;
}

/// Get the recognition engine with the specified name.
///
/// `fixed_text` supplies the canned output for the `fixed` engine and is
/// ignored otherwise.
pub fn engine_for_name(
    name: &str,
    fixed_text: Option<String>,
) -> Result<Arc<dyn TextRecognizer>> {
    match name {
        "tesseract" => Ok(Arc::new(TesseractRecognizer::new())),
        "fixed" => {
            let text = fixed_text
                .ok_or_else(|| anyhow!("the fixed engine requires --fixed-text"))?;
            Ok(Arc::new(FixedRecognizer::new(text, 100.0)))
        }
        other => Err(anyhow!("unknown recognition engine: {other:?}")),
    }
}

/// Semaphore limiting concurrent recognition processes to the CPU count, so
/// a large batch does not fork more engines than there are cores.
static CPU_SEMAPHORE: LazyLock<Semaphore> = LazyLock::new(|| Semaphore::new(num_cpus::get()));

/// Call an async function while holding a permit from the CPU semaphore.
pub(crate) async fn with_cpu_permit<Func, Fut, R>(f: Func) -> Result<R, ScanError>
where
    Func: FnOnce() -> Fut,
    Fut: Future<Output = Result<R, ScanError>>,
{
    let _permit = CPU_SEMAPHORE
        .acquire()
        .await
        .map_err(|err| ScanError::recognition_engine_with_source("could not acquire CPU permit", err))?;
    f().await
}
