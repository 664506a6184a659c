//! Terminal UI: progress bars and messages that coexist with logging.

use std::{borrow::Cow, io, sync::Arc, time::Duration};

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Application UI state. Cheap to clone; all clones share one set of
/// progress bars.
#[derive(Clone)]
pub struct Ui {
    multi_progress: Arc<MultiProgress>,
}

impl Ui {
    /// Create a new UI.
    pub fn init() -> Ui {
        let multi_progress = Arc::new(MultiProgress::new());
        Ui { multi_progress }
    }

    /// Create a UI that draws nothing, for unit tests.
    pub fn init_hidden() -> Ui {
        let multi_progress =
            Arc::new(MultiProgress::with_draw_target(ProgressDrawTarget::hidden()));
        Ui { multi_progress }
    }

    /// Hide all progress bars completely, for when actual output goes to
    /// `stdout`.
    pub fn hide_progress_bars(&self) {
        self.multi_progress
            .set_draw_target(ProgressDrawTarget::hidden());
    }

    /// Get a writer for stderr that suspends progress bars while logging.
    pub fn get_stderr_writer(&self) -> SafeStderrWriter {
        SafeStderrWriter { ui: self.clone() }
    }

    /// Display a one-off message above the progress bars.
    pub fn display_message(&self, prefix: &str, message: &str) {
        // Failures here mean stderr is gone; nothing sensible left to do.
        let _ = self.multi_progress.println(format!("{prefix} {message}"));
    }

    /// Create a progress bar counting `len` batch records.
    pub fn new_batch_bar(&self, msg: &str, done_msg: &str, len: u64) -> ProgressBar {
        let pb = ProgressBar::new(len).with_style(batch_style());
        let pb = self.multi_progress.add(pb);
        pb.set_message(msg.to_owned());
        pb.enable_steady_tick(Duration::from_millis(250));
        pb.with_finish(indicatif::ProgressFinish::WithMessage(Cow::Owned(
            done_msg.to_owned(),
        )))
    }

    /// Create a 0–100 percent bar tracking a single in-flight scan.
    pub fn new_scan_bar(&self, id: &str) -> ProgressBar {
        let pb = ProgressBar::new(100).with_style(scan_style());
        let pb = self.multi_progress.add(pb);
        pb.set_prefix(id.to_owned());
        pb
    }
}

fn batch_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{msg:20} {pos:>4}/{len:4} {elapsed_precise} {wide_bar:.cyan/blue} {eta_precise}")
        .expect("bad progress bar template")
}

fn scan_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  {prefix:12} {bar:30.green} {pos:>3}%")
        .expect("bad progress bar template")
}

/// A writer for `stderr` which hides and shows progress bars as needed, so
/// log lines don't tear through them.
#[derive(Clone)]
pub struct SafeStderrWriter {
    ui: Ui,
}

impl io::Write for SafeStderrWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.ui.multi_progress.suspend(|| io::stderr().write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.ui.multi_progress.suspend(|| io::stderr().flush())
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.ui
            .multi_progress
            .suspend(|| io::stderr().write_all(buf))
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SafeStderrWriter {
    type Writer = SafeStderrWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
