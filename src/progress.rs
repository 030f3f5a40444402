//! Upload event stream and the cargo-style console renderer
//!
//! Upload code emits [`UploadEvent`]s into an [`EventSink`]. The console
//! display, the text log and the JSONL report are all sinks.
//! - File results scroll above
//! - A status line (or a byte bar during a session upload) stays at the bottom

use crossterm::style::{Color, Stylize};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::fs_enum::{UploadKind, UploadTarget};

#[derive(Debug, Clone)]
pub enum UploadEvent {
    RunStarted {
        root: PathBuf,
        remote_folder: String,
        files: usize,
        bytes: u64,
    },
    FileStarted {
        target: UploadTarget,
        kind: UploadKind,
    },
    SessionCreated {
        file_name: String,
        chunks: u64,
    },
    ChunkSent {
        file_name: String,
        index: u64,
        chunks: u64,
        bytes_sent: u64,
        file_size: u64,
    },
    /// The service rejected the token and a replacement was installed
    Reauthorized {
        file_name: String,
    },
    FileCompleted {
        target: UploadTarget,
        kind: UploadKind,
        elapsed: Duration,
    },
    FileFailed {
        target: UploadTarget,
        kind: UploadKind,
        error_kind: &'static str,
        message: String,
    },
    RunFinished {
        uploaded: usize,
        failed: usize,
        bytes: u64,
        elapsed: Duration,
    },
}

pub trait EventSink {
    fn event(&self, event: &UploadEvent);
}

impl<F> EventSink for F
where
    F: Fn(&UploadEvent),
{
    fn event(&self, event: &UploadEvent) {
        self(event)
    }
}

pub struct NoopSink;

impl EventSink for NoopSink {
    fn event(&self, _event: &UploadEvent) {}
}

/// Broadcasts every event to each inner sink, in order
#[derive(Default)]
pub struct Fanout {
    sinks: Vec<Arc<dyn EventSink + Send + Sync>>,
}

impl Fanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sink: Arc<dyn EventSink + Send + Sync>) {
        self.sinks.push(sink);
    }
}

impl EventSink for Fanout {
    fn event(&self, event: &UploadEvent) {
        for sink in &self.sinks {
            sink.event(event);
        }
    }
}

/// Duration in minutes, the unit upload times are reported in
pub fn minutes(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() / 60.0
}

pub struct ConsoleProgress {
    multi: MultiProgress,
    spinner: ProgressBar,
    bar: Mutex<Option<ProgressBar>>,
    start_time: Instant,
    verbose: bool,
}

impl ConsoleProgress {
    pub fn new(verbose: bool) -> Self {
        let multi = MultiProgress::new();
        let spinner = multi.add(ProgressBar::new_spinner());
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));

        Self {
            multi,
            spinner,
            bar: Mutex::new(None),
            start_time: Instant::now(),
            verbose,
        }
    }

    /// Run `f` with the display hidden, e.g. to prompt on the terminal
    pub fn suspend<R>(&self, f: impl FnOnce() -> R) -> R {
        self.multi.suspend(f)
    }

    /// Print a line above the status line
    fn print_line(&self, line: String) {
        // indicatif drops println output when it is not drawing to a terminal
        if self.multi.is_hidden() {
            println!("{line}");
        } else {
            let _ = self.multi.println(line);
        }
    }

    fn set_status(&self, stage: &str, details: &str) {
        self.spinner.set_message(format!(
            "{} {} in {:.1}s",
            stage.with(Color::Green).bold(),
            details,
            self.start_time.elapsed().as_secs_f64()
        ));
    }

    fn start_bar(&self, file_name: &str, file_size: u64) {
        let bar = self.multi.add(ProgressBar::new(file_size));
        bar.set_style(
            ProgressStyle::default_bar()
                .template("  {msg} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.set_message(file_name.to_string());
        *self.bar.lock() = Some(bar);
    }

    fn finish_bar(&self) {
        if let Some(bar) = self.bar.lock().take() {
            bar.finish_and_clear();
            self.multi.remove(&bar);
        }
    }
}

impl EventSink for ConsoleProgress {
    fn event(&self, event: &UploadEvent) {
        match event {
            UploadEvent::RunStarted {
                root,
                remote_folder,
                files,
                bytes,
            } => {
                if self.verbose {
                    self.print_line(format!(
                        "Uploading {} files ({:.1} MB) from {} to /{}",
                        files,
                        *bytes as f64 / 1_048_576.0,
                        root.display(),
                        remote_folder
                    ));
                }
                self.set_status("Starting", &format!("{files} files"));
            }
            UploadEvent::FileStarted { target, kind } => {
                if *kind == UploadKind::Session || self.verbose {
                    self.print_line(format!(
                        "  {} {} - {} MB",
                        "Uploading".with(Color::Green).bold(),
                        target.file_name.as_str().with(Color::Cyan),
                        target.size_mb()
                    ));
                }
                self.set_status("Uploading", &target.file_name);
            }
            UploadEvent::SessionCreated { file_name, chunks } => {
                if self.verbose {
                    self.print_line(format!("    session open for {file_name} ({chunks} chunks)"));
                }
            }
            UploadEvent::ChunkSent {
                file_name,
                index,
                bytes_sent,
                file_size,
                ..
            } => {
                if *index == 0 {
                    self.start_bar(file_name, *file_size);
                }
                if let Some(bar) = self.bar.lock().as_ref() {
                    bar.set_position(*bytes_sent);
                }
            }
            UploadEvent::Reauthorized { file_name } => {
                self.print_line(format!(
                    "  {} new token received, retrying {}",
                    "Reauthorized".with(Color::Yellow).bold(),
                    file_name
                ));
            }
            UploadEvent::FileCompleted {
                target,
                kind,
                elapsed,
            } => {
                self.finish_bar();
                match kind {
                    UploadKind::Session => self.print_line(format!(
                        "  {} {} in {:.2} min(s)",
                        "Done".with(Color::Green).bold(),
                        target.file_name,
                        minutes(*elapsed)
                    )),
                    UploadKind::Simple if self.verbose => self.print_line(format!(
                        "  {} {}",
                        "Done".with(Color::Green).bold(),
                        target.file_name
                    )),
                    UploadKind::Simple => {}
                }
            }
            UploadEvent::FileFailed {
                target, message, ..
            } => {
                self.finish_bar();
                self.print_line(format!(
                    "  {} {}: {}",
                    "Failed".with(Color::Red).bold(),
                    target.file_name,
                    message
                ));
            }
            UploadEvent::RunFinished {
                uploaded,
                failed,
                bytes,
                elapsed,
            } => {
                let status = if *failed == 0 {
                    "Completed".with(Color::Green).bold()
                } else {
                    "Finished".with(Color::Yellow).bold()
                };
                self.spinner.finish_with_message(format!(
                    "{} {} uploaded, {} failed ({:.1} MB) in {:.2} min(s)",
                    status,
                    uploaded,
                    failed,
                    *bytes as f64 / 1_048_576.0,
                    minutes(*elapsed)
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fanout_reaches_every_sink_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut fanout = Fanout::new();
        for id in 0..2 {
            let seen = seen.clone();
            fanout.push(Arc::new(move |e: &UploadEvent| {
                if let UploadEvent::Reauthorized { file_name } = e {
                    seen.lock().push(format!("{id}:{file_name}"));
                }
            }));
        }
        fanout.event(&UploadEvent::Reauthorized {
            file_name: "a".into(),
        });
        assert_eq!(*seen.lock(), vec!["0:a".to_string(), "1:a".to_string()]);
    }

    #[test]
    fn minutes_from_duration() {
        assert!((minutes(Duration::from_secs(90)) - 1.5).abs() < f64::EPSILON);
    }
}
