//! Terminal progress bars for batches and individual transfers.

use std::io::{self, Write};

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing_subscriber::fmt::MakeWriter;

const BATCH_TEMPLATE: &str = "{prefix:.bold} [{bar:40.green/white}] {pos}/{len} files {elapsed_precise}";
const FILE_TEMPLATE: &str =
    "{msg:<40} [{bar:30.cyan/blue}] {bytes}/{total_bytes} {bytes_per_sec} eta {eta}";
const FILE_UNKNOWN_TEMPLATE: &str = "{spinner} {msg:<40} {bytes} {bytes_per_sec}";

/// Longest file label shown next to a bar, in characters.
const LABEL_CHARS: usize = 40;

/// Coordinates the progress bars of one run.
#[derive(Clone)]
pub struct ProgressDisplay {
    multi: MultiProgress,
}

impl ProgressDisplay {
    /// Create a display drawing to stderr, or drawing nothing when disabled.
    pub fn new(enabled: bool) -> Self {
        let multi = match enabled {
            true => MultiProgress::new(),
            false => MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
        };
        Self { multi }
    }

    /// A display that never draws.
    pub fn hidden() -> Self {
        Self::new(false)
    }

    /// Bar counting finished files of one folder's batch.
    pub fn batch_bar(&self, total_files: usize, label: &str) -> ProgressBar {
        let pb = self.multi.add(ProgressBar::new(total_files as u64));
        pb.set_style(style(BATCH_TEMPLATE));
        pb.set_prefix(truncate_label(label));
        pb
    }

    /// Bar counting bytes of one transfer, starting at the resume offset.
    pub fn file_bar(&self, name: &str, total: Option<u64>, position: u64) -> ProgressBar {
        let pb = match total {
            Some(total) => {
                let pb = self.multi.add(ProgressBar::new(total));
                pb.set_style(style(FILE_TEMPLATE).progress_chars("=> "));
                pb
            }
            None => {
                let pb = self.multi.add(ProgressBar::no_length());
                pb.set_style(style(FILE_UNKNOWN_TEMPLATE));
                pb
            }
        };
        pb.set_message(truncate_label(name));
        pb.set_position(position);
        pb
    }

    /// Remove a finished bar from the display.
    pub fn finish(&self, pb: ProgressBar) {
        pb.finish_and_clear();
        self.multi.remove(&pb);
    }

    /// Stderr writer for log lines that does not tear through the bars.
    pub fn log_writer(&self) -> BarSafeStderr {
        BarSafeStderr {
            multi: self.multi.clone(),
        }
    }
}

/// Writes to stderr with the bars cleared, redrawing them afterwards.
#[derive(Clone)]
pub struct BarSafeStderr {
    multi: MultiProgress,
}

impl Write for BarSafeStderr {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.multi.suspend(|| io::stderr().write(buf))
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.multi.suspend(|| io::stderr().write_all(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

impl<'a> MakeWriter<'a> for BarSafeStderr {
    type Writer = BarSafeStderr;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_bar())
}

fn truncate_label(label: &str) -> String {
    if label.chars().count() <= LABEL_CHARS {
        return label.to_string();
    }
    let mut short: String = label.chars().take(LABEL_CHARS - 1).collect();
    short.push('…');
    short
}
