//! Run progress reporting.
//!
//! Reports what is being scanned, how many files are left, and how the
//! packing went. Progress is emitted on **stderr** so stdout stays
//! parseable for scripts; it is separate from `tracing` logs.

use std::io::Write;

/// A single progress event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Walking the scan root. Total unknown.
    Discovering { root: String },
    /// Walk finished.
    Discovered { candidates: u64, rejected: u64 },
    /// `n` of `total` files processed. Sent from worker threads.
    Processing { n: u64, total: u64 },
    /// Packing finished.
    Packed {
        included: u64,
        partial: u64,
        words: u64,
    },
}

/// Receives progress events; implementations must tolerate calls from
/// several worker threads at once.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Human-friendly progress on stderr: "confluence  processing  1,234 / 5,000 files".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::Discovering { root } => format!("confluence  discovering {}...\n", root),
            ProgressEvent::Discovered {
                candidates,
                rejected,
            } => format!(
                "confluence  discovered  {} candidates, {} rejected\n",
                format_number(*candidates),
                format_number(*rejected)
            ),
            ProgressEvent::Processing { n, total } => format!(
                "confluence  processing  {} / {} files\n",
                format_number(*n),
                format_number(*total)
            ),
            ProgressEvent::Packed {
                included,
                partial,
                words,
            } => format!(
                "confluence  packed  {} files ({} partial), {} words\n",
                format_number(*included),
                format_number(*partial),
                format_number(*words)
            ),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl JsonProgress {
    fn to_json(event: &ProgressEvent) -> serde_json::Value {
        match event {
            ProgressEvent::Discovering { root } => serde_json::json!({
                "event": "progress",
                "phase": "discovering",
                "root": root
            }),
            ProgressEvent::Discovered {
                candidates,
                rejected,
            } => serde_json::json!({
                "event": "progress",
                "phase": "discovered",
                "candidates": candidates,
                "rejected": rejected
            }),
            ProgressEvent::Processing { n, total } => serde_json::json!({
                "event": "progress",
                "phase": "processing",
                "n": n,
                "total": total
            }),
            ProgressEvent::Packed {
                included,
                partial,
                words,
            } => serde_json::json!({
                "event": "progress",
                "phase": "packed",
                "included": included,
                "partial": partial,
                "words": words
            }),
        }
    }
}

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        if let Ok(line) = serde_json::to_string(&Self::to_json(&event)) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn test_json_events_carry_phase() {
        let v = JsonProgress::to_json(&ProgressEvent::Processing { n: 3, total: 10 });
        assert_eq!(v["phase"], "processing");
        assert_eq!(v["n"], 3);
        assert_eq!(v["total"], 10);

        let v = JsonProgress::to_json(&ProgressEvent::Packed {
            included: 2,
            partial: 1,
            words: 90,
        });
        assert_eq!(v["phase"], "packed");
        assert_eq!(v["words"], 90);
    }
}
