//! Reporting collaborators: status artifact, external publish, measurement
//! log and alert notification.
//!
//! Every collaborator failure is isolated to the cycle in which it happens;
//! the controller logs it and keeps sampling.

mod email;
mod files;

use chrono::NaiveDateTime;
use std::fs;
use std::path::Path;

pub use email::{LogOnlyNotifier, SmtpNotifier};
pub use files::{CopyPublisher, FileMeasurementLog};

use crate::error::Result;

const TIMESTAMP_FORMAT: &str = "%A %B %d %I:%M:%S %p";

/// Append-only log of timestamped measurements
pub trait MeasurementLog {
    fn append(&mut self, at: NaiveDateTime, value: f64) -> Result<()>;
}

/// Makes the current status visible outside the host
pub trait Publisher {
    fn publish(&mut self, status_file: &Path) -> Result<()>;
}

/// Delivers accumulated alert lines together with the current status
pub trait Notifier {
    fn notify(&mut self, alerts: &[String], status: &str) -> Result<()>;
}

/// One cycle's status artifact
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    started: NaiveDateTime,
    sampled: NaiveDateTime,
    lines: Vec<(String, String)>,
}

impl StatusReport {
    pub fn new(started: NaiveDateTime, sampled: NaiveDateTime) -> Self {
        Self {
            started,
            sampled,
            lines: Vec::new(),
        }
    }

    pub fn push<L: Into<String>, T: Into<String>>(&mut self, label: L, text: T) {
        self.lines.push((label.into(), text.into()));
    }

    pub fn render(&self) -> String {
        let mut out = format!(
            "Monitor start time: {}\nSample time: {}\n",
            self.started.format(TIMESTAMP_FORMAT),
            self.sampled.format(TIMESTAMP_FORMAT)
        );
        for (label, text) in &self.lines {
            out.push_str(&format!("{}:{}\n", label, text));
        }
        out
    }

    /// Rewrite `path` with the full report
    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, self.render())?;
        Ok(())
    }
}
