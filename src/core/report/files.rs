use chrono::NaiveDateTime;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{MeasurementLog, Publisher};
use crate::error::{ReefError, Result};

/// Publishes by copying the status file to a synced (cloud) directory
#[derive(Debug, Clone)]
pub struct CopyPublisher {
    destination: PathBuf,
}

impl CopyPublisher {
    pub fn new<P: Into<PathBuf>>(destination: P) -> Self {
        Self {
            destination: destination.into(),
        }
    }
}

impl Publisher for CopyPublisher {
    fn publish(&mut self, status_file: &Path) -> Result<()> {
        fs::copy(status_file, &self.destination).map_err(|e| {
            ReefError::publish(format!(
                "copy {:?} -> {:?}: {}",
                status_file, self.destination, e
            ))
        })?;
        Ok(())
    }
}

/// `timestamp,value` rows appended to a text file
#[derive(Debug, Clone)]
pub struct FileMeasurementLog {
    path: PathBuf,
}

impl FileMeasurementLog {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl MeasurementLog for FileMeasurementLog {
    fn append(&mut self, at: NaiveDateTime, value: f64) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| ReefError::log_write(format!("{:?}: {}", self.path, e)))?;

        writeln!(file, "{},{:2.1}", at.format("%Y-%m-%d %H:%M:%S"), value)
            .map_err(|e| ReefError::log_write(format!("{:?}: {}", self.path, e)))?;
        Ok(())
    }
}
