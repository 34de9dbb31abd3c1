//! Append-only workout log.
//!
//! Finalized workouts are appended to a JSONL (JSON Lines) file with file
//! locking so that several front ends can share one data directory.

use crate::{Acknowledgement, Error, Result, WorkoutLogEntry};
use chrono::Utc;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Destination for finalized workouts
pub trait WorkoutLogStore {
    /// Durably record `entry`.
    ///
    /// Any failure, including not getting an answer in time, is reported
    /// as [`Error::SubmissionFailed`].
    fn submit(&mut self, entry: &WorkoutLogEntry) -> Result<Acknowledgement>;
}

/// JSONL-based workout log with file locking
pub struct JsonlWorkoutLog {
    path: PathBuf,
    timeout: Duration,
}

impl JsonlWorkoutLog {
    /// Create a log at `path`; submissions give up after `timeout`
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait for the exclusive lock, but no longer than the timeout
    fn lock_with_deadline(&self, file: &File) -> Result<()> {
        let deadline = Instant::now() + self.timeout;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(()),
                Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                    if Instant::now() >= deadline {
                        return Err(Error::SubmissionFailed(format!(
                            "workout log busy, timed out after {:?}",
                            self.timeout
                        )));
                    }
                    thread::sleep(LOCK_POLL_INTERVAL);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn append(&self, entry: &WorkoutLogEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        self.lock_with_deadline(&file)?;

        let written = (|| -> Result<()> {
            let mut writer = std::io::BufWriter::new(&file);
            let line = serde_json::to_string(entry)?;
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
            writer.flush()?;
            drop(writer);
            file.sync_data()?;
            Ok(())
        })();

        file.unlock()?;
        written
    }
}

impl WorkoutLogStore for JsonlWorkoutLog {
    fn submit(&mut self, entry: &WorkoutLogEntry) -> Result<Acknowledgement> {
        match self.append(entry) {
            Ok(()) => {
                tracing::debug!("Appended workout {} to {:?}", entry.id, self.path);
                Ok(Acknowledgement {
                    id: entry.id,
                    accepted_at: Utc::now(),
                })
            }
            Err(Error::SubmissionFailed(reason)) => Err(Error::SubmissionFailed(reason)),
            Err(e) => Err(Error::SubmissionFailed(e.to_string())),
        }
    }
}

/// Read all entries from a workout log file
///
/// Corrupt lines are skipped with a warning.
pub fn read_entries(path: &Path) -> Result<Vec<WorkoutLogEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut entries = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<WorkoutLogEntry>(&line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                tracing::warn!("Failed to parse workout at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} workouts from {:?}", entries.len(), path);
    Ok(entries)
}
