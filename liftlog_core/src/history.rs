//! Finished workout history.
//!
//! Reads back the workout log for listing and lookup.

use crate::workout_log::read_entries;
use crate::{Error, Result, WorkoutLogEntry};
use std::path::Path;
use uuid::Uuid;

/// Load the most recent `limit` workouts in log order (oldest first).
///
/// A `limit` of zero returns the whole log.
pub fn load_recent_entries(path: &Path, limit: usize) -> Result<Vec<WorkoutLogEntry>> {
    let mut entries = read_entries(path)?;
    if limit > 0 && entries.len() > limit {
        entries.drain(..entries.len() - limit);
    }
    tracing::debug!("Loaded {} workouts (limit {})", entries.len(), limit);
    Ok(entries)
}

/// Find one workout by id
pub fn find_entry(path: &Path, id: Uuid) -> Result<WorkoutLogEntry> {
    read_entries(path)?
        .into_iter()
        .find(|e| e.id == id)
        .ok_or_else(|| Error::NotFound(format!("workout {}", id)))
}
