//! CSV export of the workout log.
//!
//! One row per completed set, so the file can be pivoted in a spreadsheet
//! without further processing.

use crate::storage;
use crate::workout_log::read_entries;
use crate::{Result, WorkoutLogEntry};
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow<'a> {
    entry_id: String,
    completed_at: String,
    routine_name: &'a str,
    exercise_id: &'a str,
    exercise_name: &'a str,
    set_number: u32,
    reps_completed: u32,
    weight_used_kg: f64,
    volume: f64,
}

fn rows(entry: &WorkoutLogEntry) -> impl Iterator<Item = CsvRow<'_>> {
    entry.exercises.iter().flat_map(move |exercise| {
        exercise.sets_completed.iter().map(move |set| CsvRow {
            entry_id: entry.id.to_string(),
            completed_at: entry.completed_at.to_rfc3339(),
            routine_name: &entry.routine_name,
            exercise_id: &exercise.exercise_id,
            exercise_name: &exercise.exercise_name,
            set_number: set.set_number,
            reps_completed: set.reps_completed,
            weight_used_kg: set.weight_used,
            volume: set.volume(),
        })
    })
}

/// Write every set in the workout log at `log_path` to `csv_path`.
///
/// The target is replaced atomically. Returns the number of rows written.
pub fn export_csv(log_path: &Path, csv_path: &Path) -> Result<usize> {
    let entries = read_entries(log_path)?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(Vec::new());

    let mut count = 0;
    for entry in &entries {
        for row in rows(entry) {
            writer.serialize(row)?;
            count += 1;
        }
    }

    // Headers are only emitted with the first row
    if count == 0 {
        writer.write_record([
            "entry_id",
            "completed_at",
            "routine_name",
            "exercise_id",
            "exercise_name",
            "set_number",
            "reps_completed",
            "weight_used_kg",
            "volume",
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    storage::write_atomic(csv_path, &bytes)?;

    tracing::info!(
        "Exported {} sets from {} workouts to {:?}",
        count,
        entries.len(),
        csv_path
    );
    Ok(count)
}
