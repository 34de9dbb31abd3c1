//! Core domain types for liftlog.
//!
//! This module defines the fundamental types used throughout the system:
//! - Exercises and routines (the templates a user trains from)
//! - Set and exercise logs captured while training
//! - The in-progress session and the finalized workout log entry
//! - Summary metrics computed from a finished workout
//!
//! Field names on the wire are camelCase so persisted sessions and stored
//! routines stay readable by every front end sharing the data directory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Exercise and Routine Types
// ============================================================================

/// An exercise known by id and display name (shared catalog or user-defined)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Exercise {
    pub id: String,
    pub name: String,
}

/// One exercise slot in a routine, with its targets
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoutineExercise {
    pub exercise_id: String,
    #[serde(rename = "sets", alias = "targetSets")]
    pub target_sets: u32,
    #[serde(rename = "reps", alias = "targetReps")]
    pub target_reps: u32,
    #[serde(rename = "weightKg", alias = "targetWeight", default)]
    pub target_weight: f64,
}

/// A named, ordered template of exercises
///
/// Routines are immutable once fetched from a [`crate::RoutineSource`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Routine {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub exercises: Vec<RoutineExercise>,
}

impl Routine {
    /// Check target constraints, returning one message per violation.
    ///
    /// An empty exercise list is not reported here; starting a session
    /// from it fails with [`crate::Error::EmptyRoutine`] instead.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for (i, ex) in self.exercises.iter().enumerate() {
            if ex.target_sets < 1 {
                errors.push(format!(
                    "routine {} exercise #{} ({}): target sets must be at least 1",
                    self.id,
                    i + 1,
                    ex.exercise_id
                ));
            }
            if ex.target_reps < 1 {
                errors.push(format!(
                    "routine {} exercise #{} ({}): target reps must be at least 1",
                    self.id,
                    i + 1,
                    ex.exercise_id
                ));
            }
            if !ex.target_weight.is_finite() || ex.target_weight < 0.0 {
                errors.push(format!(
                    "routine {} exercise #{} ({}): target weight must be a non-negative number",
                    self.id,
                    i + 1,
                    ex.exercise_id
                ));
            }
        }
        errors
    }
}

// ============================================================================
// Logged Performance
// ============================================================================

/// One completed set
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SetLog {
    /// 1-based, contiguous within its exercise log
    pub set_number: u32,
    pub reps_completed: u32,
    #[serde(rename = "weightUsedKg")]
    pub weight_used: f64,
}

impl SetLog {
    /// Build a set from raw user input.
    ///
    /// Input is coerced permissively: anything that is not a finite,
    /// non-negative number becomes zero. Fractional reps are truncated.
    pub fn from_input(set_number: u32, reps: &str, weight: &str) -> Self {
        Self {
            set_number,
            reps_completed: coerce_number(reps).trunc() as u32,
            weight_used: coerce_number(weight),
        }
    }

    /// Reps times weight for this set
    pub fn volume(&self) -> f64 {
        f64::from(self.reps_completed) * self.weight_used
    }
}

fn coerce_number(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}

/// Turn a sequence of raw `(reps, weight)` inputs into numbered sets.
///
/// Sets are numbered `1..=n` in input order.
pub fn sets_from_inputs<I, R, W>(inputs: I) -> Vec<SetLog>
where
    I: IntoIterator<Item = (R, W)>,
    R: AsRef<str>,
    W: AsRef<str>,
{
    inputs
        .into_iter()
        .enumerate()
        .map(|(i, (reps, weight))| SetLog::from_input(i as u32 + 1, reps.as_ref(), weight.as_ref()))
        .collect()
}

/// Per-exercise record within a session
///
/// Targets are copied from the routine when the session starts and never
/// change afterwards.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseLog {
    pub exercise_id: String,
    pub exercise_name: String,
    pub target_sets: u32,
    pub target_reps: u32,
    #[serde(default)]
    pub sets_completed: Vec<SetLog>,
}

impl ExerciseLog {
    /// Sum of reps times weight over the completed sets
    pub fn volume(&self) -> f64 {
        self.sets_completed.iter().map(SetLog::volume).sum()
    }

    pub fn is_logged(&self) -> bool {
        !self.sets_completed.is_empty()
    }
}

// ============================================================================
// Session and Workout Log Types
// ============================================================================

/// A live, resumable execution of a routine
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub routine_id: String,
    pub routine_name: String,
    pub started_at: DateTime<Utc>,
    /// Index of the next exercise to log; equals the number of exercise
    /// logs once everything is logged
    pub current_index: usize,
    pub exercise_logs: Vec<ExerciseLog>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// The immutable history record produced by finalizing a session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutLogEntry {
    pub id: Uuid,
    pub routine_id: String,
    pub routine_name: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub exercises: Vec<ExerciseLog>,
}

/// Receipt returned by a workout log store once an entry is durable
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Acknowledgement {
    pub id: Uuid,
    pub accepted_at: DateTime<Utc>,
}

// ============================================================================
// Summary Types
// ============================================================================

/// Volume and set count for one exercise of a finished workout
#[derive(Clone, Debug, PartialEq)]
pub struct ExerciseVolume {
    pub exercise_id: String,
    pub exercise_name: String,
    pub sets: usize,
    pub volume: f64,
}

/// Aggregates over a fully logged session
#[derive(Clone, Debug, PartialEq)]
pub struct WorkoutSummary {
    pub exercise_count: usize,
    pub total_sets: usize,
    pub total_volume: f64,
    pub exercises: Vec<ExerciseVolume>,
}

/// Where the engine currently is in a session's lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    NotStarted,
    /// `index` is the exercise awaiting its sets, out of `total`
    Active { index: usize, total: usize },
    AllDone,
    /// A finalize for this session holds the submission guard
    SubmissionInProgress,
}
