//! Workout summaries and finalization.
//!
//! Volume is reps times weight, summed over sets and then over exercises.
//! Finalizing turns a fully logged session into an immutable workout log
//! entry and only clears the session once the log store accepted it.

use crate::engine::SessionEngine;
use crate::session_store::SessionStore;
use crate::workout_log::WorkoutLogStore;
use crate::{
    Acknowledgement, Error, ExerciseLog, ExerciseVolume, Result, Session, WorkoutLogEntry,
    WorkoutSummary,
};
use chrono::Utc;
use uuid::Uuid;

/// Summary metrics for a fully logged session
///
/// Fails with [`Error::SessionIncomplete`] while exercises remain.
pub fn summarize(session: &Session) -> Result<WorkoutSummary> {
    if !session.is_complete() {
        return Err(Error::SessionIncomplete);
    }
    Ok(summarize_logs(&session.exercise_logs))
}

/// Summary metrics for an entry already in the workout log
pub fn summarize_entry(entry: &WorkoutLogEntry) -> WorkoutSummary {
    summarize_logs(&entry.exercises)
}

fn summarize_logs(logs: &[ExerciseLog]) -> WorkoutSummary {
    let exercises: Vec<ExerciseVolume> = logs
        .iter()
        .map(|log| ExerciseVolume {
            exercise_id: log.exercise_id.clone(),
            exercise_name: log.exercise_name.clone(),
            sets: log.sets_completed.len(),
            volume: log.volume(),
        })
        .collect();

    WorkoutSummary {
        exercise_count: exercises.len(),
        total_sets: exercises.iter().map(|e| e.sets).sum(),
        total_volume: exercises.iter().map(|e| e.volume).sum(),
        exercises,
    }
}

/// Result of a successful finalize
#[derive(Clone, Debug)]
pub struct FinalizedWorkout {
    pub entry: WorkoutLogEntry,
    pub summary: WorkoutSummary,
    pub acknowledgement: Acknowledgement,
}

/// Submits finished sessions to a workout log store
pub struct AggregationReporter<L: WorkoutLogStore> {
    log: L,
}

impl<L: WorkoutLogStore> AggregationReporter<L> {
    pub fn new(log: L) -> Self {
        Self { log }
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    /// Submit the engine's completed session and clear it on success.
    ///
    /// While the submission runs the store's submission guard is held, so a
    /// second finalize (or any other mutation) of the same session fails
    /// with [`Error::SubmissionInProgress`]. If the store does not accept
    /// the entry the session is left untouched and the error is retriable.
    pub fn finalize<S: SessionStore>(
        &mut self,
        engine: &mut SessionEngine<S>,
    ) -> Result<FinalizedWorkout> {
        let session = engine.session().ok_or(Error::NoActiveSession)?;
        let summary = summarize(session)?;
        let _guard = engine.store().begin_submission()?;

        // Another process may have finalized or replaced it since we loaded
        if engine.store().load().as_ref() != Some(session) {
            tracing::warn!(
                "Stored session for routine {} changed since it was loaded",
                session.routine_id
            );
            engine.forget_stale();
            return Err(Error::NoActiveSession);
        }

        let mut snapshot = session.clone();
        let completed_at = Utc::now();
        snapshot.completed_at = Some(completed_at);

        let entry = WorkoutLogEntry {
            id: Uuid::new_v4(),
            routine_id: snapshot.routine_id,
            routine_name: snapshot.routine_name,
            started_at: snapshot.started_at,
            completed_at,
            exercises: snapshot.exercise_logs,
        };

        let acknowledgement = match self.log.submit(&entry) {
            Ok(ack) => ack,
            Err(e) => {
                let err = match e {
                    Error::SubmissionFailed(_) => e,
                    other => Error::SubmissionFailed(other.to_string()),
                };
                tracing::warn!("Finalize of routine {} failed: {}", entry.routine_id, err);
                return Err(err);
            }
        };

        engine.finish_submitted();
        tracing::info!(
            "Finalized workout {} for routine {}: {} sets, volume {}",
            entry.id,
            entry.routine_id,
            summary.total_sets,
            summary.total_volume
        );

        Ok(FinalizedWorkout {
            entry,
            summary,
            acknowledgement,
        })
    }
}
