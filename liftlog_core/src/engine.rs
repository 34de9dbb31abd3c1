//! Workout session engine.
//!
//! Walks a user through a routine one exercise at a time:
//!
//! ```text
//! NotStarted --start--> Active(0) --log--> Active(1) ... --log--> AllDone
//! AllDone --finalize ok--> (cleared)      AllDone --finalize err--> AllDone
//! Active/AllDone --abandon or start--> NotStarted / Active(0)
//! ```
//!
//! Every mutation is persisted through the [`SessionStore`] before it
//! becomes visible, so a restarted process resumes exactly where the last
//! one stopped.

use crate::catalog::ExerciseNameResolver;
use crate::library::RoutineSource;
use crate::session_store::SessionStore;
use crate::{Error, ExerciseLog, Result, Routine, Session, SessionStatus, SetLog};
use chrono::{DateTime, Utc};

impl Session {
    /// Build a fresh session for `routine`, resolving display names.
    pub fn from_routine<R>(routine: &Routine, resolver: &R, started_at: DateTime<Utc>) -> Result<Self>
    where
        R: ExerciseNameResolver + ?Sized,
    {
        if routine.exercises.is_empty() {
            return Err(Error::EmptyRoutine);
        }
        let problems = routine.validate();
        if !problems.is_empty() {
            return Err(Error::InvalidRoutine(problems.join("; ")));
        }

        let exercise_logs = routine
            .exercises
            .iter()
            .map(|ex| ExerciseLog {
                exercise_id: ex.exercise_id.clone(),
                exercise_name: resolver.resolve(&ex.exercise_id),
                target_sets: ex.target_sets,
                target_reps: ex.target_reps,
                sets_completed: Vec::new(),
            })
            .collect();

        Ok(Self {
            routine_id: routine.id.clone(),
            routine_name: routine.name.clone(),
            started_at,
            current_index: 0,
            exercise_logs,
            completed_at: None,
        })
    }

    /// Number of exercises in the session
    pub fn len(&self) -> usize {
        self.exercise_logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercise_logs.is_empty()
    }

    /// The exercise awaiting its sets, or `None` once everything is logged
    pub fn current_exercise(&self) -> Option<&ExerciseLog> {
        self.exercise_logs.get(self.current_index)
    }

    pub fn is_complete(&self) -> bool {
        self.current_index == self.exercise_logs.len()
    }

    /// Exercises after the current one
    pub fn upcoming(&self) -> &[ExerciseLog] {
        let start = (self.current_index + 1).min(self.exercise_logs.len());
        &self.exercise_logs[start..]
    }

    /// `(logged, total)` exercise counts
    pub fn progress(&self) -> (usize, usize) {
        (self.current_index, self.exercise_logs.len())
    }

    /// Check that `sets` may be logged against the current exercise.
    pub fn check_sets(&self, sets: &[SetLog]) -> Result<()> {
        let current = self.current_exercise().ok_or(Error::SessionComplete)?;
        let expected = current.target_sets;

        if sets.len() != expected as usize {
            return Err(Error::SetCountMismatch {
                expected,
                actual: sets.len(),
            });
        }

        for (i, set) in sets.iter().enumerate() {
            let position = i + 1;
            if set.set_number as usize != position {
                return Err(Error::SetOutOfSequence {
                    position,
                    set_number: set.set_number,
                });
            }
            if !set.weight_used.is_finite() || set.weight_used < 0.0 {
                return Err(Error::InvalidWeight {
                    set_number: set.set_number,
                });
            }
        }
        Ok(())
    }

    /// Verify the structural invariants of a (possibly persisted) session.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        let total = self.exercise_logs.len();
        if total == 0 {
            return Err("session has no exercises".into());
        }
        if self.completed_at.is_some() {
            return Err("session was already finalized".into());
        }
        if self.current_index > total {
            return Err(format!(
                "current index {} out of range for {} exercises",
                self.current_index, total
            ));
        }

        for (i, log) in self.exercise_logs.iter().enumerate() {
            if log.target_sets < 1 {
                return Err(format!("exercise #{} has no target sets", i + 1));
            }
            if i < self.current_index {
                if log.sets_completed.len() != log.target_sets as usize {
                    return Err(format!(
                        "exercise #{} logged {} of {} sets",
                        i + 1,
                        log.sets_completed.len(),
                        log.target_sets
                    ));
                }
                for (n, set) in log.sets_completed.iter().enumerate() {
                    if set.set_number as usize != n + 1 {
                        return Err(format!("exercise #{} sets out of sequence", i + 1));
                    }
                    if !set.weight_used.is_finite() || set.weight_used < 0.0 {
                        return Err(format!("exercise #{} has an invalid weight", i + 1));
                    }
                }
            } else if !log.sets_completed.is_empty() {
                return Err(format!(
                    "exercise #{} has sets but has not been reached",
                    i + 1
                ));
            }
        }
        Ok(())
    }
}

/// Owns the in-progress session and keeps its store in step with it
pub struct SessionEngine<S: SessionStore> {
    store: S,
    session: Option<Session>,
}

impl<S: SessionStore> SessionEngine<S> {
    /// Engine over `store`. Call [`SessionEngine::resume`] to pick up a
    /// session left by an earlier run.
    pub fn new(store: S) -> Self {
        Self {
            store,
            session: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Start a session for `routine`, replacing any unfinished one.
    pub fn start<R>(&mut self, routine: &Routine, resolver: &R) -> Result<&Session>
    where
        R: ExerciseNameResolver + ?Sized,
    {
        self.ensure_not_submitting()?;
        let session = Session::from_routine(routine, resolver, Utc::now())?;

        let replaced = self.session.clone().or_else(|| self.store.load());
        if let Some(previous) = replaced {
            // TODO: ask before discarding once front ends can show a confirmation
            tracing::warn!(
                "Replacing unfinished session for routine {} ({} of {} logged)",
                previous.routine_id,
                previous.current_index,
                previous.len()
            );
        }

        self.store.save(&session)?;
        tracing::info!(
            "Started session for routine {} with {} exercises",
            session.routine_id,
            session.len()
        );
        Ok(&*self.session.insert(session))
    }

    /// Fetch `routine_id` from `source` and start it.
    pub fn start_routine<R>(
        &mut self,
        source: &dyn RoutineSource,
        resolver: &R,
        routine_id: &str,
    ) -> Result<&Session>
    where
        R: ExerciseNameResolver + ?Sized,
    {
        let routine = source.get_routine(routine_id)?;
        self.start(&routine, resolver)
    }

    /// Reload the persisted session.
    ///
    /// Missing or structurally invalid data yields `None`; invalid data is
    /// discarded rather than reported.
    pub fn resume(&mut self) -> Option<&Session> {
        let loaded = self.store.load();
        self.session = match loaded {
            Some(session) => match session.check_invariants() {
                Ok(()) => {
                    tracing::debug!(
                        "Resumed session for routine {} at {}/{}",
                        session.routine_id,
                        session.current_index,
                        session.len()
                    );
                    Some(session)
                }
                Err(reason) => {
                    tracing::warn!("Dropping invalid stored session: {}", reason);
                    if let Err(e) = self.store.clear() {
                        tracing::warn!("Failed to clear invalid session: {}", e);
                    }
                    None
                }
            },
            None => None,
        };
        self.session.as_ref()
    }

    /// The exercise awaiting its sets
    pub fn current_exercise(&self) -> Option<&ExerciseLog> {
        self.session.as_ref().and_then(Session::current_exercise)
    }

    /// Record the sets for the current exercise and advance.
    ///
    /// On any error the session is left exactly as it was.
    pub fn log_current_exercise(&mut self, sets: Vec<SetLog>) -> Result<&Session> {
        self.ensure_not_submitting()?;
        let session = self.session.as_ref().ok_or(Error::NoActiveSession)?;
        session.check_sets(&sets)?;

        let mut next = session.clone();
        let index = next.current_index;
        next.exercise_logs[index].sets_completed = sets;
        next.current_index += 1;

        self.store.save(&next)?;
        tracing::info!(
            "Logged {} ({}/{})",
            next.exercise_logs[index].exercise_name,
            next.current_index,
            next.len()
        );
        Ok(&*self.session.insert(next))
    }

    pub fn is_complete(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_complete)
    }

    pub fn status(&self) -> SessionStatus {
        if self.store.submission_in_progress() {
            return SessionStatus::SubmissionInProgress;
        }
        match &self.session {
            None => SessionStatus::NotStarted,
            Some(s) if s.is_complete() => SessionStatus::AllDone,
            Some(s) => SessionStatus::Active {
                index: s.current_index,
                total: s.len(),
            },
        }
    }

    /// Drop the session without recording it
    pub fn abandon(&mut self) -> Result<()> {
        self.ensure_not_submitting()?;
        self.store.clear()?;
        if let Some(session) = self.session.take() {
            tracing::info!("Abandoned session for routine {}", session.routine_id);
        }
        Ok(())
    }

    /// Forget the session after its workout log entry was accepted
    pub(crate) fn finish_submitted(&mut self) {
        self.session = None;
        if let Err(e) = self.store.clear() {
            tracing::error!("Workout recorded but stored session could not be cleared: {}", e);
        }
    }

    /// Drop an in-memory session that no longer matches the store
    pub(crate) fn forget_stale(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::debug!("Forgot stale session for routine {}", session.routine_id);
        }
    }

    fn ensure_not_submitting(&self) -> Result<()> {
        if self.store.submission_in_progress() {
            return Err(Error::SubmissionInProgress);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ExerciseCatalog;
    use crate::library::UserLibrary;
    use crate::session_store::{FileSessionStore, MemorySessionStore};
    use crate::{sets_from_inputs, RoutineExercise};

    fn two_exercise_routine() -> Routine {
        Routine {
            id: "push_pull".into(),
            name: "Push / Pull".into(),
            exercises: vec![
                RoutineExercise {
                    exercise_id: "bench_press".into(),
                    target_sets: 2,
                    target_reps: 10,
                    target_weight: 50.0,
                },
                RoutineExercise {
                    exercise_id: "cable_row".into(),
                    target_sets: 2,
                    target_reps: 10,
                    target_weight: 40.0,
                },
            ],
        }
    }

    fn engine() -> SessionEngine<MemorySessionStore> {
        SessionEngine::new(MemorySessionStore::new())
    }

    #[test]
    fn test_start_builds_one_log_per_exercise() {
        crate::logging::init_test();
        let mut engine = engine();
        let session = engine
            .start(&two_exercise_routine(), &ExerciseCatalog::shared())
            .unwrap();

        assert_eq!(session.len(), 2);
        assert_eq!(session.current_index, 0);
        assert_eq!(session.exercise_logs[0].exercise_name, "Bench Press");
        // Not in the shared catalog
        assert_eq!(session.exercise_logs[1].exercise_name, "cable_row");
        assert!(session.exercise_logs.iter().all(|l| l.sets_completed.is_empty()));
        assert_eq!(engine.store().load().as_ref(), engine.session());
        assert_eq!(engine.status(), SessionStatus::Active { index: 0, total: 2 });
    }

    #[test]
    fn test_start_empty_routine_fails() {
        let mut engine = engine();
        let routine = Routine {
            id: "empty".into(),
            name: "Empty".into(),
            exercises: vec![],
        };
        assert!(matches!(
            engine.start(&routine, &ExerciseCatalog::shared()),
            Err(Error::EmptyRoutine)
        ));
        assert!(engine.store().load().is_none());
    }

    #[test]
    fn test_start_invalid_routine_fails() {
        let mut engine = engine();
        let mut routine = two_exercise_routine();
        routine.exercises[0].target_sets = 0;

        let err = engine
            .start(&routine, &ExerciseCatalog::shared())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRoutine(_)));
        assert!(err.to_string().contains("target sets"));
        assert!(engine.session().is_none());
        assert!(engine.store().load().is_none());
    }

    #[test]
    fn test_start_routine_from_source() {
        let library = UserLibrary {
            routines: vec![two_exercise_routine()],
            ..Default::default()
        };
        let mut engine = engine();

        let session = engine
            .start_routine(&library, &library.catalog(), "push_pull")
            .unwrap();
        assert_eq!(session.routine_name, "Push / Pull");

        assert!(matches!(
            engine.start_routine(&library, &library.catalog(), "missing"),
            Err(Error::NotFound(_))
        ));
        // Failed fetch leaves the running session alone
        assert_eq!(engine.session().unwrap().routine_id, "push_pull");
    }

    #[test]
    fn test_log_advances_and_stores_sets() {
        let mut engine = engine();
        engine
            .start(&two_exercise_routine(), &ExerciseCatalog::shared())
            .unwrap();

        let session = engine
            .log_current_exercise(sets_from_inputs([("10", "50"), ("8", "50")]))
            .unwrap();
        assert_eq!(session.current_index, 1);
        let numbers: Vec<u32> = session.exercise_logs[0]
            .sets_completed
            .iter()
            .map(|s| s.set_number)
            .collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(engine.current_exercise().unwrap().exercise_id, "cable_row");

        engine
            .log_current_exercise(sets_from_inputs([("12", "40"), ("12", "40")]))
            .unwrap();
        assert!(engine.is_complete());
        assert!(engine.current_exercise().is_none());
        assert_eq!(engine.status(), SessionStatus::AllDone);
        assert_eq!(engine.store().load().unwrap().current_index, 2);
    }

    #[test]
    fn test_log_wrong_set_count_leaves_session_unmodified() {
        let mut engine = engine();
        engine
            .start(&two_exercise_routine(), &ExerciseCatalog::shared())
            .unwrap();
        let before = engine.store().raw();

        let err = engine
            .log_current_exercise(sets_from_inputs([("10", "50")]))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::SetCountMismatch {
                expected: 2,
                actual: 1
            }
        ));
        assert_eq!(engine.session().unwrap().current_index, 0);
        assert_eq!(engine.store().raw(), before);
    }

    #[test]
    fn test_log_misnumbered_sets_rejected() {
        let mut engine = engine();
        engine
            .start(&two_exercise_routine(), &ExerciseCatalog::shared())
            .unwrap();

        let sets = vec![
            SetLog {
                set_number: 2,
                reps_completed: 10,
                weight_used: 50.0,
            },
            SetLog {
                set_number: 1,
                reps_completed: 10,
                weight_used: 50.0,
            },
        ];
        let err = engine.log_current_exercise(sets).unwrap_err();
        assert!(matches!(
            err,
            Error::SetOutOfSequence {
                position: 1,
                set_number: 2
            }
        ));
        assert_eq!(err.to_string(), "Set #1 is numbered 2");
        assert_eq!(engine.session().unwrap().current_index, 0);
    }

    #[test]
    fn test_log_invalid_weight_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(
            temp_dir.path().join("active.json"),
            temp_dir.path().join("active.lock"),
        );
        let mut engine = SessionEngine::new(store.clone());
        engine
            .start(&two_exercise_routine(), &ExerciseCatalog::shared())
            .unwrap();
        let before = std::fs::read_to_string(store.path()).unwrap();

        for weight in [-20.0, f64::NAN, f64::INFINITY] {
            let sets = vec![
                SetLog {
                    set_number: 1,
                    reps_completed: 5,
                    weight_used: 50.0,
                },
                SetLog {
                    set_number: 2,
                    reps_completed: 5,
                    weight_used: weight,
                },
            ];
            assert!(matches!(
                engine.log_current_exercise(sets),
                Err(Error::InvalidWeight { set_number: 2 })
            ));
        }
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), before);

        // The stored session is still resumable
        let mut restarted = SessionEngine::new(store);
        assert_eq!(restarted.resume().map(|s| s.current_index), Some(0));
    }

    #[test]
    fn test_log_after_complete_fails() {
        let mut engine = engine();
        engine
            .start(&two_exercise_routine(), &ExerciseCatalog::shared())
            .unwrap();
        for _ in 0..2 {
            engine
                .log_current_exercise(sets_from_inputs([("5", "5"), ("5", "5")]))
                .unwrap();
        }

        assert!(matches!(
            engine.log_current_exercise(sets_from_inputs([("5", "5"), ("5", "5")])),
            Err(Error::SessionComplete)
        ));
    }

    #[test]
    fn test_log_without_session_fails() {
        let mut engine = engine();
        assert!(matches!(
            engine.log_current_exercise(vec![]),
            Err(Error::NoActiveSession)
        ));
    }

    #[test]
    fn test_resume_roundtrip_across_engines() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(
            temp_dir.path().join("active.json"),
            temp_dir.path().join("active.lock"),
        );

        let mut first = SessionEngine::new(store.clone());
        first
            .start(&two_exercise_routine(), &ExerciseCatalog::shared())
            .unwrap();
        first
            .log_current_exercise(sets_from_inputs([("10", "50"), ("8", "47.5")]))
            .unwrap();
        let expected = first.session().cloned();

        let mut second = SessionEngine::new(store);
        assert_eq!(second.resume().cloned(), expected);
        assert_eq!(second.status(), SessionStatus::Active { index: 1, total: 2 });
    }

    #[test]
    fn test_resume_drops_invalid_sessions() {
        let mut engine = engine();
        engine
            .start(&two_exercise_routine(), &ExerciseCatalog::shared())
            .unwrap();

        let mut broken = engine.session().cloned().unwrap();
        broken.current_index = 5;
        engine.store().save(&broken).unwrap();
        assert!(engine.resume().is_none());
        assert!(engine.store().raw().is_none());

        // Sets recorded on an exercise that was never reached
        let mut broken = Session::from_routine(
            &two_exercise_routine(),
            &ExerciseCatalog::shared(),
            Utc::now(),
        )
        .unwrap();
        broken.exercise_logs[1].sets_completed = sets_from_inputs([("1", "1"), ("1", "1")]);
        engine.store().save(&broken).unwrap();
        assert!(engine.resume().is_none());

        // Finalized sessions are never left in the store
        let mut broken = Session::from_routine(
            &two_exercise_routine(),
            &ExerciseCatalog::shared(),
            Utc::now(),
        )
        .unwrap();
        broken.completed_at = Some(Utc::now());
        engine.store().save(&broken).unwrap();
        assert!(engine.resume().is_none());

        engine.store().set_raw(r#"{"routineId":"r","currentIndex":"zero"}"#);
        assert!(engine.resume().is_none());
        assert_eq!(engine.status(), SessionStatus::NotStarted);
    }

    #[test]
    fn test_start_overwrites_unfinished_session() {
        let store = MemorySessionStore::new();
        let mut engine = SessionEngine::new(store);
        engine
            .start(&two_exercise_routine(), &ExerciseCatalog::shared())
            .unwrap();
        engine
            .log_current_exercise(sets_from_inputs([("10", "50"), ("8", "50")]))
            .unwrap();

        let mut other = two_exercise_routine();
        other.id = "other".into();
        engine.start(&other, &ExerciseCatalog::shared()).unwrap();

        let stored = engine.store().load().unwrap();
        assert_eq!(stored.routine_id, "other");
        assert_eq!(stored.current_index, 0);
    }

    #[test]
    fn test_abandon_clears_store() {
        let mut engine = engine();
        engine
            .start(&two_exercise_routine(), &ExerciseCatalog::shared())
            .unwrap();

        engine.abandon().unwrap();
        assert!(engine.session().is_none());
        assert!(engine.store().load().is_none());
        assert!(engine.resume().is_none());
        // Idempotent
        engine.abandon().unwrap();
    }

    #[test]
    fn test_mutations_blocked_while_submitting() {
        let mut engine = engine();
        engine
            .start(&two_exercise_routine(), &ExerciseCatalog::shared())
            .unwrap();

        let lock = engine.store().begin_submission().unwrap();
        assert_eq!(engine.status(), SessionStatus::SubmissionInProgress);
        assert!(matches!(
            engine.log_current_exercise(sets_from_inputs([("1", "1"), ("1", "1")])),
            Err(Error::SubmissionInProgress)
        ));
        assert!(matches!(engine.abandon(), Err(Error::SubmissionInProgress)));
        drop(lock);

        assert!(engine.abandon().is_ok());
    }

    #[test]
    fn test_upcoming_and_progress() {
        let session = Session::from_routine(
            &two_exercise_routine(),
            &ExerciseCatalog::shared(),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(session.progress(), (0, 2));
        assert_eq!(session.upcoming().len(), 1);

        let mut done = session.clone();
        done.current_index = 2;
        assert!(done.upcoming().is_empty());
    }
}
