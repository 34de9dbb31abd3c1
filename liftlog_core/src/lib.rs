#![forbid(unsafe_code)]

//! Core domain model and business logic for liftlog.
//!
//! This crate provides:
//! - Domain types (routines, sessions, set and exercise logs)
//! - The workout session engine and its persistence ports
//! - Aggregation and finalization of finished workouts
//! - File-backed adapters (library, session store, workout log)
//! - History listing and CSV export

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod storage;
pub mod library;
pub mod session_store;
pub mod workout_log;
pub mod engine;
pub mod report;
pub mod history;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{ExerciseCatalog, ExerciseNameResolver};
pub use config::Config;
pub use storage::UserPaths;
pub use library::{RoutineSource, UserLibrary};
pub use session_store::{FileSessionStore, MemorySessionStore, SessionStore, SubmissionLock};
pub use workout_log::{JsonlWorkoutLog, WorkoutLogStore};
pub use engine::SessionEngine;
pub use report::{summarize, summarize_entry, AggregationReporter, FinalizedWorkout};
pub use history::load_recent_entries;
pub use export::export_csv;
