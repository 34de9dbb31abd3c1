//! Error types for the liftlog_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for liftlog_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A session cannot be started from a routine with no exercises
    #[error("Routine has no exercises")]
    EmptyRoutine,

    /// A stored routine violates its target constraints
    #[error("Invalid routine: {0}")]
    InvalidRoutine(String),

    /// Every exercise in the session has already been logged
    #[error("All exercises in this session are already logged")]
    SessionComplete,

    /// Logged sets do not line up with the exercise's target sets
    #[error("Expected {expected} sets, got {actual}")]
    SetCountMismatch { expected: u32, actual: usize },

    /// Logged sets must be numbered 1, 2, 3... in order
    #[error("Set #{position} is numbered {set_number}")]
    SetOutOfSequence { position: usize, set_number: u32 },

    /// Weight must be a finite, non-negative number
    #[error("Set {set_number} has an invalid weight")]
    InvalidWeight { set_number: u32 },

    /// Finalize or summarize called before every exercise was logged
    #[error("Session still has exercises to log")]
    SessionIncomplete,

    /// There is no in-progress session to operate on
    #[error("No active workout session")]
    NoActiveSession,

    /// The workout log store rejected or did not acknowledge an entry
    #[error("Workout submission failed: {0}")]
    SubmissionFailed(String),

    /// Another finalize for the same session has not finished yet
    #[error("Workout submission already in progress")]
    SubmissionInProgress,

    /// Lookup miss in an external collaborator
    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Whether the caller can simply try the same action again.
    ///
    /// None of these leave the in-progress session modified.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Error::SubmissionFailed(_)
                | Error::SubmissionInProgress
                | Error::SetCountMismatch { .. }
                | Error::SetOutOfSequence { .. }
                | Error::InvalidWeight { .. }
                | Error::NotFound(_)
                | Error::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retriable_classification() {
        assert!(Error::SubmissionFailed("503".into()).is_retriable());
        assert!(Error::SubmissionInProgress.is_retriable());
        assert!(Error::SetCountMismatch { expected: 3, actual: 2 }.is_retriable());
        assert!(!Error::EmptyRoutine.is_retriable());
        assert!(!Error::SessionIncomplete.is_retriable());
    }

    #[test]
    fn test_set_count_mismatch_message() {
        let err = Error::SetCountMismatch { expected: 3, actual: 2 };
        assert_eq!(err.to_string(), "Expected 3 sets, got 2");
    }

    #[test]
    fn test_set_out_of_sequence_message() {
        let err = Error::SetOutOfSequence {
            position: 1,
            set_number: 2,
        };
        assert_eq!(err.to_string(), "Set #1 is numbered 2");
        assert!(err.is_retriable());
        assert!(Error::InvalidWeight { set_number: 1 }.is_retriable());
    }
}
