//! Durable storage for the single in-progress workout session.
//!
//! A store holds at most one session. Saves overwrite whatever was there
//! and are atomic from a reader's point of view; loads are fail-soft and
//! report unreadable data as "no session".

use crate::storage;
use crate::{Error, Result, Session};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Scoped storage for at most one in-progress session
pub trait SessionStore {
    /// Persist `session`, replacing any stored session
    fn save(&self, session: &Session) -> Result<()>;

    /// The stored session, or `None` if absent or unreadable
    fn load(&self) -> Option<Session>;

    /// Remove the stored session. Clearing an empty store succeeds.
    fn clear(&self) -> Result<()>;

    /// Take the guard that keeps a second finalize out while one is
    /// submitting. Fails with [`Error::SubmissionInProgress`] if held.
    fn begin_submission(&self) -> Result<SubmissionLock>;

    /// Whether a finalize currently holds the submission guard
    fn submission_in_progress(&self) -> bool;
}

/// Held for the duration of a finalize submission; released on drop
#[derive(Debug)]
pub struct SubmissionLock {
    guard: LockGuard,
}

#[derive(Debug)]
enum LockGuard {
    File(File),
    Flag(Arc<AtomicBool>),
}

impl Drop for SubmissionLock {
    fn drop(&mut self) {
        match &self.guard {
            LockGuard::File(file) => {
                if let Err(e) = file.unlock() {
                    tracing::warn!("Failed to release submission lock: {}", e);
                }
            }
            LockGuard::Flag(flag) => flag.store(false, Ordering::Release),
        }
    }
}

// ============================================================================
// File-backed store
// ============================================================================

/// Session store backed by one JSON file in the user's data directory
///
/// Survives process restarts; removing the data directory removes it.
#[derive(Clone, Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>, lock_path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_path: lock_path.into(),
        }
    }

    /// Store at the standard locations for one user
    pub fn for_user(paths: &storage::UserPaths) -> Self {
        Self::new(paths.active_session(), paths.submission_lock())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_lock_file(&self) -> Result<File> {
        if let Some(parent) = self.lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)?;
        Ok(file)
    }
}

impl SessionStore for FileSessionStore {
    fn save(&self, session: &Session) -> Result<()> {
        let contents = serde_json::to_vec(session)?;
        storage::write_atomic(&self.path, &contents)?;
        tracing::debug!(
            "Saved session for routine {} at index {} to {:?}",
            session.routine_id,
            session.current_index,
            self.path
        );
        Ok(())
    }

    fn load(&self) -> Option<Session> {
        let contents = match storage::read_locked(&self.path) {
            Ok(Some(contents)) => contents,
            Ok(None) => {
                tracing::debug!("No stored session at {:?}", self.path);
                return None;
            }
            Err(e) => {
                tracing::warn!("Unable to read session {:?}: {}. Ignoring it.", self.path, e);
                return None;
            }
        };

        match serde_json::from_str::<Session>(&contents) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!("Failed to parse session {:?}: {}. Ignoring it.", self.path, e);
                None
            }
        }
    }

    fn clear(&self) -> Result<()> {
        if storage::remove_if_exists(&self.path)? {
            tracing::debug!("Cleared session at {:?}", self.path);
        }
        Ok(())
    }

    fn begin_submission(&self) -> Result<SubmissionLock> {
        let file = self.open_lock_file()?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(SubmissionLock {
                guard: LockGuard::File(file),
            }),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                Err(Error::SubmissionInProgress)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn submission_in_progress(&self) -> bool {
        let Ok(file) = File::open(&self.lock_path) else {
            return false;
        };
        match FileExt::try_lock_shared(&file) {
            Ok(()) => {
                let _ = file.unlock();
                false
            }
            Err(e) => e.kind() == fs2::lock_contended_error().kind(),
        }
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Session store that keeps the serialized session in memory
///
/// Used by tests and by front ends that provide their own persistence
/// around the engine. Sessions are stored serialized so that loading goes
/// through the same decoding path as the file store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    contents: Mutex<Option<String>>,
    submitting: Arc<AtomicBool>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The raw stored document, if any
    pub fn raw(&self) -> Option<String> {
        self.contents.lock().ok().and_then(|c| c.clone())
    }

    /// Replace the raw stored document
    pub fn set_raw(&self, raw: impl Into<String>) {
        if let Ok(mut contents) = self.contents.lock() {
            *contents = Some(raw.into());
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn save(&self, session: &Session) -> Result<()> {
        let raw = serde_json::to_string(session)?;
        let mut contents = self
            .contents
            .lock()
            .map_err(|_| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "session store poisoned")))?;
        *contents = Some(raw);
        Ok(())
    }

    fn load(&self) -> Option<Session> {
        let raw = self.raw()?;
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!("Failed to parse stored session: {}. Ignoring it.", e);
                None
            }
        }
    }

    fn clear(&self) -> Result<()> {
        let mut contents = self
            .contents
            .lock()
            .map_err(|_| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "session store poisoned")))?;
        *contents = None;
        Ok(())
    }

    fn begin_submission(&self) -> Result<SubmissionLock> {
        if self
            .submitting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::SubmissionInProgress);
        }
        Ok(SubmissionLock {
            guard: LockGuard::Flag(Arc::clone(&self.submitting)),
        })
    }

    fn submission_in_progress(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }
}
