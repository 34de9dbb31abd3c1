//! Locked, atomic whole-file persistence shared by the file-backed stores.
//!
//! Writers go through a temp file in the target directory and rename over
//! the original, so readers see either the old or the new contents.

use crate::{Error, Result};
use fs2::FileExt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Read a whole file under a shared lock.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn read_locked(path: &Path) -> Result<Option<String>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    file.lock_shared()?;

    let mut contents = String::new();
    let read = io::BufReader::new(&file).read_to_string(&mut contents);
    let _ = file.unlock();
    read?;

    Ok(Some(contents))
}

/// Atomically replace `path` with `contents`.
///
/// 1. Write to a temp file in the same directory under an exclusive lock
/// 2. Sync to disk
/// 3. Rename over the original
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::Other, "storage path missing parent")
    })?;
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    temp.as_file().lock_exclusive()?;

    {
        let mut writer = io::BufWriter::new(temp.as_file());
        writer.write_all(contents)?;
        writer.flush()?;
    }

    temp.as_file().sync_all()?;
    temp.as_file().unlock()?;

    temp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

/// Remove a file, treating "already gone" as success
pub fn remove_if_exists(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Turn a user identity (usually an email address) into a directory name
pub fn safe_id(user: &str) -> String {
    let id: String = user
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    // "", "." and ".." would escape or alias the users directory
    if id.chars().all(|c| c == '.') {
        format!("_{}", id)
    } else {
        id
    }
}

/// File layout of one user's data under the data directory
#[derive(Clone, Debug)]
pub struct UserPaths {
    root: PathBuf,
}

impl UserPaths {
    pub fn new(data_dir: &Path, user: &str) -> Self {
        Self {
            root: data_dir.join("users").join(safe_id(user)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Profile, user exercises and routines
    pub fn library(&self) -> PathBuf {
        self.root.join("library.json")
    }

    /// The single in-progress session
    pub fn active_session(&self) -> PathBuf {
        self.root.join("session").join("active_workout.json")
    }

    /// Guard file held while a finalize is submitting
    pub fn submission_lock(&self) -> PathBuf {
        self.root.join("session").join("active_workout.lock")
    }

    /// Append-only log of finalized workouts
    pub fn workout_log(&self) -> PathBuf {
        self.root.join("workout_log.wal")
    }
}
