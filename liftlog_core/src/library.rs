//! Per-user library: profile, user-defined exercises and routines.
//!
//! The library is a single JSON document per user. It is the routine
//! source sessions are started from and contributes the user half of the
//! exercise name catalog.

use crate::catalog::ExerciseCatalog;
use crate::storage;
use crate::{Error, Exercise, Result, Routine};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Supplies an immutable routine by id
pub trait RoutineSource {
    /// Fails with [`Error::NotFound`] if no routine has this id.
    fn get_routine(&self, id: &str) -> Result<Routine>;
}

/// Display preferences stored with the user's data
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

/// Everything a user has authored
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct UserLibrary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
    #[serde(default)]
    pub routines: Vec<Routine>,
}

impl UserLibrary {
    /// Load a library, returning an empty one if the file is missing or
    /// cannot be parsed.
    pub fn load(path: &Path) -> Result<Self> {
        match Self::read(path) {
            Ok(Some(library)) => {
                tracing::debug!(
                    "Loaded library from {:?}: {} routines, {} exercises",
                    path,
                    library.routines.len(),
                    library.exercises.len()
                );
                Ok(library)
            }
            Ok(None) => {
                tracing::info!("No library file at {:?}, starting empty", path);
                Ok(Self::default())
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to read library {:?}: {}. Using an empty library.",
                    path,
                    e
                );
                Ok(Self::default())
            }
        }
    }

    /// Strict read: a present but unreadable file is an error
    fn read(path: &Path) -> Result<Option<Self>> {
        match storage::read_locked(path)? {
            Some(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            None => Ok(None),
        }
    }

    /// Atomically write the library
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_vec_pretty(self)?;
        storage::write_atomic(path, &contents)?;
        tracing::debug!("Saved library to {:?}", path);
        Ok(())
    }

    /// Merge another library document into this one.
    ///
    /// Routines and exercises replace existing entries with the same id and
    /// are otherwise appended in order. A profile in `other` replaces ours.
    pub fn merge(&mut self, other: UserLibrary) -> MergeReport {
        let mut report = MergeReport::default();

        for exercise in other.exercises {
            match self.exercises.iter_mut().find(|e| e.id == exercise.id) {
                Some(existing) => {
                    *existing = exercise;
                    report.exercises_replaced += 1;
                }
                None => {
                    self.exercises.push(exercise);
                    report.exercises_added += 1;
                }
            }
        }

        for routine in other.routines {
            match self.routines.iter_mut().find(|r| r.id == routine.id) {
                Some(existing) => {
                    *existing = routine;
                    report.routines_replaced += 1;
                }
                None => {
                    self.routines.push(routine);
                    report.routines_added += 1;
                }
            }
        }

        if other.profile.is_some() {
            self.profile = other.profile;
        }

        report
    }

    /// Merge the library document at `source` into the library at `target`.
    ///
    /// Unlike [`UserLibrary::load`], an unparsable target is an error here
    /// so that importing never overwrites data it could not read.
    pub fn import_from(target: &Path, source: &Path) -> Result<MergeReport> {
        let incoming: UserLibrary = match storage::read_locked(source)? {
            Some(contents) => serde_json::from_str(&contents)?,
            None => return Err(Error::NotFound(format!("{}", source.display()))),
        };

        let problems: Vec<String> = incoming.routines.iter().flat_map(Routine::validate).collect();
        if !problems.is_empty() {
            return Err(Error::InvalidRoutine(problems.join("; ")));
        }

        let mut library = Self::read(target)?.unwrap_or_default();
        let report = library.merge(incoming);
        library.save(target)?;

        tracing::info!("Imported {:?} into {:?}: {:?}", source, target, report);
        Ok(report)
    }

    /// Exercise name catalog for this user
    pub fn catalog(&self) -> ExerciseCatalog {
        ExerciseCatalog::with_user_exercises(&self.exercises)
    }

    /// Unit label from the profile, if the user set one
    pub fn units(&self) -> Option<&str> {
        self.profile.as_ref().and_then(|p| p.units.as_deref())
    }
}

impl RoutineSource for UserLibrary {
    fn get_routine(&self, id: &str) -> Result<Routine> {
        let routine = self
            .routines
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::NotFound(format!("routine {}", id)))?;

        let problems = routine.validate();
        if !problems.is_empty() {
            return Err(Error::InvalidRoutine(problems.join("; ")));
        }

        Ok(routine.clone())
    }
}

/// Counts from a library merge
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub routines_added: usize,
    pub routines_replaced: usize,
    pub exercises_added: usize,
    pub exercises_replaced: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ExerciseNameResolver;
    use crate::RoutineExercise;

    fn routine(id: &str, exercises: &[(&str, u32)]) -> Routine {
        Routine {
            id: id.into(),
            name: format!("Routine {}", id),
            exercises: exercises
                .iter()
                .map(|(ex, sets)| RoutineExercise {
                    exercise_id: (*ex).into(),
                    target_sets: *sets,
                    target_reps: 10,
                    target_weight: 20.0,
                })
                .collect(),
        }
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("library.json");

        let library = UserLibrary {
            profile: Some(Profile {
                units: Some("kg".into()),
            }),
            exercises: vec![Exercise {
                id: "sled_push".into(),
                name: "Sled Push".into(),
            }],
            routines: vec![routine("r1", &[("back_squat", 3)])],
        };
        library.save(&path).unwrap();

        let loaded = UserLibrary::load(&path).unwrap();
        assert_eq!(loaded.units(), Some("kg"));
        assert_eq!(loaded.routines, library.routines);
        assert_eq!(loaded.catalog().resolve("sled_push"), "Sled Push");
    }

    #[test]
    fn test_corrupted_library_loads_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("library.json");
        std::fs::write(&path, "{ not json").unwrap();

        let library = UserLibrary::load(&path).unwrap();
        assert!(library.routines.is_empty());
    }

    #[test]
    fn test_get_routine() {
        let library = UserLibrary {
            routines: vec![routine("r1", &[("deadlift", 1)])],
            ..Default::default()
        };

        assert_eq!(library.get_routine("r1").unwrap().name, "Routine r1");
        assert!(matches!(library.get_routine("r2"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_get_invalid_routine() {
        let library = UserLibrary {
            routines: vec![routine("r1", &[("deadlift", 0)])],
            ..Default::default()
        };
        assert!(matches!(
            library.get_routine("r1"),
            Err(Error::InvalidRoutine(_))
        ));
    }

    #[test]
    fn test_merge_replaces_by_id_and_appends() {
        let mut library = UserLibrary {
            routines: vec![routine("r1", &[("deadlift", 1)])],
            ..Default::default()
        };
        let incoming = UserLibrary {
            routines: vec![
                routine("r1", &[("deadlift", 5)]),
                routine("r2", &[("bench_press", 3)]),
            ],
            ..Default::default()
        };

        let report = library.merge(incoming);
        assert_eq!(report.routines_replaced, 1);
        assert_eq!(report.routines_added, 1);
        assert_eq!(library.routines[0].exercises[0].target_sets, 5);
        assert_eq!(library.routines[1].id, "r2");
        assert!(library.profile.is_none());
    }

    #[test]
    fn test_import_refuses_to_overwrite_unreadable_target() {
        let temp_dir = tempfile::tempdir().unwrap();
        let target = temp_dir.path().join("library.json");
        let source = temp_dir.path().join("incoming.json");
        std::fs::write(&target, "garbage").unwrap();
        UserLibrary::default().save(&source).unwrap();

        assert!(UserLibrary::import_from(&target, &source).is_err());
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "garbage");
    }

    #[test]
    fn test_import_rejects_invalid_routines() {
        let temp_dir = tempfile::tempdir().unwrap();
        let target = temp_dir.path().join("library.json");
        let source = temp_dir.path().join("incoming.json");
        UserLibrary {
            routines: vec![routine("r1", &[("deadlift", 0)])],
            ..Default::default()
        }
        .save(&source)
        .unwrap();

        assert!(matches!(
            UserLibrary::import_from(&target, &source),
            Err(Error::InvalidRoutine(_))
        ));
        assert!(!target.exists());
    }
}
