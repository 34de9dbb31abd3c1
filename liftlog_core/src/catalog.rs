//! Exercise catalog and display-name resolution.
//!
//! The shared catalog ships with the binary; users add their own exercises
//! through their library. Resolution merges both, user entries winning.

use crate::types::Exercise;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Maps an exercise id to a display name
///
/// Resolution never fails: a miss yields the id itself.
pub trait ExerciseNameResolver {
    fn resolve(&self, exercise_id: &str) -> String;
}

/// Cached shared catalog - built once and reused across all operations
static SHARED_CATALOG: Lazy<Vec<Exercise>> = Lazy::new(build_shared_catalog);

/// Get a reference to the cached shared catalog
pub fn shared_catalog() -> &'static [Exercise] {
    &SHARED_CATALOG
}

fn build_shared_catalog() -> Vec<Exercise> {
    [
        ("back_squat", "Back Squat"),
        ("front_squat", "Front Squat"),
        ("deadlift", "Deadlift"),
        ("romanian_deadlift", "Romanian Deadlift"),
        ("bench_press", "Bench Press"),
        ("incline_bench_press", "Incline Bench Press"),
        ("overhead_press", "Overhead Press"),
        ("barbell_row", "Barbell Row"),
        ("pullup", "Pull-up"),
        ("chinup", "Chin-up"),
        ("dip", "Dip"),
        ("lunge", "Walking Lunge"),
        ("leg_press", "Leg Press"),
        ("lat_pulldown", "Lat Pulldown"),
        ("bicep_curl", "Bicep Curl"),
        ("tricep_pushdown", "Tricep Pushdown"),
        ("lateral_raise", "Lateral Raise"),
        ("calf_raise", "Calf Raise"),
        ("plank", "Plank"),
        ("kb_swing", "Kettlebell Swing"),
    ]
    .into_iter()
    .map(|(id, name)| Exercise {
        id: id.into(),
        name: name.into(),
    })
    .collect()
}

/// Merged view over the shared catalog and a user's own exercises
#[derive(Clone, Debug, Default)]
pub struct ExerciseCatalog {
    names: HashMap<String, String>,
}

impl ExerciseCatalog {
    /// Catalog holding only the shared exercises
    pub fn shared() -> Self {
        Self::with_user_exercises(&[])
    }

    /// Shared catalog overlaid with user exercises (same id: user wins)
    pub fn with_user_exercises(user_exercises: &[Exercise]) -> Self {
        let mut names = HashMap::with_capacity(SHARED_CATALOG.len() + user_exercises.len());
        for ex in SHARED_CATALOG.iter().chain(user_exercises) {
            names.insert(ex.id.clone(), ex.name.clone());
        }
        tracing::debug!(
            "Exercise catalog: {} shared, {} user, {} merged",
            SHARED_CATALOG.len(),
            user_exercises.len(),
            names.len()
        );
        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl ExerciseNameResolver for ExerciseCatalog {
    fn resolve(&self, exercise_id: &str) -> String {
        match self.names.get(exercise_id) {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => exercise_id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_shared_catalog_ids_unique() {
        let ids: HashSet<_> = shared_catalog().iter().map(|e| &e.id).collect();
        assert_eq!(ids.len(), shared_catalog().len());
    }

    #[test]
    fn test_resolve_shared_exercise() {
        let catalog = ExerciseCatalog::shared();
        assert_eq!(catalog.resolve("bench_press"), "Bench Press");
    }

    #[test]
    fn test_resolve_falls_back_to_id() {
        let catalog = ExerciseCatalog::shared();
        assert_eq!(catalog.resolve("mystery_move"), "mystery_move");
    }

    #[test]
    fn test_user_exercises_override_shared() {
        let user = vec![
            Exercise {
                id: "bench_press".into(),
                name: "Paused Bench".into(),
            },
            Exercise {
                id: "sled_push".into(),
                name: "Sled Push".into(),
            },
            Exercise {
                id: "blank".into(),
                name: "  ".into(),
            },
        ];
        let catalog = ExerciseCatalog::with_user_exercises(&user);
        assert_eq!(catalog.resolve("bench_press"), "Paused Bench");
        assert_eq!(catalog.resolve("sled_push"), "Sled Push");
        assert_eq!(catalog.resolve("blank"), "blank");
        assert_eq!(catalog.len(), shared_catalog().len() + 2);
    }
}
