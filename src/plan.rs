use chrono::{DateTime, Utc};

use crate::models::{Exercise, PlanPreferences, Reps, WorkoutPlan};

/// Builds today's plan from the user's preferences.
///
/// This is a fixed template for now: preferences are accepted but do not
/// change the exercises. The returned plan has no id; the plan service
/// assigns one when it stores it.
pub fn generate(prefs: &PlanPreferences, now: DateTime<Utc>) -> WorkoutPlan {
    tracing::debug!(
        goals = prefs.goals.len(),
        equipment = prefs.equipment.len(),
        "generating plan from template"
    );

    WorkoutPlan {
        id: String::new(),
        date: now,
        exercises: vec![
            template_exercise("1", "Push-ups", "10-12", 60, &["chest", "triceps", "shoulders"]),
            template_exercise("2", "Squats", "12-15", 90, &["quadriceps", "glutes"]),
            template_exercise("3", "Plank", "30-45 sec", 60, &["core", "abs"]),
        ],
        target_muscles: vec!["chest".into(), "legs".into(), "core".into()],
        estimated_duration: 25,
    }
}

fn template_exercise(id: &str, name: &str, reps: &str, rest: u32, muscles: &[&str]) -> Exercise {
    Exercise {
        id: id.to_owned(),
        name: name.to_owned(),
        sets: 3,
        reps: Reps::Target(reps.to_owned()),
        rest,
        weight: 0.0,
        muscle_groups: muscles.iter().map(|m| (*m).to_owned()).collect(),
    }
}
