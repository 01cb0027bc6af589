use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoachError, Result};
use crate::types::{Equipment, Goal, PreferredTime};

/// Target repetitions for an exercise.
/// Either a plain count or a free-form target such as `"10-12"` or `"30-45 sec"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reps {
    Count(u32),
    Target(String),
}

impl Display for Reps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{n}"),
            Self::Target(s) => write!(f, "{s}"),
        }
    }
}

/// Exercise template as it appears in the library and inside plans.
/// Only `weight` changes once a plan exists (a session may adjust it).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub sets: u32,
    pub reps: Reps,
    /// Rest between sets, in seconds.
    pub rest: u32,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub muscle_groups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutPlan {
    pub id: String,
    pub date: DateTime<Utc>,
    pub exercises: Vec<Exercise>,
    #[serde(default)]
    pub target_muscles: Vec<String>,
    /// Minutes.
    pub estimated_duration: u32,
}

impl WorkoutPlan {
    pub fn total_sets(&self) -> u32 {
        self.exercises.iter().map(|e| e.sets).sum()
    }
}

/// One performed set. Never edited after it is recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetRecord {
    pub set_number: u32,
    pub reps: u32,
    pub weight: f64,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseLog {
    pub exercise_id: String,
    pub name: String,
    pub sets: Vec<SetRecord>,
}

/// Historical record of an executed (possibly partial) session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutLog {
    pub id: String,
    pub plan_id: String,
    pub date: DateTime<Utc>,
    pub completed: bool,
    /// Seconds.
    pub duration: u64,
    #[serde(default)]
    pub exercises: Vec<ExerciseLog>,
}

impl WorkoutLog {
    pub fn total_sets(&self) -> usize {
        self.exercises.iter().map(|e| e.sets.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub days_per_week: u8,
    /// Minutes.
    pub session_duration: u32,
    pub preferred_time: PreferredTime,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            days_per_week: 3,
            session_duration: 45,
            preferred_time: PreferredTime::Morning,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(default)]
    pub equipment: Vec<Equipment>,
    #[serde(default)]
    pub schedule: Schedule,
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub total_workouts: u32,
}

impl UserProfile {
    /// Setup requires at least one goal and one piece of equipment,
    /// and a schedule that fits in a week.
    pub fn validate(&self) -> Result<()> {
        if self.goals.is_empty() {
            return Err(CoachError::validation("select at least one fitness goal"));
        }
        if self.equipment.is_empty() {
            return Err(CoachError::validation("select your available equipment"));
        }
        if !(1..=7).contains(&self.schedule.days_per_week) {
            return Err(CoachError::validation("days per week must be between 1 and 7"));
        }
        if self.schedule.session_duration == 0 {
            return Err(CoachError::validation("session duration must be positive"));
        }
        Ok(())
    }
}

/// Input to plan generation. Every field may be left empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanPreferences {
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(default)]
    pub equipment: Vec<Equipment>,
    #[serde(default)]
    pub schedule: Option<Schedule>,
}

impl From<&UserProfile> for PlanPreferences {
    fn from(p: &UserProfile) -> Self {
        Self {
            goals: p.goals.clone(),
            equipment: p.equipment.clone(),
            schedule: Some(p.schedule.clone()),
        }
    }
}
