use once_cell::sync::Lazy;
use std::{collections::BTreeSet, fmt::Display};
use strsim::jaro_winkler;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum, Serialize, Deserialize)]
#[value(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    Strength,
    MuscleGain,
    FatLoss,
    Endurance,
    Flexibility,
}

impl Goal {
    pub fn label(self) -> &'static str {
        match self {
            Self::Strength => "Build Strength",
            Self::MuscleGain => "Muscle Growth",
            Self::FatLoss => "Lose Weight",
            Self::Endurance => "Endurance",
            Self::Flexibility => "Flexibility",
        }
    }
}

impl Display for Goal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Strength => "strength",
            Self::MuscleGain => "muscle_gain",
            Self::FatLoss => "fat_loss",
            Self::Endurance => "endurance",
            Self::Flexibility => "flexibility",
        };

        write!(f, "{s}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum, Serialize, Deserialize)]
#[value(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Equipment {
    Bodyweight,
    Dumbbells,
    Barbell,
    ResistanceBands,
    PullUpBar,
    Bench,
    Kettlebells,
    GymAccess,
}

impl Equipment {
    pub fn label(self) -> &'static str {
        match self {
            Self::Bodyweight => "Bodyweight",
            Self::Dumbbells => "Dumbbells",
            Self::Barbell => "Barbell",
            Self::ResistanceBands => "Resistance Bands",
            Self::PullUpBar => "Pull-up Bar",
            Self::Bench => "Bench",
            Self::Kettlebells => "Kettlebells",
            Self::GymAccess => "Full Gym",
        }
    }
}

impl Display for Equipment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Bodyweight => "bodyweight",
            Self::Dumbbells => "dumbbells",
            Self::Barbell => "barbell",
            Self::ResistanceBands => "resistance_bands",
            Self::PullUpBar => "pull_up_bar",
            Self::Bench => "bench",
            Self::Kettlebells => "kettlebells",
            Self::GymAccess => "gym_access",
        };

        write!(f, "{s}")
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferredTime {
    #[default]
    Morning,
    Afternoon,
    Evening,
}

impl Display for PreferredTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
        };

        write!(f, "{s}")
    }
}

/// Muscle-group tags used by the bundled exercise library.
pub static MUSCLE_GROUPS: Lazy<BTreeSet<&'static str>> = Lazy::new(|| {
    BTreeSet::from([
        "abs",
        "back",
        "biceps",
        "calves",
        "chest",
        "core",
        "glutes",
        "hamstrings",
        "legs",
        "quadriceps",
        "shoulders",
        "triceps",
    ])
});

/// Returns the canonical lowercase muscle-group tag or `None` if unknown.
pub fn canonical_muscle<S: AsRef<str>>(m: S) -> Option<String> {
    let m = m.as_ref().trim().to_ascii_lowercase();
    match m.as_str() {
        "quad" | "quads" => Some("quadriceps".to_owned()),
        "ab" => Some("abs".to_owned()),
        _ if MUSCLE_GROUPS.contains(m.as_str()) => Some(m),
        _ => None,
    }
}

/// Return the closest known muscle group for `input`
/// if it scores high enough *and* clearly beats the runner-up.
pub fn best_muscle_suggestion(input: &str) -> Option<&'static str> {
    let inp = input.trim().to_ascii_lowercase();
    if inp.is_empty() {
        return None;
    }

    let mut scores: Vec<(&'static str, f64)> = MUSCLE_GROUPS
        .iter()
        .copied()
        .map(|m| (m, jaro_winkler(&inp, m)))
        .collect();

    // Highest score first.
    scores.sort_by(|a, b| b.1.total_cmp(&a.1));

    let (best_muscle, best_score) = *scores.first()?;
    let second_score = scores.get(1).map_or(0.0, |(_, s)| *s);

    const MIN_SCORE: f64 = 0.80;
    const GAP: f64 = 0.02;

    if best_score >= MIN_SCORE && best_score - second_score >= GAP {
        Some(best_muscle)
    } else {
        None
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFmt {
    Text,
    Json,
}

impl OutputFmt {
    pub fn from_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Text }
    }
}

/// Print `value` as pretty JSON, or hand it to `text` for human output.
pub fn emit<T: Serialize>(fmt: OutputFmt, value: &T, text: impl FnOnce(&T)) -> serde_json::Result<()> {
    match fmt {
        OutputFmt::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFmt::Text => text(value),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_muscle_normalises_aliases() {
        assert_eq!(canonical_muscle("Chest").as_deref(), Some("chest"));
        assert_eq!(canonical_muscle("quads").as_deref(), Some("quadriceps"));
        assert_eq!(canonical_muscle("wings"), None);
    }

    #[test]
    fn suggestion_catches_typos() {
        assert_eq!(best_muscle_suggestion("shoulers"), Some("shoulders"));
        assert_eq!(best_muscle_suggestion("zzz"), None);
        assert_eq!(best_muscle_suggestion("   "), None);
    }

    #[test]
    fn tags_serialise_snake_case() {
        let json = serde_json::to_string(&vec![Goal::MuscleGain]).unwrap();
        assert_eq!(json, "[\"muscle_gain\"]");
        let eq: Equipment = serde_json::from_str("\"pull_up_bar\"").unwrap();
        assert_eq!(eq, Equipment::PullUpBar);
        assert_eq!(eq.to_string(), "pull_up_bar");
    }
}
