use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use chrono::{FixedOffset, Local, Weekday};
use serde::{Deserialize, Serialize};

use crate::{
    analytics::AnalyticsOptions,
    error::{CoachError, Result},
    services::Latency,
    session::SessionOptions,
};

pub const DEFAULT_DATABASE: &str = "./fitcoach.db";

/// Keys `config set` accepts.
pub const KNOWN_KEYS: [&str; 7] = [
    "database",
    "backend",
    "week_start",
    "utc_offset",
    "latency",
    "log_level",
    "rest_between_exercises",
];

/// Raw key/value config as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub map: BTreeMap<String, String>,
}

impl Config {
    /// `<config_dir>/fitcoach/config`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("fitcoach").join("config"))
    }

    /// A missing file is an empty config.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| CoachError::validation(format!("bad config file {}: {e}", path.display())))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let text = toml::to_string(self).map_err(|e| CoachError::validation(format!("cannot encode config: {e}")))?;
        fs::write(path, text)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Backend {
    #[default]
    Sqlite,
    Memory,
}

/// Resolved, validated configuration. Built once in `main` and passed down.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub database: String,
    pub backend: Backend,
    pub week_start: Weekday,
    /// `None` means the host's offset.
    pub utc_offset: Option<FixedOffset>,
    pub latency: Latency,
    pub log_level: String,
    pub rest_between_exercises: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: DEFAULT_DATABASE.to_owned(),
            backend: Backend::Sqlite,
            week_start: Weekday::Sun,
            utc_offset: None,
            latency: Latency::none(),
            log_level: "warn".to_owned(),
            rest_between_exercises: false,
        }
    }
}

impl Settings {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let mut s = Self::default();

        for (key, val) in &cfg.map {
            let val = val.trim();
            match key.as_str() {
                "database" => {
                    if val.is_empty() {
                        return Err(CoachError::validation("`database` must not be empty"));
                    }
                    s.database = val.to_owned();
                }
                "backend" => s.backend = parse_backend(val)?,
                "week_start" => s.week_start = parse_week_start(val)?,
                "utc_offset" => s.utc_offset = parse_offset(val)?,
                "latency" => {
                    s.latency = match val {
                        "none" => Latency::none(),
                        "simulated" => Latency::simulated(),
                        _ => return Err(invalid(key, val, "none|simulated")),
                    }
                }
                "log_level" => s.log_level = val.to_owned(),
                "rest_between_exercises" => {
                    s.rest_between_exercises = val.parse().map_err(|_| invalid(key, val, "true|false"))?
                }
                other => tracing::warn!(key = other, "ignoring unknown config key"),
            }
        }

        Ok(s)
    }

    pub fn analytics(&self) -> AnalyticsOptions {
        AnalyticsOptions {
            week_start: self.week_start,
            offset: self.utc_offset.unwrap_or_else(|| *Local::now().offset()),
        }
    }

    pub fn session(&self) -> SessionOptions {
        SessionOptions {
            rest_between_exercises: self.rest_between_exercises,
        }
    }
}

/// Check a value before `config set` stores it.
pub fn validate_entry(key: &str, val: &str) -> Result<()> {
    if !KNOWN_KEYS.contains(&key) {
        return Err(CoachError::validation(format!(
            "unknown key `{key}` (known: {})",
            KNOWN_KEYS.join(", ")
        )));
    }
    let mut cfg = Config::default();
    cfg.map.insert(key.to_owned(), val.to_owned());
    Settings::from_config(&cfg).map(|_| ())
}

fn invalid(key: &str, val: &str, expected: &str) -> CoachError {
    CoachError::validation(format!("invalid `{key}` value `{val}`, expected {expected}"))
}

fn parse_backend(val: &str) -> Result<Backend> {
    match val {
        "sqlite" => Ok(Backend::Sqlite),
        "memory" => Ok(Backend::Memory),
        _ => Err(invalid("backend", val, "sqlite|memory")),
    }
}

fn parse_week_start(val: &str) -> Result<Weekday> {
    match val.to_lowercase().as_str() {
        "sunday" | "sun" => Ok(Weekday::Sun),
        "monday" | "mon" => Ok(Weekday::Mon),
        _ => Err(invalid("week_start", val, "sunday|monday")),
    }
}

/// `local`, `Z`, or `±HH:MM`.
fn parse_offset(val: &str) -> Result<Option<FixedOffset>> {
    let err = || invalid("utc_offset", val, "local or ±HH:MM");
    match val {
        "local" => return Ok(None),
        "Z" | "z" | "utc" | "UTC" => return Ok(FixedOffset::east_opt(0)),
        _ => {}
    }

    let (sign, rest) = match val.split_at_checked(1) {
        Some(("+", rest)) => (1, rest),
        Some(("-", rest)) => (-1, rest),
        _ => return Err(err()),
    };
    let (h, m) = rest.split_once(':').ok_or_else(err)?;
    let h: i32 = h.parse().map_err(|_| err())?;
    let m: i32 = m.parse().map_err(|_| err())?;
    if h > 14 || m > 59 {
        return Err(err());
    }
    FixedOffset::east_opt(sign * (h * 3600 + m * 60))
        .map(Some)
        .ok_or_else(err)
}
