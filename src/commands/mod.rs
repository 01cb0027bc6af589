use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use fitcoach::{
    OutputFmt,
    config::Settings,
    services::{EntityService, ExerciseService, LogService, PlanService, ProfileService},
    storage::DataStore,
};

use crate::cli::Commands;

pub mod calendar;
pub mod config;
pub mod db;
pub mod exercise;
pub mod log;
pub mod plan;
pub mod profile;
pub mod progress;
pub mod session;

/// Everything a command handler needs.
pub struct Ctx<S> {
    pub store: Arc<S>,
    pub exercises: ExerciseService<S>,
    pub profiles: ProfileService<S>,
    pub logs: LogService<S>,
    pub plans: PlanService<S>,
    pub settings: Settings,
    pub fmt: OutputFmt,
}

impl<S: DataStore> Ctx<S> {
    pub fn new(store: Arc<S>, settings: Settings, fmt: OutputFmt) -> Self {
        let latency = settings.latency;
        Self {
            exercises: EntityService::new(store.clone(), latency),
            profiles: EntityService::new(store.clone(), latency),
            logs: EntityService::new(store.clone(), latency),
            plans: EntityService::new(store.clone(), latency),
            store,
            settings,
            fmt,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub async fn run<S: DataStore>(cmd: Commands, ctx: &Ctx<S>) -> Result<()> {
    match cmd {
        Commands::Profile(cmd) => profile::handle(cmd, ctx).await,
        Commands::Plan(cmd) => plan::handle(cmd, ctx).await,
        Commands::Exercise(cmd) => exercise::handle(cmd, ctx).await,
        Commands::Session(cmd) => session::handle(cmd, ctx).await,
        Commands::Log(cmd) => log::handle(cmd, ctx).await,
        Commands::Progress { range } => progress::handle(range, ctx).await,
        Commands::Calendar => calendar::handle(ctx).await,
        Commands::Db(cmd) => db::handle(cmd, ctx).await,
        // handled in main before the store is opened
        Commands::Config(_) => Ok(()),
    }
}

/// Pick an item by 1-based list index or by exact id.
pub fn resolve<'a, T>(items: &'a [T], key: &str, id: impl Fn(&T) -> &str) -> Option<&'a T> {
    if let Ok(idx) = key.parse::<usize>() {
        if let Some(item) = idx.checked_sub(1).and_then(|i| items.get(i)) {
            return Some(item);
        }
    }
    items.iter().find(|it| id(it) == key)
}

/// Printable width of a string that may contain ANSI color codes.
pub fn plain_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut i = 0;
    let mut count = 0;
    while i < bytes.len() {
        if bytes[i] == 0x1B {
            // Skip \x1b[... m
            while i < bytes.len() && bytes[i] != b'm' {
                i += 1;
            }
            i += 1;
        } else if bytes[i] & 0xC0 != 0x80 {
            count += 1;
            i += 1;
        } else {
            i += 1;
        }
    }
    count
}

/// Right-pad `s` to `width` printable columns.
pub fn pad(s: &str, width: usize) -> String {
    let fill = width.saturating_sub(plain_len(s));
    format!("{s}{}", " ".repeat(fill))
}
