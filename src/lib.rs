//! Fitness coaching core: profiles, daily plans, live set tracking with rest
//! timers, and progress statistics over the workout history.
//!
//! The `fitcoach` binary is a thin clap front end over these modules.

pub mod analytics;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod plan;
pub mod services;
pub mod session;
pub mod storage;
pub mod timer;
pub mod types;
pub mod utils;

pub use error::{CoachError, Result, SessionError};
pub use types::{OutputFmt, emit};
