use clap::{Args, Parser, Subcommand};

use fitcoach::analytics::TimeRange;
use fitcoach::types::{Equipment, Goal, PreferredTime};

#[derive(Parser)]
#[command(name = "fitcoach", version, about = "CLI fitness coach")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Emit machine-readable JSON instead of colorful text.
    #[arg(global = true, long)]
    pub json: bool,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fitness profile
    #[command(subcommand, visible_alias = "pr")]
    Profile(ProfileCmd),

    /// Workout plans
    #[command(subcommand, visible_alias = "p")]
    Plan(PlanCmd),

    /// Browse the exercise library
    #[command(subcommand, visible_alias = "ex")]
    Exercise(ExerciseCmd),

    /// Live workout tracking
    #[command(subcommand, visible_alias = "s")]
    Session(SessionCmd),

    /// Completed workouts
    #[command(subcommand, visible_alias = "l")]
    Log(LogCmd),

    /// Workout statistics and streak
    Progress {
        /// Time range to aggregate
        #[arg(short, long, value_enum, default_value_t = TimeRange::Week)]
        range: TimeRange,
    },

    /// Six-week activity calendar
    #[command(visible_alias = "cal")]
    Calendar,

    /// View or edit fitcoach config
    #[command(subcommand)]
    Config(ConfigCmd),

    /// Db operations
    #[command(subcommand)]
    Db(DbCmd),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ProfileArgs {
    /// Fitness goal (repeatable)
    #[arg(short, long = "goal", value_enum)]
    pub goals: Vec<Goal>,

    /// Available equipment (repeatable)
    #[arg(short, long = "equipment", value_enum)]
    pub equipment: Vec<Equipment>,

    /// Workouts per week (1-7)
    #[arg(short, long)]
    pub days: Option<u8>,

    /// Minutes per session
    #[arg(short = 'm', long)]
    pub minutes: Option<u32>,

    /// Preferred time of day
    #[arg(short, long, value_enum)]
    pub time: Option<PreferredTime>,
}

#[derive(Subcommand)]
pub enum ProfileCmd {
    /// Create the profile (replaces an existing one)
    Setup(ProfileArgs),

    /// Show the current profile
    #[command(visible_alias = "s")]
    Show,

    /// Change parts of the current profile
    #[command(visible_alias = "e")]
    Edit(ProfileArgs),
}

#[derive(Subcommand)]
pub enum PlanCmd {
    /// Show today's plan, generating one if needed
    #[command(visible_alias = "t")]
    Today,

    /// Generate and store a new plan
    #[command(visible_alias = "g")]
    Generate,

    /// List stored plans
    #[command(visible_alias = "l")]
    List,

    /// Show a plan in detail
    #[command(visible_alias = "s")]
    Show {
        /// Plan index (from `plan list`) or id
        plan: String,
    },

    /// Delete a plan
    #[command(visible_alias = "d")]
    Delete {
        /// Plan index (from `plan list`) or id
        plan: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum ExerciseCmd {
    /// List all exercises
    #[command(visible_alias = "l")]
    List {
        /// Filter by muscle group
        #[arg(short, long)]
        muscle: Option<String>,
    },

    /// Search names and muscle groups
    Search {
        query: String,
    },

    /// Show detailed exercise information
    #[command(visible_alias = "s", trailing_var_arg = true)]
    Show {
        /// Exercise index or name
        exercise: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum SessionCmd {
    /// Start a live session on a plan (today's plan by default)
    #[command(visible_alias = "s")]
    Start {
        /// Plan index (from `plan list`) or id
        plan: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum LogCmd {
    /// Most recent workouts first
    #[command(visible_alias = "l")]
    List {
        /// How many workouts to show
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },

    /// Show one workout in detail
    #[command(visible_alias = "s")]
    Show {
        /// Log index (from `log list`) or id
        log: String,
    },

    /// Delete a workout
    #[command(visible_alias = "d")]
    Delete {
        /// Log index (from `log list`) or id
        log: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Show all config keys
    List,

    /// Get the value of a key
    Get { key: String },

    /// Set or override a key
    Set { key: String, val: String },

    /// Remove a key
    Unset { key: String },
}

#[derive(Subcommand)]
pub enum DbCmd {
    /// Export every collection to a JSON file
    Export {
        /// Output file path (defaults to dump.json)
        #[arg(short, long)]
        file: Option<String>,
    },

    /// Replace all data with the contents of a JSON export
    Import {
        /// Input file path
        file: String,
    },

    /// Restore the bundled sample data
    Reset {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}
