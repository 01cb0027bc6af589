use anyhow::Result;
use colored::Colorize;
use fitcoach::{
    CoachError, emit,
    models::{Schedule, UserProfile},
    storage::DataStore,
};
use itertools::Itertools;

use super::Ctx;
use crate::cli::{ProfileArgs, ProfileCmd};

pub async fn handle<S: DataStore>(cmd: ProfileCmd, ctx: &Ctx<S>) -> Result<()> {
    match cmd {
        ProfileCmd::Setup(args) => {
            let mut profile = UserProfile {
                id: String::new(),
                goals: Vec::new(),
                equipment: Vec::new(),
                schedule: Schedule::default(),
                current_streak: 0,
                total_workouts: 0,
            };
            apply(&mut profile, args);
            if let Err(e) = profile.validate() {
                println!("{} {}", "error:".red().bold(), e);
                println!("  pass at least one {} and one {}", "--goal".green(), "--equipment".green());
                return Ok(());
            }

            for old in ctx.profiles.get_all().await? {
                ctx.profiles.delete(&old.id).await?;
            }
            let profile = ctx.profiles.create(profile).await?;
            tracing::info!(profile = %profile.id, "profile created");
            emit(ctx.fmt, &profile, |p| {
                println!("{} profile saved", "ok:".green().bold());
                print_profile(p);
            })?;
        }

        ProfileCmd::Show => match ctx.profiles.get_current().await {
            Ok(profile) => emit(ctx.fmt, &profile, print_profile)?,
            Err(CoachError::NotFound { .. }) => no_profile(),
            Err(e) => return Err(e.into()),
        },

        ProfileCmd::Edit(args) => {
            let mut profile = match ctx.profiles.get_current().await {
                Ok(p) => p,
                Err(CoachError::NotFound { .. }) => {
                    no_profile();
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };
            apply(&mut profile, args);
            if let Err(e) = profile.validate() {
                println!("{} {}", "error:".red().bold(), e);
                return Ok(());
            }
            let profile = ctx.profiles.save(&profile).await?;
            emit(ctx.fmt, &profile, |p| {
                println!("{} profile updated", "ok:".green().bold());
                print_profile(p);
            })?;
        }
    }

    Ok(())
}

/// Lists given on the command line replace the stored ones; omitted options
/// keep their value.
fn apply(profile: &mut UserProfile, args: ProfileArgs) {
    if !args.goals.is_empty() {
        profile.goals = args.goals.into_iter().unique().collect();
    }
    if !args.equipment.is_empty() {
        profile.equipment = args.equipment.into_iter().unique().collect();
    }
    if let Some(days) = args.days {
        profile.schedule.days_per_week = days;
    }
    if let Some(minutes) = args.minutes {
        profile.schedule.session_duration = minutes;
    }
    if let Some(time) = args.time {
        profile.schedule.preferred_time = time;
    }
}

fn no_profile() {
    println!(
        "{} no profile yet, run `{}`",
        "warning:".yellow().bold(),
        "fitcoach profile setup --goal strength --equipment bodyweight".green()
    );
}

fn print_profile(p: &UserProfile) {
    println!("{}", "Profile".cyan().bold());
    println!(
        "  {:<10} {}",
        "Goals".bold(),
        p.goals.iter().map(|g| g.label()).join(", ")
    );
    println!(
        "  {:<10} {}",
        "Equipment".bold(),
        p.equipment.iter().map(|e| e.label()).join(", ")
    );
    println!(
        "  {:<10} {} days/week, {} min, {}",
        "Schedule".bold(),
        p.schedule.days_per_week,
        p.schedule.session_duration,
        p.schedule.preferred_time
    );
    println!(
        "  {:<10} {} day(s) · {} workouts total",
        "Streak".bold(),
        p.current_streak.to_string().yellow().bold(),
        p.total_workouts
    );
}
