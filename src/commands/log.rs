use anyhow::Result;
use colored::Colorize;
use fitcoach::{
    emit,
    models::WorkoutLog,
    storage::DataStore,
    utils::{format_duration, format_weight},
};
use itertools::Itertools;

use super::{Ctx, pad, resolve};
use crate::cli::LogCmd;

pub async fn handle<S: DataStore>(cmd: LogCmd, ctx: &Ctx<S>) -> Result<()> {
    match cmd {
        LogCmd::List { limit } => {
            let logs = ctx.logs.get_recent(limit).await?;
            emit(ctx.fmt, &logs, |logs| {
                if logs.is_empty() {
                    println!("{}", "(no workouts logged yet)".dimmed());
                    return;
                }
                println!("{}", "Workouts:".cyan().bold());
                for (i, log) in logs.iter().enumerate() {
                    println!("{:>3}. {}", i + 1, summary(log));
                }
            })?;
        }

        LogCmd::Show { log } => {
            let logs = ctx.logs.get_recent(usize::MAX).await?;
            match resolve(&logs, &log, |l| l.id.as_str()) {
                Some(l) => emit(ctx.fmt, l, print_log)?,
                None => println!("{} no workout `{}`", "error:".red().bold(), log),
            }
        }

        LogCmd::Delete { log } => {
            let logs = ctx.logs.get_recent(usize::MAX).await?;
            let Some(l) = resolve(&logs, &log, |l| l.id.as_str()) else {
                println!("{} no workout `{}`", "error:".red().bold(), log);
                return Ok(());
            };
            ctx.logs.delete(&l.id).await?;
            println!(
                "{} deleted workout from {}",
                "info:".blue().bold(),
                l.date.format("%Y-%m-%d %H:%M")
            );

            // Keep the profile counters in line with the remaining history.
            let rest = ctx.logs.get_all().await?;
            if let Err(e) = ctx
                .profiles
                .refresh_counters(&rest, ctx.now(), &ctx.settings.analytics())
                .await
            {
                tracing::debug!(error = %e, "profile counters not refreshed");
            }
        }
    }

    Ok(())
}

fn summary(log: &WorkoutLog) -> String {
    let status = if log.completed {
        "done".green()
    } else {
        "partial".yellow()
    };
    format!(
        "{}  {}  {} · {} exercises · {} sets",
        log.date.format("%a %Y-%m-%d %H:%M").to_string().bold(),
        pad(&status.to_string(), 7),
        format_duration(chrono::Duration::seconds(log.duration as i64)),
        log.exercises.len(),
        log.total_sets()
    )
}

pub fn print_log(log: &WorkoutLog) {
    println!("{}", summary(log));
    for ex in &log.exercises {
        println!("  {}", ex.name.bold());
        let sets = ex
            .sets
            .iter()
            .map(|s| format!("{}. {} × {}", s.set_number, s.reps, format_weight(s.weight)))
            .join("   ");
        println!("    {}", sets.dimmed());
    }
}
