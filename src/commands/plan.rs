use anyhow::Result;
use colored::Colorize;
use fitcoach::{
    CoachError, emit,
    models::{PlanPreferences, WorkoutPlan},
    storage::DataStore,
    utils::format_weight,
};
use itertools::Itertools;

use super::{Ctx, resolve};
use crate::cli::PlanCmd;

pub async fn handle<S: DataStore>(cmd: PlanCmd, ctx: &Ctx<S>) -> Result<()> {
    match cmd {
        PlanCmd::Today => {
            let prefs = preferences(ctx).await?;
            let plan = ctx.plans.get_today_plan(&prefs, ctx.now()).await?;
            emit(ctx.fmt, &plan, print_plan)?;
        }

        PlanCmd::Generate => {
            let prefs = preferences(ctx).await?;
            let plan = ctx.plans.generate_plan(&prefs, ctx.now()).await?;
            emit(ctx.fmt, &plan, |p| {
                println!("{} generated plan {}", "ok:".green().bold(), p.id.dimmed());
                print_plan(p);
            })?;
        }

        PlanCmd::List => {
            let plans = sorted_plans(ctx).await?;
            emit(ctx.fmt, &plans, |plans| {
                if plans.is_empty() {
                    println!("{}", "(no plans yet, try `fitcoach plan today`)".dimmed());
                    return;
                }
                for (i, p) in plans.iter().enumerate() {
                    println!(
                        "{:>3}. {}  {} exercises · {} sets · ~{} min  {}",
                        i + 1,
                        p.date.format("%Y-%m-%d").to_string().green(),
                        p.exercises.len(),
                        p.total_sets(),
                        p.estimated_duration,
                        p.target_muscles.join("/").dimmed()
                    );
                }
            })?;
        }

        PlanCmd::Show { plan } => {
            let plans = sorted_plans(ctx).await?;
            match resolve(&plans, &plan, |p| p.id.as_str()) {
                Some(p) => emit(ctx.fmt, p, print_plan)?,
                None => println!("{} no plan `{}`", "error:".red().bold(), plan),
            }
        }

        PlanCmd::Delete { plan } => {
            let plans = sorted_plans(ctx).await?;
            let Some(p) = resolve(&plans, &plan, |p| p.id.as_str()) else {
                println!("{} no plan `{}`", "error:".red().bold(), plan);
                return Ok(());
            };
            ctx.plans.delete(&p.id).await?;
            println!(
                "{} deleted plan from {}",
                "info:".blue().bold(),
                p.date.format("%Y-%m-%d")
            );
        }
    }

    Ok(())
}

/// Preferences from the current profile, or empty ones if there is none.
pub async fn preferences<S: DataStore>(ctx: &Ctx<S>) -> Result<PlanPreferences> {
    match ctx.profiles.get_current().await {
        Ok(profile) => Ok(PlanPreferences::from(&profile)),
        Err(CoachError::NotFound { .. }) => {
            tracing::debug!("no profile, generating with default preferences");
            Ok(PlanPreferences::default())
        }
        Err(e) => Err(e.into()),
    }
}

/// Newest first; list indexes refer to this order.
pub async fn sorted_plans<S: DataStore>(ctx: &Ctx<S>) -> Result<Vec<WorkoutPlan>> {
    Ok(ctx
        .plans
        .get_all()
        .await?
        .into_iter()
        .sorted_by(|a, b| b.date.cmp(&a.date))
        .collect())
}

pub fn print_plan(p: &WorkoutPlan) {
    println!(
        "{} {}",
        "Workout for".cyan().bold(),
        p.date.format("%A, %B %d").to_string().cyan().bold()
    );
    println!(
        "  {} · ~{} min · {} sets",
        p.target_muscles.join(", "),
        p.estimated_duration,
        p.total_sets()
    );
    println!();
    for (i, ex) in p.exercises.iter().enumerate() {
        println!(
            "  {}. {}  {}×{}  rest {}s  {}",
            i + 1,
            ex.name.bold(),
            ex.sets,
            ex.reps,
            ex.rest,
            format_weight(ex.weight).dimmed()
        );
    }
}
