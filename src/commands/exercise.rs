use anyhow::Result;
use colored::Colorize;
use fitcoach::{
    emit,
    models::{Exercise, SetRecord},
    storage::DataStore,
    types::{MUSCLE_GROUPS, best_muscle_suggestion, canonical_muscle},
    utils::format_weight,
};
use itertools::Itertools;
use serde::Serialize;

use super::{Ctx, pad, plain_len};
use crate::cli::ExerciseCmd;

/// Past sets of one exercise in one workout.
#[derive(Serialize)]
struct HistoryEntry {
    date: String,
    sets: Vec<SetRecord>,
}

#[derive(Serialize)]
struct ExerciseDetail<'a> {
    #[serde(flatten)]
    exercise: &'a Exercise,
    history: Vec<HistoryEntry>,
}

const HISTORY_LEN: usize = 5;

pub async fn handle<S: DataStore>(cmd: ExerciseCmd, ctx: &Ctx<S>) -> Result<()> {
    match cmd {
        ExerciseCmd::List { muscle } => {
            let exercises = match muscle {
                Some(m) => {
                    let Some(musc) = canonical_muscle(&m) else {
                        unknown_muscle(&m);
                        return Ok(());
                    };
                    ctx.exercises.get_by_muscle_group(&musc).await?
                }
                None => ctx.exercises.get_all().await?,
            };
            emit(ctx.fmt, &exercises, |list| print_table(list))?;
        }

        ExerciseCmd::Search { query } => {
            let hits = ctx.exercises.search(&query).await?;
            emit(ctx.fmt, &hits, |list| {
                if list.is_empty() {
                    println!("{} nothing matches `{}`", "info:".blue().bold(), query);
                } else {
                    print_table(list);
                }
            })?;
        }

        ExerciseCmd::Show { exercise } => {
            let key = exercise.join(" ");
            let all = ctx.exercises.get_all().await?;
            let found = match key.parse::<usize>() {
                Ok(n) => n.checked_sub(1).and_then(|i| all.get(i)),
                Err(_) => all.iter().find(|e| e.name.eq_ignore_ascii_case(&key) || e.id == key),
            };
            let Some(ex) = found else {
                println!("{} no such exercise `{}`", "error:".red().bold(), key);
                return Ok(());
            };

            let history = ctx
                .logs
                .get_recent(usize::MAX)
                .await?
                .into_iter()
                .filter_map(|log| {
                    let date = log.date.format("%Y-%m-%d").to_string();
                    log.exercises
                        .into_iter()
                        .find(|e| e.exercise_id == ex.id)
                        .map(|e| HistoryEntry { date, sets: e.sets })
                })
                .take(HISTORY_LEN)
                .collect();

            let detail = ExerciseDetail { exercise: ex, history };
            emit(ctx.fmt, &detail, print_detail)?;
        }
    }

    Ok(())
}

fn unknown_muscle(input: &str) {
    match best_muscle_suggestion(input) {
        Some(sug) => println!(
            "{} unknown muscle `{}` -- did you mean: `{}`?",
            "error:".red().bold(),
            input,
            sug.green()
        ),
        None => {
            println!("{} unknown muscle `{}`", "error:".red().bold(), input);
            println!(
                "{} {}",
                "Allowed muscles:".cyan().bold(),
                MUSCLE_GROUPS.iter().join(", ")
            );
        }
    }
}

fn print_table(list: &[Exercise]) {
    println!("{}", "Exercises:".cyan().bold());
    if list.is_empty() {
        println!("{}", "  (no exercises found)".dimmed());
        return;
    }

    let idx_w = list.len().to_string().len();
    let left: Vec<String> = list
        .iter()
        .enumerate()
        .map(|(i, ex)| {
            format!(
                " {} • {} ({})",
                format!("{:>idx_w$}", i + 1).yellow(),
                ex.name.bold(),
                ex.muscle_groups.join(", ").yellow()
            )
        })
        .collect();
    let width = left.iter().map(|s| plain_len(s)).max().unwrap_or(0);

    for (l, ex) in left.iter().zip(list) {
        println!(
            "{} {} {}",
            pad(l, width),
            "|".blue(),
            format!("{}×{} · rest {}s", ex.sets, ex.reps, ex.rest).dimmed()
        );
    }
}

fn print_detail(d: &ExerciseDetail<'_>) {
    let ex = d.exercise;
    println!("{}", ex.name.cyan().bold());
    println!("  {:<9} {}", "Muscles".bold(), ex.muscle_groups.join(", "));
    println!("  {:<9} {} × {}", "Target".bold(), ex.sets, ex.reps);
    println!("  {:<9} {}s", "Rest".bold(), ex.rest);
    println!("  {:<9} {}", "Weight".bold(), format_weight(ex.weight));

    if d.history.is_empty() {
        println!("\n{}", "  (not logged yet)".dimmed());
        return;
    }
    println!("\n{}", "Recent sets:".cyan().bold());
    for h in &d.history {
        let sets = h
            .sets
            .iter()
            .map(|s| format!("{}×{}", s.reps, format_weight(s.weight)))
            .join("  ");
        println!("  {}  {}", h.date.green(), sets);
    }
}
