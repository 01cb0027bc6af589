use anyhow::Result;
use chrono::{Datelike, Weekday};
use colored::Colorize;
use fitcoach::{
    analytics::{self, CalendarDay},
    emit,
    storage::DataStore,
};
use itertools::Itertools;

use super::Ctx;

pub async fn handle<S: DataStore>(ctx: &Ctx<S>) -> Result<()> {
    let logs = ctx.logs.get_all().await?;
    let opts = ctx.settings.analytics();
    let days = analytics::heatmap(&logs, ctx.now(), &opts);
    let streak = analytics::current_streak(&logs, ctx.now(), &opts);

    emit(ctx.fmt, &days, |days| {
        let Some(first) = days.first() else {
            return;
        };
        println!("\n{}", "Last 6 weeks".bold().cyan());
        println!("{}", header(first.date.weekday()).dimmed());
        for week in &days.iter().chunks(7) {
            println!("{}", week.map(cell).join(" "));
        }
        let active = days.iter().filter(|d| d.has_workout).count();
        println!(
            "\n{} active days · streak {}",
            active.to_string().green().bold(),
            streak.to_string().yellow().bold()
        );
    })?;

    Ok(())
}

/// Two-letter weekday names starting at `first`.
fn header(first: Weekday) -> String {
    std::iter::successors(Some(first), |d| Some(d.succ()))
        .take(7)
        .map(|d| d.to_string()[..2].to_owned())
        .join(" ")
}

fn cell(day: &CalendarDay) -> String {
    let n = format!("{:2}", day.date.day());
    match (day.has_workout, day.is_today) {
        (true, true) => n.green().bold().underline().to_string(),
        (true, false) => n.green().bold().to_string(),
        (false, true) => n.underline().to_string(),
        (false, false) => n.dimmed().to_string(),
    }
}
