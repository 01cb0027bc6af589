use anyhow::Result;
use colored::Colorize;
use fitcoach::{
    analytics::{AchievementStatus, DailyCount, ProgressReport, TimeRange},
    emit,
    storage::DataStore,
    utils::format_duration,
};

use super::Ctx;

const BAR_WIDTH: u32 = 30;

pub async fn handle<S: DataStore>(range: TimeRange, ctx: &Ctx<S>) -> Result<()> {
    let logs = ctx.logs.get_all().await?;
    let report = ProgressReport::compute(&logs, range, ctx.now(), &ctx.settings.analytics());
    emit(ctx.fmt, &report, print_report)?;
    Ok(())
}

fn range_title(range: TimeRange) -> &'static str {
    match range {
        TimeRange::Week => "This week",
        TimeRange::Month => "Last 30 days",
        TimeRange::All => "All time",
    }
}

fn print_report(r: &ProgressReport) {
    println!("{}", range_title(r.range).cyan().bold());
    println!("{}", "─".repeat(36).dimmed());
    println!(
        "  {:<16} {}",
        "Workouts".bold(),
        r.stats.total_workouts.to_string().green().bold()
    );
    println!(
        "  {:<16} {}",
        "Avg. duration".bold(),
        format_duration(chrono::Duration::seconds(r.stats.avg_duration as i64))
    );
    println!("  {:<16} {}", "Total sets".bold(), r.stats.total_sets);
    println!(
        "  {:<16} {} day(s)",
        "Current streak".bold(),
        r.current_streak.to_string().yellow().bold()
    );

    if r.daily.is_empty() {
        println!("\n{}", "  (no completed workouts in this range)".dimmed());
    } else {
        println!("\n{}", "Workouts per day".bold());
        for line in bar_chart(&r.daily) {
            println!("  {line}");
        }
    }

    println!("\n{}", "Achievements".bold());
    for line in achievement_lines(&r.achievements) {
        println!("  {line}");
    }
}

fn achievement_lines(list: &[AchievementStatus]) -> Vec<String> {
    list.iter()
        .map(|a| {
            let name = a.achievement.name();
            if a.unlocked {
                format!("{} {}", "★".yellow().bold(), name.bold())
            } else {
                format!("{} {}", "☆".dimmed(), name.dimmed())
            }
        })
        .collect()
}

/// One horizontal bar per day, scaled to the busiest day.
fn bar_chart(daily: &[DailyCount]) -> Vec<String> {
    let max = daily.iter().map(|d| d.count).max().unwrap_or(0).max(1);
    daily
        .iter()
        .map(|d| {
            let len = (d.count * BAR_WIDTH).div_ceil(max) as usize;
            format!(
                "{} │{} {}",
                d.date.format("%a %m-%d"),
                "█".repeat(len).green(),
                d.count
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fitcoach::analytics::achievements;

    #[test]
    fn bars_scale_to_the_busiest_day() {
        colored::control::set_override(false);
        let day = |d| NaiveDate::from_ymd_opt(2026, 10, d).unwrap();
        let lines = bar_chart(&[
            DailyCount { date: day(19), count: 1 },
            DailyCount { date: day(20), count: 2 },
        ]);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].matches('█').count(), 15);
        assert_eq!(lines[1].matches('█').count(), 30);
        assert!(lines[1].starts_with("Tue 10-20"));
    }

    #[test]
    fn achievements_are_marked_when_unlocked() {
        colored::control::set_override(false);
        let lines = achievement_lines(&achievements(3, 8));
        assert_eq!(
            lines,
            vec!["★ First Workout", "★ 7 Day Streak", "☆ 10 Workouts", "☆ Consistency King"]
        );
    }
}
