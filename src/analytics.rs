//! Progress statistics over the workout history.
//!
//! Timestamps are stored in UTC; anything that talks about "days" converts
//! them with the configured UTC offset first.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Datelike, Duration, FixedOffset, Local, NaiveDate, Offset, Utc, Weekday};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::models::WorkoutLog;

/// Days covered by the calendar heatmap (six full weeks).
pub const HEATMAP_DAYS: i64 = 42;
/// Length of the `month` range.
pub const MONTH_DAYS: i64 = 30;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeRange {
    /// Current calendar week
    #[default]
    Week,
    /// Trailing 30 days
    Month,
    /// Everything
    All,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnalyticsOptions {
    pub week_start: Weekday,
    pub offset: FixedOffset,
}

impl Default for AnalyticsOptions {
    /// Sunday weeks in the host's current UTC offset.
    fn default() -> Self {
        Self {
            week_start: Weekday::Sun,
            offset: *Local::now().offset(),
        }
    }
}

impl AnalyticsOptions {
    pub fn utc(week_start: Weekday) -> Self {
        Self {
            week_start,
            offset: Utc.fix(),
        }
    }

    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    /// First and last day of the week containing `day`.
    pub fn week_bounds(&self, day: NaiveDate) -> (NaiveDate, NaiveDate) {
        let back = (7 + day.weekday().num_days_from_monday() - self.week_start.num_days_from_monday()) % 7;
        let start = day - Duration::days(i64::from(back));
        (start, start + Duration::days(6))
    }
}

/// Logs that fall in `range` as seen at `now`. Completion is not checked here.
pub fn filter_logs<'a>(
    logs: &'a [WorkoutLog],
    range: TimeRange,
    now: DateTime<Utc>,
    opts: &AnalyticsOptions,
) -> Vec<&'a WorkoutLog> {
    match range {
        TimeRange::Week => {
            let (start, end) = opts.week_bounds(opts.local_date(now));
            logs.iter()
                .filter(|l| {
                    let day = opts.local_date(l.date);
                    day >= start && day <= end
                })
                .collect()
        }
        TimeRange::Month => {
            let from = now - Duration::days(MONTH_DAYS);
            logs.iter().filter(|l| l.date >= from).collect()
        }
        TimeRange::All => logs.iter().collect(),
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total_workouts: usize,
    /// Seconds, rounded to the nearest whole second.
    pub avg_duration: u64,
    pub total_sets: usize,
}

/// Aggregates over completed logs only.
pub fn stats(logs: &[&WorkoutLog]) -> Stats {
    let completed: Vec<_> = logs.iter().filter(|l| l.completed).collect();
    let total_workouts = completed.len();
    if total_workouts == 0 {
        return Stats::default();
    }
    let total_duration: u64 = completed.iter().map(|l| l.duration).sum();
    Stats {
        total_workouts,
        avg_duration: (total_duration as f64 / total_workouts as f64).round() as u64,
        total_sets: completed.iter().map(|l| l.total_sets()).sum(),
    }
}

/// Consecutive active days ending at the most recent completed workout.
///
/// Zero unless that workout was today or yesterday. Always computed over the
/// whole history, never a filtered range.
pub fn current_streak(logs: &[WorkoutLog], now: DateTime<Utc>, opts: &AnalyticsOptions) -> u32 {
    let days: BTreeSet<NaiveDate> = logs
        .iter()
        .filter(|l| l.completed)
        .map(|l| opts.local_date(l.date))
        .collect();

    let today = opts.local_date(now);
    let mut newest_first = days.into_iter().rev();
    let Some(mut prev) = newest_first.next() else {
        return 0;
    };
    if (today - prev).num_days() > 1 {
        return 0;
    }

    let mut streak = 1;
    for day in newest_first {
        if (prev - day).num_days() > 1 {
            break;
        }
        streak += 1;
        prev = day;
    }
    streak
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u32,
}

/// Completed workouts per day, oldest day first.
pub fn daily_counts(logs: &[&WorkoutLog], opts: &AnalyticsOptions) -> Vec<DailyCount> {
    let mut per_day: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    for log in logs.iter().filter(|l| l.completed) {
        *per_day.entry(opts.local_date(log.date)).or_default() += 1;
    }
    per_day
        .into_iter()
        .map(|(date, count)| DailyCount { date, count })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub has_workout: bool,
    pub is_today: bool,
}

/// The last six weeks ending today, oldest first.
pub fn heatmap(logs: &[WorkoutLog], now: DateTime<Utc>, opts: &AnalyticsOptions) -> Vec<CalendarDay> {
    let active: BTreeSet<NaiveDate> = logs
        .iter()
        .filter(|l| l.completed)
        .map(|l| opts.local_date(l.date))
        .collect();
    let today = opts.local_date(now);

    (0..HEATMAP_DAYS)
        .rev()
        .map(|back| {
            let date = today - Duration::days(back);
            CalendarDay {
                date,
                has_workout: active.contains(&date),
                is_today: back == 0,
            }
        })
        .collect()
}

/// Milestones earned from the whole history, never from a range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Achievement {
    FirstWorkout,
    SevenDayStreak,
    TenWorkouts,
    ConsistencyKing,
}

impl Achievement {
    pub const ALL: [Achievement; 4] = [
        Self::FirstWorkout,
        Self::SevenDayStreak,
        Self::TenWorkouts,
        Self::ConsistencyKing,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::FirstWorkout => "First Workout",
            Self::SevenDayStreak => "7 Day Streak",
            Self::TenWorkouts => "10 Workouts",
            Self::ConsistencyKing => "Consistency King",
        }
    }

    /// `completed` is the all-time count of completed workouts.
    pub fn is_unlocked(self, completed: usize, streak: u32) -> bool {
        match self {
            Self::FirstWorkout => completed >= 1,
            Self::SevenDayStreak => streak >= 7,
            Self::TenWorkouts => completed >= 10,
            Self::ConsistencyKing => streak >= 30,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct AchievementStatus {
    pub achievement: Achievement,
    pub unlocked: bool,
}

pub fn achievements(completed: usize, streak: u32) -> Vec<AchievementStatus> {
    Achievement::ALL
        .into_iter()
        .map(|achievement| AchievementStatus {
            achievement,
            unlocked: achievement.is_unlocked(completed, streak),
        })
        .collect()
}

/// Everything the progress screen shows for one range.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProgressReport {
    pub range: TimeRange,
    pub stats: Stats,
    pub current_streak: u32,
    pub daily: Vec<DailyCount>,
    pub calendar: Vec<CalendarDay>,
    pub achievements: Vec<AchievementStatus>,
}

impl ProgressReport {
    pub fn compute(logs: &[WorkoutLog], range: TimeRange, now: DateTime<Utc>, opts: &AnalyticsOptions) -> Self {
        let filtered = filter_logs(logs, range, now, opts);
        let streak = current_streak(logs, now, opts);
        let completed = logs.iter().filter(|l| l.completed).count();
        Self {
            range,
            stats: stats(&filtered),
            current_streak: streak,
            daily: daily_counts(&filtered, opts),
            calendar: heatmap(logs, now, opts),
            achievements: achievements(completed, streak),
        }
    }
}
