//! Live workout session.
//!
//! A session walks a plan's exercises set by set:
//!
//! ```text
//! Active --(set done, more sets)--------> Resting --(skip / timer)--> Active
//! Active --(last set, more exercises)---> Active (next exercise)
//! Active --(last set, last exercise)----> Completed
//! ```
//!
//! Pausing only freezes the elapsed clock; it is not part of the progression.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{CoachError, Result, SessionError};
use crate::models::{Exercise, ExerciseLog, SetRecord, WorkoutLog, WorkoutPlan};
use crate::services::LogService;
use crate::storage::DataStore;
use crate::timer::{RestTimer, TimerEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Active,
    Resting,
    Completed,
    Abandoned,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionOptions {
    /// Also rest after the last set of an exercise when another exercise follows.
    pub rest_between_exercises: bool,
}

/// What `complete_set` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Input ignored; nothing changed.
    Rejected,
    /// Set stored; resting before set `next_set` of the same exercise.
    Rest { next_set: u32, seconds: u32 },
    /// Exercise finished; `index` is now current.
    NextExercise { index: usize, rest: Option<u32> },
    /// Last set of the plan stored.
    Finished,
}

/// What one clock tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    Elapsed,
    Rest { remaining: u32 },
    RestFinished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Abandoned,
    NeedsConfirmation,
}

pub struct WorkoutSession {
    plan: WorkoutPlan,
    options: SessionOptions,
    exercise_idx: usize,
    current_set: u32,
    records: BTreeMap<(usize, u32), SetRecord>,
    phase: Phase,
    cut_short: bool,
    paused: bool,
    rest: Option<RestTimer>,
    started_at: DateTime<Utc>,
    elapsed: u64,
    saved_as: Option<String>,
}

impl WorkoutSession {
    pub fn start(plan: WorkoutPlan, started_at: DateTime<Utc>, options: SessionOptions) -> Result<Self> {
        if plan.exercises.is_empty() {
            return Err(SessionError::EmptyPlan(plan.id).into());
        }
        if let Some(ex) = plan.exercises.iter().find(|e| e.sets == 0) {
            return Err(SessionError::NoSets(ex.name.clone()).into());
        }

        info!(plan = %plan.id, exercises = plan.exercises.len(), "session started");
        Ok(Self {
            plan,
            options,
            exercise_idx: 0,
            current_set: 1,
            records: BTreeMap::new(),
            phase: Phase::Active,
            cut_short: false,
            paused: false,
            rest: None,
            started_at,
            elapsed: 0,
            saved_as: None,
        })
    }

    /// Record the current set. `reps <= 0` or a call outside the active
    /// phase is ignored.
    pub fn complete_set(&mut self, reps: i32, weight: f64) -> Step {
        if self.phase != Phase::Active || reps <= 0 {
            debug!(reps, phase = ?self.phase, "set rejected");
            return Step::Rejected;
        }
        let weight = weight.max(0.0);
        let idx = self.exercise_idx;
        let set_number = self.current_set;

        self.records.insert(
            (idx, set_number),
            SetRecord {
                set_number,
                reps: reps.unsigned_abs(),
                weight,
                completed: true,
            },
        );
        let exercise = &mut self.plan.exercises[idx];
        exercise.weight = weight;
        let (target_sets, rest) = (exercise.sets, exercise.rest);
        info!(exercise = %exercise.name, set = set_number, reps, weight, "set completed");

        if set_number < target_sets {
            self.current_set += 1;
            self.begin_rest(rest);
            return Step::Rest {
                next_set: self.current_set,
                seconds: rest,
            };
        }

        if idx + 1 < self.plan.exercises.len() {
            self.exercise_idx += 1;
            self.current_set = 1;
            let rest = self.options.rest_between_exercises.then_some(rest);
            if let Some(secs) = rest {
                self.begin_rest(secs);
            }
            debug!(index = self.exercise_idx, "next exercise");
            return Step::NextExercise {
                index: self.exercise_idx,
                rest,
            };
        }

        self.phase = Phase::Completed;
        self.rest = None;
        info!(sets = self.records.len(), elapsed = self.elapsed, "session completed");
        Step::Finished
    }

    fn begin_rest(&mut self, seconds: u32) {
        self.phase = Phase::Resting;
        self.rest = Some(RestTimer::started(seconds));
        debug!(seconds, "resting");
    }

    /// User cut the rest short.
    pub fn skip_rest(&mut self) -> bool {
        if let Some(timer) = self.rest.as_mut() {
            timer.skip();
        }
        self.end_rest()
    }

    /// Rest timer ran out.
    pub fn rest_complete(&mut self) -> bool {
        self.end_rest()
    }

    fn end_rest(&mut self) -> bool {
        if self.phase != Phase::Resting {
            return false;
        }
        self.phase = Phase::Active;
        self.rest = None;
        debug!(set = self.current_set, "rest over");
        true
    }

    pub fn pause_rest(&mut self) {
        if let Some(timer) = self.rest.as_mut() {
            timer.pause();
        }
    }

    pub fn resume_rest(&mut self) {
        if let Some(timer) = self.rest.as_mut() {
            timer.start();
        }
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Returns the new paused flag.
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    /// One second of the external clock.
    pub fn tick(&mut self) -> TickOutcome {
        if self.is_over() {
            return TickOutcome::Idle;
        }
        if !self.paused {
            self.elapsed += 1;
        }
        let Some(timer) = self.rest.as_mut() else {
            return if self.paused {
                TickOutcome::Idle
            } else {
                TickOutcome::Elapsed
            };
        };
        match timer.tick() {
            Some(TimerEvent::Completed) => {
                self.rest_complete();
                TickOutcome::RestFinished
            }
            _ => TickOutcome::Rest {
                remaining: timer.remaining(),
            },
        }
    }

    /// Change the working weight of the current exercise before logging a set.
    pub fn set_weight(&mut self, weight: f64) {
        if self.is_over() {
            return;
        }
        self.plan.exercises[self.exercise_idx].weight = weight.max(0.0);
    }

    /// Stop before every set is done. The log will be marked incomplete.
    /// With no set recorded there is nothing to keep, so the session is
    /// abandoned and `false` is returned.
    pub fn finish_early(&mut self) -> bool {
        if self.is_over() {
            return false;
        }
        if self.records.is_empty() {
            self.exit(true);
            return false;
        }
        self.phase = Phase::Completed;
        self.cut_short = true;
        self.rest = None;
        info!(sets = self.records.len(), "session ended early");
        true
    }

    /// Leave without saving. Needs `confirmed` once any set is recorded.
    pub fn exit(&mut self, confirmed: bool) -> ExitOutcome {
        if self.needs_exit_confirmation() && !confirmed {
            return ExitOutcome::NeedsConfirmation;
        }
        self.phase = Phase::Abandoned;
        self.rest = None;
        self.records.clear();
        info!(plan = %self.plan.id, "session abandoned");
        ExitOutcome::Abandoned
    }

    pub fn needs_exit_confirmation(&self) -> bool {
        !self.records.is_empty()
    }

    /// Build the log from everything recorded so far, grouped by exercise
    /// in plan order.
    pub fn build_log(&self, date: DateTime<Utc>) -> Result<WorkoutLog, SessionError> {
        match self.phase {
            Phase::Active | Phase::Resting => return Err(SessionError::InProgress),
            Phase::Abandoned => return Err(SessionError::Abandoned),
            Phase::Completed => {}
        }

        let exercises = self
            .records
            .iter()
            .chunk_by(|((idx, _), _)| *idx)
            .into_iter()
            .map(|(idx, sets)| {
                let exercise = &self.plan.exercises[idx];
                ExerciseLog {
                    exercise_id: exercise.id.clone(),
                    name: exercise.name.clone(),
                    sets: sets.map(|(_, record)| record.clone()).collect(),
                }
            })
            .collect();

        Ok(WorkoutLog {
            id: String::new(),
            plan_id: self.plan.id.clone(),
            date,
            completed: !self.cut_short,
            duration: self.elapsed,
            exercises,
        })
    }

    /// Persist the log. On failure the session is untouched and `finalize`
    /// may be called again.
    pub async fn finalize<S: DataStore>(&mut self, logs: &LogService<S>, date: DateTime<Utc>) -> Result<WorkoutLog> {
        if let Some(id) = &self.saved_as {
            return Err(SessionError::AlreadyFinalized(id.clone()).into());
        }
        let log = self.build_log(date)?;
        match logs.create(log).await {
            Ok(saved) => {
                info!(log = %saved.id, sets = saved.total_sets(), duration = saved.duration, "workout saved");
                self.saved_as = Some(saved.id.clone());
                Ok(saved)
            }
            Err(e) => {
                warn!(error = %e, "could not save workout; session kept for retry");
                Err(e)
            }
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_over(&self) -> bool {
        matches!(self.phase, Phase::Completed | Phase::Abandoned)
    }

    pub fn is_resting(&self) -> bool {
        self.phase == Phase::Resting
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn plan(&self) -> &WorkoutPlan {
        &self.plan
    }

    pub fn exercise_index(&self) -> usize {
        self.exercise_idx
    }

    pub fn current_exercise(&self) -> &Exercise {
        &self.plan.exercises[self.exercise_idx]
    }

    pub fn current_set(&self) -> u32 {
        self.current_set
    }

    /// The next few exercises after the current one.
    pub fn up_next(&self, n: usize) -> &[Exercise] {
        let from = (self.exercise_idx + 1).min(self.plan.exercises.len());
        let to = (from + n).min(self.plan.exercises.len());
        &self.plan.exercises[from..to]
    }

    pub fn rest_timer(&self) -> Option<&RestTimer> {
        self.rest.as_ref()
    }

    pub fn records(&self) -> impl Iterator<Item = (&(usize, u32), &SetRecord)> {
        self.records.iter()
    }

    pub fn completed_sets(&self) -> usize {
        self.records.len()
    }

    pub fn total_sets(&self) -> u32 {
        self.plan.total_sets()
    }

    /// Share of planned sets done, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        let total = self.total_sets();
        if total == 0 {
            return 0.0;
        }
        (self.records.len() as f64 / f64::from(total)).min(1.0)
    }

    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn saved_as(&self) -> Option<&str> {
        self.saved_as.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Reps;
    use crate::services::Latency;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn exercise(id: &str, sets: u32, rest: u32) -> Exercise {
        Exercise {
            id: id.into(),
            name: id.to_uppercase(),
            sets,
            reps: Reps::Target("8-10".into()),
            rest,
            weight: 20.0,
            muscle_groups: vec!["chest".into()],
        }
    }

    fn plan(exercises: Vec<Exercise>) -> WorkoutPlan {
        WorkoutPlan {
            id: "plan-1".into(),
            date: Utc::now(),
            exercises,
            target_muscles: vec![],
            estimated_duration: 30,
        }
    }

    fn session(exercises: Vec<Exercise>) -> WorkoutSession {
        WorkoutSession::start(plan(exercises), Utc::now(), SessionOptions::default()).unwrap()
    }

    #[test]
    fn rejects_plans_it_cannot_run() {
        let empty = WorkoutSession::start(plan(vec![]), Utc::now(), SessionOptions::default());
        assert!(matches!(empty, Err(CoachError::Session(SessionError::EmptyPlan(_)))));

        let no_sets = WorkoutSession::start(plan(vec![exercise("a", 0, 60)]), Utc::now(), SessionOptions::default());
        assert!(matches!(no_sets, Err(CoachError::Session(SessionError::NoSets(_)))));
    }

    #[test]
    fn sets_rest_then_advance() {
        let mut s = session(vec![exercise("a", 2, 60), exercise("b", 1, 90)]);

        assert_eq!(s.complete_set(10, 20.0), Step::Rest { next_set: 2, seconds: 60 });
        assert_eq!(s.phase(), Phase::Resting);
        assert_eq!(s.rest_timer().unwrap().remaining(), 60);

        assert!(s.skip_rest());
        assert_eq!(s.phase(), Phase::Active);
        assert_eq!(s.current_set(), 2);

        assert_eq!(s.complete_set(8, 22.5), Step::NextExercise { index: 1, rest: None });
        assert_eq!(s.phase(), Phase::Active);
        assert_eq!(s.current_exercise().id, "b");
        assert_eq!(s.current_set(), 1);
        assert_eq!(s.plan().exercises[0].weight, 22.5);

        assert_eq!(s.complete_set(12, 0.0), Step::Finished);
        assert_eq!(s.phase(), Phase::Completed);
    }

    #[test]
    fn exactly_n_valid_sets_leave_an_exercise() {
        for n in 1..=5 {
            let mut s = session(vec![exercise("a", n, 30), exercise("b", 1, 30)]);
            for _ in 0..n {
                assert_eq!(s.exercise_index(), 0);
                assert_eq!(s.complete_set(0, 10.0), Step::Rejected);
                assert_eq!(s.complete_set(-3, 10.0), Step::Rejected);
                s.complete_set(5, 10.0);
                s.skip_rest();
            }
            assert_eq!(s.exercise_index(), 1, "sets = {n}");
        }
    }

    #[test]
    fn invalid_reps_change_nothing() {
        let mut s = session(vec![exercise("a", 3, 60)]);
        assert_eq!(s.complete_set(0, 50.0), Step::Rejected);
        assert_eq!(s.completed_sets(), 0);
        assert_eq!(s.current_set(), 1);
        assert_eq!(s.phase(), Phase::Active);
        assert_eq!(s.current_exercise().weight, 20.0);
    }

    #[test]
    fn cannot_log_a_set_while_resting() {
        let mut s = session(vec![exercise("a", 3, 60)]);
        s.complete_set(10, 20.0);
        assert_eq!(s.complete_set(10, 20.0), Step::Rejected);
        assert_eq!(s.completed_sets(), 1);
    }

    #[test]
    fn skip_and_timer_completion_reach_the_same_state() {
        let mut skipped = session(vec![exercise("a", 2, 3)]);
        skipped.complete_set(10, 20.0);
        skipped.skip_rest();

        let mut waited = session(vec![exercise("a", 2, 3)]);
        waited.complete_set(10, 20.0);
        assert_eq!(waited.tick(), TickOutcome::Rest { remaining: 2 });
        assert_eq!(waited.tick(), TickOutcome::Rest { remaining: 1 });
        assert_eq!(waited.tick(), TickOutcome::RestFinished);

        for s in [&skipped, &waited] {
            assert_eq!(s.phase(), Phase::Active);
            assert_eq!(s.current_set(), 2);
            assert!(s.rest_timer().is_none());
        }
        assert_eq!(waited.tick(), TickOutcome::Elapsed);
    }

    #[test]
    fn single_set_exercise_moves_on_without_rest() {
        let mut s = session(vec![exercise("a", 1, 60), exercise("b", 2, 60)]);
        assert_eq!(s.complete_set(10, 20.0), Step::NextExercise { index: 1, rest: None });
        assert!(!s.is_resting());
    }

    #[test]
    fn rest_between_exercises_is_opt_in() {
        let options = SessionOptions {
            rest_between_exercises: true,
        };
        let mut s = WorkoutSession::start(plan(vec![exercise("a", 1, 45), exercise("b", 1, 60)]), Utc::now(), options).unwrap();

        assert_eq!(s.complete_set(10, 20.0), Step::NextExercise { index: 1, rest: Some(45) });
        assert!(s.is_resting());
        assert_eq!(s.current_exercise().id, "b");
        s.rest_complete();
        assert_eq!(s.complete_set(10, 20.0), Step::Finished);
    }

    #[test]
    fn pause_freezes_elapsed_but_not_rest() {
        let mut s = session(vec![exercise("a", 2, 10)]);
        s.tick();
        s.tick();
        assert_eq!(s.elapsed(), 2);

        s.pause();
        assert_eq!(s.tick(), TickOutcome::Idle);
        assert_eq!(s.elapsed(), 2);

        s.complete_set(10, 20.0);
        assert_eq!(s.tick(), TickOutcome::Rest { remaining: 9 });
        assert_eq!(s.elapsed(), 2);

        assert!(!s.toggle_pause());
        s.tick();
        assert_eq!(s.elapsed(), 3);
    }

    #[test]
    fn paused_rest_timer_holds() {
        let mut s = session(vec![exercise("a", 2, 10)]);
        s.complete_set(10, 20.0);
        s.pause_rest();
        s.tick();
        s.tick();
        assert_eq!(s.rest_timer().unwrap().remaining(), 10);
        s.resume_rest();
        s.tick();
        assert_eq!(s.rest_timer().unwrap().remaining(), 9);
    }

    #[test]
    fn weight_edits_clamp_at_zero() {
        let mut s = session(vec![exercise("a", 2, 10)]);
        s.set_weight(-5.0);
        assert_eq!(s.current_exercise().weight, 0.0);
        s.set_weight(32.5);
        assert_eq!(s.current_exercise().weight, 32.5);
    }

    #[test]
    fn full_plan_builds_grouped_log() {
        let mut s = session(vec![exercise("a", 3, 60), exercise("b", 1, 60)]);
        for reps in [10, 9, 8] {
            s.tick();
            s.complete_set(reps, 40.0);
            s.tick();
            s.skip_rest();
        }
        s.complete_set(15, 0.0);
        assert_eq!(s.phase(), Phase::Completed);
        assert_eq!(s.tick(), TickOutcome::Idle);

        let log = s.build_log(Utc::now()).unwrap();
        assert!(log.completed);
        assert_eq!(log.plan_id, "plan-1");
        assert_eq!(log.duration, 6);
        assert_eq!(log.total_sets(), 4);
        assert_eq!(log.exercises.len(), 2);
        assert_eq!(log.exercises[0].exercise_id, "a");
        assert_eq!(
            log.exercises[0].sets.iter().map(|r| (r.set_number, r.reps)).collect::<Vec<_>>(),
            vec![(1, 10), (2, 9), (3, 8)]
        );
        assert_eq!(log.exercises[1].sets.len(), 1);
        assert!(log.exercises.iter().flat_map(|e| &e.sets).all(|r| r.completed));
    }

    #[test]
    fn early_finish_builds_partial_log() {
        let mut s = session(vec![exercise("a", 3, 60), exercise("b", 2, 60)]);
        assert_eq!(s.build_log(Utc::now()), Err(SessionError::InProgress));

        s.complete_set(10, 20.0);
        assert!(s.finish_early());
        assert!(s.rest_timer().is_none());

        let log = s.build_log(Utc::now()).unwrap();
        assert!(!log.completed);
        assert_eq!(log.total_sets(), 1);
        assert_eq!(log.exercises.len(), 1);
    }

    #[test]
    fn early_finish_without_sets_abandons() {
        let mut s = session(vec![exercise("a", 3, 60)]);
        assert!(!s.finish_early());
        assert_eq!(s.phase(), Phase::Abandoned);
        assert_eq!(s.build_log(Utc::now()), Err(SessionError::Abandoned));
    }

    #[test]
    fn exit_without_sets_needs_no_confirmation() {
        let mut s = session(vec![exercise("a", 3, 60)]);
        assert!(!s.needs_exit_confirmation());
        assert_eq!(s.exit(false), ExitOutcome::Abandoned);
        assert_eq!(s.phase(), Phase::Abandoned);
        assert_eq!(s.build_log(Utc::now()), Err(SessionError::Abandoned));
    }

    #[test]
    fn exit_with_sets_waits_for_confirmation() {
        let mut s = session(vec![exercise("a", 3, 60)]);
        s.complete_set(10, 20.0);

        assert_eq!(s.exit(false), ExitOutcome::NeedsConfirmation);
        assert_eq!(s.phase(), Phase::Resting);
        assert_eq!(s.completed_sets(), 1);

        assert_eq!(s.exit(true), ExitOutcome::Abandoned);
        assert_eq!(s.completed_sets(), 0);
        assert!(s.rest_timer().is_none());
    }

    #[test]
    fn up_next_lists_following_exercises() {
        let s = session((0..6).map(|i| exercise(&format!("e{i}"), 1, 10)).collect());
        let next: Vec<_> = s.up_next(3).iter().map(|e| e.id.as_str()).collect();
        assert_eq!(next, vec!["e1", "e2", "e3"]);
        assert_eq!(s.total_sets(), 6);
        assert_eq!(s.progress(), 0.0);
    }

    #[tokio::test]
    async fn finalize_saves_once() {
        let store = Arc::new(MemoryStore::new());
        let logs = LogService::new(store.clone(), Latency::none());

        let mut s = session(vec![exercise("a", 1, 60)]);
        s.tick();
        s.complete_set(10, 20.0);

        let saved = s.finalize(&logs, Utc::now()).await.unwrap();
        assert!(!saved.id.is_empty());
        assert_eq!(saved.duration, 1);
        assert_eq!(logs.get_all().await.unwrap().len(), 1);

        let again = s.finalize(&logs, Utc::now()).await;
        assert!(matches!(again, Err(CoachError::Session(SessionError::AlreadyFinalized(_)))));
        assert_eq!(logs.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn finalize_retries_after_a_failed_save() {
        let store = Arc::new(MemoryStore::new());
        let logs = LogService::new(store.clone(), Latency::none());

        let mut s = session(vec![exercise("a", 2, 60)]);
        s.complete_set(10, 20.0);
        s.skip_rest();
        s.complete_set(9, 20.0);

        store.fail_writes(true);
        let failed = s.finalize(&logs, Utc::now()).await;
        assert!(failed.as_ref().is_err_and(|e| e.is_recoverable()));
        assert_eq!(s.phase(), Phase::Completed);
        assert_eq!(s.completed_sets(), 2);

        store.fail_writes(false);
        let saved = s.finalize(&logs, Utc::now()).await.unwrap();
        assert_eq!(saved.total_sets(), 2);
        assert_eq!(s.saved_as(), Some(saved.id.as_str()));
    }
}
