//! Countdown used for rest periods between sets.
//!
//! The timer holds no clock of its own: something calls [`RestTimer::tick`] once
//! per second while it runs (see [`crate::clock::TickSource`]).

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    /// Never started, or reset by `stop`.
    Idle,
    Running,
    Paused,
    Completed,
}

/// Signals a caller reacts to. `Completed` fires at most once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Completed,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestTimer {
    duration: u32,
    remaining: u32,
    running: bool,
    completed: bool,
}

impl RestTimer {
    pub fn new(duration: u32) -> Self {
        Self {
            duration,
            remaining: duration,
            running: false,
            completed: false,
        }
    }

    /// A timer that is already counting down.
    pub fn started(duration: u32) -> Self {
        let mut t = Self::new(duration);
        t.start();
        t
    }

    /// Start or resume. A completed timer starts over from the full duration.
    pub fn start(&mut self) {
        if self.completed {
            self.remaining = self.duration;
            self.completed = false;
        }
        self.running = true;
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Reset to the full duration without completing.
    pub fn stop(&mut self) -> TimerEvent {
        self.running = false;
        self.remaining = self.duration;
        self.completed = false;
        TimerEvent::Stopped
    }

    /// Jump straight to completion. Returns `None` if this run already completed.
    pub fn skip(&mut self) -> Option<TimerEvent> {
        self.running = false;
        self.remaining = 0;
        self.finish()
    }

    /// One second of wall time.
    pub fn tick(&mut self) -> Option<TimerEvent> {
        if !self.running {
            return None;
        }
        if self.remaining <= 1 {
            self.remaining = 0;
            self.running = false;
            return self.finish();
        }
        self.remaining -= 1;
        None
    }

    fn finish(&mut self) -> Option<TimerEvent> {
        if self.completed {
            return None;
        }
        self.completed = true;
        Some(TimerEvent::Completed)
    }

    pub fn state(&self) -> TimerState {
        if self.completed {
            TimerState::Completed
        } else if self.running {
            TimerState::Running
        } else if self.remaining == self.duration {
            TimerState::Idle
        } else {
            TimerState::Paused
        }
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Elapsed share of the countdown in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.duration == 0 {
            return 1.0;
        }
        let done = f64::from(self.duration) - f64::from(self.remaining);
        (done / f64::from(self.duration)).clamp(0.0, 1.0)
    }

    /// `m:ss` of the remaining time.
    pub fn label(&self) -> String {
        format!("{}:{:02}", self.remaining / 60, self.remaining % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_to_end(t: &mut RestTimer, ticks: u32) -> Vec<TimerEvent> {
        (0..ticks).filter_map(|_| t.tick()).collect()
    }

    #[test]
    fn counts_down_and_completes_once() {
        let mut t = RestTimer::started(3);
        assert_eq!(t.tick(), None);
        assert_eq!(t.remaining(), 2);

        let events = run_to_end(&mut t, 10);
        assert_eq!(events, vec![TimerEvent::Completed]);
        assert_eq!(t.remaining(), 0);
        assert_eq!(t.state(), TimerState::Completed);
        assert!(!t.is_running());
    }

    #[test]
    fn idle_timer_ignores_ticks() {
        let mut t = RestTimer::new(5);
        assert_eq!(run_to_end(&mut t, 10), vec![]);
        assert_eq!(t.state(), TimerState::Idle);
    }

    #[test]
    fn pause_then_resume_continues_from_remaining() {
        let mut t = RestTimer::started(10);
        run_to_end(&mut t, 4);
        t.pause();
        assert_eq!(t.state(), TimerState::Paused);
        run_to_end(&mut t, 5);
        assert_eq!(t.remaining(), 6);

        t.start();
        run_to_end(&mut t, 1);
        assert_eq!(t.remaining(), 5);
    }

    #[test]
    fn restarting_a_completed_timer_resets_it() {
        let mut t = RestTimer::started(2);
        assert_eq!(run_to_end(&mut t, 2), vec![TimerEvent::Completed]);

        t.start();
        assert_eq!(t.remaining(), 2);
        assert_eq!(t.state(), TimerState::Running);
        assert_eq!(run_to_end(&mut t, 2), vec![TimerEvent::Completed]);
    }

    #[test]
    fn stop_resets_without_completing() {
        let mut t = RestTimer::started(30);
        run_to_end(&mut t, 12);
        assert_eq!(t.stop(), TimerEvent::Stopped);
        assert_eq!(t.remaining(), 30);
        assert!(!t.is_completed());
        assert_eq!(t.state(), TimerState::Idle);
    }

    #[test]
    fn skip_completes_immediately_and_only_once() {
        let mut t = RestTimer::started(90);
        assert_eq!(t.skip(), Some(TimerEvent::Completed));
        assert_eq!(t.state(), TimerState::Completed);
        assert_eq!(t.remaining(), 0);

        assert_eq!(t.skip(), None);
        assert_eq!(run_to_end(&mut t, 5), vec![]);
    }

    #[test]
    fn skip_works_on_an_idle_timer() {
        let mut t = RestTimer::new(45);
        assert_eq!(t.skip(), Some(TimerEvent::Completed));
        assert_eq!(t.progress(), 1.0);
    }

    #[test]
    fn progress_is_clamped_fraction() {
        let mut t = RestTimer::started(4);
        assert_eq!(t.progress(), 0.0);
        t.tick();
        assert_eq!(t.progress(), 0.25);
        run_to_end(&mut t, 10);
        assert_eq!(t.progress(), 1.0);
        assert_eq!(RestTimer::new(0).progress(), 1.0);
    }

    #[test]
    fn zero_length_timer_completes_on_first_tick() {
        let mut t = RestTimer::started(0);
        assert_eq!(t.tick(), Some(TimerEvent::Completed));
        assert_eq!(t.tick(), None);
    }

    #[test]
    fn label_is_minutes_and_seconds() {
        assert_eq!(RestTimer::new(90).label(), "1:30");
        assert_eq!(RestTimer::new(5).label(), "0:05");
    }
}
