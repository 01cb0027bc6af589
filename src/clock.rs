//! Tick sources that drive the live session clock and the rest timer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

/// Sequence number of a tick, starting at 1 for each source.
pub type Tick = u64;

const CHANNEL_CAPACITY: usize = 64;

/// A periodic signal that can be started, stopped and listened to.
///
/// Stopping must cancel all periodic work: after `stop` no further ticks
/// are delivered until the next `start`.
pub trait TickSource {
    fn start(&mut self);
    fn stop(&mut self);
    fn subscribe(&self) -> broadcast::Receiver<Tick>;
    fn is_running(&self) -> bool;
}

/// Real-time ticks from a tokio interval task.
pub struct IntervalTicker {
    period: Duration,
    tx: broadcast::Sender<Tick>,
    task: Option<JoinHandle<()>>,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            period,
            tx,
            task: None,
        }
    }

    pub fn every_second() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl TickSource for IntervalTicker {
    fn start(&mut self) {
        if self.task.is_some() {
            return;
        }
        let tx = self.tx.clone();
        let period = self.period;
        self.task = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut seq: Tick = 0;
            loop {
                interval.tick().await;
                seq += 1;
                // No subscribers is fine; they may attach later.
                let _ = tx.send(seq);
            }
        }));
        tracing::trace!(period_ms = self.period.as_millis() as u64, "ticker started");
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::trace!("ticker stopped");
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<Tick> {
        self.tx.subscribe()
    }

    fn is_running(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for IntervalTicker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Ticks on demand. Lets tests step a session second by second.
///
/// Clones share the channel and the running flag, so a handle kept aside
/// can step a ticker that was moved into a session loop.
#[derive(Clone)]
pub struct ManualTicker {
    tx: broadcast::Sender<Tick>,
    running: Arc<AtomicBool>,
    seq: Arc<AtomicU64>,
}

impl ManualTicker {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            running: Arc::new(AtomicBool::new(false)),
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit `n` ticks if running. Returns how many were emitted.
    ///
    /// More than the channel capacity at once makes listeners lag; they see
    /// `Lagged` with the number of ticks they missed.
    pub fn advance(&self, n: u64) -> u64 {
        if !self.is_running() {
            return 0;
        }
        for _ in 0..n {
            let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
            let _ = self.tx.send(seq);
        }
        n
    }
}

impl Default for ManualTicker {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSource for ManualTicker {
    fn start(&mut self) {
        self.running.store(true, Ordering::SeqCst);
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn subscribe(&self) -> broadcast::Receiver<Tick> {
        self.tx.subscribe()
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
