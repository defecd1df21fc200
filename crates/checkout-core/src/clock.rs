//! Clocks and Tickers
//!
//! Timer-driven work (status polling, the offer countdown) never touches
//! `tokio::time` directly; it asks an injected [`Clock`] for a [`Ticker`].
//! [`SystemClock`] is backed by tokio intervals, [`ManualClock`] only ticks
//! when a test advances it.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

/// Periodic tick source
#[async_trait]
pub trait Ticker: Send {
    /// Wait for the next tick. Returns `false` when no tick will ever come.
    async fn tick(&mut self) -> bool;
}

/// Time source for sessions
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Ticker firing every `period`, first tick one period from now
    fn ticker(&self, period: Duration) -> Box<dyn Ticker>;
}

/// Wall clock backed by the tokio timer
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

struct IntervalTicker(tokio::time::Interval);

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> bool {
        self.0.tick().await;
        true
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn ticker(&self, period: Duration) -> Box<dyn Ticker> {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Box::new(IntervalTicker(interval))
    }
}

struct ManualTimer {
    period: Duration,
    elapsed: Duration,
    tx: mpsc::UnboundedSender<()>,
}

#[derive(Default)]
struct ManualState {
    offset: Duration,
    timers: Vec<ManualTimer>,
}

/// Clock that only moves when [`ManualClock::advance`] is called
#[derive(Clone)]
pub struct ManualClock {
    start: DateTime<Utc>,
    state: Arc<Mutex<ManualState>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            start,
            state: Arc::new(Mutex::new(ManualState::default())),
        }
    }

    /// Move time forward, delivering every tick that falls due
    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.offset += by;
        state.timers.retain_mut(|timer| {
            timer.elapsed += by;
            while timer.elapsed >= timer.period {
                timer.elapsed -= timer.period;
                if timer.tx.send(()).is_err() {
                    return false;
                }
            }
            !timer.tx.is_closed()
        });
    }

    /// Number of tickers still listening
    pub fn active_tickers(&self) -> usize {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.timers.retain(|t| !t.tx.is_closed());
        state.timers.len()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

struct ManualTicker(mpsc::UnboundedReceiver<()>);

#[async_trait]
impl Ticker for ManualTicker {
    async fn tick(&mut self) -> bool {
        self.0.recv().await.is_some()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        self.start + chrono::Duration::from_std(state.offset).unwrap_or_else(|_| chrono::Duration::zero())
    }

    fn ticker(&self, period: Duration) -> Box<dyn Ticker> {
        let (tx, rx) = mpsc::unbounded_channel();
        // A zero period would spin forever in `advance`
        let period = period.max(Duration::from_millis(1));
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .timers
            .push(ManualTimer {
                period,
                elapsed: Duration::ZERO,
                tx,
            });
        Box::new(ManualTicker(rx))
    }
}
