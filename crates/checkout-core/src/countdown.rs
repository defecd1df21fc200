//! Offer Countdown
//!
//! Purely cosmetic "offer ends in" timer. Reaching zero flips the display to
//! an expired message; it has no effect on the payment or on polling.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::clock::Clock;
use crate::task::ScopedTask;

/// Eight minutes
pub const OFFER_SECONDS: u32 = 480;

/// Countdown display state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CountdownState {
    pub remaining_secs: u32,
    pub expired: bool,
}

impl CountdownState {
    pub const fn new(total_secs: u32) -> Self {
        Self {
            remaining_secs: total_secs,
            expired: total_secs == 0,
        }
    }

    /// One second elapsed
    pub const fn tick(&mut self) {
        if self.remaining_secs <= 1 {
            self.remaining_secs = 0;
            self.expired = true;
        } else {
            self.remaining_secs -= 1;
        }
    }

    /// Banner text
    pub fn headline(&self) -> String {
        if self.expired {
            "AINDA DÁ TEMPO!".into()
        } else {
            format!("A OFERTA ACABA EM: {}", format_mmss(self.remaining_secs))
        }
    }
}

/// `mm:ss`
pub fn format_mmss(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Running countdown; stops on drop
pub struct Countdown {
    task: ScopedTask,
}

impl Countdown {
    /// Tick every second from `total_secs`, handing each new state to
    /// `on_tick`. Stops by itself once expired.
    pub fn start<F>(clock: &Arc<dyn Clock>, total_secs: u32, mut on_tick: F) -> Self
    where
        F: FnMut(CountdownState) + Send + 'static,
    {
        let mut ticker = clock.ticker(Duration::from_secs(1));
        let task = ScopedTask::spawn(move |gate| async move {
            let mut state = CountdownState::new(total_secs);
            while !state.expired && ticker.tick().await {
                state.tick();
                if gate.run(|| on_tick(state)).is_none() {
                    break;
                }
            }
            gate.close();
        });
        Self { task }
    }

    pub fn stop(&mut self) {
        self.task.stop();
    }

    pub fn is_running(&self) -> bool {
        self.task.is_running()
    }
}
