//! Payment Status Poller
//!
//! Asks the provider for a transaction's status on a fixed period until an
//! approval is seen or the poller is stopped. There is no attempt limit and
//! no backoff; transient failures are logged and the next tick tries again.

use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::provider::{PaymentProvider, TransactionStatus};
use crate::task::ScopedTask;

/// Default polling period
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Result of one status query
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    Status(TransactionStatus),
    /// The query failed; polling continues
    Failed(String),
}

impl PollOutcome {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Status(s) if s.status.is_terminal())
    }
}

/// Cancellable polling loop for a single transaction
pub struct StatusPoller {
    provider: Arc<dyn PaymentProvider>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    task: Option<ScopedTask>,
}

impl StatusPoller {
    pub fn new(provider: Arc<dyn PaymentProvider>, clock: Arc<dyn Clock>) -> Self {
        Self {
            provider,
            clock,
            interval: POLL_INTERVAL,
            task: None,
        }
    }

    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Start polling `transaction_id`, replacing any loop already running.
    ///
    /// `on_outcome` runs once per completed query and never after
    /// [`stop`](Self::stop) has returned. The loop ends by itself after
    /// handing an approval to `on_outcome`.
    pub fn start<F>(&mut self, transaction_id: impl Into<String>, mut on_outcome: F)
    where
        F: FnMut(PollOutcome) + Send + 'static,
    {
        self.stop();

        let transaction_id = transaction_id.into();
        let provider = self.provider.clone();
        let mut ticker = self.clock.ticker(self.interval);

        tracing::debug!(
            transaction_id = %transaction_id,
            interval_secs = self.interval.as_secs(),
            provider = provider.name(),
            "Starting status polling"
        );

        self.task = Some(ScopedTask::spawn(move |gate| async move {
            let mut attempt: u64 = 0;

            while ticker.tick().await {
                if !gate.is_open() {
                    break;
                }
                attempt += 1;

                let outcome = match provider.transaction_status(&transaction_id).await {
                    Ok(status) => {
                        tracing::debug!(
                            transaction_id = %transaction_id,
                            attempt,
                            status = %status.status,
                            "Polled payment status"
                        );
                        PollOutcome::Status(status)
                    }
                    Err(e) => {
                        tracing::warn!(
                            transaction_id = %transaction_id,
                            attempt,
                            error = %e,
                            "Status check failed, retrying on next tick"
                        );
                        PollOutcome::Failed(e.to_string())
                    }
                };

                let terminal = outcome.is_terminal();
                if gate.run(|| on_outcome(outcome)).is_none() {
                    break;
                }
                if terminal {
                    tracing::info!(transaction_id = %transaction_id, attempt, "Payment approved");
                    gate.close();
                    break;
                }
            }
        }));
    }

    /// Cancel the loop. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(mut task) = self.task.take() {
            task.stop();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(ScopedTask::is_running)
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
