//! Application State

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use checkout_core::{
    AgeGate, CheckoutSession, Clock, NavigationPolicy, PaymentInitiator, PlanCatalog,
    SessionConfig, UpsellNegotiator, task::ScopedTask,
};

/// How often the registry looks for expired sessions
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// How long sessions are kept once nobody asks about them
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionExpiry {
    /// Closed after this long without a request
    pub idle: Duration,
    /// Closed this long after payment confirmation, requests or not
    pub confirmed_grace: Duration,
}

impl Default for SessionExpiry {
    fn default() -> Self {
        Self {
            idle: Duration::from_secs(600),
            confirmed_grace: Duration::from_secs(120),
        }
    }
}

struct Tracked {
    session: Arc<CheckoutSession>,
    last_seen: DateTime<Utc>,
}

fn elapsed(since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - since).to_std().unwrap_or_default()
}

/// Open checkout sessions by id.
///
/// A buyer who closes the tab never sends a close request, so sessions
/// that go quiet are torn down by [`sweep`](Self::sweep), which stops their
/// status polling.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Tracked>>,
    clock: Arc<dyn Clock>,
    expiry: SessionExpiry,
    sweeper: Mutex<Option<ScopedTask>>,
}

impl SessionRegistry {
    pub fn new(clock: Arc<dyn Clock>, expiry: SessionExpiry) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            clock,
            expiry,
            sweeper: Mutex::new(None),
        }
    }

    pub fn insert(&self, session: Arc<CheckoutSession>) {
        let tracked = Tracked {
            session,
            last_seen: self.clock.now(),
        };
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(tracked.session.id(), tracked);
    }

    /// Look a session up and mark it as seen
    pub fn get(&self, id: &Uuid) -> Option<Arc<CheckoutSession>> {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.get_mut(id).map(|tracked| {
            tracked.last_seen = now;
            tracked.session.clone()
        })
    }

    /// Remove a session and stop its timers
    pub fn close(&self, id: &Uuid) -> bool {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        removed.is_some_and(|tracked| {
            tracked.session.teardown();
            true
        })
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn is_expired(&self, tracked: &Tracked, now: DateTime<Utc>) -> bool {
        if tracked.session.is_closed() || elapsed(tracked.last_seen, now) >= self.expiry.idle {
            return true;
        }
        tracked
            .session
            .snapshot()
            .view
            .confirmed_at()
            .is_some_and(|at| elapsed(at, now) >= self.expiry.confirmed_grace)
    }

    /// Tear down idle sessions and confirmed ones past their grace period.
    /// Returns how many were closed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut expired = Vec::new();
        let open = {
            let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
            sessions.retain(|_, tracked| {
                if self.is_expired(tracked, now) {
                    expired.push(tracked.session.clone());
                    false
                } else {
                    true
                }
            });
            sessions.len()
        };

        for session in &expired {
            session.teardown();
        }
        if !expired.is_empty() {
            tracing::info!(closed = expired.len(), open, "Expired checkout sessions closed");
        }
        expired.len()
    }

    /// Sweep every `period` on the registry's clock until the registry is
    /// dropped. Replaces a sweeper already running.
    pub fn start_sweeper(self: &Arc<Self>, period: Duration) {
        let registry = Arc::downgrade(self);
        let mut ticker = self.clock.ticker(period);

        let task = ScopedTask::spawn(move |gate| async move {
            while ticker.tick().await {
                let Some(live) = registry.upgrade() else {
                    break;
                };
                if gate.run(|| live.sweep()).is_none() {
                    break;
                }
            }
        });

        *self.sweeper.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<PlanCatalog>,

    pub upsells: Arc<UpsellNegotiator>,

    /// PIX initiator (optional - None if the gateway is not configured)
    pub initiator: Option<PaymentInitiator>,

    pub clock: Arc<dyn Clock>,

    pub session_config: SessionConfig,

    pub sessions: Arc<SessionRegistry>,

    pub navigation: Arc<NavigationPolicy>,

    pub age_gate: Arc<AgeGate>,

    /// Shown on the profile page
    pub brand: String,
}
