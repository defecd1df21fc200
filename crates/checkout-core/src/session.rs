//! Checkout Session
//!
//! One buyer's pass through the checkout page. A session owns the view state
//! machine, the offer countdown and at most one status poller, and publishes
//! a [`CheckoutSnapshot`] after every change.
//!
//! ```text
//! open ──▶ countdown started
//!   │
//!   ├─ identity = collect ──────▶ waits for submit(form)
//!   └─ identity = synthetic/prefilled ──▶ submit(None) immediately
//!
//! submit ──▶ initiator ──ok──▶ awaiting-payment ──▶ poller started
//!                    └─err──▶ notice / field errors, submit re-enabled
//!
//! teardown (or drop) ──▶ closed, poller and countdown stopped
//! ```
//!
//! Timer callbacks take the state lock and check `closed` before touching
//! anything, and `teardown` marks the session closed before stopping the
//! timers, so nothing changes once `teardown` has returned.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use crate::clock::Clock;
use crate::countdown::{Countdown, CountdownState, OFFER_SECONDS};
use crate::customer::{CustomerContact, CustomerForm, synthetic_contact};
use crate::entry::CheckoutEntry;
use crate::error::{CheckoutError, Result};
use crate::initiator::PaymentInitiator;
use crate::payment::PaymentRequest;
use crate::poller::{POLL_INTERVAL, PollOutcome, StatusPoller};
use crate::upsell::SelectedPlan;
use crate::view::CheckoutView;

/// Where the buyer's contact details come from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentitySource {
    /// Buyer fills in the form
    #[default]
    Collect,
    /// Fabricated contact, no form shown
    Synthetic,
    /// Contact read from the checkout URL, no form shown
    Prefilled,
}

impl IdentitySource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Collect => "collect",
            Self::Synthetic => "synthetic",
            Self::Prefilled => "prefilled",
        }
    }

    /// Whether the info step is shown at all
    pub const fn shows_form(self) -> bool {
        matches!(self, Self::Collect)
    }
}

impl fmt::Display for IdentitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdentitySource {
    type Err = CheckoutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "collect" => Ok(Self::Collect),
            "synthetic" => Ok(Self::Synthetic),
            "prefilled" => Ok(Self::Prefilled),
            other => Err(CheckoutError::Config(format!(
                "unknown identity source '{other}' (expected collect, synthetic or prefilled)"
            ))),
        }
    }
}

/// Session configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub identity: IdentitySource,
    pub poll_interval: Duration,
    pub countdown_secs: u32,
    /// Domain used for synthetic e-mail addresses
    pub synthetic_email_domain: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            identity: IdentitySource::default(),
            poll_interval: POLL_INTERVAL,
            countdown_secs: OFFER_SECONDS,
            synthetic_email_domain: "gmail.com".into(),
        }
    }
}

/// Everything the checkout page renders
#[derive(Clone, Debug, Serialize)]
pub struct CheckoutSnapshot {
    pub session_id: Uuid,
    pub plan: SelectedPlan,
    pub identity: IdentitySource,
    pub view: CheckoutView,
    pub countdown: CountdownState,
    pub headline: String,
    pub closed: bool,
}

struct SessionState {
    view: CheckoutView,
    countdown: CountdownState,
    closed: bool,
}

/// State reachable from timer tasks
struct Shared {
    id: Uuid,
    plan: SelectedPlan,
    identity: IdentitySource,
    clock: Arc<dyn Clock>,
    state: Mutex<SessionState>,
    updates: watch::Sender<CheckoutSnapshot>,
}

impl Shared {
    fn snapshot_of(&self, state: &SessionState) -> CheckoutSnapshot {
        CheckoutSnapshot {
            session_id: self.id,
            plan: self.plan.clone(),
            identity: self.identity,
            view: state.view.clone(),
            countdown: state.countdown,
            headline: state.countdown.headline(),
            closed: state.closed,
        }
    }

    /// Mutate state and publish the result
    fn update<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut state = lock(&self.state);
        let out = f(&mut state);
        self.updates.send_replace(self.snapshot_of(&state));
        out
    }

    fn snapshot(&self) -> CheckoutSnapshot {
        self.snapshot_of(&lock(&self.state))
    }

    fn apply_poll(&self, outcome: &PollOutcome) {
        let now = self.clock.now();
        self.update(|state| {
            if state.closed {
                return;
            }
            if state.view.record_poll(outcome, now) {
                tracing::info!(
                    session_id = %self.id,
                    polls = state.view.polls_completed(),
                    "Checkout confirmed"
                );
            }
        });
    }

    fn apply_countdown(&self, countdown: CountdownState) {
        self.update(|state| {
            if !state.closed {
                state.countdown = countdown;
            }
        });
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A single checkout attempt
pub struct CheckoutSession {
    entry: CheckoutEntry,
    config: SessionConfig,
    initiator: PaymentInitiator,
    shared: Arc<Shared>,
    poller: Mutex<StatusPoller>,
    countdown: Mutex<Option<Countdown>>,
}

impl CheckoutSession {
    /// Open a session for `entry` and start its countdown.
    ///
    /// Identity sources that show no form submit right away; a failure there
    /// is left on the view as a notice, like any other failed submission.
    pub async fn open(
        entry: CheckoutEntry,
        initiator: PaymentInitiator,
        clock: Arc<dyn Clock>,
        config: SessionConfig,
    ) -> Self {
        let session = Self::new(entry, initiator, clock, config);

        if !session.config.identity.shows_form() {
            if let Err(e) = session.submit(None).await {
                tracing::warn!(
                    session_id = %session.id(),
                    identity = %session.config.identity,
                    error = %e,
                    "Automatic submission failed"
                );
            }
        }

        session
    }

    fn new(
        entry: CheckoutEntry,
        initiator: PaymentInitiator,
        clock: Arc<dyn Clock>,
        config: SessionConfig,
    ) -> Self {
        let id = Uuid::new_v4();
        let plan = SelectedPlan::from_plan(&entry.plan);
        let state = SessionState {
            view: CheckoutView::new(),
            countdown: CountdownState::new(config.countdown_secs),
            closed: false,
        };

        let (updates, _) = watch::channel(CheckoutSnapshot {
            session_id: id,
            plan: plan.clone(),
            identity: config.identity,
            view: state.view.clone(),
            countdown: state.countdown,
            headline: state.countdown.headline(),
            closed: false,
        });

        let shared = Arc::new(Shared {
            id,
            plan,
            identity: config.identity,
            clock: clock.clone(),
            state: Mutex::new(state),
            updates,
        });

        let countdown = {
            let shared = shared.clone();
            Countdown::start(&clock, config.countdown_secs, move |c| {
                shared.apply_countdown(c);
            })
        };

        let poller = StatusPoller::new(initiator.provider().clone(), clock)
            .with_interval(config.poll_interval);

        tracing::info!(
            session_id = %id,
            plan_id = %shared.plan.plan_id,
            amount_cents = shared.plan.amount_cents,
            identity = %config.identity,
            "Checkout session opened"
        );

        Self {
            entry,
            config,
            initiator,
            shared,
            poller: Mutex::new(poller),
            countdown: Mutex::new(Some(countdown)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn plan(&self) -> &SelectedPlan {
        &self.shared.plan
    }

    pub const fn entry(&self) -> &CheckoutEntry {
        &self.entry
    }

    pub fn snapshot(&self) -> CheckoutSnapshot {
        self.shared.snapshot()
    }

    /// Receiver that sees every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<CheckoutSnapshot> {
        self.shared.updates.subscribe()
    }

    /// Request a PIX code.
    ///
    /// `form` is required for the `collect` identity source and optional for
    /// `prefilled` (the URL fields are used when absent). Fails without
    /// contacting the provider if the session is closed, a request is already
    /// outstanding, or a payment already exists.
    pub async fn submit(&self, form: Option<CustomerForm>) -> Result<CheckoutSnapshot> {
        self.shared.update(|state| {
            if state.closed {
                return Err(CheckoutError::SessionClosed);
            }
            state.view.begin_submit()
        })?;

        let created = match self.resolve_contact(form) {
            Ok(contact) => {
                let request = PaymentRequest::new(&self.shared.plan, contact)
                    .with_tracking(self.entry.tracking.clone());
                self.initiator.initiate(&request).await
            }
            Err(e) => Err(e),
        };

        let record = match created {
            Ok(record) => record,
            Err(e) => {
                self.shared.update(|state| {
                    if !state.closed {
                        state.view.submit_failed(&e);
                    }
                });
                return Err(e);
            }
        };

        let transaction_id = record.transaction_id.clone();

        // Holding the poller lock keeps teardown from slipping in between
        // recording the payment and starting the poller.
        let mut poller = lock(&self.poller);
        self.shared.update(|state| {
            if state.closed {
                return Err(CheckoutError::SessionClosed);
            }
            state.view.payment_created(record)
        })?;

        let shared = self.shared.clone();
        poller.start(transaction_id, move |outcome| shared.apply_poll(&outcome));
        drop(poller);

        Ok(self.snapshot())
    }

    fn resolve_contact(&self, form: Option<CustomerForm>) -> Result<CustomerContact> {
        match self.config.identity {
            IdentitySource::Collect => form.unwrap_or_default().validate(true),
            IdentitySource::Prefilled => form
                .unwrap_or_else(|| self.entry.prefill.clone())
                .validate(false),
            IdentitySource::Synthetic => Ok(synthetic_contact(
                &mut rand::thread_rng(),
                &self.config.synthetic_email_domain,
            )),
        }
    }

    pub fn dismiss_notice(&self) -> CheckoutSnapshot {
        self.shared.update(|state| state.view.dismiss_notice());
        self.snapshot()
    }

    /// Close the session and stop its timers. Idempotent.
    pub fn teardown(&self) {
        let first = self
            .shared
            .update(|state| !std::mem::replace(&mut state.closed, true));

        lock(&self.poller).stop();
        if let Some(mut countdown) = lock(&self.countdown).take() {
            countdown.stop();
        }

        if first {
            tracing::info!(session_id = %self.id(), "Checkout session closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.shared.state).closed
    }
}

impl Drop for CheckoutSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
