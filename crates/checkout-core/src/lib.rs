//! # checkout-core
//!
//! PIX checkout orchestration: plan selection, upsell, payment request
//! creation and confirmation polling, independent of any HTTP framework.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        CheckoutSession                            │
//! │  ┌──────────────┐  ┌──────────────────┐  ┌────────────────────┐  │
//! │  │ CheckoutView │◀─│ PaymentInitiator │──│  PaymentProvider   │  │
//! │  │ (state mach.)│  └──────────────────┘  │    (Strategy)      │  │
//! │  │              │◀─┌──────────────────┐──│                    │  │
//! │  └──────────────┘  │  StatusPoller    │  └────────────────────┘  │
//! │         ▲          └────────┬─────────┘                          │
//! │         │          ┌────────┴─────────┐                          │
//! │     Countdown ─────│  Clock / Ticker  │                          │
//! │                    └──────────────────┘                          │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `PaymentProvider` trait keeps the gateway behind a seam so sessions
//! run against a scripted [`MockProvider`] in tests, and the `Clock` trait
//! lets tests drive both timers by hand.

pub mod age_gate;
pub mod arbiter;
pub mod clock;
pub mod countdown;
pub mod customer;
pub mod entry;
pub mod error;
pub mod initiator;
pub mod navigation;
pub mod payment;
pub mod plan;
pub mod poller;
pub mod provider;
pub mod session;
pub mod task;
pub mod upsell;
pub mod view;

pub use age_gate::AgeGate;
pub use arbiter::PlaybackArbiter;
pub use clock::{Clock, ManualClock, SystemClock};
pub use countdown::{Countdown, CountdownState};
pub use customer::{Cpf, CustomerContact, CustomerForm, PhoneNumber};
pub use entry::{CheckoutEntry, TrackingParams};
pub use error::{CheckoutError, Result, ValidationErrors};
pub use initiator::{InitiatorConfig, PaymentInitiator};
pub use navigation::{NavigationDecision, NavigationPolicy};
pub use payment::{PaymentRecord, PaymentRequest, PaymentStatus};
pub use plan::{Plan, PlanCatalog};
pub use poller::{PollOutcome, StatusPoller};
pub use provider::{MockProvider, PaymentProvider};
pub use session::{CheckoutSession, CheckoutSnapshot, IdentitySource, SessionConfig};
pub use upsell::{SelectedPlan, UpsellDecision, UpsellNegotiator, UpsellOffer};
pub use view::{CheckoutStep, CheckoutView, Notice};
