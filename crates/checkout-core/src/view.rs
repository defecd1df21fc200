//! Checkout View State Machine
//!
//! ```text
//! collecting-info ──(payment created)──▶ awaiting-payment ──(approved)──▶ confirmed
//!        ▲   │
//!        └───┘ submit failed: notice shown, step unchanged
//! ```
//!
//! There is no failed state and no way out of `confirmed`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CheckoutError, Result, ValidationErrors};
use crate::payment::{PaymentRecord, PaymentStatus};
use crate::poller::PollOutcome;

/// Step currently shown to the buyer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckoutStep {
    CollectingInfo,
    AwaitingPayment,
    Confirmed,
}

impl CheckoutStep {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CollectingInfo => "collecting-info",
            Self::AwaitingPayment => "awaiting-payment",
            Self::Confirmed => "confirmed",
        }
    }
}

impl fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dismissible notification
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub description: String,
}

/// View state for one checkout session
#[derive(Clone, Debug, Serialize)]
pub struct CheckoutView {
    step: CheckoutStep,
    record: Option<PaymentRecord>,
    submitting: bool,
    notice: Option<Notice>,
    field_errors: ValidationErrors,
    polls_completed: u32,
    last_status: Option<PaymentStatus>,
    confirmed_at: Option<DateTime<Utc>>,
}

impl Default for CheckoutView {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckoutView {
    pub fn new() -> Self {
        Self {
            step: CheckoutStep::CollectingInfo,
            record: None,
            submitting: false,
            notice: None,
            field_errors: ValidationErrors::new(),
            polls_completed: 0,
            last_status: None,
            confirmed_at: None,
        }
    }

    pub const fn step(&self) -> CheckoutStep {
        self.step
    }

    pub const fn record(&self) -> Option<&PaymentRecord> {
        self.record.as_ref()
    }

    /// Submit control is disabled while true
    pub const fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub const fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub const fn field_errors(&self) -> &ValidationErrors {
        &self.field_errors
    }

    pub const fn polls_completed(&self) -> u32 {
        self.polls_completed
    }

    pub const fn last_status(&self) -> Option<&PaymentStatus> {
        self.last_status.as_ref()
    }

    pub const fn confirmed_at(&self) -> Option<DateTime<Utc>> {
        self.confirmed_at
    }

    pub const fn is_confirmed(&self) -> bool {
        matches!(self.step, CheckoutStep::Confirmed)
    }

    /// Mark a payment request as outstanding.
    ///
    /// Only one may be in flight, and only before a payment exists.
    pub fn begin_submit(&mut self) -> Result<()> {
        if self.step != CheckoutStep::CollectingInfo {
            return Err(CheckoutError::InvalidTransition {
                from: self.step,
                to: CheckoutStep::AwaitingPayment,
            });
        }
        if self.submitting {
            return Err(CheckoutError::RequestOutstanding);
        }

        self.submitting = true;
        self.notice = None;
        self.field_errors = ValidationErrors::new();
        Ok(())
    }

    /// `collecting-info → awaiting-payment`
    pub fn payment_created(&mut self, record: PaymentRecord) -> Result<()> {
        if self.step != CheckoutStep::CollectingInfo || !self.submitting {
            return Err(CheckoutError::InvalidTransition {
                from: self.step,
                to: CheckoutStep::AwaitingPayment,
            });
        }

        self.last_status = Some(record.status.clone());
        self.record = Some(record);
        self.submitting = false;
        self.step = CheckoutStep::AwaitingPayment;
        Ok(())
    }

    /// Surface a failed submission and re-enable the submit control
    pub fn submit_failed(&mut self, error: &CheckoutError) {
        self.submitting = false;
        match error {
            CheckoutError::Validation(errors) => self.field_errors = errors.clone(),
            other => {
                self.notice = Some(Notice {
                    title: "Erro ao gerar PIX".into(),
                    description: other.user_message(),
                });
            }
        }
    }

    /// Fold a poll result into the view.
    ///
    /// Returns `true` only for the poll that confirms the payment. Results
    /// arriving outside `awaiting-payment` are ignored.
    pub fn record_poll(&mut self, outcome: &PollOutcome, at: DateTime<Utc>) -> bool {
        if self.step != CheckoutStep::AwaitingPayment {
            return false;
        }

        self.polls_completed += 1;

        let PollOutcome::Status(status) = outcome else {
            return false;
        };

        self.last_status = Some(status.status.clone());
        if let Some(record) = self.record.as_mut() {
            record.status = status.status.clone();
        }

        if status.status.is_terminal() {
            self.step = CheckoutStep::Confirmed;
            self.confirmed_at = Some(at);
            true
        } else {
            false
        }
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }
}
