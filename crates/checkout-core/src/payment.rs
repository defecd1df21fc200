//! Payment Requests and Records

use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};

use crate::customer::CustomerContact;
use crate::entry::TrackingParams;
use crate::upsell::SelectedPlan;

/// Provider-side transaction state
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PaymentStatus {
    Pending,
    Approved,
    Expired,
    Failed,
    /// Any status string we have no special handling for
    Other(String),
}

impl PaymentStatus {
    /// Map a provider status string.
    ///
    /// Only the exact string `approved` counts as an approval. Anything
    /// else, including look-alikes such as `paid` or `APPROVED`, stays
    /// non-terminal.
    pub fn parse(raw: &str) -> Self {
        if raw == "approved" {
            return Self::Approved;
        }
        match raw.trim().to_lowercase().as_str() {
            "pending" | "waiting_payment" | "processing" => Self::Pending,
            "expired" => Self::Expired,
            "failed" | "refused" | "cancelled" | "canceled" => Self::Failed,
            _ => Self::Other(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Expired => "expired",
            Self::Failed => "failed",
            Self::Other(s) => s,
        }
    }

    /// Only an approval ends polling; expiry and failures keep the buyer
    /// waiting on the same code.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PaymentStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PaymentStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Everything needed to ask the provider for a PIX code
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub plan_id: String,
    pub plan_name: String,

    /// Amount in centavos
    pub amount_cents: i64,

    pub customer: CustomerContact,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking: Option<TrackingParams>,
}

impl PaymentRequest {
    pub fn new(selected: &SelectedPlan, customer: CustomerContact) -> Self {
        Self {
            plan_id: selected.plan_id.clone(),
            plan_name: selected.plan_name.clone(),
            amount_cents: selected.amount_cents,
            customer,
            tracking: None,
        }
    }

    #[must_use]
    pub fn with_tracking(mut self, tracking: TrackingParams) -> Self {
        self.tracking = (!tracking.is_empty()).then_some(tracking);
        self
    }
}

/// A created PIX charge
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Provider transaction id
    pub transaction_id: String,

    /// Reference we sent with the request
    pub reference: String,

    /// PIX copy-and-paste payload, also encoded in the QR code
    pub qr_code: String,

    /// Pre-rendered QR image, when the provider sends one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_code_image: Option<String>,

    pub amount_cents: i64,

    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,

    pub status: PaymentStatus,
}

/// Reference string attached to each provider transaction:
/// `<PREFIX>-<plan>-<unix millis>-<suffix>`.
///
/// The random suffix keeps two submissions within the same millisecond
/// apart.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentReference(String);

impl PaymentReference {
    pub fn new<R: Rng + ?Sized>(
        prefix: &str,
        plan_id: &str,
        at: DateTime<Utc>,
        rng: &mut R,
    ) -> Self {
        let suffix: String = (0..6)
            .map(|_| char::from(rng.sample(Alphanumeric)).to_ascii_uppercase())
            .collect();
        Self(format!(
            "{prefix}-{plan_id}-{}-{suffix}",
            at.timestamp_millis()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaymentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
