//! Payment Provider
//!
//! The checkout talks to the PIX gateway exclusively through
//! [`PaymentProvider`]. The production implementation lives in
//! `checkout-payments`; [`MockProvider`] scripts provider behaviour for tests
//! and local demos.

mod mock;

pub use mock::MockProvider;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::TrackingParams;
use crate::error::Result;
use crate::payment::PaymentStatus;

/// Customer block of a transaction, already normalized to what the gateway
/// accepts (digits only for document and phone)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionCustomer {
    pub name: String,
    pub email: String,
    pub document: String,
    pub phone: String,
}

/// Transaction creation request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Amount in centavos
    pub amount_cents: i64,
    pub description: String,
    pub reference: String,
    pub customer: TransactionCustomer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking: Option<TrackingParams>,
}

/// Normalized creation response
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionCreated {
    pub transaction_id: String,
    pub qr_code: String,
    #[serde(default)]
    pub qr_code_image: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Amount echoed by the provider, when present
    #[serde(default)]
    pub amount_cents: Option<i64>,
}

/// Normalized status response
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionStatus {
    pub transaction_id: String,
    #[serde(default)]
    pub reference: Option<String>,
    pub status: PaymentStatus,
    #[serde(default)]
    pub amount_cents: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// PIX gateway interface
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a PIX charge
    async fn create_transaction(&self, request: &TransactionRequest) -> Result<TransactionCreated>;

    /// Read the current state of a charge
    async fn transaction_status(&self, transaction_id: &str) -> Result<TransactionStatus>;

    /// Provider name, for logs
    fn name(&self) -> &str;
}
