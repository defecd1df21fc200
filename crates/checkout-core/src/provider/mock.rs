//! Mock Payment Provider
//!
//! Scripted provider for tests and demos. Status answers are consumed in
//! order; once the script runs out the last answer repeats.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::Notify;

use super::{PaymentProvider, TransactionCreated, TransactionRequest, TransactionStatus};
use crate::error::{CheckoutError, Result};
use crate::payment::PaymentStatus;

type ScriptedStatus = std::result::Result<PaymentStatus, String>;

/// Mock provider with a scripted status sequence
pub struct MockProvider {
    statuses: Mutex<VecDeque<ScriptedStatus>>,
    last: Mutex<ScriptedStatus>,
    create_error: Mutex<Option<String>>,
    created: Mutex<Vec<TransactionRequest>>,
    status_calls: AtomicUsize,
    /// Signalled whenever a status call starts
    status_started: Arc<Notify>,
    /// When set, status calls wait for a permit before answering
    status_gate: Option<Arc<Notify>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Provider that answers `pending` forever
    pub fn new() -> Self {
        Self {
            statuses: Mutex::new(VecDeque::new()),
            last: Mutex::new(Ok(PaymentStatus::Pending)),
            create_error: Mutex::new(None),
            created: Mutex::new(Vec::new()),
            status_calls: AtomicUsize::new(0),
            status_started: Arc::new(Notify::new()),
            status_gate: None,
        }
    }

    /// Answer status calls with `statuses`, in order
    pub fn with_statuses(statuses: impl IntoIterator<Item = PaymentStatus>) -> Self {
        let provider = Self::new();
        for status in statuses {
            provider.push_status(status);
        }
        provider
    }

    /// Hold every status call until the returned handle is notified
    #[must_use]
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.status_gate = Some(gate.clone());
        (self, gate)
    }

    pub fn push_status(&self, status: PaymentStatus) {
        lock(&self.statuses).push_back(Ok(status));
    }

    /// Script a failed status call
    pub fn push_status_error(&self, message: impl Into<String>) {
        lock(&self.statuses).push_back(Err(message.into()));
    }

    /// Make the next creation call fail
    pub fn fail_next_create(&self, message: impl Into<String>) {
        *lock(&self.create_error) = Some(message.into());
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    /// Requests received by `create_transaction`
    pub fn created(&self) -> Vec<TransactionRequest> {
        lock(&self.created).clone()
    }

    /// Notified each time a status call begins
    pub fn status_started(&self) -> Arc<Notify> {
        self.status_started.clone()
    }

    fn next_status(&self) -> ScriptedStatus {
        let next = lock(&self.statuses).pop_front();
        match next {
            Some(answer) => {
                lock(&self.last).clone_from(&answer);
                answer
            }
            None => lock(&self.last).clone(),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl PaymentProvider for MockProvider {
    async fn create_transaction(&self, request: &TransactionRequest) -> Result<TransactionCreated> {
        if let Some(message) = lock(&self.create_error).take() {
            return Err(CheckoutError::Provider(message));
        }

        let transaction_id = {
            let mut created = lock(&self.created);
            created.push(request.clone());
            format!("mock-{}", created.len())
        };

        Ok(TransactionCreated {
            qr_code: format!(
                "00020126580014br.gov.bcb.pix0136{}5204000053039865802BR",
                request.reference
            ),
            transaction_id,
            qr_code_image: None,
            expires_at: Some(Utc::now() + Duration::minutes(30)),
            amount_cents: Some(request.amount_cents),
        })
    }

    async fn transaction_status(&self, transaction_id: &str) -> Result<TransactionStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.status_started.notify_one();

        if let Some(gate) = &self.status_gate {
            gate.notified().await;
        }

        let status = self.next_status().map_err(CheckoutError::ProviderUnavailable)?;
        Ok(TransactionStatus {
            transaction_id: transaction_id.to_string(),
            reference: None,
            status,
            amount_cents: None,
            created_at: None,
        })
    }

    fn name(&self) -> &str {
        "MockProvider"
    }
}
