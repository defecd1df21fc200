//! Payment Request Initiator
//!
//! Turns a [`PaymentRequest`] into exactly one provider call and normalizes
//! the answer into a [`PaymentRecord`]. Failures are returned to the caller
//! as-is; nothing here retries.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::{CheckoutError, Result, ValidationErrors};
use crate::payment::{PaymentRecord, PaymentReference, PaymentRequest, PaymentStatus};
use crate::provider::{PaymentProvider, TransactionCustomer, TransactionRequest, TransactionStatus};

/// Initiator configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiatorConfig {
    /// Brand in the charge description, `"Assinatura <brand> - <plan>"`
    pub brand: String,

    /// Leading segment of every transaction reference
    pub reference_prefix: String,
}

impl Default for InitiatorConfig {
    fn default() -> Self {
        Self {
            brand: "Anitta Privacy".into(),
            reference_prefix: "ANITTA".into(),
        }
    }
}

impl InitiatorConfig {
    pub fn description(&self, plan_name: &str) -> String {
        format!("Assinatura {} - {plan_name}", self.brand)
    }
}

/// Creates PIX charges through a [`PaymentProvider`]
#[derive(Clone)]
pub struct PaymentInitiator {
    provider: Arc<dyn PaymentProvider>,
    clock: Arc<dyn Clock>,
    config: InitiatorConfig,
}

impl PaymentInitiator {
    pub fn new(
        provider: Arc<dyn PaymentProvider>,
        clock: Arc<dyn Clock>,
        config: InitiatorConfig,
    ) -> Self {
        Self {
            provider,
            clock,
            config,
        }
    }

    pub const fn config(&self) -> &InitiatorConfig {
        &self.config
    }

    pub fn provider(&self) -> &Arc<dyn PaymentProvider> {
        &self.provider
    }

    /// Build the provider request for `request`
    pub fn build_transaction(&self, request: &PaymentRequest) -> Result<TransactionRequest> {
        if request.amount_cents <= 0 {
            let mut errors = ValidationErrors::new();
            errors.add("amount", "Valor inválido");
            return Err(CheckoutError::Validation(errors));
        }

        let reference = PaymentReference::new(
            &self.config.reference_prefix,
            &request.plan_id,
            self.clock.now(),
            &mut rand::thread_rng(),
        );

        let customer = &request.customer;
        Ok(TransactionRequest {
            amount_cents: request.amount_cents,
            description: self.config.description(&request.plan_name),
            reference: reference.to_string(),
            customer: TransactionCustomer {
                name: customer.display_name().to_string(),
                email: customer.email.clone(),
                document: customer.document.digits().to_string(),
                phone: customer.phone.digits().to_string(),
            },
            tracking: request.tracking.clone(),
        })
    }

    /// Create a PIX charge. One provider call, no retry.
    pub async fn initiate(&self, request: &PaymentRequest) -> Result<PaymentRecord> {
        let transaction = self.build_transaction(request)?;

        tracing::info!(
            reference = %transaction.reference,
            plan_id = %request.plan_id,
            amount_cents = transaction.amount_cents,
            provider = self.provider.name(),
            "Creating PIX charge"
        );

        let created = self
            .provider
            .create_transaction(&transaction)
            .await
            .inspect_err(|e| {
                tracing::error!(reference = %transaction.reference, error = %e, "PIX charge failed");
            })?;

        if created.transaction_id.trim().is_empty() {
            return Err(CheckoutError::MalformedResponse(
                "missing transaction id".into(),
            ));
        }
        if created.qr_code.trim().is_empty() {
            return Err(CheckoutError::MalformedResponse("missing QR payload".into()));
        }

        tracing::info!(
            transaction_id = %created.transaction_id,
            reference = %transaction.reference,
            "PIX charge created"
        );

        Ok(PaymentRecord {
            transaction_id: created.transaction_id,
            reference: transaction.reference,
            qr_code: created.qr_code,
            qr_code_image: created.qr_code_image,
            amount_cents: created.amount_cents.unwrap_or(transaction.amount_cents),
            expires_at: created.expires_at,
            status: PaymentStatus::Pending,
        })
    }

    /// Single status read, used by the pass-through endpoint
    pub async fn check_status(&self, transaction_id: &str) -> Result<TransactionStatus> {
        self.provider.transaction_status(transaction_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::customer::CustomerForm;
    use crate::plan::PlanCatalog;
    use crate::provider::MockProvider;
    use crate::upsell::{SelectedPlan, UpsellDecision, UpsellNegotiator};

    fn contact() -> crate::customer::CustomerContact {
        CustomerForm {
            name: None,
            email: Some("Maria@Example.com".into()),
            phone: Some("(11) 98765-4321".into()),
            document: Some("529.982.247-25".into()),
        }
        .validate(false)
        .unwrap()
    }

    fn initiator(provider: Arc<MockProvider>) -> PaymentInitiator {
        PaymentInitiator::new(
            provider,
            Arc::new(ManualClock::default()),
            InitiatorConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_plan_without_upsell() {
        let provider = Arc::new(MockProvider::new());
        let catalog = PlanCatalog::standard();
        let selected = SelectedPlan::from_plan(catalog.lookup("3meses"));

        let record = initiator(provider.clone())
            .initiate(&PaymentRequest::new(&selected, contact()))
            .await
            .unwrap();

        let sent = &provider.created()[0];
        assert_eq!(sent.amount_cents, 2490);
        assert_eq!(sent.description, "Assinatura Anitta Privacy - 3 meses");
        assert!(sent.reference.starts_with("ANITTA-3meses-"));
        assert_eq!(sent.customer.name, "maria");
        assert_eq!(sent.customer.document, "52998224725");
        assert_eq!(sent.customer.phone, "11987654321");

        assert_eq!(record.amount_cents, 2490);
        assert_eq!(record.status, PaymentStatus::Pending);
        assert_eq!(record.reference, sent.reference);
    }

    #[tokio::test]
    async fn test_accepted_upsell_amount() {
        let provider = Arc::new(MockProvider::new());
        let catalog = PlanCatalog::standard();
        let selected = UpsellNegotiator::standard().resolve(&catalog, "30dias", UpsellDecision::Accept);

        initiator(provider.clone())
            .initiate(&PaymentRequest::new(&selected, contact()))
            .await
            .unwrap();

        let sent = &provider.created()[0];
        assert_eq!(sent.amount_cents, 1990);
        assert!(sent.reference.starts_with("ANITTA-3meses-"));
    }

    #[tokio::test]
    async fn test_non_positive_amount_rejected_before_call() {
        let provider = Arc::new(MockProvider::new());
        let mut selected = SelectedPlan::from_plan(PlanCatalog::standard().default_plan());
        selected.amount_cents = 0;

        let err = initiator(provider.clone())
            .initiate(&PaymentRequest::new(&selected, contact()))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::Validation(_)));
        assert!(provider.created().is_empty());
    }

    #[tokio::test]
    async fn test_provider_error_is_returned_once() {
        let provider = Arc::new(MockProvider::new());
        provider.fail_next_create("gateway down");
        let selected = SelectedPlan::from_plan(PlanCatalog::standard().default_plan());

        let err = initiator(provider.clone())
            .initiate(&PaymentRequest::new(&selected, contact()))
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        assert!(provider.created().is_empty());
    }

    #[test]
    fn test_references_differ() {
        let init = initiator(Arc::new(MockProvider::new()));
        let selected = SelectedPlan::from_plan(PlanCatalog::standard().default_plan());
        let request = PaymentRequest::new(&selected, contact());

        let a = init.build_transaction(&request).unwrap();
        let b = init.build_transaction(&request).unwrap();
        assert_ne!(a.reference, b.reference);
    }
}
