//! Error Types

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::view::CheckoutStep;

/// Result type alias for checkout operations
pub type Result<T> = std::result::Result<T, CheckoutError>;

/// Field-level validation failures, keyed by form field name.
///
/// Messages are the copy shown next to the offending input.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors(BTreeMap<&'static str, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

/// Checkout error types
#[derive(Error, Debug)]
pub enum CheckoutError {
    /// Customer data or amount rejected before any provider call
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Provider answered with an error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider could not be reached
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Provider answered, but not with something we understand
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// A payment request is already in flight for this session
    #[error("A payment request is already outstanding")]
    RequestOutstanding,

    /// The view cannot move between these steps
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: CheckoutStep, to: CheckoutStep },

    /// The session was torn down
    #[error("Checkout session closed")]
    SessionClosed,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CheckoutError {
    /// Whether the buyer can simply try again.
    ///
    /// Nothing is retried automatically; this only drives whether the
    /// submit control is re-enabled.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Provider(_) | Self::ProviderUnavailable(_) | Self::MalformedResponse(_)
        )
    }

    /// Copy shown to the buyer
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(_) => "Confira os dados informados.".into(),
            Self::Provider(_) | Self::ProviderUnavailable(_) | Self::MalformedResponse(_) => {
                "Erro ao gerar PIX. Recarregue a página e tente novamente.".into()
            }
            Self::RequestOutstanding => "Seu PIX já está sendo gerado.".into(),
            Self::SessionClosed => "Sessão encerrada. Recarregue a página.".into(),
            _ => "Erro interno do servidor".into(),
        }
    }
}
