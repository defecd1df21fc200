//! Payment Error Types

use checkout_core::CheckoutError;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Paradise gateway errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Transport failure, timeout included
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Gateway answered with a non-success status
    #[error("Paradise API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Gateway answered 2xx with a body we cannot use
    #[error("Invalid gateway response: {0}")]
    InvalidResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed base URL
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

impl PaymentError {
    /// Whether the buyer may submit again.
    ///
    /// Any answer from the gateway, or the lack of one, leaves the submit
    /// control enabled; only a broken configuration does not. Agrees with
    /// [`CheckoutError::is_retryable`] after conversion.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Api { .. } | Self::InvalidResponse(_) => true,
            Self::Config(_) | Self::Url(_) => false,
        }
    }

    /// Get user-friendly message
    pub const fn user_message(&self) -> &str {
        match self {
            Self::Network(_) => "Não foi possível contatar o provedor de pagamento.",
            Self::Api { .. } | Self::InvalidResponse(_) => "Erro ao criar transação PIX",
            Self::Config(_) | Self::Url(_) => "Configuração de API ausente",
        }
    }
}

impl From<PaymentError> for CheckoutError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Network(e) => Self::ProviderUnavailable(e.to_string()),
            PaymentError::Api { status, message } => Self::Provider(format!("{status}: {message}")),
            PaymentError::InvalidResponse(message) => Self::MalformedResponse(message),
            PaymentError::Config(message) => Self::Config(message),
            PaymentError::Url(e) => Self::Config(e.to_string()),
        }
    }
}
