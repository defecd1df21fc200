//! # checkout-payments
//!
//! PIX charges through the Paradise gateway.
//!
//! ```text
//! ┌──────────────────┐   POST transaction.php    ┌──────────────┐
//! │ PaymentInitiator │──────────────────────────▶│              │
//! └──────────────────┘                           │   Paradise   │
//! ┌──────────────────┐   GET query.php?id=...    │     API      │
//! │   StatusPoller   │──────────────────────────▶│              │
//! └──────────────────┘                           └──────────────┘
//! ```
//!
//! [`ParadiseClient`] implements `checkout_core::PaymentProvider`, so it
//! plugs into sessions wherever the mock provider does in tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use checkout_payments::{ParadiseClient, ParadiseConfig};
//!
//! let client = ParadiseClient::new(&ParadiseConfig::from_env()?)?;
//! let status = client.status("98765").await?;
//! ```

mod config;
mod error;
mod paradise;

pub use config::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS, ParadiseConfig};
pub use error::{PaymentError, Result};
pub use paradise::ParadiseClient;
