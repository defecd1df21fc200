//! Server Configuration

use std::time::Duration;

use checkout_core::{CheckoutError, IdentitySource, InitiatorConfig, SessionConfig};

use crate::state::SessionExpiry;

/// Settings read from the environment at startup
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub initiator: InitiatorConfig,
    pub session: SessionConfig,
    pub expiry: SessionExpiry,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".into(),
            initiator: InitiatorConfig::default(),
            session: SessionConfig::default(),
            expiry: SessionExpiry::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, CheckoutError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unset or blank variables keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CheckoutError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(addr) = get("BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(brand) = get("CHECKOUT_BRAND") {
            config.initiator.brand = brand;
        }
        if let Some(prefix) = get("CHECKOUT_REFERENCE_PREFIX") {
            config.initiator.reference_prefix = prefix;
        }
        if let Some(identity) = get("CHECKOUT_IDENTITY_SOURCE") {
            config.session.identity = identity.parse::<IdentitySource>()?;
        }
        let secs = |key: &str| -> Result<Option<Duration>, CheckoutError> {
            get(key)
                .map(|raw| {
                    raw.parse::<u64>()
                        .map(|secs| Duration::from_secs(secs.max(1)))
                        .map_err(|_| CheckoutError::Config(format!("{key} invalid: {raw}")))
                })
                .transpose()
        };
        if let Some(interval) = secs("CHECKOUT_POLL_INTERVAL_SECS")? {
            config.session.poll_interval = interval;
        }
        if let Some(idle) = secs("CHECKOUT_SESSION_IDLE_SECS")? {
            config.expiry.idle = idle;
        }
        if let Some(grace) = secs("CHECKOUT_CONFIRMED_GRACE_SECS")? {
            config.expiry.confirmed_grace = grace;
        }

        Ok(config)
    }
}
