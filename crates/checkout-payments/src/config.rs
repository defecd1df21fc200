//! Paradise Gateway Configuration

use std::time::Duration;

use crate::error::{PaymentError, Result};

pub const DEFAULT_BASE_URL: &str = "https://multi.paradisepags.com/api/v1/";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Credentials and endpoint for the Paradise API
#[derive(Clone, PartialEq, Eq)]
pub struct ParadiseConfig {
    pub api_key: String,
    pub product_hash: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for ParadiseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParadiseConfig")
            .field("api_key", &"***")
            .field("product_hash", &self.product_hash)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ParadiseConfig {
    pub fn new(api_key: impl Into<String>, product_hash: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            product_hash: product_hash.into(),
            base_url: DEFAULT_BASE_URL.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read `PARADISE_*` settings through `lookup`.
    ///
    /// `PARADISE_API_KEY` and `PARADISE_PRODUCT_HASH` are required;
    /// `PARADISE_BASE_URL` and `PARADISE_TIMEOUT_SECS` are optional.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| PaymentError::Config(format!("{key} not set")))
        };

        let mut config = Self::new(required("PARADISE_API_KEY")?, required("PARADISE_PRODUCT_HASH")?);

        if let Some(base_url) = lookup("PARADISE_BASE_URL").filter(|v| !v.trim().is_empty()) {
            config.base_url = base_url.trim().to_string();
        }

        if let Some(raw) = lookup("PARADISE_TIMEOUT_SECS") {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|_| PaymentError::Config(format!("PARADISE_TIMEOUT_SECS invalid: {raw}")))?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_required_credentials() {
        let err = ParadiseConfig::from_lookup(lookup(&[("PARADISE_API_KEY", "sk")])).unwrap_err();
        assert!(err.to_string().contains("PARADISE_PRODUCT_HASH"));

        let err = ParadiseConfig::from_lookup(lookup(&[
            ("PARADISE_API_KEY", "  "),
            ("PARADISE_PRODUCT_HASH", "prod"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("PARADISE_API_KEY"));
    }

    #[test]
    fn test_defaults_and_overrides() {
        let config = ParadiseConfig::from_lookup(lookup(&[
            ("PARADISE_API_KEY", "sk"),
            ("PARADISE_PRODUCT_HASH", "prod"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        let config = ParadiseConfig::from_lookup(lookup(&[
            ("PARADISE_API_KEY", "sk"),
            ("PARADISE_PRODUCT_HASH", "prod"),
            ("PARADISE_BASE_URL", "http://localhost:9000/"),
            ("PARADISE_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:9000/");
        assert_eq!(config.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_bad_timeout() {
        let result = ParadiseConfig::from_lookup(lookup(&[
            ("PARADISE_API_KEY", "sk"),
            ("PARADISE_PRODUCT_HASH", "prod"),
            ("PARADISE_TIMEOUT_SECS", "soon"),
        ]));
        assert!(matches!(result, Err(PaymentError::Config(_))));
    }

    #[test]
    fn test_debug_hides_key() {
        let config = ParadiseConfig::new("sk_live_secret", "prod");
        assert!(!format!("{config:?}").contains("sk_live_secret"));
    }
}
