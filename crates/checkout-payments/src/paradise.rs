//! Paradise PIX Client
//!
//! Two endpoints are used:
//!
//! - `POST transaction.php` creates a charge and returns the PIX payload
//! - `GET query.php?action=get_transaction&id=..` reads its status
//!
//! Both authenticate with the `X-API-Key` header.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use checkout_core::entry::TrackingParams;
use checkout_core::payment::PaymentStatus;
use checkout_core::provider::{
    PaymentProvider, TransactionCreated, TransactionCustomer, TransactionRequest, TransactionStatus,
};

use crate::config::ParadiseConfig;
use crate::error::{PaymentError, Result};

const API_KEY_HEADER: &str = "X-API-Key";

/// Paradise gateway client
#[derive(Clone)]
pub struct ParadiseClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
    product_hash: String,
}

#[derive(Serialize)]
struct CreateBody<'a> {
    amount: i64,
    description: &'a str,
    reference: &'a str,
    #[serde(rename = "productHash")]
    product_hash: &'a str,
    customer: &'a TransactionCustomer,
    #[serde(skip_serializing_if = "Option::is_none")]
    tracking: Option<&'a TrackingParams>,
}

/// Ids and amounts arrive either as JSON numbers or strings
#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Loose {
    fn into_text(self) -> String {
        match self {
            Self::Int(n) => n.to_string(),
            Self::Float(n) => n.to_string(),
            Self::Text(s) => s,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn as_cents(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Float(n) if n.fract() == 0.0 => Some(*n as i64),
            Self::Float(_) => None,
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Deserialize)]
struct CreateResponse {
    #[serde(default)]
    transaction_id: Option<Loose>,
    #[serde(default)]
    id: Option<Loose>,
    #[serde(default)]
    qr_code: Option<String>,
    #[serde(default)]
    qr_code_base64: Option<String>,
    #[serde(default)]
    amount: Option<Loose>,
    #[serde(default)]
    expires_at: Option<String>,
}

#[derive(Deserialize)]
struct StatusResponse {
    #[serde(default)]
    id: Option<Loose>,
    #[serde(default)]
    external_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    amount: Option<Loose>,
    #[serde(default)]
    created_at: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Accepts RFC 3339 and the gateway's `YYYY-MM-DD HH:MM:SS` (taken as UTC)
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|n| n.and_utc()))
        .inspect_err(|_| tracing::debug!(value = raw, "Unparseable gateway timestamp"))
        .ok()
}

impl ParadiseClient {
    pub fn new(config: &ParadiseConfig) -> Result<Self> {
        if config.api_key.is_empty() || config.product_hash.is_empty() {
            return Err(PaymentError::Config("Paradise credentials missing".into()));
        }

        // `Url::join` drops the last path segment unless it ends with '/'
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }

        let http = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http,
            base_url: Url::parse(&base)?,
            api_key: config.api_key.clone(),
            product_hash: config.product_hash.clone(),
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(&ParadiseConfig::from_env()?)
    }

    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `POST transaction.php`
    pub async fn create(&self, request: &TransactionRequest) -> Result<TransactionCreated> {
        let url = self.base_url.join("transaction.php")?;
        let body = CreateBody {
            amount: request.amount_cents,
            description: &request.description,
            reference: &request.reference,
            product_hash: &self.product_hash,
            customer: &request.customer,
            tracking: request.tracking.as_ref(),
        };

        let resp = self
            .http
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;
        let data: CreateResponse = Self::handle_response(resp).await?;

        let transaction_id = data
            .transaction_id
            .or(data.id)
            .map(Loose::into_text)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| PaymentError::InvalidResponse("missing transaction_id".into()))?;

        let qr_code = data
            .qr_code
            .filter(|qr| !qr.is_empty())
            .ok_or_else(|| PaymentError::InvalidResponse("missing qr_code".into()))?;

        tracing::debug!(
            transaction_id = %transaction_id,
            reference = %request.reference,
            "Paradise transaction created"
        );

        Ok(TransactionCreated {
            transaction_id,
            qr_code,
            qr_code_image: data.qr_code_base64.filter(|img| !img.is_empty()),
            expires_at: data.expires_at.as_deref().and_then(parse_timestamp),
            amount_cents: data.amount.as_ref().and_then(Loose::as_cents),
        })
    }

    /// `GET query.php?action=get_transaction&id=<id>`
    pub async fn status(&self, transaction_id: &str) -> Result<TransactionStatus> {
        let mut url = self.base_url.join("query.php")?;
        url.query_pairs_mut()
            .append_pair("action", "get_transaction")
            .append_pair("id", transaction_id);

        let resp = self
            .http
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        let data: StatusResponse = Self::handle_response(resp).await?;

        let status = data
            .status
            .as_deref()
            .map(PaymentStatus::parse)
            .ok_or_else(|| PaymentError::InvalidResponse("missing status".into()))?;

        Ok(TransactionStatus {
            transaction_id: data
                .id
                .map(Loose::into_text)
                .unwrap_or_else(|| transaction_id.to_string()),
            reference: data.external_id,
            status,
            amount_cents: data.amount.as_ref().and_then(Loose::as_cents),
            created_at: data.created_at.as_deref().and_then(parse_timestamp),
        })
    }

    /// Decode a success body, or turn the gateway's `message` into an error
    async fn handle_response<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        let text = resp.text().await?;

        if status.is_success() {
            return serde_json::from_str(&text)
                .map_err(|e| PaymentError::InvalidResponse(format!("{e}: {text}")));
        }

        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|b| b.message.or(b.error))
            .unwrap_or_else(|| {
                if text.trim().is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                } else {
                    text
                }
            });

        tracing::warn!(status = status.as_u16(), message = %message, "Paradise API error");

        Err(PaymentError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl PaymentProvider for ParadiseClient {
    async fn create_transaction(
        &self,
        request: &TransactionRequest,
    ) -> checkout_core::Result<TransactionCreated> {
        Ok(self.create(request).await?)
    }

    async fn transaction_status(&self, transaction_id: &str) -> checkout_core::Result<TransactionStatus> {
        Ok(self.status(transaction_id).await?)
    }

    fn name(&self) -> &str {
        "Paradise"
    }
}
