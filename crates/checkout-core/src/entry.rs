//! Checkout Entry
//!
//! Everything the checkout page learns from its URL: the plan, an optional
//! promotional price, campaign attribution and (for the prefilled flow)
//! customer fields.

use serde::{Deserialize, Serialize};

use crate::customer::CustomerForm;
use crate::plan::{Plan, PlanCatalog};

/// UTM-style attribution forwarded to the provider
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_medium: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_campaign: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_term: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sck: Option<String>,
}

impl TrackingParams {
    /// Record a query pair if it is a tracking field. Empty values are dropped.
    fn absorb(&mut self, key: &str, value: &str) -> bool {
        let slot = match key {
            "utm_source" => &mut self.utm_source,
            "utm_medium" => &mut self.utm_medium,
            "utm_campaign" => &mut self.utm_campaign,
            "utm_content" => &mut self.utm_content,
            "utm_term" => &mut self.utm_term,
            "src" => &mut self.src,
            "sck" => &mut self.sck,
            _ => return false,
        };
        if !value.is_empty() && slot.is_none() {
            *slot = Some(value.to_string());
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Parsed checkout URL
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutEntry {
    /// Resolved plan, promo applied
    pub plan: Plan,

    pub tracking: TrackingParams,

    /// Customer fields carried in the URL
    pub prefill: CustomerForm,

    /// Original query string, without the leading `?`
    pub query: String,
}

impl CheckoutEntry {
    /// Parse a query string (with or without leading `?`).
    ///
    /// Unknown plans fall back to the catalog default and malformed promo
    /// prices are ignored; parsing never fails.
    pub fn from_query(query: &str, catalog: &PlanCatalog) -> Self {
        let query = query.trim_start_matches('?');

        let mut plan_id: Option<String> = None;
        let mut promo: Option<i64> = None;
        let mut tracking = TrackingParams::default();
        let mut prefill = CustomerForm::default();

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if tracking.absorb(&key, &value) {
                continue;
            }
            let value = value.into_owned();
            match key.as_ref() {
                "plan" if plan_id.is_none() => plan_id = Some(value),
                "promo" if promo.is_none() => promo = value.trim().parse().ok(),
                "name" => prefill.name = Some(value),
                "email" => prefill.email = Some(value),
                "phone" => prefill.phone = Some(value),
                "document" | "cpf" => prefill.document = Some(value),
                _ => {}
            }
        }

        let plan = catalog
            .lookup(plan_id.as_deref().unwrap_or_default())
            .clone()
            .with_promo(promo);

        Self {
            plan,
            tracking,
            prefill,
            query: query.to_string(),
        }
    }
}

/// Append a query string to a path, if there is one
pub fn with_query(path: &str, query: &str) -> String {
    let query = query.trim_start_matches('?');
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{query}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_and_promo() {
        let entry = CheckoutEntry::from_query("?plan=1ano&promo=2395", &PlanCatalog::standard());
        assert_eq!(entry.plan.id, "1ano");
        assert_eq!(entry.plan.effective_price_cents(), 2395);
    }

    #[test]
    fn test_defaults() {
        let entry = CheckoutEntry::from_query("", &PlanCatalog::standard());
        assert_eq!(entry.plan.id, "30dias");
        assert_eq!(entry.plan.effective_price_cents(), 1490);
        assert!(entry.tracking.is_empty());
    }

    #[test]
    fn test_bad_promo_ignored() {
        let catalog = PlanCatalog::standard();
        for promo in ["abc", "-10", "0", ""] {
            let entry = CheckoutEntry::from_query(&format!("plan=3meses&promo={promo}"), &catalog);
            assert_eq!(entry.plan.effective_price_cents(), 2490, "promo={promo}");
        }
    }

    #[test]
    fn test_tracking_fields() {
        let entry = CheckoutEntry::from_query(
            "plan=3meses&utm_source=ig&utm_campaign=launch%20day&utm_term=&sck=abc&other=1",
            &PlanCatalog::standard(),
        );
        assert_eq!(entry.tracking.utm_source.as_deref(), Some("ig"));
        assert_eq!(entry.tracking.utm_campaign.as_deref(), Some("launch day"));
        assert_eq!(entry.tracking.utm_term, None);
        assert_eq!(entry.tracking.sck.as_deref(), Some("abc"));
    }

    #[test]
    fn test_prefill_fields() {
        let entry = CheckoutEntry::from_query(
            "email=a%40b.com&phone=11987654321&cpf=52998224725",
            &PlanCatalog::standard(),
        );
        assert_eq!(entry.prefill.email.as_deref(), Some("a@b.com"));
        assert_eq!(entry.prefill.document.as_deref(), Some("52998224725"));
    }

    #[test]
    fn test_with_query() {
        let entry = CheckoutEntry::from_query("?plan=1ano", &PlanCatalog::standard());
        assert_eq!(entry.query, "plan=1ano");
        assert_eq!(with_query("/privacy", &entry.query), "/privacy?plan=1ano");
        assert_eq!(with_query("/privacy", ""), "/privacy");
    }
}
