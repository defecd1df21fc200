//! Plan Catalog
//!
//! Static subscription plans. Lookups never fail: an unknown identifier
//! degrades to the catalog's default plan so a malformed `plan` query
//! parameter can never break the checkout page.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Identifier of the plan used when a lookup misses
pub const DEFAULT_PLAN_ID: &str = "30dias";

/// A subscription plan
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Plan identifier (as used in query strings)
    pub id: String,

    /// Display name
    pub name: String,

    /// Base price in centavos
    pub price_cents: i64,

    /// Promotional override in centavos
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promo_price_cents: Option<i64>,
}

impl Plan {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price_cents: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price_cents,
            promo_price_cents: None,
        }
    }

    /// Apply a promotional price. Non-positive overrides are ignored.
    #[must_use]
    pub fn with_promo(mut self, promo_cents: Option<i64>) -> Self {
        self.promo_price_cents = promo_cents.filter(|p| *p > 0);
        self
    }

    /// Price actually charged
    pub fn effective_price_cents(&self) -> i64 {
        self.promo_price_cents.unwrap_or(self.price_cents)
    }

    /// Effective price formatted as Brazilian reais
    pub fn display_price(&self) -> String {
        format_brl(self.effective_price_cents())
    }
}

/// Format centavos as `R$ 24,90`
pub fn format_brl(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}R$ {},{:02}", abs / 100, abs % 100)
}

/// Immutable plan lookup table with a designated default
#[derive(Clone, Debug)]
pub struct PlanCatalog {
    plans: Vec<Plan>,
    index: HashMap<String, usize>,
    default_index: usize,
}

impl PlanCatalog {
    /// Build a catalog. `default_id` must name one of `plans`; otherwise the
    /// first plan becomes the default.
    pub fn new(plans: Vec<Plan>, default_id: &str) -> Self {
        assert!(!plans.is_empty(), "plan catalog cannot be empty");

        let index: HashMap<String, usize> = plans
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();
        let default_index = index.get(default_id).copied().unwrap_or(0);

        Self {
            plans,
            index,
            default_index,
        }
    }

    /// The funnel's four plans
    pub fn standard() -> Self {
        Self::new(
            vec![
                Plan::new("30dias", "30 dias", 1490),
                Plan::new("3meses", "3 meses", 2490),
                Plan::new("1ano", "1 ano", 4790),
                Plan::new("vitalicio", "Vitalício", 8790),
            ],
            DEFAULT_PLAN_ID,
        )
    }

    /// Total lookup: unknown ids yield the default plan
    pub fn lookup(&self, plan_id: &str) -> &Plan {
        match self.index.get(plan_id) {
            Some(&i) => &self.plans[i],
            None => {
                tracing::debug!(plan_id = %plan_id, "Unknown plan, using default");
                self.default_plan()
            }
        }
    }

    /// Strict lookup, for callers that need to know whether the id exists
    pub fn get(&self, plan_id: &str) -> Option<&Plan> {
        self.index.get(plan_id).map(|&i| &self.plans[i])
    }

    pub fn default_plan(&self) -> &Plan {
        &self.plans[self.default_index]
    }

    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
