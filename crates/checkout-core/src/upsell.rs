//! Upsell Negotiator
//!
//! Before a lower-tier plan is finalized the buyer may be offered the next
//! tier at a discount. This module only decides which plan and amount are
//! forwarded to the payment request.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::plan::{Plan, PlanCatalog, format_brl};

/// A discounted upgrade offered in place of a selected plan
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsellOffer {
    /// Plan the buyer originally picked
    pub source_plan_id: String,

    /// Plan offered instead
    pub target_plan_id: String,

    /// Display name of the target plan
    pub name: String,

    /// Offer price in centavos
    pub price_cents: i64,

    /// Regular price of the target plan in centavos
    pub original_price_cents: i64,
}

impl UpsellOffer {
    pub fn savings_cents(&self) -> i64 {
        self.original_price_cents - self.price_cents
    }

    /// How much more the upgrade costs than `original`
    pub fn extra_cost_cents(&self, original: &Plan) -> i64 {
        self.price_cents - original.effective_price_cents()
    }

    /// Modal headline, e.g. "Por apenas +R$ 5,00 você pode ter acesso ao plano 3 meses!"
    pub fn pitch(&self, original: &Plan) -> String {
        format!(
            "Por apenas +{} você pode ter acesso ao plano {}!",
            format_brl(self.extra_cost_cents(original)),
            self.name
        )
    }
}

/// Buyer's answer to the upsell modal
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsellDecision {
    Accept,
    Decline,
}

impl From<bool> for UpsellDecision {
    fn from(accept: bool) -> Self {
        if accept { Self::Accept } else { Self::Decline }
    }
}

/// Plan and price that go into the payment request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedPlan {
    pub plan_id: String,
    pub plan_name: String,
    pub amount_cents: i64,
    pub upsold: bool,
}

impl SelectedPlan {
    pub fn from_plan(plan: &Plan) -> Self {
        Self {
            plan_id: plan.id.clone(),
            plan_name: plan.name.clone(),
            amount_cents: plan.effective_price_cents(),
            upsold: false,
        }
    }

    /// Query string that opens the checkout for this selection
    pub fn checkout_query(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("plan", &self.plan_id)
            .append_pair("promo", &self.amount_cents.to_string())
            .finish()
    }
}

/// Upsell offers keyed by source plan
#[derive(Clone, Debug, Default)]
pub struct UpsellNegotiator {
    offers: HashMap<String, UpsellOffer>,
}

impl UpsellNegotiator {
    pub fn new(offers: impl IntoIterator<Item = UpsellOffer>) -> Self {
        Self {
            offers: offers
                .into_iter()
                .map(|o| (o.source_plan_id.clone(), o))
                .collect(),
        }
    }

    /// Offers matching the standard catalog; the lifetime plan has none
    pub fn standard() -> Self {
        let offer = |source: &str, target: &str, name: &str, price, original| UpsellOffer {
            source_plan_id: source.into(),
            target_plan_id: target.into(),
            name: name.into(),
            price_cents: price,
            original_price_cents: original,
        };

        Self::new([
            offer("30dias", "3meses", "3 meses", 1990, 2490),
            offer("3meses", "1ano", "1 ano", 3790, 4790),
            offer("1ano", "vitalicio", "Vitalício", 6790, 8790),
        ])
    }

    pub fn offer_for(&self, plan_id: &str) -> Option<&UpsellOffer> {
        self.offers.get(plan_id)
    }

    /// Resolve the plan forwarded to checkout.
    ///
    /// Plans without an offer ignore `decision` and proceed unchanged.
    pub fn resolve(
        &self,
        catalog: &PlanCatalog,
        plan_id: &str,
        decision: UpsellDecision,
    ) -> SelectedPlan {
        let original = catalog.lookup(plan_id);

        match (self.offer_for(&original.id), decision) {
            (Some(offer), UpsellDecision::Accept) => {
                let target = catalog.lookup(&offer.target_plan_id);
                tracing::debug!(
                    from = %original.id,
                    to = %target.id,
                    price = offer.price_cents,
                    "Upsell accepted"
                );
                SelectedPlan {
                    plan_id: target.id.clone(),
                    plan_name: target.name.clone(),
                    amount_cents: offer.price_cents,
                    upsold: true,
                }
            }
            _ => SelectedPlan::from_plan(original),
        }
    }
}
