//! Back-Navigation Policy

use serde::{Deserialize, Serialize};

use crate::entry::with_query;

/// Where a back navigation on the funnel pages ends up.
///
/// The front end pushes `guard_depth` history entries so the browser's back
/// button lands on the funnel instead of leaving it, then asks the policy
/// where to go.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationPolicy {
    pub enabled: bool,
    pub target_route: String,
    pub guard_depth: u8,
}

impl Default for NavigationPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            target_route: "/oferta-especial".into(),
            guard_depth: 3,
        }
    }
}

/// Outcome of a back navigation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "location", rename_all = "lowercase")]
pub enum NavigationDecision {
    Redirect(String),
    Allow,
}

impl NavigationPolicy {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Decide a back navigation from a page whose query is `query`
    pub fn on_back(&self, query: &str) -> NavigationDecision {
        if self.enabled {
            NavigationDecision::Redirect(with_query(&self.target_route, query))
        } else {
            NavigationDecision::Allow
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_keeps_query() {
        let policy = NavigationPolicy::default();
        assert_eq!(
            policy.on_back("?utm_source=ig&plan=1ano"),
            NavigationDecision::Redirect("/oferta-especial?utm_source=ig&plan=1ano".into())
        );
        assert_eq!(
            policy.on_back(""),
            NavigationDecision::Redirect("/oferta-especial".into())
        );
    }

    #[test]
    fn test_disabled_allows() {
        assert_eq!(NavigationPolicy::disabled().on_back("a=1"), NavigationDecision::Allow);
    }

    #[test]
    fn test_decision_json() {
        let json = serde_json::to_value(NavigationDecision::Redirect("/x".into())).unwrap();
        assert_eq!(json["action"], "redirect");
        assert_eq!(json["location"], "/x");
    }
}
