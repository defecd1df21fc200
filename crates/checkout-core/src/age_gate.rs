//! Age Gate
//!
//! A persisted `age_verified` flag, with no expiry, guards the content
//! route. The flag travels as a cookie.

use crate::entry::with_query;

pub const AGE_COOKIE: &str = "age_verified";

/// Age gate routes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgeGate {
    pub content_route: String,
    pub gate_route: String,
    pub deny_url: String,
}

impl Default for AgeGate {
    fn default() -> Self {
        Self {
            content_route: "/privacy".into(),
            gate_route: "/".into(),
            deny_url: "https://www.google.com".into(),
        }
    }
}

impl AgeGate {
    /// Whether a `Cookie` header carries the verified flag
    pub fn is_verified(cookie_header: Option<&str>) -> bool {
        cookie_header.is_some_and(|header| {
            header.split(';').any(|pair| {
                pair.trim()
                    .split_once('=')
                    .is_some_and(|(name, value)| name.trim() == AGE_COOKIE && value.trim() == "true")
            })
        })
    }

    /// `Set-Cookie` value persisting the flag
    pub fn verified_cookie() -> String {
        // Ten years stands in for "never expires"
        format!("{AGE_COOKIE}=true; Path=/; Max-Age=315360000; SameSite=Lax")
    }

    /// Redirect after confirming, query preserved
    pub fn confirm_location(&self, query: &str) -> String {
        with_query(&self.content_route, query)
    }

    pub fn deny_location(&self) -> &str {
        &self.deny_url
    }

    /// Redirect for a content request, `None` when access is allowed
    pub fn guard(&self, cookie_header: Option<&str>) -> Option<&str> {
        (!Self::is_verified(cookie_header)).then_some(self.gate_route.as_str())
    }
}
