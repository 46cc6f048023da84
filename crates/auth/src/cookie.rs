//! Bypass cookie issuance.
//!
//! A cookie is issued exactly when the decision carries a verified bypass
//! claim, independent of the session axis. It is attached to the response
//! returned to the caller, never to the upstream request.

use crate::decision::AuthDecision;

pub const BYPASS_COOKIE_NAME: &str = "auth_bypass_token";

/// Deployment settings that shape the cookie.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookiePolicy {
    external_app_domain: Option<String>,
}

impl CookiePolicy {
    /// `external_app_domain` is the bare domain (e.g. `publishing.service.gov.uk`).
    /// Blank values mean "no explicit domain".
    pub fn new(external_app_domain: Option<String>) -> Self {
        let external_app_domain = external_app_domain
            .map(|d| d.trim().trim_start_matches('.').to_string())
            .filter(|d| !d.is_empty());
        Self {
            external_app_domain,
        }
    }

    /// Cookie `Domain` attribute: `"." + external_app_domain` when configured.
    pub fn cookie_domain(&self) -> Option<String> {
        self.external_app_domain
            .as_deref()
            .map(|domain| format!(".{domain}"))
    }
}

/// Transport-agnostic description of the cookie to set.
#[derive(Clone, PartialEq, Eq)]
pub struct BypassCookie {
    pub name: &'static str,
    pub value: String,
    pub domain: Option<String>,
    pub path: &'static str,
}

impl BypassCookie {
    /// Render as a `Set-Cookie` header value.
    ///
    /// The `Domain` attribute keeps its leading dot verbatim.
    pub fn set_cookie_value(&self) -> String {
        let mut out = format!("{}={}", self.name, self.value);
        if let Some(domain) = &self.domain {
            out.push_str("; Domain=");
            out.push_str(domain);
        }
        out.push_str("; Path=");
        out.push_str(self.path);
        out
    }
}

impl core::fmt::Debug for BypassCookie {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BypassCookie")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .field("domain", &self.domain)
            .field("path", &self.path)
            .finish()
    }
}

pub fn cookie_for(decision: &AuthDecision, policy: &CookiePolicy) -> Option<BypassCookie> {
    let claim = decision.bypass()?;
    Some(BypassCookie {
        name: BYPASS_COOKIE_NAME,
        value: claim.token().to_string(),
        domain: policy.cookie_domain(),
        path: "/",
    })
}
