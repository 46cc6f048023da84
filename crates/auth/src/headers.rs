//! Trusted header projection.
//!
//! | decision            | user / organisation          | bypass id      |
//! |---------------------|------------------------------|----------------|
//! | `SessionOnly`       | session ids                  | absent         |
//! | `BypassOnly`        | `"invalid"` / `"invalid"`    | claim subject  |
//! | `SessionAndBypass`  | session ids                  | claim subject  |
//!
//! `Unauthenticated` requests are redirected before projection; projecting one
//! yields no headers.

use std::collections::BTreeMap;

use crate::decision::AuthDecision;

pub const AUTHENTICATED_USER_HEADER: &str = "X-Govuk-Authenticated-User";
pub const AUTHENTICATED_USER_ORGANISATION_HEADER: &str = "X-Govuk-Authenticated-User-Organisation";
pub const BYPASS_ID_HEADER: &str = "Govuk-Auth-Bypass-Id";

/// Every header upstream trusts for identity. Inbound copies must be dropped.
pub const TRUSTED_HEADERS: [&str; 3] = [
    AUTHENTICATED_USER_HEADER,
    AUTHENTICATED_USER_ORGANISATION_HEADER,
    BYPASS_ID_HEADER,
];

/// Literal placed in the user headers when no session identity exists.
/// Upstream applications match on this exact string.
pub const INVALID_IDENTITY: &str = "invalid";

/// Header name → value pairs to set on the upstream request.
pub type TrustedHeaders = BTreeMap<&'static str, String>;

pub fn project_headers(decision: &AuthDecision) -> TrustedHeaders {
    let mut headers = TrustedHeaders::new();
    if !decision.is_authenticated() {
        return headers;
    }

    let (user, organisation) = match decision.session() {
        Some(identity) => (
            identity.user_id().to_string(),
            identity.organisation_id().to_string(),
        ),
        None => (INVALID_IDENTITY.to_string(), INVALID_IDENTITY.to_string()),
    };
    headers.insert(AUTHENTICATED_USER_HEADER, user);
    headers.insert(AUTHENTICATED_USER_ORGANISATION_HEADER, organisation);

    if let Some(claim) = decision.bypass() {
        headers.insert(BYPASS_ID_HEADER, claim.subject_id().to_string());
    }

    headers
}
