//! Request gate: the entry point for every inbound request.
//!
//! `Start → Resolved → {Redirecting | Forwarding} → Done`. The decision is
//! resolved once; the redirect/forward plan is derived from it, and the
//! forward plan carries both the trusted headers and the cookie so they can
//! never disagree.

use axum::{
    body::Body,
    extract::{Query, State},
    http::{Request, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use authproxy_auth::{
    AuthDecision, BypassCookie, CookiePolicy, TrustedHeaders, cookie_for, project_headers,
    resolve,
};

use crate::{app::AppState, forwarder::ProxyRequest};

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Bypass token from the `token` query parameter; no other source is read.
///
/// A query string that cannot be decoded (including a repeated `token`)
/// counts as no token.
pub fn bypass_token(uri: &Uri) -> Option<String> {
    Query::<TokenQuery>::try_from_uri(uri).ok()?.0.token
}

/// What the gate does with a resolved request.
#[derive(Debug, PartialEq, Eq)]
pub enum GatePlan {
    Redirect,
    Forward {
        headers: TrustedHeaders,
        cookie: Option<BypassCookie>,
    },
}

pub fn plan(decision: &AuthDecision, cookie_policy: &CookiePolicy) -> GatePlan {
    match decision {
        AuthDecision::Unauthenticated => GatePlan::Redirect,
        AuthDecision::SessionOnly(_)
        | AuthDecision::BypassOnly(_)
        | AuthDecision::SessionAndBypass(..) => GatePlan::Forward {
            headers: project_headers(decision),
            cookie: cookie_for(decision, cookie_policy),
        },
    }
}

/// 302 to the login flow. Deliberately sets no framing headers.
fn login_redirect(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

/// Fallback handler: every method and path lands here.
pub async fn gate(State(state): State<AppState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();

    let raw_token = bypass_token(&parts.uri);
    let session = state.session.current_identity(&parts);
    let decision = resolve(session, raw_token.as_deref(), state.verifier.as_ref());
    tracing::debug!(
        decision = %decision.kind(),
        token_present = raw_token.is_some(),
        "resolved request identity"
    );

    match plan(&decision, &state.cookie_policy) {
        GatePlan::Redirect => login_redirect(state.session.login_redirect_url(&parts)),
        GatePlan::Forward { headers, cookie } => {
            let inbound = ProxyRequest::from_parts(parts, body);
            match state.forwarder.forward(inbound, &headers).await {
                Ok(mut response) => {
                    if let Some(cookie) = &cookie {
                        response.attach_cookie(cookie);
                    }
                    response.into_response()
                }
                Err(err) => {
                    if err.is_upstream_unavailable() {
                        tracing::warn!(error = %err, "upstream request failed");
                    } else {
                        tracing::error!(error = %err, "request could not be forwarded");
                    }
                    err.into_response()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authproxy_auth::{BYPASS_ID_HEADER, BypassClaim};
    use authproxy_core::{Identity, OrganisationId, SubjectId, UserId};

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[test]
    fn token_only_comes_from_query() {
        assert_eq!(bypass_token(&uri("/foo?token=a.b.c")).as_deref(), Some("a.b.c"));
        assert_eq!(bypass_token(&uri("/foo?x=1&token=a%2Eb&y")).as_deref(), Some("a.b"));
        assert_eq!(bypass_token(&uri("/foo")), None);
        assert_eq!(bypass_token(&uri("/foo?tokens=a.b.c")), None);
    }

    #[test]
    fn unauthenticated_plans_redirect() {
        assert_eq!(
            plan(&AuthDecision::Unauthenticated, &CookiePolicy::default()),
            GatePlan::Redirect
        );
    }

    #[test]
    fn forward_plan_keeps_headers_and_cookie_consistent() {
        let claim = BypassClaim::new(SubjectId::new("abc-123").unwrap(), "t.o.k");
        let identity = Identity::new(UserId::new("u").unwrap(), OrganisationId::new("o").unwrap());

        for decision in [
            AuthDecision::SessionOnly(identity.clone()),
            AuthDecision::BypassOnly(claim.clone()),
            AuthDecision::SessionAndBypass(identity, claim),
        ] {
            let GatePlan::Forward { headers, cookie } = plan(&decision, &CookiePolicy::default())
            else {
                panic!("expected forward plan for {decision:?}");
            };
            assert_eq!(headers.contains_key(BYPASS_ID_HEADER), cookie.is_some());
        }
    }

    #[test]
    fn redirect_is_a_plain_302() {
        let response = login_redirect("/auth/gds?return_to=%2F".into());
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/auth/gds?return_to=%2F"
        );
        assert!(response.headers().get("x-frame-options").is_none());
    }
}
