//! Session-authentication collaborator seam.
//!
//! The real single-sign-on session subsystem lives outside this proxy; the
//! gate only needs "who is signed in, if anyone" and "where to send callers
//! who are not".

use axum::http::request::Parts;

use authproxy_core::Identity;

/// Source of session identity for inbound requests.
///
/// Implementations are authoritative: whatever identity they return is
/// projected to upstream without further checks.
pub trait SessionAuthenticator: Send + Sync {
    fn current_identity(&self, request: &Parts) -> Option<Identity>;

    /// Absolute or host-relative URL of the login flow for this request.
    fn login_redirect_url(&self, request: &Parts) -> String;
}

fn with_return_to(login_url: &str, request: &Parts) -> String {
    let requested = request
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let separator = if login_url.contains('?') { '&' } else { '?' };
    format!(
        "{login_url}{separator}return_to={}",
        urlencoding::encode(requested)
    )
}

/// No local session store: every caller without a bypass token is sent to
/// the signon login flow, with `return_to` pointing back at the request.
#[derive(Debug, Clone)]
pub struct SignonRedirect {
    login_url: String,
}

impl SignonRedirect {
    pub fn new(login_url: impl Into<String>) -> Self {
        Self {
            login_url: login_url.into(),
        }
    }
}

impl SessionAuthenticator for SignonRedirect {
    fn current_identity(&self, _request: &Parts) -> Option<Identity> {
        None
    }

    fn login_redirect_url(&self, request: &Parts) -> String {
        with_return_to(&self.login_url, request)
    }
}

/// Development session: every caller is signed in as one fixed identity.
#[derive(Debug, Clone)]
pub struct MockSession {
    identity: Identity,
    login_url: String,
}

impl MockSession {
    pub fn new(identity: Identity, login_url: impl Into<String>) -> Self {
        Self {
            identity,
            login_url: login_url.into(),
        }
    }
}

impl SessionAuthenticator for MockSession {
    fn current_identity(&self, _request: &Parts) -> Option<Identity> {
        Some(self.identity.clone())
    }

    fn login_redirect_url(&self, request: &Parts) -> String {
        with_return_to(&self.login_url, request)
    }
}
