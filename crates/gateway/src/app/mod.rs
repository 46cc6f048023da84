//! HTTP application wiring (Axum router + shared state).
//!
//! - `errors.rs`: consistent error responses
//! - the request gate itself lives in `crate::gate`

use std::sync::Arc;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use authproxy_auth::{CookiePolicy, Hs256TokenVerifier, TokenVerifier};

use crate::{
    config::ProxyConfig, error::GatewayError, forwarder::UpstreamForwarder, gate,
    session::SessionAuthenticator,
};

pub mod errors;

/// Per-process state shared by every request. Immutable after startup.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<dyn SessionAuthenticator>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub cookie_policy: CookiePolicy,
    pub forwarder: UpstreamForwarder,
}

impl AppState {
    pub fn new(
        config: &ProxyConfig,
        session: Arc<dyn SessionAuthenticator>,
    ) -> Result<Self, GatewayError> {
        Ok(Self {
            session,
            verifier: Arc::new(Hs256TokenVerifier::new(
                config.bypass_token_secret.as_bytes(),
            )),
            cookie_policy: CookiePolicy::new(config.external_app_domain.clone()),
            forwarder: UpstreamForwarder::new(
                config.upstream_base_uri.clone(),
                config.upstream_timeout,
            )?,
        })
    }
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// There are no routes of its own: every request goes through the gate.
pub fn build_app(
    config: &ProxyConfig,
    session: Arc<dyn SessionAuthenticator>,
) -> Result<Router, GatewayError> {
    let state = AppState::new(config, session)?;

    Ok(Router::new()
        .fallback(gate::gate)
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http())))
}
