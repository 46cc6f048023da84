//! Gateway error model.

use std::time::Duration;

use thiserror::Error;

/// Per-request forwarding failure.
///
/// Both upstream variants are "upstream unavailable" to the caller (5xx);
/// neither is retried here.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("upstream did not respond within {0:?}")]
    UpstreamTimeout(Duration),

    #[error("trusted header {0} has a value that cannot be sent")]
    InvalidTrustedHeader(&'static str),
}

impl ProxyError {
    pub fn is_upstream_unavailable(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable(_) | Self::UpstreamTimeout(_))
    }
}

/// Failure while assembling the application.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to build upstream http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
