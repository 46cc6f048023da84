use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::ProxyError;

pub fn proxy_error_to_response(err: &ProxyError) -> Response {
    match err {
        ProxyError::UpstreamUnavailable(_) => json_error(
            StatusCode::BAD_GATEWAY,
            "upstream_unavailable",
            "the upstream service could not be reached",
        ),
        ProxyError::UpstreamTimeout(_) => json_error(
            StatusCode::GATEWAY_TIMEOUT,
            "upstream_timeout",
            "the upstream service did not respond in time",
        ),
        ProxyError::InvalidTrustedHeader(_) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "identity could not be forwarded",
        ),
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        proxy_error_to_response(&self)
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn upstream_failures_map_to_gateway_statuses() {
        let unavailable = proxy_error_to_response(&ProxyError::UpstreamUnavailable("refused".into()));
        assert_eq!(unavailable.status(), StatusCode::BAD_GATEWAY);

        let timeout = proxy_error_to_response(&ProxyError::UpstreamTimeout(Duration::from_secs(1)));
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn unsendable_identity_is_an_internal_error() {
        let response = ProxyError::InvalidTrustedHeader("X-Govuk-Authenticated-User").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers().get(axum::http::header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }
}
