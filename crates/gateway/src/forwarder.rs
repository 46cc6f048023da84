//! Upstream forwarding.
//!
//! Method, path, query and body go upstream unchanged; the trusted headers
//! replace whatever the client sent under those names. The upstream response
//! is streamed back as-is (minus hop-by-hop headers). An upstream that goes
//! quiet mid-body for longer than the timeout ends the response with an error.

use std::time::Duration;

use axum::{
    body::{Body, HttpBody as _},
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};

use authproxy_auth::{BypassCookie, TRUSTED_HEADERS, TrustedHeaders};

use crate::error::{GatewayError, ProxyError};

/// Inbound request as seen by the forwarder.
#[derive(Debug)]
pub struct ProxyRequest {
    pub method: Method,
    /// Path plus query string, exactly as received (`/foo?token=...`).
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Body,
}

impl ProxyRequest {
    pub fn from_parts(parts: Parts, body: Body) -> Self {
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        Self {
            method: parts.method,
            path_and_query,
            headers: parts.headers,
            body,
        }
    }
}

/// Upstream response on its way back to the caller.
#[derive(Debug)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Body,
}

impl ProxyResponse {
    /// Append a bypass cookie; upstream `Set-Cookie` headers are kept.
    pub fn attach_cookie(&mut self, cookie: &BypassCookie) {
        match HeaderValue::try_from(cookie.set_cookie_value()) {
            Ok(value) => {
                self.headers.append(header::SET_COOKIE, value);
            }
            Err(_) => tracing::warn!("bypass cookie value is not a valid header; not set"),
        }
    }
}

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(self.body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Headers that only make sense for a single connection (RFC 9110 §7.6.1).
fn is_hop_by_hop(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailers"
            | "transfer-encoding"
            | "upgrade"
    )
}

/// Build the upstream header set: inbound headers minus hop-by-hop, `host`
/// and any client-supplied trusted headers, then the projected headers.
pub fn upstream_headers(
    inbound: &HeaderMap,
    trusted: &TrustedHeaders,
) -> Result<HeaderMap, ProxyError> {
    let mut headers = HeaderMap::with_capacity(inbound.len() + trusted.len());
    for (name, value) in inbound {
        if is_hop_by_hop(name) || *name == header::HOST {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    for name in TRUSTED_HEADERS {
        headers.remove(name);
    }

    for (&name, value) in trusted {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ProxyError::InvalidTrustedHeader(name))?;
        let header_value =
            HeaderValue::from_str(value).map_err(|_| ProxyError::InvalidTrustedHeader(name))?;
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}

fn response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.len() + 1);
    for (name, value) in upstream {
        if !is_hop_by_hop(name) {
            headers.append(name.clone(), value.clone());
        }
    }
    headers
}

/// HTTP client bound to one upstream base URI.
#[derive(Debug, Clone)]
pub struct UpstreamForwarder {
    client: reqwest::Client,
    base_uri: String,
    timeout: Duration,
}

impl UpstreamForwarder {
    /// `base_uri` is expected without a trailing slash (see `ProxyConfig`).
    pub fn new(base_uri: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .connect_timeout(timeout)
            // Idle bound on every read, so a stalled body is cut off too.
            .read_timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_uri: base_uri.into(),
            timeout,
        })
    }

    pub fn upstream_url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base_uri, path_and_query)
    }

    pub async fn forward(
        &self,
        inbound: ProxyRequest,
        trusted: &TrustedHeaders,
    ) -> Result<ProxyResponse, ProxyError> {
        let url = self.upstream_url(&inbound.path_and_query);
        let headers = upstream_headers(&inbound.headers, trusted)?;

        let mut request = self
            .client
            .request(inbound.method, url.as_str())
            .headers(headers);
        if inbound.body.size_hint().exact() != Some(0) {
            request = request.body(reqwest::Body::wrap_stream(inbound.body.into_data_stream()));
        }

        tracing::debug!(%url, "forwarding to upstream");

        // Bounded wait for response headers; body reads are bounded per read.
        let upstream = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| ProxyError::UpstreamTimeout(self.timeout))?
            .map_err(|e| {
                if e.is_timeout() {
                    ProxyError::UpstreamTimeout(self.timeout)
                } else {
                    ProxyError::UpstreamUnavailable(e.to_string())
                }
            })?;

        let status = upstream.status();
        let headers = response_headers(upstream.headers());
        let body = Body::from_stream(upstream.bytes_stream());

        Ok(ProxyResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authproxy_auth::{AUTHENTICATED_USER_HEADER, BYPASS_ID_HEADER};

    fn trusted(pairs: &[(&'static str, &str)]) -> TrustedHeaders {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn url_is_base_plus_path_and_query() {
        let fwd = UpstreamForwarder::new("http://upstream:3000", Duration::from_secs(1)).unwrap();
        assert_eq!(
            fwd.upstream_url("/foo/bar?token=abc&x=%20"),
            "http://upstream:3000/foo/bar?token=abc&x=%20"
        );
    }

    #[test]
    fn client_supplied_trusted_headers_are_dropped() {
        let mut inbound = HeaderMap::new();
        inbound.insert("govuk-auth-bypass-id", HeaderValue::from_static("forged"));
        inbound.insert(
            "x-govuk-authenticated-user",
            HeaderValue::from_static("forged-user"),
        );
        inbound.insert(header::ACCEPT, HeaderValue::from_static("text/html"));

        let headers =
            upstream_headers(&inbound, &trusted(&[(AUTHENTICATED_USER_HEADER, "u-1")])).unwrap();

        assert!(headers.get(BYPASS_ID_HEADER).is_none());
        assert_eq!(headers.get(AUTHENTICATED_USER_HEADER).unwrap(), "u-1");
        assert_eq!(headers.get(header::ACCEPT).unwrap(), "text/html");
    }

    #[test]
    fn hop_by_hop_and_host_are_not_forwarded() {
        let mut inbound = HeaderMap::new();
        inbound.insert(header::HOST, HeaderValue::from_static("draft.example"));
        inbound.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        inbound.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        inbound.append(header::COOKIE, HeaderValue::from_static("a=1"));
        inbound.append(header::COOKIE, HeaderValue::from_static("b=2"));

        let headers = upstream_headers(&inbound, &TrustedHeaders::new()).unwrap();

        assert!(headers.get(header::HOST).is_none());
        assert!(headers.get(header::CONNECTION).is_none());
        assert!(headers.get(header::TRANSFER_ENCODING).is_none());
        assert_eq!(headers.get_all(header::COOKIE).iter().count(), 2);
    }

    #[test]
    fn cookie_is_appended_to_existing_set_cookie() {
        let mut response = ProxyResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Body::empty(),
        };
        response
            .headers
            .append(header::SET_COOKIE, HeaderValue::from_static("upstream=1"));

        response.attach_cookie(&BypassCookie {
            name: "auth_bypass_token",
            value: "a.b.c".into(),
            domain: None,
            path: "/",
        });

        let cookies: Vec<_> = response.headers.get_all(header::SET_COOKIE).iter().collect();
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[1], "auth_bypass_token=a.b.c; Path=/");
    }
}
