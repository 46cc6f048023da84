//! Process configuration.
//!
//! Read once at startup from the environment. Any [`ConfigError`] is fatal:
//! the binary refuses to bind a listener rather than failing per request.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use serde::Deserialize;
use thiserror::Error;

use authproxy_core::{DomainError, Identity, OrganisationId, UserId};

use crate::session::{MockSession, SessionAuthenticator, SignonRedirect};

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3107";
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_LOGIN_URL: &str = "/auth/gds";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required setting {0} is not set")]
    Missing(&'static str),

    #[error("setting {key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("failed to read environment: {0}")]
    Env(#[from] envy::Error),
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// How the session collaborator is provided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMode {
    /// No local session: callers without a bypass token go to signon.
    Signon { login_url: String },
    /// Development mode: every caller is signed in as `identity`.
    Mock { identity: Identity, login_url: String },
}

impl SessionMode {
    pub fn authenticator(&self) -> Arc<dyn SessionAuthenticator> {
        match self {
            Self::Signon { login_url } => Arc::new(SignonRedirect::new(login_url.clone())),
            Self::Mock {
                identity,
                login_url,
            } => Arc::new(MockSession::new(identity.clone(), login_url.clone())),
        }
    }
}

/// Validated proxy settings.
#[derive(Clone)]
pub struct ProxyConfig {
    /// Upstream base URI, without a trailing slash.
    pub upstream_base_uri: String,
    /// HS256 secret for bypass tokens.
    pub bypass_token_secret: String,
    /// Bare domain used for the bypass cookie's `Domain` attribute.
    pub external_app_domain: Option<String>,
    pub listen_addr: SocketAddr,
    /// Bound on connecting to upstream and receiving its response headers.
    pub upstream_timeout: Duration,
    pub session: SessionMode,
}

impl core::fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("upstream_base_uri", &self.upstream_base_uri)
            .field("bypass_token_secret", &"<redacted>")
            .field("external_app_domain", &self.external_app_domain)
            .field("listen_addr", &self.listen_addr)
            .field("upstream_timeout", &self.upstream_timeout)
            .field("session", &self.session)
            .finish()
    }
}

/// Raw environment, before validation. Names follow the deployment's env vars.
#[derive(Debug, Default, Deserialize)]
struct EnvSettings {
    govuk_upstream_uri: Option<String>,
    jwt_auth_secret: Option<String>,
    govuk_app_domain_external: Option<String>,
    listen_addr: Option<String>,
    upstream_timeout_secs: Option<String>,
    session_mode: Option<String>,
    signon_login_url: Option<String>,
    mock_user_id: Option<String>,
    mock_organisation_id: Option<String>,
}

/// Blank values count as unset. Values are otherwise kept verbatim.
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn required(value: Option<String>, key: &'static str) -> Result<String, ConfigError> {
    non_blank(value).ok_or(ConfigError::Missing(key))
}

impl ProxyConfig {
    /// Settings with defaults for everything but the two required values.
    pub fn new(
        upstream_base_uri: impl AsRef<str>,
        bypass_token_secret: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let bypass_token_secret = bypass_token_secret.into();
        if bypass_token_secret.is_empty() {
            return Err(ConfigError::Missing("JWT_AUTH_SECRET"));
        }

        Ok(Self {
            upstream_base_uri: normalise_upstream(upstream_base_uri.as_ref())?,
            bypass_token_secret,
            external_app_domain: None,
            listen_addr: parse_listen_addr(DEFAULT_LISTEN_ADDR)?,
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
            session: SessionMode::Signon {
                login_url: DEFAULT_LOGIN_URL.to_string(),
            },
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let env: EnvSettings = envy::from_iter(vars)?;

        let upstream = required(env.govuk_upstream_uri, "GOVUK_UPSTREAM_URI")?;
        let secret = required(env.jwt_auth_secret, "JWT_AUTH_SECRET")?;
        let mut config = Self::new(upstream, secret)?;

        config.external_app_domain = non_blank(env.govuk_app_domain_external);

        if let Some(addr) = non_blank(env.listen_addr) {
            config.listen_addr = parse_listen_addr(addr.trim())?;
        }

        if let Some(secs) = non_blank(env.upstream_timeout_secs) {
            config.upstream_timeout = parse_timeout(secs.trim())?;
        }

        let login_url =
            non_blank(env.signon_login_url).unwrap_or_else(|| DEFAULT_LOGIN_URL.to_string());
        let mode = non_blank(env.session_mode).map(|m| m.trim().to_ascii_lowercase());
        config.session = match mode.as_deref() {
            None | Some("signon") => SessionMode::Signon { login_url },
            Some("mock") => {
                let user = required(env.mock_user_id, "MOCK_USER_ID")?;
                let organisation = required(env.mock_organisation_id, "MOCK_ORGANISATION_ID")?;
                let identity = Identity::new(
                    UserId::new(user).map_err(|e| id_error("MOCK_USER_ID", e))?,
                    OrganisationId::new(organisation)
                        .map_err(|e| id_error("MOCK_ORGANISATION_ID", e))?,
                );
                SessionMode::Mock {
                    identity,
                    login_url,
                }
            }
            Some(other) => {
                return Err(ConfigError::invalid(
                    "SESSION_MODE",
                    format!("expected `signon` or `mock`, got `{other}`"),
                ));
            }
        };

        Ok(config)
    }
}

fn id_error(key: &'static str, err: DomainError) -> ConfigError {
    ConfigError::invalid(key, err.to_string())
}

/// Validate the upstream URI and drop one trailing `/` so that appending an
/// inbound path (always starting with `/`) yields a single separator.
fn normalise_upstream(raw: &str) -> Result<String, ConfigError> {
    const KEY: &str = "GOVUK_UPSTREAM_URI";

    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ConfigError::Missing(KEY));
    }

    let url = reqwest::Url::parse(raw).map_err(|e| ConfigError::invalid(KEY, e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::invalid(KEY, "scheme must be http or https"));
    }
    if url.host_str().is_none() {
        return Err(ConfigError::invalid(KEY, "missing host"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(ConfigError::invalid(KEY, "must not carry a query or fragment"));
    }

    Ok(raw.strip_suffix('/').unwrap_or(raw).to_string())
}

fn parse_listen_addr(raw: &str) -> Result<SocketAddr, ConfigError> {
    raw.parse()
        .map_err(|e: std::net::AddrParseError| ConfigError::invalid("LISTEN_ADDR", e.to_string()))
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    match raw.parse::<u64>() {
        Ok(0) => Err(ConfigError::invalid("UPSTREAM_TIMEOUT_SECS", "must be positive")),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(ConfigError::invalid("UPSTREAM_TIMEOUT_SECS", e.to_string())),
    }
}
