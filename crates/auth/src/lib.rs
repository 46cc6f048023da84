//! `authproxy-auth`: the authentication decision procedure.
//!
//! This crate is intentionally decoupled from HTTP and storage: it verifies
//! bypass tokens, combines them with the session identity into a single
//! [`AuthDecision`], and derives the trusted headers and bypass cookie from
//! that decision. Every function here is pure.

pub mod cookie;
pub mod decision;
pub mod headers;
pub mod token;

pub use cookie::{BYPASS_COOKIE_NAME, BypassCookie, CookiePolicy, cookie_for};
pub use decision::{AuthDecision, DecisionKind, combine, resolve};
pub use headers::{
    AUTHENTICATED_USER_HEADER, AUTHENTICATED_USER_ORGANISATION_HEADER, BYPASS_ID_HEADER,
    INVALID_IDENTITY, TRUSTED_HEADERS, TrustedHeaders, project_headers,
};
pub use token::{BypassClaim, Hs256TokenVerifier, TokenValidationResult, TokenVerifier, verify};
