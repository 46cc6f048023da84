//! Bypass token verification (HS256, compact three-part JWT).
//!
//! A bypass token only has to carry a valid signature and a string `sub`
//! claim. Expiry and audience are deliberately not checked. Every failure
//! (bad structure, bad signature, wrong algorithm, missing or malformed
//! subject) collapses to [`TokenValidationResult::Invalid`].

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;

use authproxy_core::SubjectId;

/// Decoded and verified payload of a bypass token.
///
/// Keeps the raw token it was decoded from, because the cookie issued for a
/// bypass request carries the token verbatim.
#[derive(Clone, PartialEq, Eq)]
pub struct BypassClaim {
    subject_id: SubjectId,
    token: String,
}

impl BypassClaim {
    pub fn new(subject_id: SubjectId, token: impl Into<String>) -> Self {
        Self {
            subject_id,
            token: token.into(),
        }
    }

    pub fn subject_id(&self) -> &SubjectId {
        &self.subject_id
    }

    /// The raw token string this claim was verified from.
    pub fn token(&self) -> &str {
        &self.token
    }
}

// The token is a bearer credential; keep it out of logs.
impl core::fmt::Debug for BypassClaim {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BypassClaim")
            .field("subject_id", &self.subject_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Outcome of checking the (optional) bypass token of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenValidationResult {
    Valid(BypassClaim),
    Invalid,
    Absent,
}

impl TokenValidationResult {
    /// The verified claim, if any. `Invalid` and `Absent` both yield `None`.
    pub fn into_claim(self) -> Option<BypassClaim> {
        match self {
            Self::Valid(claim) => Some(claim),
            Self::Invalid | Self::Absent => None,
        }
    }
}

/// Verifies bypass tokens against a server-held secret.
pub trait TokenVerifier: Send + Sync {
    /// Verify a token string that was present on the request.
    fn verify(&self, token: &str) -> TokenValidationResult;

    /// Verify an optional token; a missing token is `Absent`.
    fn check(&self, token: Option<&str>) -> TokenValidationResult {
        match token {
            Some(token) => self.verify(token),
            None => TokenValidationResult::Absent,
        }
    }
}

#[derive(Deserialize)]
struct BypassTokenClaims {
    sub: String,
}

/// HS256 verifier with a pre-built decoding key.
pub struct Hs256TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256TokenVerifier {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Only signature + `sub` matter for bypass tokens.
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;

        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl core::fmt::Debug for Hs256TokenVerifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256TokenVerifier").finish_non_exhaustive()
    }
}

impl TokenVerifier for Hs256TokenVerifier {
    fn verify(&self, token: &str) -> TokenValidationResult {
        let data = match decode::<BypassTokenClaims>(token, &self.key, &self.validation) {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!(kind = ?e.kind(), "bypass token rejected");
                return TokenValidationResult::Invalid;
            }
        };

        match SubjectId::new(data.claims.sub) {
            Ok(subject_id) => TokenValidationResult::Valid(BypassClaim::new(subject_id, token)),
            Err(e) => {
                tracing::debug!(error = %e, "bypass token subject rejected");
                TokenValidationResult::Invalid
            }
        }
    }
}

/// One-shot verification of `token` against `secret`.
///
/// Prefer holding an [`Hs256TokenVerifier`] when verifying many tokens.
pub fn verify(token: &str, secret: &[u8]) -> TokenValidationResult {
    Hs256TokenVerifier::new(secret).verify(token)
}
