//! Identity resolution: session axis × bypass-token axis → [`AuthDecision`].
//!
//! The decision is computed once per request and handed to header projection
//! and cookie issuance, so both always agree on which axes are present.

use authproxy_core::Identity;

use crate::token::{BypassClaim, TokenValidationResult, TokenVerifier};

/// The single authoritative authentication outcome for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    /// No session and no valid bypass token.
    Unauthenticated,
    /// Valid session; no token, or a token that failed verification.
    SessionOnly(Identity),
    /// No session, but a verified bypass token. The acting user is unknown.
    BypassOnly(BypassClaim),
    /// Both a session and a verified bypass token.
    SessionAndBypass(Identity, BypassClaim),
}

/// Field-less tag of an [`AuthDecision`], for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionKind {
    Unauthenticated,
    SessionOnly,
    BypassOnly,
    SessionAndBypass,
}

impl DecisionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::SessionOnly => "session_only",
            Self::BypassOnly => "bypass_only",
            Self::SessionAndBypass => "session_and_bypass",
        }
    }
}

impl core::fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AuthDecision {
    pub fn kind(&self) -> DecisionKind {
        match self {
            Self::Unauthenticated => DecisionKind::Unauthenticated,
            Self::SessionOnly(_) => DecisionKind::SessionOnly,
            Self::BypassOnly(_) => DecisionKind::BypassOnly,
            Self::SessionAndBypass(..) => DecisionKind::SessionAndBypass,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Self::Unauthenticated)
    }

    /// The session identity, when the session axis is present.
    pub fn session(&self) -> Option<&Identity> {
        match self {
            Self::SessionOnly(identity) | Self::SessionAndBypass(identity, _) => Some(identity),
            Self::Unauthenticated | Self::BypassOnly(_) => None,
        }
    }

    /// The verified bypass claim, when the token axis is present.
    pub fn bypass(&self) -> Option<&BypassClaim> {
        match self {
            Self::BypassOnly(claim) | Self::SessionAndBypass(_, claim) => Some(claim),
            Self::Unauthenticated | Self::SessionOnly(_) => None,
        }
    }
}

/// Combine the two axes into a decision.
///
/// `Invalid` and `Absent` tokens contribute nothing.
pub fn combine(session: Option<Identity>, token: TokenValidationResult) -> AuthDecision {
    match (session, token.into_claim()) {
        (None, None) => AuthDecision::Unauthenticated,
        (Some(identity), None) => AuthDecision::SessionOnly(identity),
        (None, Some(claim)) => AuthDecision::BypassOnly(claim),
        (Some(identity), Some(claim)) => AuthDecision::SessionAndBypass(identity, claim),
    }
}

/// Resolve the decision for a request.
///
/// - No IO
/// - Deterministic for identical inputs
pub fn resolve<V>(session: Option<Identity>, raw_token: Option<&str>, verifier: &V) -> AuthDecision
where
    V: TokenVerifier + ?Sized,
{
    combine(session, verifier.check(raw_token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Hs256TokenVerifier;
    use authproxy_core::{OrganisationId, UserId};
    use jsonwebtoken::{EncodingKey, Header, encode};
    use proptest::prelude::*;
    use serde_json::json;

    const SECRET: &[u8] = b"resolver-secret";

    fn identity(user: &str, org: &str) -> Identity {
        Identity::new(UserId::new(user).unwrap(), OrganisationId::new(org).unwrap())
    }

    fn mint(sub: &str, secret: &[u8]) -> String {
        encode(
            &Header::default(),
            &json!({ "sub": sub }),
            &EncodingKey::from_secret(secret),
        )
        .expect("failed to encode jwt")
    }

    #[test]
    fn neither_axis_is_unauthenticated() {
        let verifier = Hs256TokenVerifier::new(SECRET);
        assert_eq!(resolve(None, None, &verifier), AuthDecision::Unauthenticated);
    }

    #[test]
    fn invalid_token_without_session_is_unauthenticated() {
        let verifier = Hs256TokenVerifier::new(SECRET);
        let token = mint("abc-123", b"wrong");
        assert_eq!(
            resolve(None, Some(&token), &verifier),
            AuthDecision::Unauthenticated
        );
    }

    #[test]
    fn session_with_invalid_token_is_session_only() {
        let verifier = Hs256TokenVerifier::new(SECRET);
        let decision = resolve(Some(identity("u-1", "o-1")), Some("junk"), &verifier);
        assert_eq!(decision.kind(), DecisionKind::SessionOnly);
        assert!(decision.bypass().is_none());
    }

    #[test]
    fn valid_token_without_session_is_bypass_only() {
        let verifier = Hs256TokenVerifier::new(SECRET);
        let token = mint("abc-123", SECRET);

        let decision = resolve(None, Some(&token), &verifier);
        let AuthDecision::BypassOnly(claim) = &decision else {
            panic!("expected BypassOnly, got {decision:?}");
        };
        assert_eq!(claim.subject_id().as_str(), "abc-123");
        assert!(decision.session().is_none());
    }

    #[test]
    fn both_axes_are_kept() {
        let verifier = Hs256TokenVerifier::new(SECRET);
        let token = mint("abc-123", SECRET);

        let decision = resolve(Some(identity("u-1", "o-1")), Some(&token), &verifier);
        assert_eq!(decision.kind(), DecisionKind::SessionAndBypass);
        assert_eq!(decision.session().unwrap().user_id().as_str(), "u-1");
        assert_eq!(decision.bypass().unwrap().subject_id().as_str(), "abc-123");
    }

    #[test]
    fn kind_names_are_stable() {
        assert_eq!(DecisionKind::SessionAndBypass.to_string(), "session_and_bypass");
        assert!(!AuthDecision::Unauthenticated.is_authenticated());
    }

    fn arb_session() -> impl Strategy<Value = Option<(String, String)>> {
        proptest::option::of(("[a-z0-9-]{1,16}", "[a-z0-9-]{1,16}"))
    }

    proptest! {
        // mode: 0 = no token, 1 = right secret, 2 = wrong secret, 3 = garbage.
        #[test]
        fn resolve_is_idempotent(
            session in arb_session(),
            mode in 0u8..4,
            sub in "[a-zA-Z0-9-]{1,24}"
        ) {
            let verifier = Hs256TokenVerifier::new(SECRET);
            let session = session.map(|(u, o)| identity(&u, &o));
            let token = match mode {
                0 => None,
                1 => Some(mint(&sub, SECRET)),
                2 => Some(mint(&sub, b"not-the-secret")),
                _ => Some(sub.clone()),
            };

            let first = resolve(session.clone(), token.as_deref(), &verifier);
            let second = resolve(session.clone(), token.as_deref(), &verifier);
            prop_assert_eq!(&first, &second);

            // Axis presence matches the inputs exactly.
            prop_assert_eq!(first.session(), session.as_ref());
            prop_assert_eq!(first.bypass().is_some(), mode == 1);
            if let Some(claim) = first.bypass() {
                prop_assert_eq!(claim.subject_id().as_str(), sub.as_str());
            }
        }
    }
}
