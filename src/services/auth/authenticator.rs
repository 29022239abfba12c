//! Bearer トークンの検証と principal 解決
//!
//! Trust policy is an explicit ordered list of resolvers:
//! 1. `VerifiedHs256` — signature verified against our shared secret.
//! 2. `UnverifiedSubject` — payload decoded without verification, `sub` trusted.
//!
//! The second tier exists for tokens minted by an external IdP whose signing
//! key we do not hold. Accepting an unverified `sub` is a deliberate, documented
//! policy decision, optionally narrowed by an issuer allow-list (see `Config`).

use std::fmt;

use base64::Engine as _;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use thiserror::Error;
use tracing::{debug, warn};

use crate::services::auth::claims::Claims;

/// Terminal rejection reasons. Display strings are the client-visible
/// messages, so changing them is a wire-contract change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("No token provided")]
    NoToken,
    #[error("Malformed authorization header")]
    MalformedHeader,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Authentication failed")]
    Internal,
}

/// One tier of the token trust policy.
///
/// Returns `Some(principal_id)` to accept the token at this tier, `None` to
/// let the next tier try. Implementations must never return an empty string.
trait ResolveIdentity: Send + Sync {
    fn name(&self) -> &'static str;
    fn resolve(&self, token: &str) -> Option<String>;
}

/// Tier 1: full verification against the shared HS256 secret.
///
/// Identity comes from the internal claim (`id`, falling back to `_id`). A
/// verified token without either claim yields `None` rather than an undefined
/// principal; resolution then falls through to the subject tier.
struct VerifiedHs256 {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl VerifiedHs256 {
    fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // exp/nbf are enforced when present, but neither is required:
        // tokens from the legacy issuer may omit exp entirely.
        validation.required_spec_claims.clear();
        validation.validate_nbf = true;

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

impl ResolveIdentity for VerifiedHs256 {
    fn name(&self) -> &'static str {
        "verified-hs256"
    }

    fn resolve(&self, token: &str) -> Option<String> {
        let data = match jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
        {
            Ok(data) => data,
            Err(err) => {
                // Bad signature and expired both land here; the caller does not
                // distinguish them, the next tier simply gets its turn.
                debug!(error = %err, "token verification failed");
                return None;
            }
        };

        data.claims.identity().map(str::to_owned)
    }
}

/// Tier 2: decode the payload without checking the signature and trust `sub`.
///
/// This accepts an *unverified* assertion of identity. With an empty
/// `trusted_issuers` list any decodable token is accepted (the historical
/// behavior); a non-empty list restricts the tier to tokens whose `iss` claim
/// is on it.
struct UnverifiedSubject {
    trusted_issuers: Vec<String>,
}

impl ResolveIdentity for UnverifiedSubject {
    fn name(&self) -> &'static str {
        "unverified-subject"
    }

    fn resolve(&self, token: &str) -> Option<String> {
        let claims = decode_unverified(token)?;

        if !self.trusted_issuers.is_empty() {
            let iss = claims.iss.as_deref().unwrap_or_default();
            if !self.trusted_issuers.iter().any(|trusted| trusted == iss) {
                warn!(issuer = iss, "unverified token from unlisted issuer rejected");
                return None;
            }
        }

        claims.subject().map(str::to_owned)
    }
}

/// Read the payload segment of a JWS compact token. No signature check.
fn decode_unverified(token: &str) -> Option<Claims> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next()) {
        (Some(_header), Some(payload), Some(_signature)) => payload,
        _ => return None,
    };
    if segments.next().is_some() {
        return None;
    }

    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload)
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Per-request authentication gate.
///
/// Stateless apart from the configured secret and issuer list, so one instance
/// is shared across all requests behind an `Arc`.
pub struct Authenticator {
    resolvers: Vec<Box<dyn ResolveIdentity>>,
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print key material
        let names: Vec<&str> = self.resolvers.iter().map(|r| r.name()).collect();
        f.debug_struct("Authenticator").field("resolvers", &names).finish()
    }
}

impl Authenticator {
    pub fn new(secret: &str, trusted_issuers: Vec<String>) -> Self {
        Self {
            resolvers: vec![
                Box::new(VerifiedHs256::new(secret)),
                Box::new(UnverifiedSubject { trusted_issuers }),
            ],
        }
    }

    /// Decide whether the request may proceed.
    ///
    /// `header_value` is the raw `Authorization` header, if the request had
    /// one. `Ok` carries a non-empty principal id; `Err` is terminal for the
    /// request and maps to a 401.
    pub fn authenticate(&self, header_value: Option<&str>) -> Result<String, AuthError> {
        let header = header_value.ok_or(AuthError::NoToken)?;
        if header.is_empty() {
            return Err(AuthError::NoToken);
        }

        // `<scheme> <token>`: the scheme word is read but not validated.
        let mut words = header.split_ascii_whitespace();
        let _scheme = words.next();
        let token = words.next().ok_or(AuthError::MalformedHeader)?;

        for resolver in &self.resolvers {
            if let Some(principal) = resolver.resolve(token) {
                debug!(resolver = resolver.name(), "principal resolved");
                return Ok(principal);
            }
        }

        Err(AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header};

    const SECRET: &str = "unit-test-secret";

    fn gate() -> Authenticator {
        Authenticator::new(SECRET, Vec::new())
    }

    fn sign(claims: &serde_json::Value, secret: &str) -> String {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {token}")
    }

    fn exp_in(seconds: i64) -> i64 {
        Utc::now().timestamp() + seconds
    }

    #[test]
    fn missing_header_is_no_token() {
        assert_eq!(gate().authenticate(None), Err(AuthError::NoToken));
    }

    #[test]
    fn empty_header_is_no_token() {
        assert_eq!(gate().authenticate(Some("")), Err(AuthError::NoToken));
    }

    #[test]
    fn scheme_without_token_is_malformed() {
        assert_eq!(
            gate().authenticate(Some("Bearer")),
            Err(AuthError::MalformedHeader)
        );
        assert_eq!(
            gate().authenticate(Some("   ")),
            Err(AuthError::MalformedHeader)
        );
    }

    #[test]
    fn verified_token_resolves_id_claim() {
        let token = sign(&serde_json::json!({ "id": "u1", "exp": exp_in(3600) }), SECRET);
        assert_eq!(gate().authenticate(Some(&bearer(&token))), Ok("u1".to_string()));
    }

    #[test]
    fn verified_token_falls_back_to_legacy_id_claim() {
        let token = sign(&serde_json::json!({ "_id": "u2", "exp": exp_in(3600) }), SECRET);
        assert_eq!(gate().authenticate(Some(&bearer(&token))), Ok("u2".to_string()));
    }

    #[test]
    fn verified_token_without_exp_is_accepted() {
        let token = sign(&serde_json::json!({ "id": "u3" }), SECRET);
        assert_eq!(gate().authenticate(Some(&bearer(&token))), Ok("u3".to_string()));
    }

    #[test]
    fn scheme_word_is_not_validated() {
        let token = sign(&serde_json::json!({ "id": "u1" }), SECRET);
        assert_eq!(
            gate().authenticate(Some(&format!("Token {token}"))),
            Ok("u1".to_string())
        );
    }

    #[test]
    fn foreign_signature_falls_back_to_subject() {
        let token = sign(&serde_json::json!({ "sub": "ext-42" }), "some-other-secret");
        assert_eq!(
            gate().authenticate(Some(&bearer(&token))),
            Ok("ext-42".to_string())
        );
    }

    #[test]
    fn expired_token_with_subject_uses_fallback() {
        // Signed with our secret but expired: tier 1 fails, tier 2 still
        // accepts the decodable subject. Leeway is 60s, so go well past.
        let token = sign(
            &serde_json::json!({ "sub": "ext-9", "exp": exp_in(-3600) }),
            SECRET,
        );
        assert_eq!(
            gate().authenticate(Some(&bearer(&token))),
            Ok("ext-9".to_string())
        );
    }

    #[test]
    fn expired_token_without_subject_is_invalid() {
        let token = sign(
            &serde_json::json!({ "id": "u1", "exp": exp_in(-3600) }),
            SECRET,
        );
        assert_eq!(
            gate().authenticate(Some(&bearer(&token))),
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn not_yet_valid_token_without_subject_is_invalid() {
        let token = sign(
            &serde_json::json!({ "id": "u1", "nbf": exp_in(3600) }),
            SECRET,
        );
        assert_eq!(
            gate().authenticate(Some(&bearer(&token))),
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn garbage_token_is_invalid() {
        assert_eq!(
            gate().authenticate(Some("Bearer not-a-jwt")),
            Err(AuthError::InvalidToken)
        );
        assert_eq!(
            gate().authenticate(Some("Bearer a.%%%.c")),
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn verified_token_with_no_identity_claims_is_invalid() {
        // Valid signature, empty claims: must not proceed with an undefined
        // principal. Falls through to tier 2, which finds no subject either.
        let token = sign(&serde_json::json!({ "exp": exp_in(3600) }), SECRET);
        assert_eq!(
            gate().authenticate(Some(&bearer(&token))),
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn verified_token_with_only_subject_resolves_via_fallback_tier() {
        let token = sign(&serde_json::json!({ "sub": "s-1", "exp": exp_in(3600) }), SECRET);
        assert_eq!(gate().authenticate(Some(&bearer(&token))), Ok("s-1".to_string()));
    }

    #[test]
    fn empty_identity_values_never_proceed() {
        let token = sign(
            &serde_json::json!({ "id": "", "_id": " ", "sub": "", "exp": exp_in(3600) }),
            SECRET,
        );
        assert_eq!(
            gate().authenticate(Some(&bearer(&token))),
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn issuer_allow_list_gates_the_fallback_tier() {
        let gate = Authenticator::new(SECRET, vec!["https://idp.example.com".to_string()]);

        let trusted = sign(
            &serde_json::json!({ "sub": "ext-1", "iss": "https://idp.example.com" }),
            "foreign-secret",
        );
        assert_eq!(
            gate.authenticate(Some(&bearer(&trusted))),
            Ok("ext-1".to_string())
        );

        let unlisted = sign(
            &serde_json::json!({ "sub": "ext-2", "iss": "https://evil.example.com" }),
            "foreign-secret",
        );
        assert_eq!(
            gate.authenticate(Some(&bearer(&unlisted))),
            Err(AuthError::InvalidToken)
        );

        let anonymous = sign(&serde_json::json!({ "sub": "ext-3" }), "foreign-secret");
        assert_eq!(
            gate.authenticate(Some(&bearer(&anonymous))),
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn issuer_allow_list_does_not_gate_the_verified_tier() {
        let gate = Authenticator::new(SECRET, vec!["https://idp.example.com".to_string()]);
        let token = sign(&serde_json::json!({ "id": "u1" }), SECRET);
        assert_eq!(gate.authenticate(Some(&bearer(&token))), Ok("u1".to_string()));
    }

    #[test]
    fn authenticate_is_idempotent() {
        let gate = gate();
        let token = bearer(&sign(&serde_json::json!({ "id": "u1" }), SECRET));
        assert_eq!(
            gate.authenticate(Some(&token)),
            gate.authenticate(Some(&token))
        );
        assert_eq!(
            gate.authenticate(Some("Bearer junk")),
            gate.authenticate(Some("Bearer junk"))
        );
    }
}
