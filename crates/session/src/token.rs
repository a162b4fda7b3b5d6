//! Client-side reading of a bearer token's `exp` claim.
//!
//! The signature is NOT verified: the expiry is only used to schedule the
//! local expiry watch and to skip obviously stale tokens at startup. It is
//! never an authorization decision. The server's 401/403 is the only
//! authoritative signal.

use std::collections::HashSet;

use jsonwebtoken::{decode, DecodingKey, Validation};
use portal_core::error::CoreError;
use portal_core::types::Timestamp;
use serde::Deserialize;

/// The only claim the client reads.
#[derive(Debug, Deserialize)]
struct ExpiryClaim {
    /// Expiration time (UTC Unix timestamp).
    exp: i64,
}

/// How a token's expiry relates to "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenHealth {
    Valid,
    /// Still valid, but inside the lookahead window.
    ExpiringSoon,
    Expired,
}

impl TokenHealth {
    /// Whether the session should be ended proactively.
    pub fn needs_logout(&self) -> bool {
        !matches!(self, TokenHealth::Valid)
    }
}

/// Decode the `exp` claim of a JWT without checking its signature.
///
/// Fails with [`CoreError::MalformedToken`] when the token is not a JWT,
/// has no numeric `exp`, or the timestamp is out of range.
pub fn decode_expiry(token: &str) -> Result<Timestamp, CoreError> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::from(["exp".to_string()]);

    let data = decode::<ExpiryClaim>(token, &DecodingKey::from_secret(&[]), &validation)
        .map_err(|e| CoreError::MalformedToken(e.to_string()))?;

    chrono::DateTime::from_timestamp(data.claims.exp, 0).ok_or_else(|| {
        CoreError::MalformedToken(format!("exp {} is out of range", data.claims.exp))
    })
}

/// Classify an expiry against `now` with a `lookahead` window.
pub fn assess(expires_at: Timestamp, now: Timestamp, lookahead: chrono::Duration) -> TokenHealth {
    if expires_at <= now {
        TokenHealth::Expired
    } else if expires_at - now <= lookahead {
        TokenHealth::ExpiringSoon
    } else {
        TokenHealth::Valid
    }
}

/// Decode and classify in one step.
pub fn check(
    token: &str,
    now: Timestamp,
    lookahead: chrono::Duration,
) -> Result<TokenHealth, CoreError> {
    decode_expiry(token).map(|expires_at| assess(expires_at, now, lookahead))
}
