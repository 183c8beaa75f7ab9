//! session-token: client-side inspection of the dashboard's bearer token.
//!
//! Purpose
//! - Decide whether a stored token is still worth sending: decode the JWT
//!   payload, read `exp`, and compare it with the current time.
//! - Build a `domain::Session` from a token that passes that check.
//!
//! API
//! - `inspect(token, now)` → `Result<SessionStatus, TokenError>`
//! - `open_session(token, now)` → `Result<Session, TokenError>`
//!
//! Notes
//! - The signature is NOT verified. The client holds no key; the backend
//!   verifies every request. This check only avoids calls that would fail.
//! - Tokens without `exp` are treated as non-expiring.

use base64::Engine;
use chrono::{DateTime, Utc};
use domain::Session;
use serde::Deserialize;
use tracing::trace;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("missing or malformed token")]
    Malformed,
    #[error("invalid token payload: {0}")]
    InvalidPayload(&'static str),
    #[error("token expired at {0}")]
    Expired(DateTime<Utc>),
}

/// Outcome of inspecting a well-formed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Valid { expires_at: Option<DateTime<Utc>> },
    Expired { expired_at: DateTime<Utc> },
}

impl SessionStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, SessionStatus::Valid { .. })
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    exp: Option<i64>,
}

/// Decode the payload segment of `token` and check its expiry against `now`.
pub fn inspect(token: &str, now: DateTime<Utc>) -> Result<SessionStatus, TokenError> {
    let token = token.trim();
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 || parts[1].is_empty() {
        return Err(TokenError::Malformed);
    }
    let payload_bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('=').as_bytes())
        .map_err(|_| TokenError::Malformed)?;
    let claims: Claims =
        serde_json::from_slice(&payload_bytes).map_err(|_| TokenError::InvalidPayload("json"))?;

    let Some(exp) = claims.exp else {
        trace!("session-token: no exp claim, treating as non-expiring");
        return Ok(SessionStatus::Valid { expires_at: None });
    };
    let expires_at =
        DateTime::<Utc>::from_timestamp(exp, 0).ok_or(TokenError::InvalidPayload("exp"))?;
    // Still valid at the exact expiry instant.
    if expires_at < now {
        return Ok(SessionStatus::Expired {
            expired_at: expires_at,
        });
    }
    Ok(SessionStatus::Valid {
        expires_at: Some(expires_at),
    })
}

/// Build a session from `token`, refusing expired or malformed ones.
pub fn open_session(token: &str, now: DateTime<Utc>) -> Result<Session, TokenError> {
    match inspect(token, now)? {
        SessionStatus::Valid { expires_at } => {
            let session = Session::new(token.trim());
            Ok(match expires_at {
                Some(at) => session.with_expiry(at),
                None => session,
            })
        }
        SessionStatus::Expired { expired_at } => Err(TokenError::Expired(expired_at)),
    }
}
