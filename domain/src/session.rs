//! Authenticated session context handed to the store at construction.

use chrono::{DateTime, Utc};
use std::fmt::{Debug, Formatter};

use crate::CoreError;

/// Bearer credential for one login. Torn down explicitly on logout.
#[derive(Clone, Default)]
pub struct Session {
    token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// A session for `token`. Blank tokens yield an unauthenticated session.
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            token: (!token.trim().is_empty()).then_some(token),
            expires_at: None,
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }

    /// Token to send as `Authorization: Bearer`; absent means "do not call".
    pub fn bearer(&self) -> Result<&str, CoreError> {
        self.token.as_deref().ok_or(CoreError::Unauthenticated)
    }

    /// Drop the credential.
    pub fn end(&mut self) {
        self.token = None;
        self.expires_at = None;
    }
}

impl Debug for Session {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
