//! Domain library for the link dashboard.
//!
//! Holds the link/click data model, the backend port, the error taxonomy and
//! the two cores built on them: the stateful [`store::LinkCollectionStore`]
//! and the pure click aggregation in [`analytics`]. Network, token and
//! terminal concerns stay in the adapter and app crates.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Backend-assigned code identifying a short link.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ShortCode(String);

impl ShortCode {
    pub fn new<S: Into<String>>(s: S) -> Result<Self, ValidationError> {
        let val = s.into();
        if val.is_empty() {
            return Err(ValidationError::InvalidShortCode("empty".into()));
        }
        if !val
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ValidationError::InvalidShortCode(format!(
                "invalid characters in {val:?}"
            )));
        }
        Ok(Self(val))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Public short URL for this code under `base`.
    pub fn short_url(&self, base: &str) -> String {
        format!("{}/{}", base.trim_end_matches('/'), self.0)
    }
}

impl Display for ShortCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One visit as recorded server-side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RawClick {
    pub timestamp: DateTime<Utc>,
    pub ip: String,
    pub user_agent: Option<String>,
}

/// A shortened link in the user's collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Link {
    pub short_code: ShortCode,
    pub original_url: String,
    pub remark: String,
    pub expiration_date: Option<DateTime<Utc>>,
    /// Backend-maintained counter; may exceed `clicks.len()`.
    pub total_clicks: u64,
    /// Raw clicks in arrival order (not guaranteed sorted).
    pub clicks: Vec<RawClick>,
}

impl Link {
    pub fn new(
        short_code: ShortCode,
        original_url: impl Into<String>,
        remark: impl Into<String>,
    ) -> Self {
        Self {
            short_code,
            original_url: original_url.into(),
            remark: remark.into(),
            expiration_date: None,
            total_clicks: 0,
            clicks: Vec::new(),
        }
    }

    /// Millisecond key used for expiry ordering. "No Expiry" sorts as the epoch.
    pub fn expiry_sort_key(&self) -> i64 {
        self.expiration_date
            .map(|d| d.timestamp_millis())
            .unwrap_or(0)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration_date.is_some_and(|exp| now >= exp)
    }
}

/// Form-level input for creating or editing a link.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct LinkDraft {
    pub original_url: String,
    pub remark: String,
    pub expiration_enabled: bool,
    /// Ignored unless `expiration_enabled` is set.
    pub expiration_date: Option<DateTime<Utc>>,
}

impl LinkDraft {
    pub fn new(original_url: impl Into<String>, remark: impl Into<String>) -> Self {
        Self {
            original_url: original_url.into(),
            remark: remark.into(),
            expiration_enabled: false,
            expiration_date: None,
        }
    }

    pub fn with_expiration(mut self, at: DateTime<Utc>) -> Self {
        self.expiration_enabled = true;
        self.expiration_date = Some(at);
        self
    }

    /// Prefill an edit form from an existing link.
    pub fn from_link(link: &Link) -> Self {
        Self {
            original_url: link.original_url.clone(),
            remark: link.remark.clone(),
            expiration_enabled: link.expiration_date.is_some(),
            expiration_date: link.expiration_date,
        }
    }
}

/// Validated request body for create and update calls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LinkPayload {
    pub original_url: String,
    pub remark: String,
    pub expiration_date: Option<DateTime<Utc>>,
}

/// Aggregates reported by the backend stats endpoint, as received.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatsReport {
    pub total_clicks: u64,
    pub date_wise_clicks: Vec<(NaiveDate, u64)>,
    /// Device label as reported by the backend, with its count.
    pub device_types: Vec<(String, u64)>,
}

/// Time source abstraction to make code testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Backend port: the REST API that owns links and clicks.
///
/// Implementations must not touch the network when the session carries no
/// token; they return [`CoreError::Unauthenticated`] instead.
#[async_trait]
pub trait LinkBackend: Send + Sync {
    async fn fetch_links(&self, session: &Session) -> Result<Vec<Link>, CoreError>;
    async fn fetch_stats(&self, session: &Session) -> Result<StatsReport, CoreError>;
    async fn create_link(
        &self,
        session: &Session,
        payload: &LinkPayload,
    ) -> Result<Link, CoreError>;
    async fn update_link(
        &self,
        session: &Session,
        code: &ShortCode,
        payload: &LinkPayload,
    ) -> Result<Link, CoreError>;
    async fn delete_link(&self, session: &Session, code: &ShortCode) -> Result<(), CoreError>;
}

/// Input rejected before any network call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("destination url is required")]
    EmptyUrl,
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("remark is required")]
    EmptyRemark,
    #[error("invalid short code: {0}")]
    InvalidShortCode(String),
    #[error("page size must be at least 1")]
    ZeroPageSize,
}

/// Errors surfaced by the store and its backends. None is fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("link {0} is not in the local collection; refetch required")]
    Consistency(ShortCode),
    #[error("page {page} is out of range (total pages: {total_pages})")]
    PageOutOfRange { page: usize, total_pages: usize },
    #[error("not authenticated")]
    Unauthenticated,
    #[error("backend error: {0}")]
    Transport(String),
}

impl CoreError {
    pub fn transport(err: impl Display) -> Self {
        CoreError::Transport(err.to_string())
    }

    /// The local collection has diverged from the backend; refetch to recover.
    pub fn requires_refetch(&self) -> bool {
        matches!(self, CoreError::Consistency(_))
    }
}

pub mod adapters;
pub mod analytics;
pub mod base62;
pub mod page;
pub mod session;
pub mod sort;
pub mod store;
pub mod validate;

pub use analytics::{ClickEvent, DeviceClass};
pub use session::Session;
pub use sort::SortOrder;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn short_code_accepts_simple_values() {
        let c = ShortCode::new("abc123").expect("valid code");
        assert_eq!(c.as_str(), "abc123");
    }

    #[test]
    fn short_code_rejects_empty_and_paths() {
        assert!(matches!(
            ShortCode::new(""),
            Err(ValidationError::InvalidShortCode(_))
        ));
        assert!(ShortCode::new("a/b").is_err());
        assert!(ShortCode::new("a b").is_err());
    }

    #[test]
    fn short_url_joins_without_double_slash() {
        let c = ShortCode::new("xY9").unwrap();
        assert_eq!(
            c.short_url("http://localhost:5000/api/links/"),
            "http://localhost:5000/api/links/xY9"
        );
        assert_eq!(c.short_url("https://s.io"), "https://s.io/xY9");
    }

    #[test]
    fn missing_expiry_sorts_as_epoch() {
        let mut link = Link::new(ShortCode::new("a").unwrap(), "https://e.com", "r");
        assert_eq!(link.expiry_sort_key(), 0);
        link.expiration_date = Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        assert!(link.expiry_sort_key() > 0);
    }

    #[test]
    fn expired_from_the_expiry_instant() {
        let exp = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut link = Link::new(ShortCode::new("a").unwrap(), "https://e.com", "r");
        assert!(!link.is_expired(exp));
        link.expiration_date = Some(exp);
        assert!(!link.is_expired(exp - chrono::Duration::seconds(1)));
        assert!(link.is_expired(exp));
    }

    #[test]
    fn draft_prefill_enables_expiration_only_when_set() {
        let mut link = Link::new(ShortCode::new("a").unwrap(), "https://e.com", "r");
        assert!(!LinkDraft::from_link(&link).expiration_enabled);
        link.expiration_date = Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        let draft = LinkDraft::from_link(&link);
        assert!(draft.expiration_enabled);
        assert_eq!(draft.expiration_date, link.expiration_date);
    }

    #[test]
    fn only_consistency_errors_require_refetch() {
        let code = ShortCode::new("gone").unwrap();
        assert!(CoreError::Consistency(code).requires_refetch());
        assert!(!CoreError::Transport("boom".into()).requires_refetch());
        assert!(!CoreError::Unauthenticated.requires_refetch());
    }
}
