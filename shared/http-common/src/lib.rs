//! Shared HTTP utilities for the link dashboard workspace.
//!
//! Endpoint URL building, timestamp parsing/formatting and structured error
//! bodies used by the http-backend adapter and the dashboard CLI.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

// ============================================================================
// JSON Error Bodies
// ============================================================================

/// Create a structured error JSON with a custom message.
///
/// Returns: `{"error": {"code": "<code>", "message": "<message>"}}`
pub fn json_error_with_message(code: &str, message: &str) -> serde_json::Value {
    serde_json::json!({"error": {"code": code, "message": message}})
}

// ============================================================================
// Endpoint URLs
// ============================================================================

fn api_root(base: &str) -> String {
    format!("{}/api/links", base.trim_end_matches('/'))
}

/// `GET`/`POST {base}/api/links`.
pub fn links_endpoint(base: &str) -> String {
    api_root(base)
}

/// `GET {base}/api/links/stats`.
pub fn stats_endpoint(base: &str) -> String {
    format!("{}/stats", api_root(base))
}

/// `PUT`/`DELETE {base}/api/links/short/{code}`, with the code percent-encoded.
pub fn link_endpoint(base: &str, code: &str) -> String {
    format!("{}/short/{}", api_root(base), urlencoding::encode(code))
}

/// Prefix under which the backend serves short-link redirects.
pub fn default_short_url_base(base: &str) -> String {
    api_root(base)
}

// ============================================================================
// Time Utilities
// ============================================================================

/// Format a timestamp as RFC3339 (seconds precision, UTC).
pub fn format_timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Expiry column text: the timestamp, or "No Expiry".
pub fn format_expiry(t: Option<DateTime<Utc>>) -> String {
    match t {
        Some(t) => t.format("%Y-%m-%d %H:%M").to_string(),
        None => "No Expiry".to_string(),
    }
}

/// Parse a timestamp as RFC3339, or as a zone-less `YYYY-MM-DDTHH:MM[:SS]`
/// (an HTML datetime-local value) taken as UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let s = s.trim();
    match DateTime::parse_from_rfc3339(s) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(rfc_err) => ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .map(|naive| naive.and_utc())
            .ok_or(rfc_err),
    }
}
