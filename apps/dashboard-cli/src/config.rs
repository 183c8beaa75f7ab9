//! Centralized configuration for the dashboard CLI.
//!
//! Environment variables (optionally from a `.env` file) are read and
//! validated once at startup so a bad value fails before any request is made.

use std::env;
use std::fmt;
use std::time::Duration;

use domain::analytics::DEFAULT_BAR_PADDING;
use http_common::default_short_url_base;

/// Log output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration error for {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Dashboard configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend origin, no trailing slash (default: http://localhost:5000)
    pub api_base: String,
    /// Bearer token; `None` means every backend call is refused locally
    pub token: Option<String>,
    /// Prefix for displayed short URLs
    pub short_url_base: String,
    /// Links per page (default: 5)
    pub page_size: usize,
    pub request_timeout: Duration,
    /// Padding added to the largest bucket when scaling bars
    pub bar_padding: u64,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        // API base
        let api_base = get("DASHBOARD_API_BASE")
            .unwrap_or_else(|| "http://localhost:5000".into())
            .trim_end_matches('/')
            .to_string();
        match url::Url::parse(&api_base) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => {}
            Ok(u) => {
                return Err(ConfigError {
                    field: "DASHBOARD_API_BASE",
                    message: format!("unsupported scheme '{}'", u.scheme()),
                })
            }
            Err(e) => {
                return Err(ConfigError {
                    field: "DASHBOARD_API_BASE",
                    message: format!("invalid URL '{}': {}", api_base, e),
                })
            }
        }

        let token = get("DASHBOARD_TOKEN");

        let short_url_base = get("SHORTLINK_BASE")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|| default_short_url_base(&api_base));

        let page_size = parse_number("PAGE_SIZE", get("PAGE_SIZE"), 5usize)?;
        if page_size == 0 {
            return Err(ConfigError {
                field: "PAGE_SIZE",
                message: "must be at least 1".into(),
            });
        }

        let timeout_secs = parse_number("REQUEST_TIMEOUT_SECS", get("REQUEST_TIMEOUT_SECS"), 30u64)?;
        let bar_padding = parse_number("BAR_PADDING", get("BAR_PADDING"), DEFAULT_BAR_PADDING)?;

        let log_format = LogFormat::from_str(&get("LOG_FORMAT").unwrap_or_else(|| "pretty".into()));

        Ok(Self {
            api_base,
            token,
            short_url_base,
            page_size,
            request_timeout: Duration::from_secs(timeout_secs),
            bar_padding,
            log_format,
        })
    }

    /// Log warnings about configuration that will make commands fail.
    pub fn warn_if_unusable(&self) {
        if self.token.is_none() {
            tracing::warn!("DASHBOARD_TOKEN not set: backend commands will be refused");
        }
        if self.api_base.starts_with("http://") && !self.api_base.contains("localhost") {
            tracing::warn!(api_base = %self.api_base, "sending bearer token over plain http");
        }
    }
}

fn parse_number<T: std::str::FromStr>(
    field: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(s) => s.parse().map_err(|e| ConfigError {
            field,
            message: format!("invalid number '{}': {}", s, e),
        }),
    }
}
