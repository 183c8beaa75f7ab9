//! JSON shapes exchanged with the links API and their domain conversions.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use domain::{Link, LinkPayload, RawClick, ShortCode, StatsReport};
use http_common::{format_timestamp, parse_timestamp};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::HttpError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireLink {
    pub original_url: String,
    /// The short code. Some deployments send the full short URL instead.
    pub short_url: String,
    #[serde(default)]
    pub remark: Option<String>,
    #[serde(default)]
    pub expiration_date: Option<String>,
    #[serde(default)]
    pub clicks: Option<Vec<WireClick>>,
    #[serde(default)]
    pub total_clicks: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireClick {
    pub timestamp: String,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireStats {
    #[serde(default)]
    pub total_clicks: u64,
    #[serde(default)]
    pub date_wise_clicks: Vec<WireDateClicks>,
    #[serde(default)]
    pub device_types: BTreeMap<String, u64>,
}

#[derive(Debug, Deserialize)]
pub struct WireDateClicks {
    pub date: String,
    pub clicks: u64,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WirePayload {
    pub original_url: String,
    pub remark: String,
    /// Always present; `null` clears the expiry.
    pub expiration_date: Option<String>,
}

impl From<&LinkPayload> for WirePayload {
    fn from(p: &LinkPayload) -> Self {
        Self {
            original_url: p.original_url.clone(),
            remark: p.remark.clone(),
            expiration_date: p.expiration_date.map(format_timestamp),
        }
    }
}

fn short_code_of(raw: &str) -> Result<ShortCode, HttpError> {
    let code = raw.trim_end_matches('/').rsplit('/').next().unwrap_or(raw);
    ShortCode::new(code).map_err(|e| HttpError::Decode(e.to_string()))
}

impl TryFrom<WireLink> for Link {
    type Error = HttpError;

    fn try_from(w: WireLink) -> Result<Self, Self::Error> {
        let short_code = short_code_of(&w.short_url)?;
        let expiration_date = match w.expiration_date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(s) => Some(parse_timestamp(s).map_err(|e| {
                HttpError::Decode(format!("expirationDate {s:?} of {short_code}: {e}"))
            })?),
        };
        let clicks = w
            .clicks
            .unwrap_or_default()
            .into_iter()
            .filter_map(|c| match parse_timestamp(&c.timestamp) {
                Ok(timestamp) => Some(RawClick {
                    timestamp,
                    ip: c.ip.unwrap_or_default(),
                    user_agent: c.user_agent,
                }),
                Err(e) => {
                    warn!(code = %short_code, timestamp = %c.timestamp, error = %e, "skipping click with bad timestamp");
                    None
                }
            })
            .collect();
        Ok(Link {
            short_code,
            original_url: w.original_url,
            remark: w.remark.unwrap_or_default(),
            expiration_date,
            total_clicks: w.total_clicks.unwrap_or(0),
            clicks,
        })
    }
}

fn parse_bucket_date(s: &str) -> Result<NaiveDate, HttpError> {
    s.get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .or_else(|| parse_timestamp(s).ok().map(|t| t.date_naive()))
        .ok_or_else(|| HttpError::Decode(format!("unrecognised stats date {s:?}")))
}

impl TryFrom<WireStats> for StatsReport {
    type Error = HttpError;

    fn try_from(w: WireStats) -> Result<Self, Self::Error> {
        let date_wise_clicks = w
            .date_wise_clicks
            .into_iter()
            .map(|d| Ok((parse_bucket_date(&d.date)?, d.clicks)))
            .collect::<Result<Vec<_>, HttpError>>()?;
        Ok(StatsReport {
            total_clicks: w.total_clicks,
            date_wise_clicks,
            device_types: w.device_types.into_iter().collect(),
        })
    }
}
