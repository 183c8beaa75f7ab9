//! Click analytics: device classification, flattening of per-link click
//! lists, timestamp sorting, and date/device summaries.
//!
//! Everything here is pure and deterministic; inputs are never mutated.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::sort::{sort_stable_by_key, SortOrder, SortToggle};
use crate::{Link, ShortCode, StatsReport};

/// Padding added to each bucket before taking the scale maximum, so the top
/// bucket never fills its bar.
pub const DEFAULT_BAR_PADDING: u64 = 50;

/// Coarse device category derived from a user-agent string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum DeviceClass {
    Mobile,
    Tablet,
    Desktop,
    Android,
    #[serde(rename = "iOS")]
    Ios,
    Unknown,
}

impl DeviceClass {
    /// Display and summary order.
    pub const CANONICAL_ORDER: [DeviceClass; 6] = [
        DeviceClass::Mobile,
        DeviceClass::Tablet,
        DeviceClass::Desktop,
        DeviceClass::Android,
        DeviceClass::Ios,
        DeviceClass::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Mobile => "Mobile",
            DeviceClass::Tablet => "Tablet",
            DeviceClass::Desktop => "Desktop",
            DeviceClass::Android => "Android",
            DeviceClass::Ios => "iOS",
            DeviceClass::Unknown => "Unknown",
        }
    }

    /// Classify a raw user agent. Rules are checked in order and the first
    /// match wins, so an Android phone reporting "Mobile" is `Mobile`.
    pub fn classify(user_agent: Option<&str>) -> Self {
        let Some(ua) = user_agent.filter(|s| !s.is_empty()) else {
            return DeviceClass::Unknown;
        };
        let ua = ua.to_lowercase();
        if ua.contains("mobile") {
            DeviceClass::Mobile
        } else if ua.contains("tablet") {
            DeviceClass::Tablet
        } else if ua.contains("windows") || ua.contains("macintosh") {
            DeviceClass::Desktop
        } else if ua.contains("android") {
            DeviceClass::Android
        } else if ua.contains("iphone") {
            DeviceClass::Ios
        } else {
            DeviceClass::Unknown
        }
    }

    /// Map a device label from the stats endpoint onto a class, if it names one.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "mobile" => Some(DeviceClass::Mobile),
            "tablet" => Some(DeviceClass::Tablet),
            "desktop" => Some(DeviceClass::Desktop),
            "android" => Some(DeviceClass::Android),
            "ios" | "iphone" => Some(DeviceClass::Ios),
            "unknown" => Some(DeviceClass::Unknown),
            _ => None,
        }
    }

    fn canonical_index(self) -> usize {
        match self {
            DeviceClass::Mobile => 0,
            DeviceClass::Tablet => 1,
            DeviceClass::Desktop => 2,
            DeviceClass::Android => 3,
            DeviceClass::Ios => 4,
            DeviceClass::Unknown => 5,
        }
    }
}

pub fn classify_device(user_agent: Option<&str>) -> DeviceClass {
    DeviceClass::classify(user_agent)
}

/// One click, denormalized with its parent link for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClickEvent {
    pub short_code: ShortCode,
    pub timestamp: DateTime<Utc>,
    pub ip: String,
    pub user_agent_raw: Option<String>,
    pub device: DeviceClass,
    pub original_url: String,
    pub short_url: String,
}

/// Expand every link's clicks into events, in link order then click order.
pub fn flatten(links: &[Link], short_url_base: &str) -> Vec<ClickEvent> {
    links
        .iter()
        .flat_map(|link| {
            let short_url = link.short_code.short_url(short_url_base);
            link.clicks.iter().map(move |click| ClickEvent {
                short_code: link.short_code.clone(),
                timestamp: click.timestamp,
                ip: click.ip.clone(),
                user_agent_raw: click.user_agent.clone(),
                device: DeviceClass::classify(click.user_agent.as_deref()),
                original_url: link.original_url.clone(),
                short_url: short_url.clone(),
            })
        })
        .collect()
}

/// Stable copy of `events` ordered by timestamp.
pub fn sort_by_timestamp(events: &[ClickEvent], order: SortOrder) -> Vec<ClickEvent> {
    let mut sorted = events.to_vec();
    sort_stable_by_key(&mut sorted, order, |e| e.timestamp);
    sorted
}

/// The analytics table: flattened events plus the timestamp column toggle.
#[derive(Clone, Debug, Default)]
pub struct ClickTable {
    events: Vec<ClickEvent>,
    sort: SortToggle,
}

impl ClickTable {
    pub fn new(events: Vec<ClickEvent>) -> Self {
        Self {
            events,
            sort: SortToggle::new(),
        }
    }

    pub fn events(&self) -> &[ClickEvent] {
        &self.events
    }

    /// Order the next toggle will apply.
    pub fn next_order(&self) -> SortOrder {
        self.sort.next()
    }

    /// Reorder the table by timestamp and flip the direction for next time.
    pub fn toggle_sort(&mut self) -> SortOrder {
        let order = self.sort.advance();
        sort_stable_by_key(&mut self.events, order, |e| e.timestamp);
        order
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DateBucket {
    pub date: NaiveDate,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeviceBucket {
    pub device: DeviceClass,
    pub count: u64,
}

/// A backend device label outside the known classes, kept as sent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LabelBucket {
    pub label: String,
    pub count: u64,
}

/// Totals view. Dates ascend; devices follow [`DeviceClass::CANONICAL_ORDER`]
/// with empty buckets omitted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AnalyticsSummary {
    pub total_clicks: u64,
    pub clicks_by_date: Vec<DateBucket>,
    pub clicks_by_device: Vec<DeviceBucket>,
    /// Stats-endpoint labels no class matched, by label. Always empty for
    /// summaries computed from raw clicks.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub other_devices: Vec<LabelBucket>,
}

impl AnalyticsSummary {
    /// Build the summary from the backend aggregate endpoint. Its totals are
    /// authoritative and are not recomputed from buckets.
    pub fn from_report(report: &StatsReport) -> Self {
        let mut by_date: BTreeMap<NaiveDate, u64> = BTreeMap::new();
        for (date, count) in &report.date_wise_clicks {
            *by_date.entry(*date).or_default() += count;
        }
        let mut by_device = [0u64; 6];
        let mut other: BTreeMap<&str, u64> = BTreeMap::new();
        for (label, count) in &report.device_types {
            match DeviceClass::from_label(label) {
                Some(device) => by_device[device.canonical_index()] += count,
                None => *other.entry(label.trim()).or_default() += count,
            }
        }
        Self {
            total_clicks: report.total_clicks,
            clicks_by_date: date_buckets(by_date),
            clicks_by_device: device_buckets(by_device),
            other_devices: other
                .into_iter()
                .filter(|(_, count)| *count > 0)
                .map(|(label, count)| LabelBucket {
                    label: label.to_string(),
                    count,
                })
                .collect(),
        }
    }

    /// Scale maximum for the date bars.
    pub fn date_scale(&self, padding: u64) -> u64 {
        padded_max(self.clicks_by_date.iter().map(|b| b.count), padding)
    }

    /// Scale maximum for the device bars, unmatched labels included.
    pub fn device_scale(&self, padding: u64) -> u64 {
        let counts = self.clicks_by_device.iter().map(|b| b.count);
        padded_max(counts.chain(self.other_devices.iter().map(|b| b.count)), padding)
    }
}

/// Count `events` by UTC calendar date and by device class.
pub fn summarize(events: &[ClickEvent]) -> AnalyticsSummary {
    let mut by_date: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    let mut by_device = [0u64; 6];
    for event in events {
        *by_date.entry(event.timestamp.date_naive()).or_default() += 1;
        by_device[event.device.canonical_index()] += 1;
    }
    AnalyticsSummary {
        total_clicks: events.len() as u64,
        clicks_by_date: date_buckets(by_date),
        clicks_by_device: device_buckets(by_device),
        other_devices: Vec::new(),
    }
}

fn date_buckets(by_date: BTreeMap<NaiveDate, u64>) -> Vec<DateBucket> {
    by_date
        .into_iter()
        .map(|(date, count)| DateBucket { date, count })
        .collect()
}

fn device_buckets(by_device: [u64; 6]) -> Vec<DeviceBucket> {
    DeviceClass::CANONICAL_ORDER
        .iter()
        .zip(by_device)
        .filter(|(_, count)| *count > 0)
        .map(|(device, count)| DeviceBucket {
            device: *device,
            count,
        })
        .collect()
}

/// Largest `count + padding` over `counts`, or 0 when there are none.
pub fn padded_max(counts: impl IntoIterator<Item = u64>, padding: u64) -> u64 {
    counts
        .into_iter()
        .map(|c| c.saturating_add(padding))
        .max()
        .unwrap_or(0)
}

/// Fraction of the bar to fill, `count / max`; zero when `max` is zero.
pub fn bar_width(count: u64, max: u64) -> f64 {
    if max == 0 {
        return 0.0;
    }
    count as f64 / max as f64
}
