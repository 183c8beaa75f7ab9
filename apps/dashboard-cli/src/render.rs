//! Plain-text rendering of link pages, click tables and analytics bars.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use domain::analytics::{bar_width, AnalyticsSummary};
use domain::page::Page;
use domain::{ClickEvent, Link, SortOrder};
use http_common::{format_expiry, format_timestamp};

/// Width of a full bar, in characters.
pub const BAR_CELLS: usize = 40;

/// Header label, with the sort arrow when the column is sorted.
fn header(label: &str, sort: Option<SortOrder>) -> String {
    match sort {
        Some(order) => format!("{} {}", label, order.arrow()),
        None => label.to_string(),
    }
}

pub fn links_page(
    page: &Page<Link>,
    short_url_base: &str,
    sort: Option<SortOrder>,
    now: DateTime<Utc>,
) -> String {
    let mut out = String::new();
    if page.items.is_empty() {
        out.push_str("No links.\n");
        return out;
    }
    let _ = writeln!(
        out,
        "{:<10} {:<18} {:>6}  {:<20} {}",
        "CODE",
        header("EXPIRES", sort),
        "CLICKS",
        "REMARK",
        "URL"
    );
    for link in &page.items {
        let expiry = if link.is_expired(now) {
            format!("{} (expired)", format_expiry(link.expiration_date))
        } else {
            format_expiry(link.expiration_date)
        };
        let _ = writeln!(
            out,
            "{:<10} {:<18} {:>6}  {:<20} {}",
            link.short_code.as_str(),
            expiry,
            link.total_clicks,
            truncate(&link.remark, 20),
            link.original_url,
        );
        let _ = writeln!(out, "{:<10} -> {}", "", link.short_code.short_url(short_url_base));
    }
    let _ = writeln!(out, "page {} of {}", page.page, page.total_pages);
    out
}

pub fn link_detail(link: &Link, short_url_base: &str) -> String {
    format!(
        "code:      {}\nshort url: {}\nurl:       {}\nremark:    {}\nexpires:   {}\nclicks:    {}\n",
        link.short_code,
        link.short_code.short_url(short_url_base),
        link.original_url,
        link.remark,
        format_expiry(link.expiration_date),
        link.total_clicks,
    )
}

pub fn clicks_table(events: &[ClickEvent], sort: Option<SortOrder>) -> String {
    let mut out = String::new();
    if events.is_empty() {
        out.push_str("No clicks.\n");
        return out;
    }
    let _ = writeln!(
        out,
        "{:<21} {:<10} {:<8} {:<16} {}",
        header("TIME", sort),
        "CODE",
        "DEVICE",
        "IP",
        "SHORT URL"
    );
    for e in events {
        let _ = writeln!(
            out,
            "{:<21} {:<10} {:<8} {:<16} {}",
            format_timestamp(e.timestamp),
            e.short_code.as_str(),
            e.device.as_str(),
            e.ip,
            e.short_url,
        );
    }
    out
}

/// `count / max` of [`BAR_CELLS`], rounded to whole cells.
pub fn bar(count: u64, max: u64) -> String {
    let cells = (bar_width(count, max) * BAR_CELLS as f64).round() as usize;
    "#".repeat(cells.min(BAR_CELLS))
}

pub fn summary(summary: &AnalyticsSummary, padding: u64) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Total clicks: {}", summary.total_clicks);

    out.push_str("\nClicks by date\n");
    if summary.clicks_by_date.is_empty() {
        out.push_str("  (none)\n");
    }
    let scale = summary.date_scale(padding);
    for b in &summary.clicks_by_date {
        let _ = writeln!(out, "  {}  {:>6} {}", b.date, b.count, bar(b.count, scale));
    }

    out.push_str("\nClicks by device\n");
    if summary.clicks_by_device.is_empty() && summary.other_devices.is_empty() {
        out.push_str("  (none)\n");
    }
    let scale = summary.device_scale(padding);
    for b in &summary.clicks_by_device {
        let _ = writeln!(
            out,
            "  {:<10} {:>6} {}",
            b.device.as_str(),
            b.count,
            bar(b.count, scale)
        );
    }
    for b in &summary.other_devices {
        let _ = writeln!(out, "  {:<10} {:>6} {}", b.label, b.count, bar(b.count, scale));
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut t: String = s.chars().take(max.saturating_sub(1)).collect();
    t.push('…');
    t
}
