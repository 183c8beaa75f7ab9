use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::analytics::{flatten, summarize};
use crate::base62::encode_padded;
use crate::{
    CoreError, Link, LinkBackend, LinkPayload, Session, ShortCode, StatsReport,
};

const CODE_WIDTH: usize = 6;

/// In-memory stand-in for the REST backend.
///
/// Counts the calls that would have reached the network and can be told to
/// fail the next one, which is what the store tests need.
pub struct InMemoryBackend {
    inner: Mutex<State>,
}

#[derive(Default)]
struct State {
    links: Vec<Link>,
    next_id: u64,
    calls: usize,
    fail_next: Option<String>,
    stats: Option<StatsReport>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::with_links(Vec::new())
    }

    pub fn with_links(links: Vec<Link>) -> Self {
        Self {
            inner: Mutex::new(State {
                next_id: links.len() as u64 + 1,
                links,
                ..State::default()
            }),
        }
    }

    /// Serve `report` from the stats endpoint instead of deriving it.
    pub fn with_stats(self, report: StatsReport) -> Self {
        if let Ok(mut st) = self.inner.lock() {
            st.stats = Some(report);
        }
        self
    }

    /// Make the next authenticated call fail with a transport error.
    pub fn fail_next(&self, message: impl Into<String>) {
        if let Ok(mut st) = self.inner.lock() {
            st.fail_next = Some(message.into());
        }
    }

    /// Number of authenticated calls received so far.
    pub fn call_count(&self) -> usize {
        self.inner.lock().map(|st| st.calls).unwrap_or(0)
    }

    /// Snapshot of the backend-side collection.
    pub fn stored_links(&self) -> Vec<Link> {
        self.inner
            .lock()
            .map(|st| st.links.clone())
            .unwrap_or_default()
    }

    fn begin(&self, session: &Session) -> Result<MutexGuard<'_, State>, CoreError> {
        session.bearer()?;
        let mut st = self
            .inner
            .lock()
            .map_err(|_| CoreError::Transport("mutex poisoned".into()))?;
        st.calls += 1;
        if let Some(msg) = st.fail_next.take() {
            return Err(CoreError::Transport(msg));
        }
        Ok(st)
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(code: &ShortCode) -> CoreError {
    CoreError::Transport(format!("404 Not Found: link {code}"))
}

#[async_trait]
impl LinkBackend for InMemoryBackend {
    async fn fetch_links(&self, session: &Session) -> Result<Vec<Link>, CoreError> {
        let st = self.begin(session)?;
        Ok(st.links.clone())
    }

    async fn fetch_stats(&self, session: &Session) -> Result<StatsReport, CoreError> {
        let st = self.begin(session)?;
        if let Some(report) = &st.stats {
            return Ok(report.clone());
        }
        let summary = summarize(&flatten(&st.links, ""));
        Ok(StatsReport {
            total_clicks: st.links.iter().map(|l| l.total_clicks).sum(),
            date_wise_clicks: summary
                .clicks_by_date
                .iter()
                .map(|b| (b.date, b.count))
                .collect(),
            device_types: summary
                .clicks_by_device
                .iter()
                .map(|b| (b.device.as_str().to_string(), b.count))
                .collect(),
        })
    }

    async fn create_link(
        &self,
        session: &Session,
        payload: &LinkPayload,
    ) -> Result<Link, CoreError> {
        let mut st = self.begin(session)?;
        let code = ShortCode::new(encode_padded(st.next_id, CODE_WIDTH))?;
        st.next_id += 1;
        let mut link = Link::new(code, payload.original_url.clone(), payload.remark.clone());
        link.expiration_date = payload.expiration_date;
        st.links.push(link.clone());
        Ok(link)
    }

    async fn update_link(
        &self,
        session: &Session,
        code: &ShortCode,
        payload: &LinkPayload,
    ) -> Result<Link, CoreError> {
        let mut st = self.begin(session)?;
        let link = st
            .links
            .iter_mut()
            .find(|l| &l.short_code == code)
            .ok_or_else(|| not_found(code))?;
        link.original_url = payload.original_url.clone();
        link.remark = payload.remark.clone();
        link.expiration_date = payload.expiration_date;
        Ok(link.clone())
    }

    async fn delete_link(&self, session: &Session, code: &ShortCode) -> Result<(), CoreError> {
        let mut st = self.begin(session)?;
        let before = st.links.len();
        st.links.retain(|l| &l.short_code != code);
        if st.links.len() == before {
            return Err(not_found(code));
        }
        Ok(())
    }
}
