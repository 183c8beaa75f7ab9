use tracing::{debug, info, warn};

use crate::analytics::{flatten, AnalyticsSummary, ClickEvent};
use crate::page::{paginate, Page};
use crate::sort::{sort_stable_by_key, SortOrder, SortToggle};
use crate::validate::validate_draft;
use crate::{CoreError, Link, LinkBackend, LinkDraft, Session, ShortCode};

/// Authoritative local copy of the signed-in user's links.
///
/// Every mutation goes to the backend first and patches local state only
/// after the call succeeds, so a failed call leaves the collection exactly as
/// it was. A full refetch happens only through [`refresh`](Self::refresh),
/// which is also the recovery for [`CoreError::Consistency`].
///
/// Mutating operations take `&mut self`, so one store cannot run two of them
/// at once. Nothing deduplicates repeated submits; callers disable their
/// triggers while a call is in flight.
pub struct LinkCollectionStore<B: LinkBackend> {
    backend: B,
    session: Session,
    links: Vec<Link>,
    sort: SortToggle,
}

impl<B: LinkBackend> LinkCollectionStore<B> {
    /// Start an empty store for `session`. Call [`refresh`](Self::refresh) to load.
    pub fn new(backend: B, session: Session) -> Self {
        Self {
            backend,
            session,
            links: Vec::new(),
            sort: SortToggle::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Links in stored order.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn get(&self, code: &ShortCode) -> Option<&Link> {
        self.links.iter().find(|l| &l.short_code == code)
    }

    fn position(&self, code: &ShortCode) -> Option<usize> {
        self.links.iter().position(|l| &l.short_code == code)
    }

    fn ensure_session(&self) -> Result<(), CoreError> {
        self.session.bearer().map(|_| ())
    }

    /// Replace the collection with the backend's. Returns the number of links.
    pub async fn refresh(&mut self) -> Result<usize, CoreError> {
        self.ensure_session()?;
        let fetched = self.backend.fetch_links(&self.session).await?;
        let mut links: Vec<Link> = Vec::with_capacity(fetched.len());
        for link in fetched {
            if links.iter().any(|l| l.short_code == link.short_code) {
                warn!(code = %link.short_code, "backend returned duplicate short code; keeping first");
                continue;
            }
            links.push(link);
        }
        self.links = links;
        debug!(count = self.links.len(), "link collection refreshed");
        Ok(self.links.len())
    }

    /// Sorted copy by expiration date; stored order is untouched.
    pub fn list(&self, order: SortOrder) -> Vec<Link> {
        let mut sorted = self.links.clone();
        sort_stable_by_key(&mut sorted, order, Link::expiry_sort_key);
        sorted
    }

    /// Order the next [`toggle_sort`](Self::toggle_sort) will apply.
    pub fn next_sort_order(&self) -> SortOrder {
        self.sort.next()
    }

    /// Reorder the stored collection by expiration date using the current
    /// direction, then flip the direction for the next call.
    pub fn toggle_sort(&mut self) -> SortOrder {
        let order = self.sort.advance();
        sort_stable_by_key(&mut self.links, order, Link::expiry_sort_key);
        order
    }

    /// Links whose remark contains `query`, case-insensitively, in stored
    /// order. A blank query matches everything.
    pub fn search(&self, query: &str) -> Vec<Link> {
        let q = query.trim().to_lowercase();
        self.links
            .iter()
            .filter(|l| q.is_empty() || l.remark.to_lowercase().contains(&q))
            .cloned()
            .collect()
    }

    /// Page `page` of the stored order.
    pub fn page(&self, page: usize, page_size: usize) -> Result<Page<Link>, CoreError> {
        paginate(&self.links, page, page_size)
    }

    /// Validate `draft`, create it remotely and append the result.
    pub async fn create(&mut self, draft: &LinkDraft) -> Result<Link, CoreError> {
        let payload = validate_draft(draft)?;
        self.ensure_session()?;
        let created = self.backend.create_link(&self.session, &payload).await?;
        match self.position(&created.short_code) {
            Some(idx) => {
                warn!(code = %created.short_code, "created link already present locally; replacing");
                self.links[idx] = created.clone();
            }
            None => self.links.push(created.clone()),
        }
        debug!(code = %created.short_code, "link created");
        Ok(created)
    }

    /// Validate `draft` and apply it to the link `code`, replacing it in place.
    ///
    /// A code missing from the local collection means the view is stale: the
    /// call fails with [`CoreError::Consistency`] before reaching the backend.
    pub async fn update(&mut self, code: &ShortCode, draft: &LinkDraft) -> Result<Link, CoreError> {
        let payload = validate_draft(draft)?;
        self.ensure_session()?;
        if self.position(code).is_none() {
            warn!(%code, "update target missing from local collection");
            return Err(CoreError::Consistency(code.clone()));
        }
        let mut updated = self.backend.update_link(&self.session, code, &payload).await?;
        // Re-resolve after the await; the index is only trusted once the call has succeeded.
        let idx = self
            .position(code)
            .ok_or_else(|| CoreError::Consistency(code.clone()))?;
        if updated.clicks.is_empty() {
            // Edits never touch clicks; keep what we already have when the
            // response leaves them out.
            updated.clicks = std::mem::take(&mut self.links[idx].clicks);
        }
        self.links[idx] = updated.clone();
        debug!(%code, "link updated");
        Ok(updated)
    }

    /// Delete `code` remotely and drop it locally. Unknown codes are a no-op.
    pub async fn remove(&mut self, code: &ShortCode) -> Result<(), CoreError> {
        self.ensure_session()?;
        if self.position(code).is_none() {
            debug!(%code, "remove of unknown link ignored");
            return Ok(());
        }
        self.backend.delete_link(&self.session, code).await?;
        self.links.retain(|l| &l.short_code != code);
        debug!(%code, "link removed");
        Ok(())
    }

    /// Totals from the backend aggregate endpoint.
    pub async fn fetch_summary(&self) -> Result<AnalyticsSummary, CoreError> {
        self.ensure_session()?;
        let report = self.backend.fetch_stats(&self.session).await?;
        Ok(AnalyticsSummary::from_report(&report))
    }

    /// Flattened click events of the current collection.
    pub fn click_events(&self, short_url_base: &str) -> Vec<ClickEvent> {
        flatten(&self.links, short_url_base)
    }

    /// Tear down the session: forget the token and the collection.
    pub fn logout(&mut self) {
        self.session.end();
        self.links.clear();
        self.sort = SortToggle::new();
        info!("session ended; link collection discarded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_backend::InMemoryBackend;
    use crate::{RawClick, ValidationError};
    use chrono::{DateTime, TimeZone, Utc};

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn seeded(code: &str, remark: &str, expiry: Option<DateTime<Utc>>) -> Link {
        let mut l = Link::new(
            ShortCode::new(code).unwrap(),
            format!("https://example.com/{code}"),
            remark,
        );
        l.expiration_date = expiry;
        l
    }

    async fn store_with(links: Vec<Link>) -> LinkCollectionStore<InMemoryBackend> {
        let mut store =
            LinkCollectionStore::new(InMemoryBackend::with_links(links), Session::new("tok"));
        store.refresh().await.unwrap();
        store
    }

    fn codes(links: &[Link]) -> Vec<&str> {
        links.iter().map(|l| l.short_code.as_str()).collect()
    }

    #[tokio::test]
    async fn refresh_loads_backend_links() {
        let store = store_with(vec![seeded("a", "one", None), seeded("b", "two", None)]).await;
        assert_eq!(store.len(), 2);
        assert_eq!(codes(store.links()), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn refresh_drops_duplicate_codes() {
        let store = store_with(vec![seeded("a", "one", None), seeded("a", "dup", None)]).await;
        assert_eq!(store.len(), 1);
        assert_eq!(store.links()[0].remark, "one");
    }

    #[tokio::test]
    async fn list_sorts_missing_expiry_first_without_mutating() {
        let store = store_with(vec![
            seeded("late", "r", Some(at(2031, 1, 1))),
            seeded("never", "r", None),
            seeded("soon", "r", Some(at(2030, 1, 1))),
        ])
        .await;
        assert_eq!(codes(&store.list(SortOrder::Asc)), vec!["never", "soon", "late"]);
        assert_eq!(codes(&store.list(SortOrder::Desc)), vec!["late", "soon", "never"]);
        assert_eq!(codes(store.links()), vec!["late", "never", "soon"]);
    }

    #[tokio::test]
    async fn toggle_sort_reorders_and_flips() {
        let mut store = store_with(vec![
            seeded("late", "r", Some(at(2031, 1, 1))),
            seeded("never", "r", None),
            seeded("soon", "r", Some(at(2030, 1, 1))),
        ])
        .await;
        assert_eq!(store.toggle_sort(), SortOrder::Asc);
        assert_eq!(codes(store.links()), vec!["never", "soon", "late"]);
        assert_eq!(store.toggle_sort(), SortOrder::Desc);
        assert_eq!(codes(store.links()), vec!["late", "soon", "never"]);
        assert_eq!(store.next_sort_order(), SortOrder::Asc);
    }

    #[tokio::test]
    async fn search_matches_remark_case_insensitively() {
        let store = store_with(vec![
            seeded("a", "Spring Campaign", None),
            seeded("b", "newsletter", None),
        ])
        .await;
        assert_eq!(codes(&store.search("campaign")), vec!["a"]);
        assert_eq!(store.search("  ").len(), 2);
        assert!(store.search("zzz").is_empty());
    }

    #[tokio::test]
    async fn page_uses_stored_order() {
        let links = (0..7).map(|i| seeded(&format!("c{i}"), "r", None)).collect();
        let store = store_with(links).await;
        let p = store.page(2, 5).unwrap();
        assert_eq!(codes(&p.items), vec!["c5", "c6"]);
        assert_eq!(p.total_pages, 2);
        assert!(matches!(
            store.page(3, 5),
            Err(CoreError::PageOutOfRange { page: 3, total_pages: 2 })
        ));
    }

    #[tokio::test]
    async fn create_appends_backend_result() {
        let mut store = store_with(vec![seeded("a", "r", None)]).await;
        let created = store
            .create(&LinkDraft::new("https://rust-lang.org", "docs"))
            .await
            .unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.links()[1], created);
        assert_eq!(created.remark, "docs");
    }

    #[tokio::test]
    async fn invalid_drafts_never_reach_backend() {
        let mut store = store_with(vec![seeded("a", "r", None)]).await;
        let calls = store.backend().call_count();
        for bad in ["not a url", "example.com/path", "", "//host/path"] {
            let err = store.create(&LinkDraft::new(bad, "remark")).await.unwrap_err();
            assert!(matches!(err, CoreError::Validation(_)), "{bad:?} accepted");
            let code = ShortCode::new("a").unwrap();
            let err = store.update(&code, &LinkDraft::new(bad, "remark")).await.unwrap_err();
            assert!(matches!(err, CoreError::Validation(_)), "{bad:?} accepted");
        }
        let err = store
            .create(&LinkDraft::new("https://ok.example", ""))
            .await
            .unwrap_err();
        assert_eq!(err, CoreError::Validation(ValidationError::EmptyRemark));
        assert_eq!(store.backend().call_count(), calls);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn create_with_disabled_expiration_sends_null() {
        let mut store = store_with(vec![]).await;
        let mut draft = LinkDraft::new("https://e.com", "r").with_expiration(at(2030, 1, 1));
        draft.expiration_enabled = false;
        let created = store.create(&draft).await.unwrap();
        assert_eq!(created.expiration_date, None);
    }

    #[tokio::test]
    async fn update_replaces_in_place_and_keeps_clicks() {
        let mut first = seeded("a", "old", None);
        first.clicks.push(RawClick {
            timestamp: at(2025, 1, 1),
            ip: "1.1.1.1".into(),
            user_agent: None,
        });
        let mut store = store_with(vec![first, seeded("b", "r", None)]).await;
        let code = ShortCode::new("a").unwrap();
        let updated = store
            .update(
                &code,
                &LinkDraft::new("https://new.example", "new").with_expiration(at(2030, 1, 1)),
            )
            .await
            .unwrap();
        assert_eq!(updated.remark, "new");
        assert_eq!(codes(store.links()), vec!["a", "b"]);
        assert_eq!(store.links()[0].original_url, "https://new.example");
        assert_eq!(store.links()[0].expiration_date, Some(at(2030, 1, 1)));
        assert_eq!(store.links()[0].clicks.len(), 1);
    }

    #[tokio::test]
    async fn update_of_unknown_code_is_a_consistency_error() {
        let mut store = store_with(vec![seeded("a", "r", None)]).await;
        let before = store.links().to_vec();
        let calls = store.backend().call_count();
        let ghost = ShortCode::new("ghost").unwrap();
        let err = store
            .update(&ghost, &LinkDraft::new("https://e.com", "r"))
            .await
            .unwrap_err();
        assert_eq!(err, CoreError::Consistency(ghost));
        assert!(err.requires_refetch());
        assert_eq!(store.links(), before.as_slice());
        assert_eq!(store.backend().call_count(), calls);
    }

    #[tokio::test]
    async fn transport_failures_leave_state_untouched() {
        let mut store = store_with(vec![seeded("a", "r", None)]).await;
        let before = store.links().to_vec();
        let code = ShortCode::new("a").unwrap();

        store.backend().fail_next("500 Internal Server Error");
        assert!(matches!(
            store.create(&LinkDraft::new("https://e.com", "r")).await,
            Err(CoreError::Transport(_))
        ));
        store.backend().fail_next("500 Internal Server Error");
        assert!(matches!(
            store.update(&code, &LinkDraft::new("https://e.com", "x")).await,
            Err(CoreError::Transport(_))
        ));
        store.backend().fail_next("500 Internal Server Error");
        assert!(matches!(store.remove(&code).await, Err(CoreError::Transport(_))));
        store.backend().fail_next("500 Internal Server Error");
        assert!(store.refresh().await.is_err());

        assert_eq!(store.links(), before.as_slice());
    }

    #[tokio::test]
    async fn remove_drops_link_and_is_idempotent() {
        let mut store = store_with(vec![seeded("a", "r", None), seeded("b", "r", None)]).await;
        let code = ShortCode::new("a").unwrap();
        store.remove(&code).await.unwrap();
        assert_eq!(codes(store.links()), vec!["b"]);
        let calls = store.backend().call_count();
        store.remove(&code).await.unwrap();
        assert_eq!(store.backend().call_count(), calls);
        assert_eq!(store.backend().stored_links().len(), 1);
    }

    #[tokio::test]
    async fn unauthenticated_store_never_calls_backend() {
        let mut store = LinkCollectionStore::new(InMemoryBackend::new(), Session::anonymous());
        assert_eq!(store.refresh().await, Err(CoreError::Unauthenticated));
        assert_eq!(
            store.create(&LinkDraft::new("https://e.com", "r")).await,
            Err(CoreError::Unauthenticated)
        );
        assert_eq!(store.backend().call_count(), 0);
    }

    #[tokio::test]
    async fn logout_discards_collection_and_token() {
        let mut store = store_with(vec![seeded("a", "r", None)]).await;
        store.logout();
        assert!(store.is_empty());
        assert!(!store.session().is_authenticated());
        assert_eq!(store.refresh().await, Err(CoreError::Unauthenticated));
    }

    #[tokio::test]
    async fn summary_comes_from_stats_endpoint() {
        let report = crate::StatsReport {
            total_clicks: 12,
            date_wise_clicks: vec![],
            device_types: vec![("Desktop".into(), 12)],
        };
        let backend = InMemoryBackend::new().with_stats(report);
        let store = LinkCollectionStore::new(backend, Session::new("tok"));
        let summary = store.fetch_summary().await.unwrap();
        assert_eq!(summary.total_clicks, 12);
        assert_eq!(summary.clicks_by_device.len(), 1);
    }

    #[tokio::test]
    async fn click_events_flatten_collection() {
        let mut a = seeded("a", "r", None);
        a.clicks.push(RawClick {
            timestamp: at(2025, 1, 1),
            ip: "1.1.1.1".into(),
            user_agent: Some("Mozilla/5.0 (Windows NT 10.0)".into()),
        });
        let store = store_with(vec![a, seeded("b", "r", None)]).await;
        let events = store.click_events("https://s.io");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].short_url, "https://s.io/a");
    }
}
