//! The `edit` command: prefill from the current link, apply the requested
//! changes, and refetch once when the local view turns out to be stale.

use anyhow::bail;
use chrono::{DateTime, Utc};
use domain::store::LinkCollectionStore;
use domain::{CoreError, Link, LinkBackend, LinkDraft, ShortCode};
use tracing::warn;

/// Field changes requested on the command line. Unset fields keep the
/// link's current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkEdits {
    pub url: Option<String>,
    pub remark: Option<String>,
    pub expires: Option<DateTime<Utc>>,
    pub clear_expiry: bool,
}

impl LinkEdits {
    pub fn apply(&self, link: &Link) -> LinkDraft {
        let mut draft = LinkDraft::from_link(link);
        if let Some(url) = &self.url {
            draft.original_url = url.clone();
        }
        if let Some(remark) = &self.remark {
            draft.remark = remark.clone();
        }
        if let Some(at) = self.expires {
            draft = draft.with_expiration(at);
        } else if self.clear_expiry {
            draft.expiration_enabled = false;
            draft.expiration_date = None;
        }
        draft
    }
}

async fn try_edit<B: LinkBackend>(
    store: &mut LinkCollectionStore<B>,
    code: &ShortCode,
    edits: &LinkEdits,
) -> Result<Link, CoreError> {
    let draft = match store.get(code) {
        Some(current) => edits.apply(current),
        None => return Err(CoreError::Consistency(code.clone())),
    };
    store.update(code, &draft).await
}

/// Apply `edits` to `code`. A link missing from the local collection means
/// the view is stale: refetch once and try again before giving up.
pub async fn edit_link<B: LinkBackend>(
    store: &mut LinkCollectionStore<B>,
    code: &ShortCode,
    edits: &LinkEdits,
) -> anyhow::Result<Link> {
    match try_edit(store, code, edits).await {
        Err(e) if e.requires_refetch() => {
            warn!(%code, "link not in local collection; refetching once");
            store.refresh().await?;
            match try_edit(store, code, edits).await {
                Err(CoreError::Consistency(_)) => bail!("no link with code {}", code),
                other => Ok(other?),
            }
        }
        other => Ok(other?),
    }
}
