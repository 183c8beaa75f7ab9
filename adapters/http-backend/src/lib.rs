//! http-backend — reqwest implementation of the `LinkBackend` port.
//!
//! Purpose
//! - Talk to the links REST API (`/api/links`, `/api/links/stats`,
//!   `/api/links/short/{code}`) with the session's bearer token.
//! - Translate the API's camelCase JSON into domain types (see [`wire`]).
//!
//! Notes
//! - A session without a token short-circuits with
//!   `CoreError::Unauthenticated` before any request is built.
//! - Non-2xx responses become `CoreError::Transport` carrying the status and
//!   the backend's message when it sent one. Nothing is retried.

use std::time::Duration;

use async_trait::async_trait;
use domain::{CoreError, Link, LinkBackend, LinkPayload, Session, ShortCode, StatsReport};
use http_common::{link_endpoint, links_endpoint, stats_endpoint};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

pub mod wire;

use wire::{WireLink, WirePayload, WireStats};

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{status} from {url}: {message}")]
    Status {
        status: u16,
        url: String,
        message: String,
    },
    #[error("malformed response: {0}")]
    Decode(String),
}

impl From<HttpError> for CoreError {
    fn from(err: HttpError) -> Self {
        CoreError::transport(err)
    }
}

/// Backend reached over HTTP.
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Build a backend for `base_url` (scheme and host, no `/api` suffix).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, HttpError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, req: RequestBuilder, token: &str) -> Result<String, HttpError> {
        let resp = req.bearer_auth(token).send().await?;
        let status = resp.status();
        let url = resp.url().to_string();
        let body = resp.text().await?;
        trace!(%status, %url, bytes = body.len(), "backend response");
        if !status.is_success() {
            return Err(HttpError::Status {
                status: status.as_u16(),
                url,
                message: error_message(&body)
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string()),
            });
        }
        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        token: &str,
    ) -> Result<T, HttpError> {
        let body = self.send(req, token).await?;
        serde_json::from_str(&body).map_err(|e| HttpError::Decode(e.to_string()))
    }
}

/// Pull a human-readable message out of an error body, if it has one.
fn error_message(body: &str) -> Option<String> {
    let v: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .find_map(|k| v.get(k))
        .and_then(|m| match m {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(o) => o
                .get("message")
                .and_then(|s| s.as_str())
                .map(str::to_string),
            _ => None,
        })
}

#[async_trait]
impl LinkBackend for HttpBackend {
    async fn fetch_links(&self, session: &Session) -> Result<Vec<Link>, CoreError> {
        let token = session.bearer()?;
        let url = links_endpoint(&self.base_url);
        debug!(%url, "fetching links");
        let wire: Vec<WireLink> = self.send_json(self.client.get(&url), token).await?;
        let links = wire
            .into_iter()
            .map(Link::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(links)
    }

    async fn fetch_stats(&self, session: &Session) -> Result<StatsReport, CoreError> {
        let token = session.bearer()?;
        let url = stats_endpoint(&self.base_url);
        debug!(%url, "fetching stats");
        let wire: WireStats = self.send_json(self.client.get(&url), token).await?;
        Ok(StatsReport::try_from(wire)?)
    }

    async fn create_link(
        &self,
        session: &Session,
        payload: &LinkPayload,
    ) -> Result<Link, CoreError> {
        let token = session.bearer()?;
        let url = links_endpoint(&self.base_url);
        let req = self.client.post(&url).json(&WirePayload::from(payload));
        let wire: WireLink = self.send_json(req, token).await?;
        Ok(Link::try_from(wire)?)
    }

    async fn update_link(
        &self,
        session: &Session,
        code: &ShortCode,
        payload: &LinkPayload,
    ) -> Result<Link, CoreError> {
        let token = session.bearer()?;
        let url = link_endpoint(&self.base_url, code.as_str());
        let req = self.client.put(&url).json(&WirePayload::from(payload));
        let wire: WireLink = self.send_json(req, token).await?;
        Ok(Link::try_from(wire)?)
    }

    async fn delete_link(&self, session: &Session, code: &ShortCode) -> Result<(), CoreError> {
        let token = session.bearer()?;
        let url = link_endpoint(&self.base_url, code.as_str());
        self.send(self.client.delete(&url), token).await?;
        Ok(())
    }
}
