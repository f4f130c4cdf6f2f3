//! Fetching grid pages.
//!
//! The controller never performs I/O itself: every trigger hands back a
//! [FetchRequest], and whoever runs the controller resolves it through a
//! [Transport] and reports the outcome with
//! [crate::controller::GridController::complete].

use std::time::{SystemTime, UNIX_EPOCH};

use evolugrid_common::envelope::ResponseEnvelope;
use evolugrid_common::error::WireError;
use evolugrid_common::query::{strings, GridQuery};
use hyper::client::HttpConnector;
use hyper::header::{ACCEPT, CACHE_CONTROL, PRAGMA};
use hyper::{Body, Client, Request};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Server answered with status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] hyper::Error),

    #[error("Unable to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),
}

/// Why a fetch was issued. Everything but a scroll replaces the rows on
/// display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Initial,
    Page,
    Sort,
    Filter,
    Scroll,
    HistoryRestore,
}

impl FetchKind {
    pub fn replaces_rows(&self) -> bool {
        !matches!(self, FetchKind::Scroll)
    }
}

/// A fetch the host must perform on behalf of a grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Hand this back to the controller along with the result.
    pub ticket: u64,
    pub url: Url,
    pub kind: FetchKind,
}

impl FetchRequest {
    /// Decode the parameters carried by the request URL.
    pub fn query(&self) -> Result<GridQuery, WireError> {
        GridQuery::from_query_str(self.url.query().unwrap_or(""))
    }
}

/// Performs a GET and decodes the envelope.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn fetch(&self, url: &Url) -> Result<ResponseEnvelope, TransportError>;
}

/// [Transport] over plain HTTP, with caching disabled.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client<HttpConnector>,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Append a cache-busting parameter, so intermediaries never answer
/// with a stale page.
fn bust_cache(url: &Url) -> Url {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();

    let mut url = url.clone();
    url.query_pairs_mut()
        .append_pair(strings::CACHE_BUSTER, &stamp.to_string());
    url
}

impl Transport for HttpTransport {
    async fn fetch(&self, url: &Url) -> Result<ResponseEnvelope, TransportError> {
        let url = bust_cache(url);

        log::debug!("GET {url}");

        let uri: hyper::Uri = url
            .as_str()
            .parse()
            .map_err(|e: hyper::http::uri::InvalidUri| {
                TransportError::InvalidUrl(e.to_string())
            })?;

        let req = Request::get(uri)
            .header(ACCEPT, "application/json")
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .body(Body::empty())
            .map_err(|e| TransportError::InvalidUrl(e.to_string()))?;

        let res = self.client.request(req).await?;
        let status = res.status();
        let body = hyper::body::to_bytes(res.into_body()).await?;

        if !status.is_success() {
            return Err(TransportError::Http {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(serde_json::from_slice(&body)?)
    }
}
