//! In-process [`Transport`] backed by a [`Storefront`].
//!
//! Routes requests by URL path the way the HTTP surface does, without a
//! socket. Tests and the CLI's `--mock` mode point a `StorefrontClient` at
//! it to exercise the real codec and pagination engine end to end.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use batchexecute::codec::{BATCHEXECUTE_PATH, DETAILS_PATH, SEARCH_PATH};
use batchexecute::{AppId, Transport, TransportError};
use tracing::debug;

use crate::errors::MockError;
use crate::storefront::Storefront;

/// A storefront reachable through the [`Transport`] port.
#[derive(Debug, Clone)]
pub struct InMemoryStorefront {
    storefront: Arc<Storefront>,
    requests: Arc<AtomicUsize>,
}

impl InMemoryStorefront {
    pub fn new(storefront: Arc<Storefront>) -> Self {
        Self {
            storefront,
            requests: Arc::default(),
        }
    }

    pub fn storefront(&self) -> &Storefront {
        &self.storefront
    }

    /// Requests answered so far, across clones.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    fn route(&self, url: &str, body: Option<&str>) -> Result<String, MockError> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let path = path_of(url);
        debug!(path, post = body.is_some(), "in-memory request");
        match (path, body) {
            (BATCHEXECUTE_PATH, Some(body)) => self.storefront.batchexecute(body),
            (DETAILS_PATH, None) => {
                let app_id = query_param(url, "id")
                    .and_then(AppId::new)
                    .ok_or_else(|| MockError::BadRequest {
                        message: "missing 'id' query parameter".to_string(),
                    })?;
                self.storefront.detail_page(&app_id)
            }
            (SEARCH_PATH, None) => {
                let query = query_param(url, "q").unwrap_or_default();
                self.storefront.search_page(&query)
            }
            _ => Err(MockError::NotFound {
                path: path.to_string(),
            }),
        }
    }
}

#[async_trait]
impl Transport for InMemoryStorefront {
    async fn post_form(&self, url: &str, body: &str) -> Result<String, TransportError> {
        self.route(url, Some(body))
            .map_err(|e| e.into_transport_error(url))
    }

    async fn get(&self, url: &str) -> Result<String, TransportError> {
        self.route(url, None).map_err(|e| e.into_transport_error(url))
    }
}

/// The path component of an absolute or origin-relative URL.
fn path_of(url: &str) -> &str {
    let without_query = url.split(['?', '#']).next().unwrap_or_default();
    match without_query.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("/", |i| &rest[i..]),
        None => without_query,
    }
}

/// First value of query parameter `name`, percent-decoded.
pub(crate) fn query_param(url: &str, name: &str) -> Option<String> {
    let (_, query) = url.split_once('?')?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .and_then(|(_, value)| urlencoding::decode(value).ok())
        .map(|value| value.into_owned())
}
