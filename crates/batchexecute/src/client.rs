//! The storefront client: the operations callers actually use.
//!
//! Operations without an explicit language and country use the ones in the
//! client's [`ClientConfig`]; the `*_in` variants take them per call.
//!
//! A [`StorefrontClient`] owns one transport, shares one immutable
//! [`ExtractionSchema`] and carries a [`ClientConfig`]. Independent fetches
//! may run concurrently against the same client; nothing in it is mutated
//! after construction.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::codec::{
    batchexecute_url, decode_detail_page, decode_permissions, decode_search_page,
    detail_fallback_url, detail_url, search_fallback_url, search_url, BatchRequest,
};
use crate::config::ClientConfig;
use crate::errors::{FetchError, SchemaError, TransportError};
use crate::identifiers::AppId;
use crate::pagination::{FetchControl, ReviewPager};
use crate::schema::{ExtractionSchema, Record, RecordKind};
use crate::transport::Transport;
use crate::types::{ContinuationToken, PermissionGroups, Review, ReviewQuery};
use crate::value::Value;

/// Reviews from one call plus the token to continue from.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewBatch {
    pub records: Vec<Record>,
    /// `None` once the server has no more pages.
    pub next: Option<ContinuationToken>,
}

impl ReviewBatch {
    /// The records as typed reviews.
    ///
    /// # Errors
    ///
    /// [`SchemaError::FieldType`] if a field holds a value of the wrong kind.
    pub fn reviews(&self) -> Result<Vec<Review>, SchemaError> {
        self.records.iter().map(Review::try_from).collect()
    }
}

/// Client for the storefront's review, detail, permission and search
/// surfaces.
#[derive(Debug, Clone)]
pub struct StorefrontClient<T> {
    transport: T,
    schema: Arc<ExtractionSchema>,
    config: ClientConfig,
}

impl<T: Transport> StorefrontClient<T> {
    pub fn new(transport: T, schema: Arc<ExtractionSchema>, config: ClientConfig) -> Self {
        Self {
            transport,
            schema,
            config,
        }
    }

    /// A client with the standard schema and default configuration.
    pub fn with_defaults(transport: T) -> Self {
        Self::new(
            transport,
            Arc::new(ExtractionSchema::standard()),
            ClientConfig::default(),
        )
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn schema(&self) -> &ExtractionSchema {
        &self.schema
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn pager(&self) -> ReviewPager<'_, T> {
        ReviewPager::new(&self.transport, &self.schema, &self.config)
    }

    // -----------------------------------------------------------------------
    // Reviews
    // -----------------------------------------------------------------------

    /// Fetches up to `query.count` reviews from the first page.
    ///
    /// # Errors
    ///
    /// See [`ReviewPager::collect`].
    pub async fn reviews(
        &self,
        app_id: &AppId,
        query: &ReviewQuery,
        control: &FetchControl,
    ) -> Result<ReviewBatch, FetchError> {
        let max_per_fetch = self.config.max_per_fetch;
        let outcome = self
            .pager()
            .collect(app_id, query, max_per_fetch, None, control)
            .await?;
        Ok(ReviewBatch {
            records: outcome.records,
            next: outcome
                .next_token
                .map(|token| ContinuationToken::resume(token, query, max_per_fetch)),
        })
    }

    /// Continues from `token` with the filters it was created with.
    ///
    /// # Errors
    ///
    /// See [`ReviewPager::collect`].
    pub async fn resume(
        &self,
        app_id: &AppId,
        token: ContinuationToken,
        control: &FetchControl,
    ) -> Result<ReviewBatch, FetchError> {
        let query = token.query();
        let max_per_fetch = token.max_per_fetch;
        let outcome = self
            .pager()
            .collect(app_id, &query, max_per_fetch, Some(token.token), control)
            .await?;
        Ok(ReviewBatch {
            records: outcome.records,
            next: outcome
                .next_token
                .map(|next| ContinuationToken::resume(next, &query, max_per_fetch)),
        })
    }

    /// Fetches every review the server will hand out, one
    /// `max_per_fetch`-sized call at a time, awaiting `pause` between calls.
    ///
    /// `query.count` is ignored.
    ///
    /// # Errors
    ///
    /// See [`ReviewPager::collect`]. Reviews from earlier calls are dropped.
    #[instrument(skip(self, app_id, query, control, pause), fields(app_id = %app_id))]
    pub async fn reviews_all<P, F>(
        &self,
        app_id: &AppId,
        query: &ReviewQuery,
        control: &FetchControl,
        mut pause: P,
    ) -> Result<Vec<Record>, FetchError>
    where
        P: FnMut() -> F,
        F: Future<Output = ()>,
    {
        let query = ReviewQuery {
            count: self.config.max_per_fetch,
            ..query.clone()
        };
        let mut batch = self.reviews(app_id, &query, control).await?;
        let mut records = std::mem::take(&mut batch.records);
        while let Some(token) = batch.next.take() {
            pause().await;
            batch = self.resume(app_id, token, control).await?;
            records.append(&mut batch.records);
        }
        info!(total = records.len(), "fetched all reviews");
        Ok(records)
    }

    // -----------------------------------------------------------------------
    // Detail, permissions and search
    // -----------------------------------------------------------------------

    /// GETs `primary`, or `fallback` if `primary` is not found. Returns the
    /// URL that answered and its body.
    async fn get_with_fallback(
        &self,
        primary: String,
        fallback: impl FnOnce() -> String,
    ) -> Result<(String, String), FetchError> {
        match self.transport.get(&primary).await {
            Err(TransportError::NotFound { .. }) => {
                let url = fallback();
                debug!(%url, "country page not found, trying fallback");
                let body = self.transport.get(&url).await?;
                Ok((url, body))
            }
            other => Ok((primary, other?)),
        }
    }

    /// [`app_detail_in`](Self::app_detail_in) for the configured language
    /// and country.
    ///
    /// # Errors
    ///
    /// As [`app_detail_in`](Self::app_detail_in).
    pub async fn app_detail(&self, app_id: &AppId) -> Result<Record, FetchError> {
        self.app_detail_in(app_id, &self.config.lang, &self.config.country)
            .await
    }

    /// Fetches and extracts an app's detail page.
    ///
    /// A 404 for the country-specific page is retried once without the
    /// country. The record carries `appId` and `url` besides the schema
    /// fields.
    ///
    /// # Errors
    ///
    /// Transport failures (including a 404 on the fallback page) and decode
    /// failures of the page.
    #[instrument(skip(self, app_id), fields(app_id = %app_id))]
    pub async fn app_detail_in(
        &self,
        app_id: &AppId,
        lang: &str,
        country: &str,
    ) -> Result<Record, FetchError> {
        let base_url = &self.config.base_url;
        let (url, html) = self
            .get_with_fallback(detail_url(base_url, app_id, lang, country), || {
                detail_fallback_url(base_url, app_id, lang)
            })
            .await?;
        let dataset = decode_detail_page(&html)
            .inspect_err(|e| warn!(error = %e, "detail page did not decode"))?;

        let mut record = self.schema.extract(RecordKind::Detail, &dataset);
        record.insert("appId", Value::from(app_id.as_str()));
        record.insert("url", Value::from(url));
        Ok(record)
    }

    /// [`permissions_in`](Self::permissions_in) for the configured language
    /// and country.
    ///
    /// # Errors
    ///
    /// As [`permissions_in`](Self::permissions_in).
    pub async fn permissions(&self, app_id: &AppId) -> Result<PermissionGroups, FetchError> {
        self.permissions_in(app_id, &self.config.lang, &self.config.country)
            .await
    }

    /// Fetches an app's permissions as group name → sorted permission names.
    ///
    /// # Errors
    ///
    /// Transport and decode failures.
    #[instrument(skip(self, app_id), fields(app_id = %app_id))]
    pub async fn permissions_in(
        &self,
        app_id: &AppId,
        lang: &str,
        country: &str,
    ) -> Result<PermissionGroups, FetchError> {
        let url = batchexecute_url(&self.config.base_url, lang, country);
        let request = BatchRequest::Permissions {
            app_id: app_id.clone(),
        };
        let body = self.transport.post_form(&url, &request.encode_form()).await?;

        let mut groups = PermissionGroups::new();
        for group in decode_permissions(&body)? {
            let record = self.schema.extract(RecordKind::Permission, &group);
            let name = record
                .opt_str("type")?
                .unwrap_or_else(|| "Uncategorized".to_string());
            let names = record
                .get("permissions")
                .and_then(Value::as_array)
                .unwrap_or_default()
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
            groups.insert(name, names);
        }
        Ok(groups)
    }

    /// [`search_in`](Self::search_in) for the configured language and
    /// country.
    ///
    /// # Errors
    ///
    /// As [`search_in`](Self::search_in).
    pub async fn search(&self, query: &str, n_hits: usize) -> Result<Vec<Record>, FetchError> {
        self.search_in(query, n_hits, &self.config.lang, &self.config.country)
            .await
    }

    /// Searches apps and returns at most `n_hits` results in page order.
    ///
    /// The highlighted top result, when the page shows one, comes first and
    /// counts toward `n_hits`. A 404 for the country-specific page is
    /// retried once without the country. `n_hits = 0` sends no request.
    ///
    /// # Errors
    ///
    /// - [`FetchError::InvalidRequest`] for a blank query.
    /// - Transport failures and decode failures of the page.
    #[instrument(skip(self, query), fields(query = %query))]
    pub async fn search_in(
        &self,
        query: &str,
        n_hits: usize,
        lang: &str,
        country: &str,
    ) -> Result<Vec<Record>, FetchError> {
        if n_hits == 0 {
            return Ok(Vec::new());
        }
        let query = query.trim();
        if query.is_empty() {
            return Err(FetchError::InvalidRequest {
                message: "search query must not be empty".to_string(),
            });
        }

        let base_url = &self.config.base_url;
        let (_, html) = self
            .get_with_fallback(search_url(base_url, query, lang, country), || {
                search_fallback_url(base_url, query, lang)
            })
            .await?;
        let page = decode_search_page(&html)
            .inspect_err(|e| warn!(error = %e, "search page did not decode"))?;

        let mut results: Vec<Record> = page
            .top
            .iter()
            .map(|top| self.schema.extract(RecordKind::TopSearchResult, top))
            .collect();
        let listed = n_hits.min(page.hits.len()).saturating_sub(results.len());
        results.extend(
            page.hits
                .iter()
                .take(listed)
                .map(|hit| self.schema.extract(RecordKind::SearchResult, hit)),
        );
        debug!(hits = page.hits.len(), returned = results.len(), "search page decoded");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{encode_detail_page, encode_permissions_response, encode_search_page};
    use crate::extract::RawDataset;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Answers GETs from a list of (url, result) pairs and records calls.
    #[derive(Default)]
    struct PageTransport {
        pages: Vec<(String, Result<String, TransportError>)>,
        post_body: Option<String>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Transport for PageTransport {
        async fn post_form(&self, url: &str, _body: &str) -> Result<String, TransportError> {
            self.calls.lock().unwrap().push(url.to_string());
            self.post_body.clone().ok_or(TransportError::NotFound { url: url.to_string() })
        }

        async fn get(&self, url: &str) -> Result<String, TransportError> {
            self.calls.lock().unwrap().push(url.to_string());
            self.pages
                .iter()
                .find(|(u, _)| u == url)
                .map(|(_, r)| r.clone())
                .unwrap_or(Err(TransportError::NotFound { url: url.to_string() }))
        }
    }

    fn detail_html() -> String {
        let schema = ExtractionSchema::standard();
        let dataset: RawDataset = schema
            .encode(RecordKind::Detail, [("title", Value::from("Notes"))])
            .unwrap();
        encode_detail_page(&dataset)
    }

    #[tokio::test]
    async fn detail_falls_back_to_country_less_url_on_404() {
        let app = AppId::new("com.example.notes").unwrap();
        let fallback = detail_fallback_url("https://play.google.com", &app, "en");
        let client = StorefrontClient::with_defaults(PageTransport {
            pages: vec![(fallback.clone(), Ok(detail_html()))],
            ..PageTransport::default()
        });

        let record = client.app_detail_in(&app, "en", "zz").await.unwrap();
        assert_eq!(record.get("title"), Some(&Value::from("Notes")));
        assert_eq!(record.get("appId"), Some(&Value::from("com.example.notes")));
        assert_eq!(record.get("url"), Some(&Value::from(fallback.as_str())));
        assert_eq!(client.transport().calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn detail_surfaces_server_errors_without_fallback() {
        let app = AppId::new("com.example.notes").unwrap();
        let url = detail_url("https://play.google.com", &app, "en", "us");
        let client = StorefrontClient::with_defaults(PageTransport {
            pages: vec![(url.clone(), Err(TransportError::Status { status: 500, url }))],
            ..PageTransport::default()
        });
        let err = client.app_detail(&app).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(TransportError::Status { status: 500, .. })));
        assert_eq!(client.transport().calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn permissions_are_grouped_and_sorted() {
        let body = encode_permissions_response(vec![
            Value::from(serde_json::json!([[
                "Location",
                null,
                [[null, "precise location"], [null, "approximate location"]],
                null
            ]])),
            Value::from(serde_json::json!([[null, "full network access"]])),
        ]);
        let client = StorefrontClient::with_defaults(PageTransport {
            post_body: Some(body),
            ..PageTransport::default()
        });
        let groups = client
            .permissions(&AppId::new("com.example.notes").unwrap())
            .await
            .unwrap();
        assert_eq!(
            groups["Location"],
            vec!["approximate location".to_string(), "precise location".to_string()]
        );
        assert_eq!(groups["Uncategorized"], vec!["full network access".to_string()]);
    }

    fn search_html(with_top: bool, hits: usize) -> String {
        let schema = ExtractionSchema::standard();
        let entry = |kind, id: String| {
            schema
                .encode(kind, [("appId", Value::from(id.clone())), ("title", Value::from(id))])
                .unwrap()
        };
        let top = with_top.then(|| entry(RecordKind::TopSearchResult, "com.example.top".to_string()));
        let hits = (0..hits)
            .map(|i| entry(RecordKind::SearchResult, format!("com.example.hit{i}")))
            .collect();
        encode_search_page(top, hits)
    }

    fn app_ids(records: &[Record]) -> Vec<String> {
        records
            .iter()
            .map(|r| r.opt_str("appId").unwrap().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn search_puts_the_top_result_first_and_caps_the_hits() {
        let url = search_url("https://play.google.com", "note taking", "en", "us");
        assert!(url.contains("q=note%20taking&c=apps"));
        let client = StorefrontClient::with_defaults(PageTransport {
            pages: vec![(url, Ok(search_html(true, 10)))],
            ..PageTransport::default()
        });

        let results = client.search("note taking", 3).await.unwrap();
        assert_eq!(app_ids(&results), ["com.example.top", "com.example.hit0", "com.example.hit1"]);
        assert_eq!(results[0].get("title"), Some(&Value::from("com.example.top")));
    }

    #[tokio::test]
    async fn search_without_top_result_lists_hits_only() {
        let client = StorefrontClient::with_defaults(PageTransport {
            pages: vec![(
                search_url("https://play.google.com", "notes", "en", "us"),
                Ok(search_html(false, 2)),
            )],
            ..PageTransport::default()
        });
        let results = client.search("notes", 30).await.unwrap();
        assert_eq!(app_ids(&results), ["com.example.hit0", "com.example.hit1"]);
    }

    #[tokio::test]
    async fn search_falls_back_to_country_less_url_and_uses_config_locale() {
        let config = ClientConfig {
            lang: "de".to_string(),
            country: "zz".to_string(),
            ..ClientConfig::default()
        };
        let fallback = search_fallback_url("https://play.google.com", "notes", "de");
        let client = StorefrontClient::new(
            PageTransport {
                pages: vec![(fallback.clone(), Ok(search_html(false, 1)))],
                ..PageTransport::default()
            },
            Arc::new(ExtractionSchema::standard()),
            config,
        );
        assert_eq!(client.search("notes", 5).await.unwrap().len(), 1);
        let calls = client.transport().calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            [search_url("https://play.google.com", "notes", "de", "zz"), fallback]
        );
    }

    #[tokio::test]
    async fn blank_or_zero_hit_searches_send_nothing() {
        let client = StorefrontClient::with_defaults(PageTransport::default());
        assert!(client.search("anything", 0).await.unwrap().is_empty());
        assert!(matches!(
            client.search("   ", 5).await,
            Err(FetchError::InvalidRequest { .. })
        ));
        assert!(client.transport().calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn detail_uses_the_configured_locale() {
        let app = AppId::new("com.example.notes").unwrap();
        let url = detail_url("https://play.google.com", &app, "fr", "ca");
        let client = StorefrontClient::new(
            PageTransport {
                pages: vec![(url.clone(), Ok(detail_html()))],
                ..PageTransport::default()
            },
            Arc::new(ExtractionSchema::standard()),
            ClientConfig {
                lang: "fr".to_string(),
                country: "ca".to_string(),
                ..ClientConfig::default()
            },
        );
        let record = client.app_detail(&app).await.unwrap();
        assert_eq!(record.get("url"), Some(&Value::from(url.as_str())));
    }
}
