//! Pagination engine against a scripted in-process storefront.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use batchexecute::codec::{encode_reviews_response, BatchRequest};
use batchexecute::{
    AppId, ClientConfig, DecodeError, ExtractionSchema, FetchControl, FetchError, PageToken,
    RecordKind, ReviewQuery, StorefrontClient, Transport, TransportError, Value,
};

/// Serves `total` numbered reviews, `count` per request, with an
/// `offset:N` token.
struct ScriptedStore {
    total: usize,
    page_sizes: Mutex<Vec<usize>>,
    tokens_seen: Mutex<Vec<Option<String>>>,
}

impl ScriptedStore {
    fn new(total: usize) -> Self {
        Self {
            total,
            page_sizes: Mutex::new(Vec::new()),
            tokens_seen: Mutex::new(Vec::new()),
        }
    }

    fn page_sizes(&self) -> Vec<usize> {
        self.page_sizes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedStore {
    async fn post_form(&self, _url: &str, body: &str) -> Result<String, TransportError> {
        let BatchRequest::Reviews(request) = BatchRequest::decode_form(body).unwrap() else {
            panic!("expected a review request");
        };
        self.page_sizes.lock().unwrap().push(request.count);
        self.tokens_seen
            .lock()
            .unwrap()
            .push(request.token.as_ref().map(|t| t.to_string()));

        let start = request
            .token
            .as_ref()
            .and_then(|t| t.as_str().strip_prefix("offset:"))
            .map_or(0, |n| n.parse::<usize>().unwrap());
        let end = (start + request.count).min(self.total);

        let schema = ExtractionSchema::standard();
        let items = (start..end)
            .map(|i| {
                schema
                    .encode(
                        RecordKind::Review,
                        [
                            ("reviewId", Value::from(format!("r-{i}"))),
                            ("score", Value::Number((i % 5 + 1) as f64)),
                        ],
                    )
                    .unwrap()
            })
            .collect();
        let next = (end < self.total).then(|| PageToken::new(format!("offset:{end}")).unwrap());
        Ok(encode_reviews_response(items, next.as_ref()))
    }

    async fn get(&self, url: &str) -> Result<String, TransportError> {
        Err(TransportError::NotFound { url: url.to_string() })
    }
}

fn client(store: ScriptedStore, max_per_fetch: usize) -> StorefrontClient<ScriptedStore> {
    let config = ClientConfig {
        max_per_fetch,
        ..ClientConfig::default()
    };
    StorefrontClient::new(store, ExtractionSchema::standard().into(), config)
}

fn app() -> AppId {
    AppId::new("com.example.notes").unwrap()
}

fn query(count: usize) -> ReviewQuery {
    ReviewQuery {
        count,
        ..ReviewQuery::default()
    }
}

fn ids(records: &[batchexecute::Record]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.opt_str("reviewId").unwrap().unwrap())
        .collect()
}

#[tokio::test]
async fn requested_count_is_split_into_bounded_pages() {
    let client = client(ScriptedStore::new(1_000), 100);
    let batch = client
        .reviews(&app(), &query(250), &FetchControl::unbounded())
        .await
        .unwrap();

    assert_eq!(client.transport().page_sizes(), vec![100, 100, 50]);
    assert_eq!(batch.records.len(), 250);
    let expected: Vec<String> = (0..250).map(|i| format!("r-{i}")).collect();
    assert_eq!(ids(&batch.records), expected);

    let next = batch.next.expect("more reviews remain");
    assert_eq!(next.token.as_str(), "offset:250");
    assert_eq!(next.requested_count, 250);
    assert_eq!(next.max_per_fetch, 100);
}

#[tokio::test]
async fn loop_stops_when_server_runs_out() {
    let client = client(ScriptedStore::new(120), 100);
    let batch = client
        .reviews(&app(), &query(250), &FetchControl::unbounded())
        .await
        .unwrap();
    assert_eq!(client.transport().page_sizes(), vec![100, 100]);
    assert_eq!(batch.records.len(), 120);
    assert!(batch.next.is_none());
}

#[tokio::test]
async fn resume_continues_with_the_token_and_its_filters() {
    let client = client(ScriptedStore::new(1_000), 100);
    let first = client
        .reviews(&app(), &query(150), &FetchControl::unbounded())
        .await
        .unwrap();
    let token = first.next.clone().unwrap();
    let second = client
        .resume(&app(), token, &FetchControl::unbounded())
        .await
        .unwrap();

    assert_eq!(ids(&second.records)[0], "r-150");
    assert_eq!(second.records.len(), 150);
    assert_eq!(client.transport().page_sizes(), vec![100, 50, 100, 50]);
    let tokens = client.transport().tokens_seen.lock().unwrap().clone();
    assert_eq!(tokens[0], None);
    assert_eq!(tokens[2].as_deref(), Some("offset:150"));
}

#[tokio::test]
async fn zero_count_issues_no_request() {
    let client = client(ScriptedStore::new(10), 100);
    let batch = client
        .reviews(&app(), &query(0), &FetchControl::unbounded())
        .await
        .unwrap();
    assert!(batch.records.is_empty());
    assert!(client.transport().page_sizes().is_empty());
}

#[tokio::test]
async fn reviews_all_drains_every_page_and_pauses_between_calls() {
    let client = client(ScriptedStore::new(230), 100);
    let mut pauses = 0;
    let records = client
        .reviews_all(&app(), &query(5), &FetchControl::unbounded(), || {
            pauses += 1;
            std::future::ready(())
        })
        .await
        .unwrap();
    assert_eq!(records.len(), 230);
    assert_eq!(pauses, 2);
    assert_eq!(client.transport().page_sizes(), vec![100, 100, 100]);
}

#[tokio::test]
async fn raised_cancel_flag_stops_before_the_first_page() {
    let client = client(ScriptedStore::new(500), 100);
    let control = FetchControl::unbounded();
    control.cancel.cancel();
    let err = client.reviews(&app(), &query(250), &control).await.unwrap_err();
    assert!(matches!(err, FetchError::Cancelled));
    assert!(client.transport().page_sizes().is_empty());
}

/// Answers every request with a captive-portal page.
struct CaptivePortal;

#[async_trait]
impl Transport for CaptivePortal {
    async fn post_form(&self, _url: &str, _body: &str) -> Result<String, TransportError> {
        Ok("<html><body>Sign in to the network</body></html>".to_string())
    }

    async fn get(&self, _url: &str) -> Result<String, TransportError> {
        Ok(String::new())
    }
}

#[tokio::test]
async fn unframed_response_is_a_protocol_mismatch_with_no_records() {
    let client = StorefrontClient::with_defaults(CaptivePortal);
    let result = client
        .reviews(&app(), &query(100), &FetchControl::unbounded())
        .await;
    assert!(matches!(
        result,
        Err(FetchError::Decode(DecodeError::ProtocolMismatch { .. }))
    ));
}

/// Fails on the second request.
struct FlakyStore {
    inner: ScriptedStore,
}

#[async_trait]
impl Transport for FlakyStore {
    async fn post_form(&self, url: &str, body: &str) -> Result<String, TransportError> {
        if self.inner.page_sizes().len() == 1 {
            return Err(TransportError::Status {
                status: 503,
                url: url.to_string(),
            });
        }
        self.inner.post_form(url, body).await
    }

    async fn get(&self, url: &str) -> Result<String, TransportError> {
        self.inner.get(url).await
    }
}

#[tokio::test]
async fn mid_loop_failure_aborts_without_partial_results() {
    let client = StorefrontClient::new(
        FlakyStore {
            inner: ScriptedStore::new(1_000),
        },
        ExtractionSchema::standard().into(),
        ClientConfig {
            max_per_fetch: 100,
            ..ClientConfig::default()
        },
    );
    let err = client
        .reviews(&app(), &query(300), &FetchControl::unbounded())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FetchError::Transport(TransportError::Status { status: 503, .. })
    ));
}

/// Takes `delay` to answer each request.
struct SlowStore {
    inner: ScriptedStore,
    delay: Duration,
}

#[async_trait]
impl Transport for SlowStore {
    async fn post_form(&self, url: &str, body: &str) -> Result<String, TransportError> {
        tokio::time::sleep(self.delay).await;
        self.inner.post_form(url, body).await
    }

    async fn get(&self, url: &str) -> Result<String, TransportError> {
        self.inner.get(url).await
    }
}

#[tokio::test]
async fn deadline_passing_mid_loop_stops_before_the_next_page() {
    let client = StorefrontClient::new(
        SlowStore {
            inner: ScriptedStore::new(1_000),
            delay: Duration::from_millis(80),
        },
        ExtractionSchema::standard().into(),
        ClientConfig {
            max_per_fetch: 100,
            ..ClientConfig::default()
        },
    );
    let control = FetchControl::unbounded().with_deadline(Instant::now() + Duration::from_millis(20));
    let err = client.reviews(&app(), &query(300), &control).await.unwrap_err();
    assert!(matches!(err, FetchError::DeadlineExceeded));
    assert_eq!(client.transport().inner.page_sizes(), vec![100]);
}

#[tokio::test]
async fn already_passed_deadline_issues_no_request() {
    let client = client(ScriptedStore::new(500), 100);
    let control = FetchControl::unbounded().with_deadline(Instant::now());
    let err = client.reviews(&app(), &query(100), &control).await.unwrap_err();
    assert!(matches!(err, FetchError::DeadlineExceeded));
    assert!(client.transport().page_sizes().is_empty());
}
