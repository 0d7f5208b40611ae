//! The live HTTP transport against the mock bound on a loopback port.

use std::sync::Arc;

use batchexecute::{
    AppId, ClientConfig, ExtractionSchema, FetchControl, ReviewQuery, StorefrontClient, Value,
};
use http_transport::{HttpSettings, HttpTransport, RetrySettings};
use mock_server::{build_router, standard_storefront, AppState, Synthesizer};

const SEED: u64 = 42;

async fn serve(total_reviews: usize) -> String {
    let app = build_router(AppState::new(standard_storefront(SEED, total_reviews)));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(base_url: &str, max_per_fetch: usize) -> StorefrontClient<HttpTransport> {
    let transport = HttpTransport::new(HttpSettings {
        retry: RetrySettings::disabled(),
        ..HttpSettings::default()
    })
    .unwrap();
    let config = ClientConfig {
        max_per_fetch,
        ..ClientConfig::default()
    }
    .with_base_url(base_url);
    StorefrontClient::new(transport, Arc::new(ExtractionSchema::standard()), config)
}

fn app() -> AppId {
    AppId::new("com.example.notes").unwrap()
}

#[tokio::test]
async fn reviews_over_http_match_synthesis() {
    let base = serve(45).await;
    let client = client(&base, 20);
    let query = ReviewQuery {
        count: 45,
        ..ReviewQuery::default()
    };
    let batch = client
        .reviews(&app(), &query, &FetchControl::unbounded())
        .await
        .unwrap();

    let synth = Synthesizer::new(SEED, 45);
    assert_eq!(batch.records.len(), 45);
    assert!(batch.next.is_none());
    for (index, record) in batch.records.iter().enumerate() {
        let expected = synth.review(&app(), index, None);
        assert_eq!(record.get("reviewId"), Some(&Value::from(expected.review_id.as_str())));
        assert_eq!(record.get("content"), Some(&Value::from(expected.content.as_str())));
        assert_eq!(record.get("score"), Some(&Value::from(i64::from(expected.score))));
        assert_eq!(record.get("appVersion"), Some(&Value::from(expected.app_version.as_str())));
    }
}

#[tokio::test]
async fn detail_page_over_http_carries_its_url() {
    let base = serve(10).await;
    let detail = client(&base, 100).app_detail(&app()).await.unwrap();
    assert_eq!(detail.get("title"), Some(&Value::from("Notes")));
    assert_eq!(
        detail.get("url"),
        Some(&Value::from(format!(
            "{base}/store/apps/details?id=com.example.notes&hl=en&gl=us"
        )))
    );
}

#[tokio::test]
async fn publisher_listing_serves_json() {
    let base = serve(12).await;
    let url = format!(
        "{base}/androidpublisher/v3/applications/com.example.notes/reviews?maxResults=5&filter_score_with=3"
    );
    let response = reqwest::get(&url).await.unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("application/json"));

    let body: serde_json::Value = response.json().await.unwrap();
    let reviews = body["reviews"].as_array().unwrap();
    assert_eq!(reviews.len(), 5);
    assert!(reviews
        .iter()
        .all(|r| r["comments"][0]["userComment"]["starRating"] == 3));
    assert_eq!(body["pageInfo"]["startIndex"], -1);
    assert_eq!(body["tokenPagination"]["nextPageToken"], "mock-offset:5");
}

#[tokio::test]
async fn bad_publisher_parameters_are_rejected() {
    let base = serve(12).await;
    let url = format!("{base}/androidpublisher/v3/applications/com.example.notes/reviews?maxResults=x");
    let response = reqwest::get(&url).await.unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn health_endpoint_answers() {
    let base = serve(1).await;
    let body = reqwest::get(format!("{base}/healthz")).await.unwrap().text().await.unwrap();
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn search_over_http_decodes_results() {
    let base = serve(10).await;
    let results = client(&base, 100).search("note taking", 3).await.unwrap();
    let ids: Vec<_> = results
        .iter()
        .map(|r| r.get("appId").and_then(Value::as_str).map(str::to_string))
        .collect();
    assert_eq!(
        ids,
        [
            Some("com.example.notetaking".to_string()),
            Some("com.example.notetaking2".to_string()),
            Some("com.example.notetaking3".to_string()),
        ]
    );
}
