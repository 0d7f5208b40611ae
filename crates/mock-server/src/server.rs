//! HTTP surface of the mock storefront.
//!
//! | Method | Path | Answer |
//! |--------|------|--------|
//! | POST | `/_/PlayStoreUi/data/batchexecute` | framed review or permission payload |
//! | GET | `/store/apps/details?id=` | detail page with `AF_initDataCallback` chunks |
//! | GET | `/store/search?q=` | search page with the results in `ds:4` |
//! | GET | `/androidpublisher/v3/applications/{app_id}/reviews` | publisher JSON listing |
//! | GET | `/healthz` | `ok` |

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use batchexecute::codec::{BATCHEXECUTE_PATH, DETAILS_PATH, SEARCH_PATH};
use batchexecute::{AppId, StorefrontClient};
use serde_json::json;
use tracing::{instrument, warn};

use crate::errors::MockError;
use crate::memory::InMemoryStorefront;
use crate::publisher::{list_reviews, PublisherQuery, ReviewsListResponse};
use crate::storefront::Storefront;

/// Path of the publisher listing, in axum's route syntax.
pub const PUBLISHER_REVIEWS_ROUTE: &str = "/androidpublisher/v3/applications/:app_id/reviews";

/// Content type of batchexecute answers.
const BATCH_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    storefront: Arc<Storefront>,
    client: Arc<StorefrontClient<InMemoryStorefront>>,
}

impl AppState {
    /// State whose publisher listing runs a default-configured client over
    /// the same storefront the protocol routes serve.
    pub fn new(storefront: Arc<Storefront>) -> Self {
        let client = StorefrontClient::with_defaults(InMemoryStorefront::new(storefront.clone()));
        Self {
            storefront,
            client: Arc::new(client),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(BATCHEXECUTE_PATH, post(batchexecute))
        .route(DETAILS_PATH, get(details))
        .route(SEARCH_PATH, get(search))
        .route(PUBLISHER_REVIEWS_ROUTE, get(publisher_reviews))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn batchexecute(State(state): State<AppState>, body: String) -> Result<Response, MockError> {
    let payload = state.storefront.batchexecute(&body)?;
    Ok(([(CONTENT_TYPE, BATCH_CONTENT_TYPE)], payload).into_response())
}

#[instrument(skip(state, params))]
async fn details(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Html<String>, MockError> {
    let app_id = params
        .get("id")
        .and_then(|id| AppId::new(id.as_str()))
        .ok_or_else(|| MockError::BadRequest {
            message: "missing 'id' query parameter".to_string(),
        })?;
    state.storefront.detail_page(&app_id).map(Html)
}

#[instrument(skip(state, params))]
async fn search(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Html<String>, MockError> {
    let query = params.get("q").map(String::as_str).unwrap_or_default();
    state.storefront.search_page(query).map(Html)
}

async fn publisher_reviews(
    State(state): State<AppState>,
    Path(app_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ReviewsListResponse>, MockError> {
    let app_id = AppId::new(app_id).ok_or_else(|| MockError::BadRequest {
        message: "empty app id".to_string(),
    })?;
    let query = PublisherQuery::from_params(&params)?;
    list_reviews(&state.client, &app_id, &query).await.map(Json)
}

async fn healthz() -> &'static str {
    "ok"
}

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            warn!(error = %self, "mock request failed");
        }
        let body = Json(json!({
            "error": { "code": status.as_u16(), "message": self.to_string() }
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::Synthesizer;
    use batchexecute::ExtractionSchema;

    #[test]
    fn errors_render_as_json_with_their_status() {
        let response = MockError::UnknownToken { token: "x".into() }.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let response = MockError::NotFound { path: "/x".into() }.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn router_builds_with_shared_state() {
        let storefront = Storefront::new(Synthesizer::new(1, 5), Arc::new(ExtractionSchema::standard()));
        let _router = build_router(AppState::new(Arc::new(storefront)));
    }
}
