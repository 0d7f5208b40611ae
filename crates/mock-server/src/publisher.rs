//! The androidpublisher-style review listing.
//!
//! This surface is not produced from synthesis directly: it runs the real
//! [`StorefrontClient`] over the in-memory transport and reshapes the
//! decoded reviews, so anything it serves has been through the same
//! encoder, decoder and schema as a live fetch.

use std::collections::HashMap;

use batchexecute::{
    AppId, ContinuationToken, FetchControl, PageToken, Review, ReviewQuery, ScoreFilter,
    StorefrontClient, Transport, DEFAULT_MAX_PER_FETCH,
};
use chrono::Utc;
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::devices::{phone_for, DeviceMetadata};
use crate::errors::MockError;

/// Page size when `maxResults` is absent.
pub const DEFAULT_MAX_RESULTS: usize = 100;

// ---------------------------------------------------------------------------
// Response body
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewsListResponse {
    pub reviews: Vec<PublisherReview>,
    pub token_pagination: TokenPagination,
    pub page_info: PageInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublisherReview {
    pub review_id: String,
    pub author_name: String,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub user_comment: UserComment,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserComment {
    pub text: String,
    pub last_modified: Timestamp,
    pub star_rating: i64,
    pub reviewer_language: String,
    pub device: String,
    pub android_os_version: i64,
    pub app_version_code: i64,
    pub app_version_name: String,
    pub thumbs_up_count: i64,
    pub thumbs_down_count: i64,
    pub device_metadata: DeviceMetadata,
    pub original_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: i32,
}

/// Empty strings stand for "no token".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPagination {
    pub next_page_token: String,
    pub previous_page_token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// The requested page size; the corpus size is not disclosed.
    pub total_results: usize,
    pub result_per_page: usize,
    /// `-1` while more pages follow, `0` on the last one.
    pub start_index: i64,
}

impl PublisherReview {
    fn from_review(review: Review, lang: &str) -> Self {
        let review_id = review.review_id.unwrap_or_default();
        let text = review.content.unwrap_or_default();
        let seconds = review.at.unwrap_or_else(Utc::now).timestamp();
        let device_key = Uuid::new_v5(&Uuid::NAMESPACE_OID, review_id.as_bytes()).as_u128() as u64;
        Self {
            author_name: review.user_name.unwrap_or_default(),
            comments: vec![Comment {
                user_comment: UserComment {
                    text: text.clone(),
                    last_modified: Timestamp { seconds, nanos: 0 },
                    star_rating: review.score.unwrap_or_default(),
                    reviewer_language: lang.to_string(),
                    device: String::new(),
                    android_os_version: 0,
                    app_version_code: 0,
                    app_version_name: review.app_version,
                    thumbs_up_count: review.thumbs_up_count.unwrap_or_default(),
                    thumbs_down_count: 0,
                    device_metadata: *phone_for(device_key),
                    original_text: text,
                },
            }],
            review_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// Parsed query string of a listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherQuery {
    pub token: Option<PageToken>,
    pub max_results: usize,
    pub lang: String,
    pub country: String,
    pub score_filter: Option<ScoreFilter>,
}

impl PublisherQuery {
    /// Reads `token`, `maxResults`, `lang`, `country` and
    /// `filter_score_with`. Empty values count as absent.
    ///
    /// # Errors
    ///
    /// [`MockError::BadRequest`] for a non-numeric `maxResults` or a score
    /// outside 1 to 5.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, MockError> {
        let param = |name: &str| params.get(name).map(String::as_str).filter(|v| !v.is_empty());
        let max_results = match param("maxResults") {
            Some(raw) => raw.parse().map_err(|_| MockError::BadRequest {
                message: format!("invalid maxResults parameter '{raw}'"),
            })?,
            None => DEFAULT_MAX_RESULTS,
        };
        let score_filter = param("filter_score_with")
            .map(|raw| {
                raw.parse::<ScoreFilter>().map_err(|e| MockError::BadRequest {
                    message: format!("invalid filter_score_with parameter: {e}"),
                })
            })
            .transpose()?;
        Ok(Self {
            token: param("token").and_then(PageToken::new),
            max_results,
            lang: param("lang").unwrap_or("en").to_string(),
            country: param("country").unwrap_or("us").to_string(),
            score_filter,
        })
    }

    fn review_query(&self) -> ReviewQuery {
        ReviewQuery {
            lang: self.lang.clone(),
            country: self.country.clone(),
            count: self.max_results,
            score_filter: self.score_filter,
            ..ReviewQuery::default()
        }
    }
}

/// Fetches one listing page through `client` and reshapes it.
///
/// # Errors
///
/// [`MockError::Fetch`] when the client run fails (an unknown token
/// surfaces as a 400 from the storefront), [`MockError::Fetch`] wrapping a
/// schema error when a decoded review has a field of the wrong kind.
#[instrument(skip(client, query), fields(app_id = %app_id, max_results = query.max_results))]
pub async fn list_reviews<T: Transport>(
    client: &StorefrontClient<T>,
    app_id: &AppId,
    query: &PublisherQuery,
) -> Result<ReviewsListResponse, MockError> {
    let review_query = query.review_query();
    let control = FetchControl::unbounded();
    let batch = match &query.token {
        Some(token) => {
            let resume = ContinuationToken::resume(token.clone(), &review_query, DEFAULT_MAX_PER_FETCH);
            client.resume(app_id, resume, &control).await?
        }
        None => client.reviews(app_id, &review_query, &control).await?,
    };
    let reviews = batch.reviews().map_err(batchexecute::FetchError::from)?;
    let next_page_token = batch
        .next
        .map(|next| next.token.to_string())
        .unwrap_or_default();

    Ok(ReviewsListResponse {
        page_info: PageInfo {
            total_results: query.max_results,
            result_per_page: reviews.len(),
            start_index: if next_page_token.is_empty() { 0 } else { -1 },
        },
        reviews: reviews
            .into_iter()
            .map(|review| PublisherReview::from_review(review, &query.lang))
            .collect(),
        token_pagination: TokenPagination {
            next_page_token,
            previous_page_token: String::new(),
        },
    })
}
