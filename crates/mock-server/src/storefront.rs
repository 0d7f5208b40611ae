//! The protocol core shared by every mock surface.
//!
//! [`Storefront`] answers batchexecute form bodies, detail-page requests and
//! searches with bodies in exactly the wire shape the live storefront uses. It holds
//! no I/O; the in-memory transport and the axum handlers are thin shells
//! around it.

use std::sync::Arc;

use batchexecute::codec::{
    encode_detail_page, encode_permissions_response, encode_reviews_response, encode_search_page,
    BatchRequest, ReviewsRequest,
};
use batchexecute::{AppId, ExtractionSchema, PageToken};
use tracing::{debug, instrument};

use crate::errors::MockError;
use crate::synth::{permission_sections, Synthesizer};

/// Prefix of every page token this mock issues; the rest is the offset of
/// the next review.
const TOKEN_PREFIX: &str = "mock-offset:";

/// Synthesizes storefront responses for any app id.
#[derive(Debug, Clone)]
pub struct Storefront {
    synth: Synthesizer,
    schema: Arc<ExtractionSchema>,
}

impl Storefront {
    pub fn new(synth: Synthesizer, schema: Arc<ExtractionSchema>) -> Self {
        Self { synth, schema }
    }

    pub fn synthesizer(&self) -> &Synthesizer {
        &self.synth
    }

    pub fn schema(&self) -> &ExtractionSchema {
        &self.schema
    }

    /// Answers one `f.req` form body.
    ///
    /// # Errors
    ///
    /// [`MockError::BadRequest`] for bodies the request decoder rejects,
    /// [`MockError::UnknownToken`] for page tokens this mock did not issue.
    pub fn batchexecute(&self, body: &str) -> Result<String, MockError> {
        match BatchRequest::decode_form(body)? {
            BatchRequest::Reviews(request) => self.review_page(&request),
            BatchRequest::Permissions { app_id } => {
                debug!(%app_id, "serving permissions");
                Ok(encode_permissions_response(permission_sections()))
            }
        }
    }

    /// One page of reviews, newest first.
    ///
    /// The page starts at the offset carried by the request token (0 when
    /// absent) and holds `count` reviews, fewer at the end of the corpus.
    /// Every page but the last carries a token for the next offset. Sort
    /// order and device filter are accepted and ignored.
    ///
    /// # Errors
    ///
    /// [`MockError::UnknownToken`] for a token without the mock prefix.
    #[instrument(skip(self, request), fields(app_id = %request.app_id, count = request.count))]
    pub fn review_page(&self, request: &ReviewsRequest) -> Result<String, MockError> {
        let start = match &request.token {
            Some(token) => parse_token(token)?,
            None => 0,
        };
        let total = self.synth.total_reviews();
        let end = start.saturating_add(request.count).min(total);
        let items = (start.min(end)..end)
            .map(|index| {
                self.synth
                    .review_item(&self.schema, &request.app_id, index, request.score_filter)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let next = (end < total).then(|| page_token(end)).flatten();
        debug!(start, end, has_next = next.is_some(), "serving review page");
        Ok(encode_reviews_response(items, next.as_ref()))
    }

    /// The detail page for `app_id`.
    ///
    /// # Errors
    ///
    /// [`MockError::Synthesis`] if the detail fields do not fit the schema.
    pub fn detail_page(&self, app_id: &AppId) -> Result<String, MockError> {
        let dataset = self.synth.detail_dataset(&self.schema, app_id)?;
        debug!(%app_id, chunks = dataset.len(), "serving detail page");
        Ok(encode_detail_page(&dataset))
    }

    /// The search page for `query`.
    ///
    /// # Errors
    ///
    /// [`MockError::BadRequest`] for a blank query, [`MockError::Synthesis`]
    /// if the search fields do not fit the schema.
    #[instrument(skip(self))]
    pub fn search_page(&self, query: &str) -> Result<String, MockError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(MockError::BadRequest {
                message: "missing 'q' query parameter".to_string(),
            });
        }
        let (top, hits) = self.synth.search_results(&self.schema, query)?;
        debug!(hits = hits.len(), "serving search page");
        Ok(encode_search_page(top, hits))
    }
}

fn page_token(offset: usize) -> Option<PageToken> {
    PageToken::new(format!("{TOKEN_PREFIX}{offset}"))
}

fn parse_token(token: &PageToken) -> Result<usize, MockError> {
    token
        .as_str()
        .strip_prefix(TOKEN_PREFIX)
        .and_then(|offset| offset.parse().ok())
        .ok_or_else(|| MockError::UnknownToken {
            token: token.to_string(),
        })
}
