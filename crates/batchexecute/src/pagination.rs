//! The review pagination engine.
//!
//! One fetch-all operation is a two-state machine:
//!
//! - [`PageState::Fetching`]: quota remains, so the next page is requested
//!   with `min(remaining, max_per_fetch)` as its size.
//! - [`PageState::Done`]: the quota is met, the server sent no next-page
//!   token, or a page came back empty.
//!
//! Pages are strictly sequential; the next request is not encoded until the
//! previous response has been decoded. Records are kept in server order and
//! pages are not truncated: a server that over-delivers is believed. Any
//! transport or decode failure aborts the loop and the records gathered so
//! far are dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, instrument, warn};

use crate::codec::{batchexecute_url, decode_reviews, BatchRequest, ReviewsRequest};
use crate::config::ClientConfig;
use crate::errors::FetchError;
use crate::identifiers::{AppId, PageToken};
use crate::schema::{ExtractionSchema, Record, RecordKind};
use crate::transport::Transport;
use crate::types::ReviewQuery;

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// A shared flag a caller raises to stop a pagination loop between pages.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Cancellation and deadline, checked before every page request.
#[derive(Debug, Clone, Default)]
pub struct FetchControl {
    pub cancel: CancelFlag,
    pub deadline: Option<Instant>,
}

impl FetchControl {
    /// No deadline and a fresh, unraised flag.
    pub fn unbounded() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// # Errors
    ///
    /// [`FetchError::Cancelled`] once the flag is raised, otherwise
    /// [`FetchError::DeadlineExceeded`] once the deadline has passed.
    pub fn check(&self) -> Result<(), FetchError> {
        if self.cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(FetchError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Where a pagination loop stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageState {
    Fetching {
        remaining: usize,
        token: Option<PageToken>,
    },
    Done {
        /// The live token when the loop stopped on quota; `None` when the
        /// server had no more pages.
        token: Option<PageToken>,
    },
}

impl PageState {
    /// The starting state for `requested` reviews, resuming from `token`.
    ///
    /// A zero request is `Done` immediately and keeps the incoming token.
    pub fn start(requested: usize, token: Option<PageToken>) -> Self {
        if requested == 0 {
            Self::Done { token }
        } else {
            Self::Fetching {
                remaining: requested,
                token,
            }
        }
    }

    /// The state after a page, given the running total and the page's token.
    pub fn after_page(
        requested: usize,
        collected: usize,
        page_len: usize,
        next_token: Option<PageToken>,
    ) -> Self {
        let remaining = requested.saturating_sub(collected);
        match next_token {
            Some(token) if remaining > 0 && page_len > 0 => Self::Fetching {
                remaining,
                token: Some(token),
            },
            token => Self::Done { token },
        }
    }
}

/// Records gathered by one loop plus the token to resume from.
#[derive(Debug, Clone, PartialEq)]
pub struct PageOutcome {
    pub records: Vec<Record>,
    pub next_token: Option<PageToken>,
    /// Requests actually issued.
    pub pages: usize,
}

/// Drives encode, send, decode and extract for review pages.
pub struct ReviewPager<'a, T: ?Sized> {
    transport: &'a T,
    schema: &'a ExtractionSchema,
    config: &'a ClientConfig,
}

impl<'a, T: Transport + ?Sized> ReviewPager<'a, T> {
    pub fn new(transport: &'a T, schema: &'a ExtractionSchema, config: &'a ClientConfig) -> Self {
        Self {
            transport,
            schema,
            config,
        }
    }

    /// Collects up to `query.count` reviews, starting from `token`.
    ///
    /// # Errors
    ///
    /// - [`FetchError::InvalidRequest`] if `max_per_fetch` is zero.
    /// - [`FetchError::Cancelled`] / [`FetchError::DeadlineExceeded`] from
    ///   `control`, checked before each page.
    /// - Any transport or decode failure of any page.
    #[instrument(
        name = "reviews.paginate",
        skip(self, app_id, query, token, control),
        fields(app_id = %app_id, requested = query.count)
    )]
    pub async fn collect(
        &self,
        app_id: &AppId,
        query: &ReviewQuery,
        max_per_fetch: usize,
        token: Option<PageToken>,
        control: &FetchControl,
    ) -> Result<PageOutcome, FetchError> {
        if max_per_fetch == 0 {
            return Err(FetchError::InvalidRequest {
                message: "max_per_fetch must be at least 1".to_string(),
            });
        }

        let url = batchexecute_url(&self.config.base_url, &query.lang, &query.country);
        let mut records = Vec::new();
        let mut pages = 0usize;
        let mut state = PageState::start(query.count, token);

        loop {
            let (remaining, token) = match state {
                PageState::Done { token } => {
                    debug!(pages, collected = records.len(), has_token = token.is_some(), "pagination done");
                    return Ok(PageOutcome {
                        records,
                        next_token: token,
                        pages,
                    });
                }
                PageState::Fetching { remaining, token } => (remaining, token),
            };

            control.check()?;
            pages += 1;
            let batch = remaining.min(max_per_fetch);
            let request = BatchRequest::Reviews(ReviewsRequest {
                app_id: app_id.clone(),
                sort: query.sort,
                count: batch,
                token,
                score_filter: query.score_filter,
                device_filter: query.device_filter,
            });

            let body = self
                .transport
                .post_form(&url, &request.encode_form())
                .await
                .inspect_err(|e| warn!(page = pages, error = %e, "review page request failed"))?;
            let page = decode_reviews(&body, self.config.token_layout)
                .inspect_err(|e| warn!(page = pages, error = %e, "review page did not decode"))?;

            let page_len = page.items.len();
            records.extend(
                page.items
                    .iter()
                    .map(|item| self.schema.extract(RecordKind::Review, item)),
            );
            debug!(
                page = pages,
                batch,
                received = page_len,
                has_token = page.next_token.is_some(),
                "review page decoded"
            );

            state = PageState::after_page(query.count, records.len(), page_len, page.next_token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(s: &str) -> Option<PageToken> {
        PageToken::new(s)
    }

    #[test]
    fn zero_request_is_done_with_incoming_token() {
        assert_eq!(
            PageState::start(0, token("t")),
            PageState::Done { token: token("t") }
        );
    }

    #[test]
    fn quota_met_keeps_the_live_token() {
        assert_eq!(
            PageState::after_page(100, 100, 100, token("more")),
            PageState::Done { token: token("more") }
        );
    }

    #[test]
    fn missing_token_ends_the_loop() {
        assert_eq!(
            PageState::after_page(250, 120, 20, None),
            PageState::Done { token: None }
        );
    }

    #[test]
    fn remaining_quota_with_token_keeps_fetching() {
        assert_eq!(
            PageState::after_page(250, 200, 100, token("p3")),
            PageState::Fetching {
                remaining: 50,
                token: token("p3")
            }
        );
    }

    #[test]
    fn empty_page_stops_even_with_token() {
        assert_eq!(
            PageState::after_page(250, 0, 0, token("again")),
            PageState::Done { token: token("again") }
        );
    }

    #[test]
    fn control_reports_cancel_before_deadline() {
        let control = FetchControl::unbounded().with_deadline(Instant::now());
        assert!(matches!(control.check(), Err(FetchError::DeadlineExceeded)));
        control.cancel.cancel();
        assert!(matches!(control.check(), Err(FetchError::Cancelled)));
    }

    #[test]
    fn cancel_flag_is_shared_between_clones() {
        let flag = CancelFlag::new();
        let control = FetchControl::unbounded().with_cancel(flag.clone());
        assert!(control.check().is_ok());
        flag.cancel();
        assert!(control.cancel.is_cancelled());
    }
}
