//! Error and retry-policy types for the batchexecute domain.
//!
//! Errors come in two tiers:
//!
//! - **Field tier**: [`LookupError`] is produced by the JSON-Path extractor
//!   when an index path does not resolve. It is always recovered by the
//!   field's declared fallback and never leaves the schema layer.
//! - **Structural / transport tier**: [`DecodeError`], [`TransportError`]
//!   and the umbrella [`FetchError`] are terminal for the current fetch and
//!   are surfaced to the caller with enough context (status, url) to diagnose.
//!
//! [`RetryPolicy`] is a cross-cutting concern: transports consult it to decide
//! whether a failed request may be re-issued.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::ValueKind;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// Returned by [`TransportError::retry_policy`] to let a transport decide
/// whether to re-issue a request without surfacing the failure.
///
/// - `Retryable` errors: network failures, timeouts, 5xx/429 responses and
///   gateway rate-limit bodies.
/// - `NonRetryable` errors: 404, other 4xx responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt. `None` means apply the
        /// caller's own back-off schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Field tier
// ---------------------------------------------------------------------------

/// Why an index path failed to resolve inside a value tree.
///
/// All three cases are ordinary results; the caller picks a fallback by
/// inspecting the variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// The container at `depth` has no element at `index`.
    #[error("index {index} not found at depth {depth}")]
    IndexNotFound {
        /// Index that was requested.
        index: usize,
        /// Zero-based position of the index within the path.
        depth: usize,
    },

    /// The value at `depth` is a scalar, so descent cannot continue.
    #[error("value at depth {depth} is {found}, not an array")]
    NotIndexable {
        /// Zero-based position of the index within the path.
        depth: usize,
        /// Kind of the value that blocked descent.
        found: ValueKind,
    },

    /// The path has no elements.
    #[error("empty index path")]
    InvalidPath,
}

// ---------------------------------------------------------------------------
// Schema errors
// ---------------------------------------------------------------------------

/// Programming errors in how a schema is used.
///
/// These are not fallback cases: they indicate a consumer asked for a field
/// the schema does not declare, or a record value with the wrong shape.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// The field is not declared for this record kind.
    #[error("field '{field}' is not declared for {kind} records")]
    UnknownField {
        /// Record kind name (e.g. `"Review"`).
        kind: &'static str,
        /// Requested field name.
        field: String,
    },

    /// A record field holds a value of an unexpected kind.
    #[error("field '{field}' expected {expected}, found {found}")]
    FieldType {
        /// Field name.
        field: String,
        /// Human-readable expectation (e.g. `"string"`).
        expected: &'static str,
        /// Kind actually found.
        found: ValueKind,
    },

    /// Encoding a field would overwrite a scalar with a nested array.
    #[error("cannot place a value at {path:?}: a {found} occupies depth {depth}")]
    PlacementConflict {
        /// Full path being written.
        path: Vec<usize>,
        /// Depth at which the conflicting scalar sits.
        depth: usize,
        /// Kind of the conflicting value.
        found: ValueKind,
    },
}

// ---------------------------------------------------------------------------
// Structural tier
// ---------------------------------------------------------------------------

/// Failures while stripping framing or parsing the embedded JSON.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The body does not carry the framing this decoder expects.
    #[error("protocol mismatch: {context}")]
    ProtocolMismatch {
        /// What was being looked for.
        context: String,
    },

    /// Framing matched, but the embedded JSON could not be parsed or has an
    /// unexpected outer shape.
    #[error("payload corrupt ({context}): {message}")]
    PayloadCorrupt {
        /// Which part of the payload failed.
        context: String,
        /// Parser or shape diagnostic.
        message: String,
    },
}

impl DecodeError {
    pub(crate) fn mismatch(context: impl Into<String>) -> Self {
        Self::ProtocolMismatch {
            context: context.into(),
        }
    }

    pub(crate) fn corrupt(context: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::PayloadCorrupt {
            context: context.into(),
            message: message.to_string(),
        }
    }
}

/// Failures reported by a [`crate::Transport`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The server answered 404.
    #[error("not found (404): {url}")]
    NotFound {
        /// Requested URL.
        url: String,
    },

    /// The server answered with a non-2xx status other than 404.
    #[error("http status {status}: {url}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// The request could not be sent or the body could not be read.
    #[error("network failure for {url}: {message}")]
    Network {
        /// Requested URL.
        url: String,
        /// Underlying client diagnostic.
        message: String,
    },

    /// The request did not complete within the configured timeout.
    #[error("request timed out: {url}")]
    Timeout {
        /// Requested URL.
        url: String,
    },

    /// The gateway reported rate limiting inside an otherwise successful body.
    #[error("rate limited by gateway: {url}")]
    RateLimited {
        /// Requested URL.
        url: String,
    },
}

impl TransportError {
    /// Retry classification for this failure.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Network { .. } | Self::Timeout { .. } | Self::RateLimited { .. } => {
                RetryPolicy::Retryable { after: None }
            }
            Self::Status { status, .. } if *status == 429 || *status >= 500 => {
                RetryPolicy::Retryable { after: None }
            }
            Self::Status { .. } | Self::NotFound { .. } => RetryPolicy::NonRetryable,
        }
    }

    /// The URL the failing request targeted.
    pub fn url(&self) -> &str {
        match self {
            Self::NotFound { url }
            | Self::Status { url, .. }
            | Self::Network { url, .. }
            | Self::Timeout { url }
            | Self::RateLimited { url } => url,
        }
    }
}

// ---------------------------------------------------------------------------
// Fetch-level errors
// ---------------------------------------------------------------------------

/// Terminal failure of one fetch operation (a single page or a whole
/// pagination loop).
///
/// A pagination loop aborts on the first `FetchError`; records collected by
/// earlier pages are discarded rather than returned partially.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The transport failed (after any retries it applies).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The response body could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A decoded record could not be shaped into its typed form.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The caller raised the cancellation flag before the next page.
    #[error("fetch cancelled")]
    Cancelled,

    /// The caller's deadline passed before the next page.
    #[error("fetch deadline exceeded")]
    DeadlineExceeded,

    /// The request parameters cannot be encoded.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// What is wrong with the request.
        message: String,
    },
}
