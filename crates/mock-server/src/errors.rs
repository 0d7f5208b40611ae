//! Error types for the mock storefront.
//!
//! A [`MockError`] is what a handler returns instead of a body. Each variant
//! maps onto one HTTP status via [`MockError::status`], which both the
//! in-memory transport and the axum surface use, so a caller sees the same
//! failure whichever way it reaches the mock.

use batchexecute::{DecodeError, FetchError, SchemaError, TransportError};
use thiserror::Error;

/// Why the mock could not answer a request.
#[derive(Debug, Error)]
pub enum MockError {
    /// The request body or query could not be understood.
    #[error("bad request: {message}")]
    BadRequest { message: String },

    /// A page token this mock never issued.
    #[error("unknown page token '{token}'")]
    UnknownToken { token: String },

    /// No surface is mounted at this path.
    #[error("no mock surface at '{path}'")]
    NotFound { path: String },

    /// Synthesized values did not fit the extraction schema.
    #[error("synthesis failed: {0}")]
    Synthesis(#[from] SchemaError),

    /// The client run behind the publisher surface failed.
    #[error("review fetch failed: {0}")]
    Fetch(#[from] FetchError),
}

impl From<DecodeError> for MockError {
    fn from(error: DecodeError) -> Self {
        Self::BadRequest {
            message: error.to_string(),
        }
    }
}

impl MockError {
    /// HTTP status this error is served with.
    pub fn status(&self) -> u16 {
        match self {
            Self::BadRequest { .. } | Self::UnknownToken { .. } => 400,
            Self::NotFound { .. } => 404,
            Self::Fetch(FetchError::Transport(TransportError::Status { status, .. })) => *status,
            Self::Fetch(FetchError::InvalidRequest { .. }) => 400,
            Self::Synthesis(_) | Self::Fetch(_) => 500,
        }
    }

    /// The transport-level failure a client of the in-memory surface sees.
    pub fn into_transport_error(self, url: &str) -> TransportError {
        match self.status() {
            404 => TransportError::NotFound {
                url: url.to_string(),
            },
            status => TransportError::Status {
                status,
                url: url.to_string(),
            },
        }
    }
}
