//! Core domain for the storefront batchexecute client.
//!
//! This crate holds the value tree, the JSON-Path extractor, the declarative
//! extraction schema, the protocol codec (both directions), the pagination
//! engine and the client façade. Transports implement the [`Transport`]
//! trait defined here; they never add protocol rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is sent and how replies are read; infrastructure crates
//! define *how* bytes move.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`value`] | `Value` tagged union and `place` |
//! | [`extract`] | `nested_lookup`, `RawDataset` |
//! | [`schema`] | `FieldSpec`, `ExtractionSchema`, `Record`, transforms |
//! | [`codec`] | request encoder/decoder, response decoder, wire encoder |
//! | [`transport`] | the `Transport` port |
//! | [`pagination`] | `ReviewPager`, `PageState`, `FetchControl` |
//! | [`client`] | `StorefrontClient` |
//! | [`identifiers`] | `AppId`, `PageToken` |
//! | [`types`] | `Sort`, `Device`, `ScoreFilter`, `ContinuationToken`, `Review` |
//! | [`config`] | `ClientConfig`, `TokenLayout` |
//! | [`errors`] | error tiers and `RetryPolicy` |

pub mod client;
pub mod codec;
pub mod config;
pub mod errors;
pub mod extract;
pub mod identifiers;
pub mod pagination;
pub mod schema;
pub mod transport;
pub mod types;
pub mod value;

// Re-export the working set at the crate root for downstream crates.
pub use client::{ReviewBatch, StorefrontClient};
pub use config::{ClientConfig, TokenLayout, DEFAULT_BASE_URL, DEFAULT_MAX_PER_FETCH};
pub use errors::{
    DecodeError, FetchError, LookupError, RetryPolicy, SchemaError, TransportError,
};
pub use extract::{nested_lookup, RawDataset};
pub use identifiers::{AppId, PageToken};
pub use pagination::{CancelFlag, FetchControl, PageOutcome, PageState, ReviewPager};
pub use schema::{ExtractionSchema, Fallback, FieldSet, FieldSpec, Record, RecordKind, Transform};
pub use transport::Transport;
pub use types::{
    ContinuationToken, Device, ParseCodeError, PermissionGroups, Review, ReviewQuery, ScoreFilter,
    Sort,
};
pub use value::{Value, ValueKind};
