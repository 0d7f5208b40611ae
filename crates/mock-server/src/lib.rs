//! Protocol-faithful test double for the storefront.
//!
//! The mock answers the same requests the live storefront does, with bodies
//! built by the same codec the client decodes with. Reviews, app details and
//! search results are synthesized deterministically and placed into wire
//! payloads through the extraction schema, so a client pointed at the mock
//! decodes exactly what was synthesized.
//!
//! ## Architectural Layer
//!
//! **Infrastructure / test double.** Depends on the `batchexecute` domain
//! crate for the codec and schema; adds synthesis, an in-memory
//! [`Transport`](batchexecute::Transport) and an `axum` HTTP surface.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`synth`] | `Synthesizer`, raw review, detail and search values |
//! | [`storefront`] | `Storefront`: form body, detail or search request → wire body |
//! | [`memory`] | `InMemoryStorefront` transport |
//! | [`publisher`] | androidpublisher listing, reshaped from decoded reviews |
//! | [`devices`] | reviewer phone pool |
//! | [`server`] | `axum` router and state |
//! | [`config`] | `MockConfig` from environment variables |
//! | [`errors`] | `MockError` |

pub mod config;
pub mod devices;
pub mod errors;
pub mod memory;
pub mod publisher;
pub mod server;
pub mod storefront;
pub mod synth;

use std::sync::Arc;

use batchexecute::ExtractionSchema;

pub use config::{ConfigError, MockConfig};
pub use errors::MockError;
pub use memory::InMemoryStorefront;
pub use server::{build_router, AppState};
pub use storefront::Storefront;
pub use synth::Synthesizer;

/// A storefront over the standard schema.
pub fn standard_storefront(seed: u64, total_reviews: usize) -> Arc<Storefront> {
    Arc::new(Storefront::new(
        Synthesizer::new(seed, total_reviews),
        Arc::new(ExtractionSchema::standard()),
    ))
}
