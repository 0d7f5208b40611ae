//! Client configuration.

use serde::{Deserialize, Serialize};

/// Storefront origin used when no override is configured.
pub const DEFAULT_BASE_URL: &str = "https://play.google.com";

/// Largest page the storefront serves in one review request.
pub const DEFAULT_MAX_PER_FETCH: usize = 1000;

/// Where the next-page token sits in a decoded review payload.
///
/// Two conventions have been observed in live traffic. Both are kept until
/// traffic samples settle which one is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenLayout {
    /// Last element of `inner[len - 2]`. A list in that slot means "no more
    /// pages".
    #[default]
    Trailing,
    /// `inner[len - 2][1]`, read only when the row has at least four entries
    /// and the inner payload at least three.
    Positional,
}

/// Settings shared by every fetch a client issues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Scheme and host, without trailing slash.
    pub base_url: String,
    pub lang: String,
    pub country: String,
    /// Upper bound on the page size of a single review request.
    pub max_per_fetch: usize,
    pub token_layout: TokenLayout,
}

impl ClientConfig {
    /// Sets the origin, trimming any trailing `/`.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            lang: "en".to_string(),
            country: "us".to_string(),
            max_per_fetch: DEFAULT_MAX_PER_FETCH,
            token_layout: TokenLayout::default(),
        }
    }
}
