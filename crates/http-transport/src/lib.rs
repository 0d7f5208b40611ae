//! Live HTTP adapter for the batchexecute [`Transport`] port.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate knows how to move bytes over HTTPS with
//! `reqwest`; it knows nothing about payload shapes beyond the gateway's
//! rate-limit marker.
//!
//! ## Behaviour
//!
//! - 2xx bodies are returned as text.
//! - 404 maps to [`TransportError::NotFound`]; other non-2xx statuses to
//!   [`TransportError::Status`].
//! - A 2xx body containing the gateway error marker is
//!   [`TransportError::RateLimited`].
//! - Retryable failures are re-issued per [`RetrySettings`]; the error of
//!   the last attempt is returned.

mod retry;

use std::time::Duration;

use async_trait::async_trait;
use batchexecute::codec::{FORM_CONTENT_TYPE, RATE_LIMIT_MARKER};
use batchexecute::{Transport, TransportError};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};

pub use retry::RetrySettings;

/// Browser-like user agent; the storefront serves reduced pages to unknown
/// agents.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Connection and retry settings for [`HttpTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    /// Whole-request timeout, per attempt.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
    pub retry: RetrySettings,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retry: RetrySettings::default(),
        }
    }
}

/// The HTTP client could not be constructed.
#[derive(Debug, Error)]
#[error("failed to build HTTP client: {0}")]
pub struct BuildError(#[from] reqwest::Error);

/// [`Transport`] over a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    settings: HttpSettings,
}

enum Method<'a> {
    Get,
    PostForm(&'a str),
}

impl HttpTransport {
    /// # Errors
    ///
    /// [`BuildError`] if the TLS backend cannot be initialised.
    pub fn new(settings: HttpSettings) -> Result<Self, BuildError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(settings.connect_timeout)
            .user_agent(settings.user_agent.clone())
            .build()?;
        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &HttpSettings {
        &self.settings
    }

    async fn send_once(&self, method: &Method<'_>, url: &str) -> Result<String, TransportError> {
        let request = match method {
            Method::Get => self.client.get(url),
            Method::PostForm(body) => self
                .client
                .post(url)
                .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
                .body(body.to_string()),
        };
        let response = request.send().await.map_err(|e| classify(url, &e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(TransportError::NotFound {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let text = response.text().await.map_err(|e| classify(url, &e))?;
        if text.contains(RATE_LIMIT_MARKER) {
            return Err(TransportError::RateLimited {
                url: url.to_string(),
            });
        }
        Ok(text)
    }

    async fn send(&self, method: Method<'_>, url: &str) -> Result<String, TransportError> {
        let mut attempt = 0u32;
        let mut rate_limited = 0u32;
        loop {
            attempt += 1;
            let error = match self.send_once(&method, url).await {
                Ok(body) => {
                    debug!(url, attempt, bytes = body.len(), "request succeeded");
                    return Ok(body);
                }
                Err(error) => error,
            };
            if matches!(error, TransportError::RateLimited { .. }) {
                rate_limited += 1;
            }
            let Some(delay) = self.settings.retry.delay_after(attempt, rate_limited, &error) else {
                warn!(url, attempt, error = %error, "request failed");
                return Err(error);
            };
            warn!(url, attempt, ?delay, error = %error, "request failed, retrying");
            tokio::time::sleep(delay).await;
        }
    }
}

fn classify(url: &str, error: &reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout {
            url: url.to_string(),
        }
    } else {
        TransportError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_form(&self, url: &str, body: &str) -> Result<String, TransportError> {
        self.send(Method::PostForm(body), url).await
    }

    async fn get(&self, url: &str) -> Result<String, TransportError> {
        self.send(Method::Get, url).await
    }
}
