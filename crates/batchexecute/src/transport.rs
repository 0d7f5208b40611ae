//! The transport port.
//!
//! The domain never opens a socket. Every byte goes through a [`Transport`]:
//! the live HTTP adapter in `http-transport`, the in-memory synthesiser in
//! `mock-server`, or a scripted double in tests.

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::TransportError;

/// Moves request bodies to the storefront and response bodies back.
///
/// Implementations map non-2xx statuses to [`TransportError`] (404 as
/// [`TransportError::NotFound`]) and return the body of a 2xx response as
/// text. Any retry policy lives inside the implementation; a returned error
/// is final for the call.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POSTs a `application/x-www-form-urlencoded` body.
    async fn post_form(&self, url: &str, body: &str) -> Result<String, TransportError>;

    /// GETs a page.
    async fn get(&self, url: &str) -> Result<String, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn post_form(&self, url: &str, body: &str) -> Result<String, TransportError> {
        (**self).post_form(url, body).await
    }

    async fn get(&self, url: &str) -> Result<String, TransportError> {
        (**self).get(url).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn post_form(&self, url: &str, body: &str) -> Result<String, TransportError> {
        (**self).post_form(url, body).await
    }

    async fn get(&self, url: &str) -> Result<String, TransportError> {
        (**self).get(url).await
    }
}
