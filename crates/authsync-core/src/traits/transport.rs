//! HTTP transport trait.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::types::{HttpRequest, HttpResponse};

/// Executes provider HTTP requests.
///
/// A base transport returns `Ok` for every exchange that produced a
/// response, whatever its status; status interpretation belongs to the
/// layers above it.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request).await
    }
}
