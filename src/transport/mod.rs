//! Request transport.
//!
//! # Responsibilities
//! - Define the abstract send capability the dispatcher depends on
//! - Provide the HTTP implementation used by the proxy binary
//!
//! # Design Decisions
//! - The engine never names a concrete client; tests inject mock transports
//! - Transport failures are a distinct error type so the retry loop can
//!   tell them apart from application-level error statuses

use std::future::Future;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use thiserror::Error;

use crate::dispatch::DispatchRequest;
use crate::registry::Backend;

/// Response handed back to the caller, body streamed through as-is.
pub type UpstreamResponse = Response<Body>;

/// A transport-level failure. Recovered by the dispatcher's retry loop up
/// to the configured budget, then converted to a terminal error.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    #[error("upstream request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("failed to build upstream request: {0}")]
    Request(#[from] axum::http::Error),
}

/// Capability to send a request to a chosen backend.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        backend: &Backend,
        request: &DispatchRequest,
    ) -> impl Future<Output = Result<UpstreamResponse, TransportError>> + Send;
}

/// HTTP transport over the hyper-util legacy client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client<HttpConnector, Body>,
    request_timeout: Duration,
}

impl HttpTransport {
    pub fn new(request_timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            request_timeout,
        }
    }
}

impl Transport for HttpTransport {
    async fn send(
        &self,
        backend: &Backend,
        request: &DispatchRequest,
    ) -> Result<UpstreamResponse, TransportError> {
        // base_url carries a trailing "/"; path_and_query is absolute.
        let uri = format!(
            "{}{}",
            backend.base_url.as_str().trim_end_matches('/'),
            request.path_and_query
        );

        let mut builder = Request::builder().method(request.method.clone()).uri(uri);
        if let Some(headers) = builder.headers_mut() {
            for (name, value) in request.headers.iter() {
                headers.insert(name.clone(), value.clone());
            }
        }
        let req = builder.body(Body::from(request.body.clone()))?;

        let response: Response<hyper::body::Incoming> =
            tokio::time::timeout(self.request_timeout, self.client.request(req))
                .await
                .map_err(|_| TransportError::Timeout(self.request_timeout))??;

        let (parts, body) = response.into_parts();
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}
