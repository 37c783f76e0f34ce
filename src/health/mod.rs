//! Health probing.
//!
//! # Responsibilities
//! - Define the abstract probe capability the dispatcher depends on
//! - Provide the HTTP prober used by the proxy binary
//! - Run the optional background monitor (interval mode)
//!
//! # Design Decisions
//! - The prober is the sole writer of a backend's health flag
//! - Two scheduling modes: inline (probe the candidate before every
//!   dispatch) and interval (background loop refreshes the flags, the
//!   request path only reads them)

pub mod monitor;

use std::future::Future;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;

use crate::registry::Backend;

pub use monitor::HealthMonitor;

/// Capability to check a backend's liveness.
///
/// Implementations probe and then store the result on the backend, so the
/// flag always reflects the latest probe.
pub trait HealthProbe: Send + Sync {
    /// Probe `backend`, update its health flag, and return the result.
    fn probe(&self, backend: &Backend) -> impl Future<Output = bool> + Send;
}

/// HTTP liveness prober: GET a configured path and require a success
/// status within the timeout.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client<HttpConnector, Body>,
    path: String,
    timeout: Duration,
}

impl HttpProber {
    pub fn new(path: String, timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            path,
            timeout,
        }
    }
}

impl HealthProbe for HttpProber {
    async fn probe(&self, backend: &Backend) -> bool {
        let uri = format!(
            "{}{}",
            backend.base_url.as_str().trim_end_matches('/'),
            self.path
        );

        let request = match Request::builder()
            .method("GET")
            .uri(uri)
            .header("user-agent", "backend-dispatch-health-check")
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(error = %e, "failed to build health check request");
                return false;
            }
        };

        let healthy = match tokio::time::timeout(self.timeout, self.client.request(request)).await {
            Ok(Ok(response)) => {
                let success = response.status().is_success();
                if !success {
                    tracing::warn!(
                        backend = %backend.addr,
                        status = %response.status(),
                        "health check failed: non-success status"
                    );
                }
                success
            }
            Ok(Err(e)) => {
                tracing::warn!(backend = %backend.addr, error = %e, "health check failed: connection error");
                false
            }
            Err(_) => {
                tracing::warn!(backend = %backend.addr, "health check failed: timeout");
                false
            }
        };

        backend.set_healthy(healthy);
        healthy
    }
}
