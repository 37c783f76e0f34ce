//! HTTP front-end glue.
//!
//! # Responsibilities
//! - Build the Axum router with a catch-all proxy handler
//! - Attach request-ID, timeout and trace middleware
//! - Translate inbound requests into `DispatchRequest`s and engine errors
//!   into HTTP statuses
//! - Spawn the background health monitor in interval mode
//!
//! The engine itself lives in `dispatch`; nothing here selects backends.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header::HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{DispatchConfig, ProbeMode};
use crate::dispatch::{DispatchRequest, Dispatcher};
use crate::error::DispatchError;
use crate::health::{HealthMonitor, HttpProber};
use crate::observability::metrics;
use crate::transport::HttpTransport;

/// Largest request body buffered for replay across retries.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Application state injected into the handler.
#[derive(Clone)]
struct AppState {
    dispatcher: Arc<Dispatcher<HttpTransport, HttpProber>>,
}

/// HTTP server wrapping the dispatch engine.
pub struct ProxyServer {
    router: Router,
    config: DispatchConfig,
    dispatcher: Arc<Dispatcher<HttpTransport, HttpProber>>,
}

impl ProxyServer {
    /// Wire the engine from configuration.
    pub fn new(config: DispatchConfig) -> Result<Self, DispatchError> {
        let transport = HttpTransport::new(Duration::from_secs(config.timeouts.request_secs));
        let prober = HttpProber::new(
            config.health_check.path.clone(),
            Duration::from_millis(config.health_check.timeout_ms),
        );
        let dispatcher = Arc::new(Dispatcher::new(&config, transport, prober)?);

        let state = AppState {
            dispatcher: dispatcher.clone(),
        };
        let router = Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(TraceLayer::new_for_http());

        Ok(Self {
            router,
            config,
            dispatcher,
        })
    }

    /// Serve until ctrl-c, with graceful shutdown of the health monitor.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "proxy server starting");

        let (shutdown_tx, _) = broadcast::channel(1);
        if self.config.health_check.mode == ProbeMode::Interval {
            let monitor = HealthMonitor::new(
                self.dispatcher.registry(),
                HttpProber::new(
                    self.config.health_check.path.clone(),
                    Duration::from_millis(self.config.health_check.timeout_ms),
                ),
                Duration::from_secs(self.config.health_check.interval_secs),
            );
            let rx = shutdown_tx.subscribe();
            tokio::spawn(async move {
                monitor.run(rx).await;
            });
        }

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        let _ = shutdown_tx.send(());
        tracing::info!("proxy server stopped");
        Ok(())
    }
}

/// Main proxy handler: translate, dispatch, translate back.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(peer_addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let method = request.method().clone();
    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.to_string())
        .unwrap_or_else(|| "/".to_string());
    let routing_key = request
        .headers()
        .get("x-routing-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let (parts, body) = request.into_parts();
    let mut headers = parts.headers;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        headers.insert("x-request-id", value);
    }

    // Buffer the body so failed attempts can be replayed.
    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "failed to buffer request body");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path_and_query,
        peer = %peer_addr,
        "dispatching request"
    );

    let dispatch_request = DispatchRequest {
        method,
        path_and_query,
        headers,
        body,
        peer_addr: Some(peer_addr),
        routing_key,
    };

    match state.dispatcher.dispatch(dispatch_request).await {
        Ok(response) => response.into_response(),
        Err(e @ DispatchError::Unavailable(_)) => {
            tracing::warn!(request_id = %request_id, error = %e, "request failed");
            metrics::record_request("none", 503, start_time);
            (StatusCode::SERVICE_UNAVAILABLE, "Service unavailable").into_response()
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "dispatch error");
            metrics::record_request("none", 500, start_time);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
        }
    }
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        return;
    }
    tracing::info!("shutdown signal received");
}
