//! Request dispatcher.
//!
//! # Responsibilities
//! - Drive the per-request lifecycle: select → probe → account → send → retry
//! - Own the strategy instance and the backend registry
//! - Convert exhausted retries into the terminal unavailable error
//!
//! # Lifecycle
//! ```text
//! Selecting → Probing → Dispatching → Success
//!     ↑                     │
//!     └──── backoff ←───────┘ (transport failure, retry budget left)
//! ```
//!
//! # Design Decisions
//! - Counters move only around the transport call; probing and I/O run
//!   with no lock held
//! - Retries cover transport failures only; non-success HTTP statuses from
//!   a reachable backend pass through untouched
//! - A failed inline probe is terminal for the request: no re-selection

pub mod backoff;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method};

use crate::balancer::{self, LoadBalancer};
use crate::config::{DispatchConfig, ProbeMode, RetryConfig};
use crate::error::{DispatchError, Unavailable};
use crate::health::HealthProbe;
use crate::observability::metrics;
use crate::registry::Registry;
use crate::transport::{Transport, UpstreamResponse};

/// Per-request ephemeral state handed to the dispatcher.
///
/// The body is buffered so failed attempts can be replayed.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub method: Method,
    /// Path and query of the target, e.g. `/api/users?page=2`.
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Address of the requesting client, when known.
    pub peer_addr: Option<SocketAddr>,
    /// Explicit affinity key; overrides the derived key.
    pub routing_key: Option<String>,
}

impl DispatchRequest {
    pub fn get(path_and_query: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path_and_query: path_and_query.into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            peer_addr: None,
            routing_key: None,
        }
    }

    /// The stable key fed to affinity strategies: explicit override, else
    /// client address, else request path. Never randomly generated — a
    /// fresh key per call would defeat ring affinity.
    pub fn routing_key(&self) -> String {
        if let Some(key) = &self.routing_key {
            return key.clone();
        }
        if let Some(addr) = self.peer_addr {
            return addr.to_string();
        }
        self.path_and_query.clone()
    }
}

/// The orchestrator: resolves the strategy, probes health, accounts
/// counters, invokes the transport and drives the retry loop.
pub struct Dispatcher<T, P> {
    registry: Arc<Registry>,
    balancer: Box<dyn LoadBalancer>,
    transport: T,
    prober: P,
    retry: RetryConfig,
    probe_mode: ProbeMode,
}

impl<T: Transport, P: HealthProbe> Dispatcher<T, P> {
    /// Build a dispatcher from configuration.
    ///
    /// Fails with `InvalidConfiguration` when the backend pool is empty or
    /// malformed; the consistent-hash ring is populated here so a
    /// constructed dispatcher never sees an empty ring.
    pub fn new(config: &DispatchConfig, transport: T, prober: P) -> Result<Self, DispatchError> {
        let registry = Arc::new(Registry::new(&config.backends)?);
        let balancer = balancer::build(
            config.strategy,
            &registry,
            config.consistent_hash.virtual_nodes,
        );

        tracing::info!(
            strategy = ?config.strategy,
            backends = registry.len(),
            max_retries = config.retries.max_retries,
            probe_mode = ?config.health_check.mode,
            "dispatcher ready"
        );

        Ok(Self {
            registry,
            balancer,
            transport,
            prober,
            retry: config.retries.clone(),
            probe_mode: config.health_check.mode,
        })
    }

    /// The backend registry, shared with the background health monitor.
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Dispatch one request.
    ///
    /// Transport failures are retried with exponential backoff up to the
    /// configured budget, re-selecting a backend each time. Everything else
    /// is terminal on the first attempt.
    pub async fn dispatch(
        &self,
        request: DispatchRequest,
    ) -> Result<UpstreamResponse, DispatchError> {
        let routing_key = request.routing_key();
        let started_overall = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            // Selecting: strategy reads a registry snapshot, no I/O.
            let backend = self
                .balancer
                .next_server(self.registry.snapshot(), &routing_key)
                .ok_or(Unavailable::NoBackend)?;

            // Probing: network I/O, no engine state held across it.
            let healthy = match self.probe_mode {
                ProbeMode::Inline => self.prober.probe(&backend).await,
                ProbeMode::Interval => backend.is_healthy(),
            };
            if !healthy {
                tracing::warn!(backend = %backend.addr, "selected backend unhealthy, failing request");
                return Err(Unavailable::ProbeFailed(backend.addr).into());
            }

            // Dispatching: account, send, settle.
            self.registry.adjust_connections(backend.addr, 1);
            self.registry.adjust_in_flight(backend.addr, 1);
            let started = Instant::now();

            let outcome = self.transport.send(&backend, &request).await;

            self.registry.adjust_in_flight(backend.addr, -1);
            self.registry.adjust_connections(backend.addr, -1);

            match outcome {
                Ok(response) => {
                    // Feeds the least-response-time strategy.
                    backend.record_response_time(started.elapsed());
                    metrics::record_request(
                        &backend.addr.to_string(),
                        response.status().as_u16(),
                        started_overall,
                    );
                    return Ok(response);
                }
                Err(e) => {
                    if attempt >= self.retry.max_retries {
                        tracing::error!(
                            backend = %backend.addr,
                            attempts = attempt + 1,
                            error = %e,
                            "retries exhausted"
                        );
                        return Err(Unavailable::RetriesExhausted {
                            attempts: attempt + 1,
                            source: e,
                        }
                        .into());
                    }

                    attempt += 1;
                    let delay = backoff::calculate_backoff(
                        attempt,
                        self.retry.base_delay_ms,
                        self.retry.max_delay_ms,
                    );
                    tracing::warn!(
                        backend = %backend.addr,
                        attempt,
                        delay = ?delay,
                        error = %e,
                        "transport failure, retrying"
                    );
                    metrics::record_retry();
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
