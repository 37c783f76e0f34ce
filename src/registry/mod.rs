//! Backend registry.
//!
//! # Responsibilities
//! - Own the set of backend descriptors and their live counters
//! - Expose atomic, race-free counter adjustments to the dispatcher
//! - Enforce closed membership: the pool is fixed at construction
//!
//! # Design Decisions
//! - Counters are lock-free atomics; strategies only ever read them, the
//!   dispatcher is the only mutator, the health prober owns the health flag
//! - Decrements clamp at zero; an attempted underflow indicates a
//!   bookkeeping race and is recorded, not surfaced

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::config::BackendConfig;
use crate::error::DispatchError;
use crate::observability::metrics;

/// Smoothing factor denominator for the response-time EWMA.
const EWMA_WEIGHT: u64 = 8;

/// A single backend server and its live load state.
#[derive(Debug)]
pub struct Backend {
    /// Network address of the backend.
    pub addr: SocketAddr,
    /// Pre-calculated base URL, avoids re-parsing per request.
    pub base_url: Url,
    /// Weight for weighted selection (>= 1).
    pub weight: u32,

    current_connections: AtomicUsize,
    requests_in_flight: AtomicUsize,
    healthy: AtomicBool,
    /// Rolling response time in microseconds; 0 means no sample yet.
    response_time_us: AtomicU64,
}

impl Backend {
    pub fn new(addr: SocketAddr, weight: u32) -> Self {
        // Addresses are validated before construction, so this cannot fail.
        let base_url = Url::parse(&format!("http://{}", addr))
            .unwrap_or_else(|_| unreachable!("socket address always forms a valid URL"));
        Self {
            addr,
            base_url,
            weight,
            current_connections: AtomicUsize::new(0),
            requests_in_flight: AtomicUsize::new(0),
            healthy: AtomicBool::new(true),
            response_time_us: AtomicU64::new(0),
        }
    }

    /// Number of connections currently open to this backend.
    pub fn connections(&self) -> usize {
        self.current_connections.load(Ordering::Relaxed)
    }

    /// Number of requests currently being processed by this backend.
    pub fn in_flight(&self) -> usize {
        self.requests_in_flight.load(Ordering::Relaxed)
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    /// Overwrite the health flag. Called only from the health prober.
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
        metrics::record_backend_health(&self.addr.to_string(), healthy);
    }

    /// Rolling response time in microseconds (0 = no sample yet).
    pub fn response_time_us(&self) -> u64 {
        self.response_time_us.load(Ordering::Relaxed)
    }

    /// Fold a completed-dispatch latency sample into the rolling average.
    pub fn record_response_time(&self, elapsed: Duration) {
        let sample = elapsed.as_micros().min(u64::MAX as u128) as u64;
        let _ = self
            .response_time_us
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |prev| {
                if prev == 0 {
                    Some(sample)
                } else {
                    Some(prev - prev / EWMA_WEIGHT + sample / EWMA_WEIGHT)
                }
            });
    }
}

/// Ordered, closed-membership collection of backends.
///
/// Order matters: round-robin rotates in sequence order and ties in the
/// least-* strategies break toward the earlier backend.
#[derive(Debug)]
pub struct Registry {
    backends: Vec<Arc<Backend>>,
}

impl Registry {
    /// Build the registry from configuration.
    ///
    /// Fails with `InvalidConfiguration` on an empty list, an unparseable
    /// address, or a duplicate address.
    pub fn new(configs: &[BackendConfig]) -> Result<Self, DispatchError> {
        if configs.is_empty() {
            return Err(DispatchError::InvalidConfiguration(
                "backend pool is empty".into(),
            ));
        }

        let mut backends: Vec<Arc<Backend>> = Vec::with_capacity(configs.len());
        for config in configs {
            let addr: SocketAddr = config.address.parse().map_err(|_| {
                DispatchError::InvalidConfiguration(format!(
                    "invalid backend address: {}",
                    config.address
                ))
            })?;
            if backends.iter().any(|b| b.addr == addr) {
                return Err(DispatchError::InvalidConfiguration(format!(
                    "duplicate backend address: {}",
                    addr
                )));
            }
            backends.push(Arc::new(Backend::new(addr, config.weight.max(1))));
        }

        Ok(Self { backends })
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// The current backend set, in configuration order.
    ///
    /// Membership is closed, so a borrow of the slice is a consistent
    /// snapshot; only the counters inside each descriptor move.
    pub fn snapshot(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    /// Adjust the connection counter for `addr` by `delta`.
    ///
    /// Unknown addresses are ignored (closed membership makes them a
    /// programming error, not a request failure). Decrements clamp at zero.
    pub fn adjust_connections(&self, addr: SocketAddr, delta: i64) {
        if let Some(backend) = self.find(addr) {
            adjust_clamped(&backend.current_connections, delta, "connections", addr);
        }
    }

    /// Adjust the in-flight request counter for `addr` by `delta`.
    pub fn adjust_in_flight(&self, addr: SocketAddr, delta: i64) {
        if let Some(backend) = self.find(addr) {
            adjust_clamped(&backend.requests_in_flight, delta, "in_flight", addr);
        }
    }

    fn find(&self, addr: SocketAddr) -> Option<&Arc<Backend>> {
        self.backends.iter().find(|b| b.addr == addr)
    }
}

/// Apply a signed delta to a counter, clamping at zero.
///
/// An attempted decrement below zero is a bookkeeping invariant violation;
/// it is logged and counted but never surfaced to the request path.
fn adjust_clamped(counter: &AtomicUsize, delta: i64, name: &'static str, addr: SocketAddr) {
    if delta >= 0 {
        counter.fetch_add(delta as usize, Ordering::Relaxed);
        return;
    }
    let sub = delta.unsigned_abs() as usize;
    let mut clamped = false;
    let _ = counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |prev| {
        clamped = prev < sub;
        Some(prev.saturating_sub(sub))
    });
    if clamped {
        tracing::warn!(
            backend = %addr,
            counter = name,
            "counter decrement below zero, clamping"
        );
        metrics::record_counter_clamp(name);
    }
}
