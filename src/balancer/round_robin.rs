//! Round-robin selection.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::balancer::LoadBalancer;
use crate::registry::Backend;

/// Rotates through backends in configuration order.
///
/// The cursor advances atomically with the read that produces the chosen
/// index, so concurrent callers never observe the same index twice in a
/// row. Health is not consulted here; the dispatcher probes the candidate.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for RoundRobin {
    fn next_server(&self, backends: &[Arc<Backend>], _routing_key: &str) -> Option<Arc<Backend>> {
        if backends.is_empty() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % backends.len();
        Some(backends[index].clone())
    }
}
