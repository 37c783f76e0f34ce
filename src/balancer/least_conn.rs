//! Least-connections selection.

use std::sync::Arc;

use crate::balancer::LoadBalancer;
use crate::registry::Backend;

/// Selects the backend with the fewest open connections.
///
/// Ties break toward the earlier backend in configuration order. Health is
/// deliberately not consulted: connection count is the sole criterion.
#[derive(Debug, Default)]
pub struct LeastConnections;

impl LeastConnections {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for LeastConnections {
    fn next_server(&self, backends: &[Arc<Backend>], _routing_key: &str) -> Option<Arc<Backend>> {
        // min_by_key keeps the first minimum, giving the stable tie-break.
        backends.iter().min_by_key(|b| b.connections()).cloned()
    }
}
