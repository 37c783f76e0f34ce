//! Least-response-time selection.

use std::sync::Arc;

use crate::balancer::LoadBalancer;
use crate::registry::Backend;

/// Selects the healthy backend with the lowest rolling response time.
///
/// Samples come from completed dispatches (the dispatcher folds each
/// attempt's latency into the backend's EWMA). A backend with no sample yet
/// reads as zero and therefore sorts first, so cold backends get traffic
/// until they have a measurement.
#[derive(Debug, Default)]
pub struct LeastResponseTime;

impl LeastResponseTime {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for LeastResponseTime {
    fn next_server(&self, backends: &[Arc<Backend>], _routing_key: &str) -> Option<Arc<Backend>> {
        backends
            .iter()
            .filter(|b| b.is_healthy())
            .min_by_key(|b| b.response_time_us())
            .cloned()
    }
}
