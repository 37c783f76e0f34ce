//! Uniform random selection.

use std::sync::Arc;

use crate::balancer::LoadBalancer;
use crate::registry::Backend;

/// Uniform choice over the whole pool, ignoring health and load.
#[derive(Debug, Default)]
pub struct Random;

impl Random {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for Random {
    fn next_server(&self, backends: &[Arc<Backend>], _routing_key: &str) -> Option<Arc<Backend>> {
        if backends.is_empty() {
            return None;
        }
        Some(backends[fastrand::usize(..backends.len())].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_backend_is_reachable() {
        let lb = Random::new();
        let backends: Vec<_> = (0..3)
            .map(|i| Arc::new(Backend::new(format!("127.0.0.1:{}", 8080 + i).parse().unwrap(), 1)))
            .collect();

        let mut seen = std::collections::HashSet::new();
        for _ in 0..500 {
            seen.insert(lb.next_server(&backends, "").unwrap().addr);
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn empty_pool_yields_none() {
        let lb = Random::new();
        assert!(lb.next_server(&[], "").is_none());
    }
}
