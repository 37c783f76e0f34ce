//! Weighted round-robin selection.

use std::sync::Arc;

use rand::Rng;

use crate::balancer::LoadBalancer;
use crate::registry::Backend;

/// Picks backends with probability proportional to their weight.
///
/// Draws a uniform integer in `[0, total_weight)` and walks the pool
/// accumulating weight bands until the draw falls inside one.
#[derive(Debug, Default)]
pub struct WeightedRoundRobin;

impl WeightedRoundRobin {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for WeightedRoundRobin {
    fn next_server(&self, backends: &[Arc<Backend>], _routing_key: &str) -> Option<Arc<Backend>> {
        if backends.is_empty() {
            return None;
        }

        let total_weight: u64 = backends.iter().map(|b| u64::from(b.weight)).sum();
        if total_weight == 0 {
            return Some(backends[0].clone());
        }

        let draw = rand::thread_rng().gen_range(0..total_weight);
        let mut cumulative = 0u64;
        for backend in backends {
            cumulative += u64::from(backend.weight);
            if draw < cumulative {
                return Some(backend.clone());
            }
        }

        // Unreachable with well-formed weights; fall back to the first.
        Some(backends[0].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn frequency_tracks_weight() {
        let lb = WeightedRoundRobin::new();
        let light = Arc::new(Backend::new("127.0.0.1:8080".parse().unwrap(), 1));
        let heavy = Arc::new(Backend::new("127.0.0.1:8081".parse().unwrap(), 3));
        let backends = vec![light.clone(), heavy.clone()];

        let trials = 20_000;
        let mut counts: HashMap<std::net::SocketAddr, u32> = HashMap::new();
        for _ in 0..trials {
            let pick = lb.next_server(&backends, "").unwrap();
            *counts.entry(pick.addr).or_insert(0) += 1;
        }

        // heavy should take ~75% of selections; allow a generous band.
        let heavy_share = f64::from(counts[&heavy.addr]) / f64::from(trials);
        assert!(
            (0.70..0.80).contains(&heavy_share),
            "heavy share out of band: {}",
            heavy_share
        );
    }

    #[test]
    fn single_backend_always_wins() {
        let lb = WeightedRoundRobin::new();
        let only = Arc::new(Backend::new("127.0.0.1:8080".parse().unwrap(), 7));
        let backends = vec![only.clone()];
        for _ in 0..50 {
            assert_eq!(lb.next_server(&backends, "").unwrap().addr, only.addr);
        }
    }

    #[test]
    fn empty_pool_yields_none() {
        let lb = WeightedRoundRobin::new();
        assert!(lb.next_server(&[], "").is_none());
    }
}
