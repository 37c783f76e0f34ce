//! Consistent-hash selection.

use std::sync::Arc;

use crate::balancer::ring::HashRing;
use crate::balancer::LoadBalancer;
use crate::registry::Backend;

/// Ring lookup keyed by a stable per-request identifier.
///
/// The routing key must be stable across requests for the same logical
/// client (an explicit override, the client address, or the request path);
/// a fresh random key per call would defeat node affinity entirely.
///
/// Membership is closed, so the ring is built once at construction and
/// read-only afterwards.
#[derive(Debug)]
pub struct ConsistentHash {
    ring: HashRing,
}

impl ConsistentHash {
    pub fn new(ring: HashRing) -> Self {
        Self { ring }
    }
}

impl LoadBalancer for ConsistentHash {
    fn next_server(&self, backends: &[Arc<Backend>], routing_key: &str) -> Option<Arc<Backend>> {
        let addr = match self.ring.get_node(routing_key) {
            Ok(addr) => addr,
            Err(e) => {
                // Unreachable when the ring was populated from a non-empty
                // registry at construction.
                tracing::error!(error = %e, "consistent hash lookup failed");
                return None;
            }
        };
        backends.iter().find(|b| b.addr == addr).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(n: usize) -> Vec<Arc<Backend>> {
        (0..n)
            .map(|i| Arc::new(Backend::new(format!("127.0.0.1:{}", 8080 + i).parse().unwrap(), 1)))
            .collect()
    }

    fn ring_for(backends: &[Arc<Backend>]) -> HashRing {
        let mut ring = HashRing::new(100);
        for b in backends {
            ring.add_node(b.addr);
        }
        ring
    }

    #[test]
    fn stable_key_maps_to_stable_backend() {
        let backends = pool(3);
        let lb = ConsistentHash::new(ring_for(&backends));

        let owner = lb.next_server(&backends, "/api/users/17").unwrap().addr;
        for _ in 0..50 {
            assert_eq!(lb.next_server(&backends, "/api/users/17").unwrap().addr, owner);
        }
    }

    #[test]
    fn empty_ring_yields_none() {
        let backends = pool(2);
        let lb = ConsistentHash::new(HashRing::new(100));
        assert!(lb.next_server(&backends, "key").is_none());
    }

    #[test]
    fn keys_spread_across_backends() {
        let backends = pool(3);
        let lb = ConsistentHash::new(ring_for(&backends));

        let mut seen = std::collections::HashSet::new();
        for i in 0..300 {
            let key = format!("session-{}", i);
            seen.insert(lb.next_server(&backends, &key).unwrap().addr);
        }
        assert_eq!(seen.len(), 3);
    }
}
