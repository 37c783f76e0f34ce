//! IP-hash selection.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::balancer::LoadBalancer;
use crate::registry::Backend;

/// Maps a routing key (normally the client address) to a fixed pool index.
///
/// `index = hash(key) % N`, deterministic for a given key and pool size;
/// used for session affinity without a ring.
#[derive(Debug, Default)]
pub struct IpHash;

impl IpHash {
    pub fn new() -> Self {
        Self::default()
    }
}

fn hash_key(key: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

impl LoadBalancer for IpHash {
    fn next_server(&self, backends: &[Arc<Backend>], routing_key: &str) -> Option<Arc<Backend>> {
        if backends.is_empty() {
            return None;
        }
        let index = (hash_key(routing_key) % backends.len() as u64) as usize;
        Some(backends[index].clone())
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

    #[test]
    fn same_key_always_maps_to_same_backend() {
        let lb = IpHash::new();
        let backends = pool(5);

        let first = lb.next_server(&backends, "10.0.0.7:51123").unwrap().addr;
        for _ in 0..20 {
            assert_eq!(lb.next_server(&backends, "10.0.0.7:51123").unwrap().addr, first);
        }
    }

    #[test]
    fn distinct_keys_spread_over_the_pool() {
        let lb = IpHash::new();
        let backends = pool(4);

        let mut seen = std::collections::HashSet::new();
        for i in 0..200 {
            let key = format!("10.0.{}.1:40000", i);
            seen.insert(lb.next_server(&backends, &key).unwrap().addr);
        }
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn empty_pool_yields_none() {
        let lb = IpHash::new();
        assert!(lb.next_server(&[], "10.0.0.1:1").is_none());
    }
}
