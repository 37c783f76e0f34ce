//! Load balancing strategies.
//!
//! # Data Flow
//! ```text
//! Dispatcher → next_server(registry snapshot, routing key)
//!     → round_robin.rs   (rotate a shared cursor)
//!     → weighted.rs      (random draw over weight bands)
//!     → random.rs        (uniform choice)
//!     → least_conn.rs    (fewest open connections)
//!     → least_requests.rs (fewest in-flight, healthy only)
//!     → least_response.rs (lowest rolling latency, healthy only)
//!     → ip_hash.rs       (hash key modulo pool size)
//!     → consistent_hash.rs (ring lookup, ring.rs)
//! ```
//!
//! # Design Decisions
//! - Selection is synchronous, bounded-time and never touches the network;
//!   probing and I/O belong to the dispatcher and health modules
//! - The strategy is chosen once at construction from the closed
//!   `StrategyKind` enum, so adding a variant forces every match to be
//!   revisited

pub mod consistent_hash;
pub mod ip_hash;
pub mod least_conn;
pub mod least_requests;
pub mod least_response;
pub mod random;
pub mod ring;
pub mod round_robin;
pub mod weighted;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::registry::{Backend, Registry};

/// A backend selection policy.
///
/// `routing_key` is a stable per-request identifier (client address, path,
/// or an explicit override); only the affinity strategies consume it.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    fn next_server(&self, backends: &[Arc<Backend>], routing_key: &str) -> Option<Arc<Backend>>;
}

/// The closed set of selection policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    RoundRobin,
    WeightedRoundRobin,
    Random,
    LeastConnections,
    LeastRequests,
    LeastResponseTime,
    IpHash,
    ConsistentHash,
}

/// Instantiate the configured strategy.
///
/// The consistent-hash ring is populated here from the registry, so a
/// non-empty registry guarantees a non-empty ring.
pub fn build(kind: StrategyKind, registry: &Registry, virtual_nodes: u32) -> Box<dyn LoadBalancer> {
    match kind {
        StrategyKind::RoundRobin => Box::new(round_robin::RoundRobin::new()),
        StrategyKind::WeightedRoundRobin => Box::new(weighted::WeightedRoundRobin::new()),
        StrategyKind::Random => Box::new(random::Random::new()),
        StrategyKind::LeastConnections => Box::new(least_conn::LeastConnections::new()),
        StrategyKind::LeastRequests => Box::new(least_requests::LeastRequests::new()),
        StrategyKind::LeastResponseTime => Box::new(least_response::LeastResponseTime::new()),
        StrategyKind::IpHash => Box::new(ip_hash::IpHash::new()),
        StrategyKind::ConsistentHash => {
            let mut ring = ring::HashRing::new(virtual_nodes);
            for backend in registry.snapshot() {
                ring.add_node(backend.addr);
            }
            Box::new(consistent_hash::ConsistentHash::new(ring))
        }
    }
}
