//! Consistent hash ring.
//!
//! # Responsibilities
//! - Maintain a sorted map from hash-space position to backend address
//! - Spread each backend over `virtual_nodes` ring positions
//! - Resolve a key to the owning backend with wrap-around
//!
//! # Design Decisions
//! - BTreeMap gives the ordered positions and the `range(hash..)` lookup is
//!   the binary search over them
//! - Adding or removing one node only remaps keys on that node's arcs,
//!   which is the point of a ring over naive modulo hashing

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::net::SocketAddr;

use thiserror::Error;

/// Lookup on a ring with no nodes.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("hash ring is empty")]
pub struct EmptyRing;

/// Sorted mapping from hash position to backend address.
#[derive(Debug)]
pub struct HashRing {
    positions: BTreeMap<u64, SocketAddr>,
    virtual_nodes: u32,
}

impl HashRing {
    /// Create an empty ring with `virtual_nodes` positions per backend.
    /// A zero count is bumped to one so every node keeps at least one arc.
    pub fn new(virtual_nodes: u32) -> Self {
        Self {
            positions: BTreeMap::new(),
            virtual_nodes: virtual_nodes.max(1),
        }
    }

    /// Insert all virtual positions for `addr`.
    pub fn add_node(&mut self, addr: SocketAddr) {
        for v in 0..self.virtual_nodes {
            let position = hash_position(&format!("{}:{}", addr, v));
            self.positions.insert(position, addr);
        }
    }

    /// Remove every position belonging to `addr`.
    pub fn remove_node(&mut self, addr: SocketAddr) {
        self.positions.retain(|_, node| *node != addr);
    }

    /// Resolve `key` to the backend owning the first position at or after
    /// its hash, wrapping to the ring's first position.
    pub fn get_node(&self, key: &str) -> Result<SocketAddr, EmptyRing> {
        if self.positions.is_empty() {
            return Err(EmptyRing);
        }
        let hash = hash_position(key);
        let node = self
            .positions
            .range(hash..)
            .next()
            .or_else(|| self.positions.iter().next())
            .map(|(_, addr)| *addr);
        // Non-empty map always yields a node after wrap-around.
        node.ok_or(EmptyRing)
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }
}

fn hash_position(key: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}
