//! Least-requests selection.

use std::sync::Arc;

use crate::balancer::LoadBalancer;
use crate::registry::Backend;

/// Selects the healthy backend with the fewest in-flight requests.
///
/// Returns `None` when no backend is healthy.
#[derive(Debug, Default)]
pub struct LeastRequests;

impl LeastRequests {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for LeastRequests {
    fn next_server(&self, backends: &[Arc<Backend>], _routing_key: &str) -> Option<Arc<Backend>> {
        backends
            .iter()
            .filter(|b| b.is_healthy())
            .min_by_key(|b| b.in_flight())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use crate::registry::Registry;

    #[test]
    fn picks_minimum_in_flight_among_healthy() {
        let registry = Registry::new(&[
            BackendConfig { address: "127.0.0.1:8080".into(), weight: 1 },
            BackendConfig { address: "127.0.0.1:8081".into(), weight: 1 },
        ])
        .unwrap();
        let lb = LeastRequests::new();

        registry.adjust_in_flight("127.0.0.1:8080".parse().unwrap(), 2);
        let pick = lb.next_server(registry.snapshot(), "").unwrap();
        assert_eq!(pick.addr, "127.0.0.1:8081".parse().unwrap());
    }

    #[test]
    fn unhealthy_backends_are_excluded() {
        let b1 = Arc::new(Backend::new("127.0.0.1:8080".parse().unwrap(), 1));
        let b2 = Arc::new(Backend::new("127.0.0.1:8081".parse().unwrap(), 1));
        b1.set_healthy(false);
        let lb = LeastRequests::new();

        let pick = lb.next_server(&[b1.clone(), b2.clone()], "").unwrap();
        assert_eq!(pick.addr, b2.addr);
    }

    #[test]
    fn none_when_all_unhealthy() {
        let b1 = Arc::new(Backend::new("127.0.0.1:8080".parse().unwrap(), 1));
        b1.set_healthy(false);
        let lb = LeastRequests::new();
        assert!(lb.next_server(&[b1], "").is_none());
    }
}
