//! Background health monitoring (interval probe mode).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::health::HealthProbe;
use crate::registry::Registry;

/// Periodically probes every backend and refreshes its health flag,
/// decoupling probe latency from request latency.
pub struct HealthMonitor<P> {
    registry: Arc<Registry>,
    prober: P,
    interval: Duration,
}

impl<P: HealthProbe> HealthMonitor<P> {
    pub fn new(registry: Arc<Registry>, prober: P, interval: Duration) -> Self {
        Self {
            registry,
            prober,
            interval,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            backends = self.registry.len(),
            "health monitor starting"
        );

        let mut ticker = time::interval(self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("health monitor shutting down");
                    break;
                }
            }
        }
    }

    async fn check_all(&self) {
        for backend in self.registry.snapshot() {
            let healthy = self.prober.probe(backend).await;
            tracing::debug!(backend = %backend.addr, healthy, "probe complete");
        }
    }
}
