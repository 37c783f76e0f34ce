//! End-to-end tests through the HTTP front-end against mock TCP backends.

use std::net::SocketAddr;
use std::time::Duration;

use backend_dispatch::balancer::StrategyKind;
use backend_dispatch::config::{BackendConfig, DispatchConfig, ProbeMode};
use backend_dispatch::server::ProxyServer;

mod common;

fn base_config(proxy: SocketAddr, backends: &[SocketAddr]) -> DispatchConfig {
    let mut config = DispatchConfig::default();
    config.listener.bind_address = proxy.to_string();
    config.backends = backends
        .iter()
        .map(|a| BackendConfig {
            address: a.to_string(),
            weight: 1,
        })
        .collect();
    config.health_check.path = "/".to_string();
    config.health_check.timeout_ms = 500;
    config.retries.base_delay_ms = 10;
    config.retries.max_delay_ms = 50;
    config
}

async fn spawn_proxy(config: DispatchConfig) {
    let listener = tokio::net::TcpListener::bind(&config.listener.bind_address)
        .await
        .unwrap();
    let server = ProxyServer::new(config).unwrap();
    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });
    tokio::time::sleep(Duration::from_millis(200)).await;
}

#[tokio::test]
async fn round_robin_alternates_across_backends() {
    let b1: SocketAddr = "127.0.0.1:29181".parse().unwrap();
    let b2: SocketAddr = "127.0.0.1:29182".parse().unwrap();
    let proxy: SocketAddr = "127.0.0.1:29183".parse().unwrap();

    common::start_mock_backend(b1, "b1").await;
    common::start_mock_backend(b2, "b2").await;

    let mut config = base_config(proxy, &[b1, b2]);
    config.strategy = StrategyKind::RoundRobin;
    spawn_proxy(config).await;

    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap();

    let mut bodies = Vec::new();
    for _ in 0..4 {
        let res = client
            .get(format!("http://{}", proxy))
            .send()
            .await
            .expect("proxy unreachable");
        assert_eq!(res.status(), 200);
        bodies.push(res.text().await.unwrap());
    }

    assert_eq!(bodies, vec!["b1", "b2", "b1", "b2"]);
}

#[tokio::test]
async fn dead_backend_fails_its_probe_with_503() {
    // No listener behind `dead`; the inline probe fails and the request is
    // terminal without touching the live backend out of turn.
    let dead: SocketAddr = "127.0.0.1:29281".parse().unwrap();
    let alive: SocketAddr = "127.0.0.1:29282".parse().unwrap();
    let proxy: SocketAddr = "127.0.0.1:29283".parse().unwrap();

    common::start_mock_backend(alive, "alive").await;

    let mut config = base_config(proxy, &[dead, alive]);
    config.strategy = StrategyKind::RoundRobin;
    spawn_proxy(config).await;

    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap();

    let mut statuses = Vec::new();
    for _ in 0..4 {
        let res = client
            .get(format!("http://{}", proxy))
            .send()
            .await
            .expect("proxy unreachable");
        statuses.push(res.status().as_u16());
    }

    // Rotation lands on the dead backend every other request.
    assert_eq!(statuses, vec![503, 200, 503, 200]);
}

#[tokio::test]
async fn interval_monitor_steers_traffic_off_dead_backend() {
    let dead: SocketAddr = "127.0.0.1:29381".parse().unwrap();
    let alive: SocketAddr = "127.0.0.1:29382".parse().unwrap();
    let proxy: SocketAddr = "127.0.0.1:29383".parse().unwrap();

    common::start_mock_backend(alive, "alive").await;

    let mut config = base_config(proxy, &[dead, alive]);
    config.strategy = StrategyKind::LeastRequests;
    config.health_check.mode = ProbeMode::Interval;
    config.health_check.interval_secs = 1;
    spawn_proxy(config).await;

    // Let the monitor complete a probe round.
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    for _ in 0..5 {
        let res = client
            .get(format!("http://{}", proxy))
            .send()
            .await
            .expect("proxy unreachable");
        assert_eq!(res.status(), 200);
        assert_eq!(res.text().await.unwrap(), "alive");
    }
}

#[tokio::test]
async fn routing_key_header_gives_session_affinity() {
    let b1: SocketAddr = "127.0.0.1:29481".parse().unwrap();
    let b2: SocketAddr = "127.0.0.1:29482".parse().unwrap();
    let b3: SocketAddr = "127.0.0.1:29483".parse().unwrap();
    let proxy: SocketAddr = "127.0.0.1:29484".parse().unwrap();

    common::start_mock_backend(b1, "b1").await;
    common::start_mock_backend(b2, "b2").await;
    common::start_mock_backend(b3, "b3").await;

    let mut config = base_config(proxy, &[b1, b2, b3]);
    config.strategy = StrategyKind::ConsistentHash;
    spawn_proxy(config).await;

    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap();

    let mut bodies = std::collections::HashSet::new();
    for _ in 0..6 {
        let res = client
            .get(format!("http://{}", proxy))
            .header("x-routing-key", "session-xyz")
            .send()
            .await
            .expect("proxy unreachable");
        assert_eq!(res.status(), 200);
        bodies.insert(res.text().await.unwrap());
    }

    assert_eq!(bodies.len(), 1, "one session key must map to one backend");
}
