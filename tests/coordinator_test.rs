//! 协调器生命周期、注册、过滤器与配置集成测试

mod common;

use common::{CountingDirectory, directory_with, three_instances};
use flare_discovery_client::{
    DiscoveryError, InvocationCoordinator, LbConfig, MetadataFilter, RegistrationEvent,
    ServiceInstance, split_service_url,
};
use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

const CONFIG: &str = r#"
service_name = "order-service"
cache_ttl_ms = 5000
load_balancer_type = "round_robin"
prefer_ip_over_host = true
stats_aggregation_interval_ms = 0

[directory]
backend = "static"

[directory.backend_config.services]
order = ["10.0.0.1:8080", { ip = "10.0.0.2", host = "order-2.local", port = 8081 }]
"#;

#[tokio::test]
async fn coordinator_from_toml_config() {
    let config = assert_ok!(LbConfig::from_toml_str(CONFIG));
    assert_eq!(config.cache_ttl(), Duration::from_secs(5));
    assert_eq!(config.default_max_attempts, 3);
    assert!(config.stats_aggregation_interval().is_none());

    let coordinator = InvocationCoordinator::from_config(config).unwrap();
    let first = coordinator.choose_instance("order").await.unwrap();
    let second = coordinator.choose_instance("order").await.unwrap();
    assert_eq!(first.address(true), "10.0.0.1:8080");
    assert_eq!(second.host, "order-2.local");
    assert_eq!(second.port, 8081);
}

#[test]
fn unknown_backend_is_rejected() {
    let config = LbConfig::from_toml_str("[directory]\nbackend = \"zookeeper\"\n").unwrap();
    let err = InvocationCoordinator::from_config(config).err().unwrap();
    assert!(matches!(err, DiscoveryError::Config(_)));
}

#[tokio::test]
async fn register_event_assigns_identity() {
    let directory = Arc::new(CountingDirectory::new());
    let config = LbConfig::default()
        .with_service_name("order-service")
        .with_stats_aggregation_interval_ms(0);
    let coordinator = InvocationCoordinator::new(config, directory.clone()).unwrap();

    let event = RegistrationEvent {
        host: "order-1.local".to_string(),
        ip: "10.0.0.9".to_string(),
        port: 9000,
        metadata: HashMap::from([("zone".to_string(), "a".to_string())]),
    };
    let instance = coordinator.register_event(event).await.unwrap();
    assert_eq!(instance.service_name, "order-service");
    assert!(instance.id.is_some());

    let registered = directory.registered().await.unwrap();
    assert_eq!(registered.id, instance.id);

    coordinator.shutdown().await;
    assert!(directory.registered().await.is_none());
}

#[tokio::test]
async fn register_event_requires_service_name() {
    let directory = Arc::new(CountingDirectory::new());
    let coordinator = InvocationCoordinator::new(LbConfig::default(), directory).unwrap();
    let err = assert_err!(coordinator.register_event(RegistrationEvent::default()).await);
    assert!(matches!(err, DiscoveryError::Config(_)));
}

#[tokio::test(start_paused = true)]
async fn start_runs_refresh_and_shutdown_stops_it() {
    let directory = directory_with("order", three_instances()).await;
    let config = LbConfig::default()
        .with_cache_refresh_interval_ms(1_000)
        .with_stats_aggregation_interval_ms(0);
    let coordinator = InvocationCoordinator::new(config, directory.clone()).unwrap();
    coordinator.start().await;

    coordinator.choose_instance("order").await.unwrap();
    assert_eq!(directory.calls(), 1);

    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert_eq!(directory.calls(), 2);

    coordinator.shutdown().await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(directory.calls(), 2);
}

#[tokio::test]
async fn filters_narrow_candidates() {
    let instances = vec![
        ServiceInstance::new("order", "10.0.0.1", 8080).with_metadata("zone", "a"),
        ServiceInstance::new("order", "10.0.0.2", 8080).with_metadata("zone", "b"),
        ServiceInstance::new("order", "10.0.0.3", 8080).with_metadata("zone", "b"),
    ];
    let directory = directory_with("order", instances).await;
    let config = LbConfig::default().with_stats_aggregation_interval_ms(0);
    let coordinator = InvocationCoordinator::new(config, directory).unwrap();

    coordinator.add_filter(Arc::new(MetadataFilter::equals("zone", "b")));
    for _ in 0..4 {
        let chosen = coordinator.choose_instance("order").await.unwrap();
        assert_eq!(chosen.metadata.get("zone").map(String::as_str), Some("b"));
    }

    coordinator.add_filter(Arc::new(|_: Vec<ServiceInstance>| Vec::new()));
    let result = coordinator
        .invoke(
            |_ctx| async { Ok::<_, io::Error>(()) },
            |err| {
                assert!(matches!(err, DiscoveryError::NoInstanceAvailable { .. }));
                None
            },
            "order",
        )
        .await;
    assert!(result.is_none());
}

#[tokio::test]
async fn request_url_is_rewritten_onto_instance() {
    let instances = vec![ServiceInstance::new("order", "10.0.0.1", 8080).with_host("order-1.local")];
    let directory = directory_with("order", instances).await;
    let config = LbConfig::default()
        .with_prefer_ip(true)
        .with_stats_aggregation_interval_ms(0);
    let coordinator = InvocationCoordinator::new(config, directory).unwrap();

    let url = split_service_url("http://gateway.local/order/api/orders?page=3").unwrap();
    let rewritten = coordinator
        .invoke(
            |ctx| {
                let url = url.clone();
                async move {
                    assert_eq!(ctx.base_url(), "http://10.0.0.1:8080");
                    Ok::<_, io::Error>(ctx.rewrite_url(&url))
                }
            },
            |_| None,
            &url.service_name,
        )
        .await;

    assert_eq!(rewritten.as_deref(), Some("http://10.0.0.1:8080/api/orders?page=3"));
}

#[tokio::test]
async fn custom_load_balancer_is_used() {
    use flare_discovery_client::LoadBalancer;

    struct Last;
    impl LoadBalancer for Last {
        fn lb_type(&self) -> &str {
            "Last"
        }
        fn select<'a>(
            &self,
            _service_name: &str,
            instances: &'a [ServiceInstance],
        ) -> Option<&'a ServiceInstance> {
            instances.last()
        }
    }

    let directory = directory_with("order", three_instances()).await;
    let config = LbConfig::default()
        .with_load_balancer("last")
        .with_stats_aggregation_interval_ms(0);
    let coordinator = InvocationCoordinator::new(config, directory).unwrap();
    coordinator.register_load_balancer(Arc::new(Last));

    assert_eq!(coordinator.choose_instance("order").await.unwrap().ip, "10.0.0.3");
}
