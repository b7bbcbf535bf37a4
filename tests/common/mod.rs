//! 集成测试公共工具

#![allow(dead_code)]

use async_trait::async_trait;
use flare_discovery_client::{InfraResult, InstanceDirectory, ServiceInstance, StaticDirectory};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// 记录查询次数、可注入故障的注册中心
#[derive(Default)]
pub struct CountingDirectory {
    inner: StaticDirectory,
    calls: AtomicUsize,
    failing: AtomicBool,
    delay: Option<Duration>,
}

impl CountingDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每次查询前等待 `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn set(&self, service_name: &str, instances: Vec<ServiceInstance>) {
        self.inner.set_instances(service_name, instances).await;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn registered(&self) -> Option<ServiceInstance> {
        self.inner.registered().await
    }
}

#[async_trait]
impl InstanceDirectory for CountingDirectory {
    async fn register(&self, instance: ServiceInstance) -> InfraResult<()> {
        self.inner.register(instance).await
    }

    async fn unregister(&self) -> InfraResult<()> {
        self.inner.unregister().await
    }

    async fn instances(&self, service_name: &str) -> InfraResult<Vec<ServiceInstance>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("directory connection refused");
        }
        self.inner.instances(service_name).await
    }

    async fn service_names(&self) -> InfraResult<Vec<String>> {
        self.inner.service_names().await
    }
}

/// `order` 服务的三个实例 A、B、C
pub fn three_instances() -> Vec<ServiceInstance> {
    vec![
        ServiceInstance::new("order", "10.0.0.1", 8080),
        ServiceInstance::new("order", "10.0.0.2", 8080),
        ServiceInstance::new("order", "10.0.0.3", 8080),
    ]
}

pub async fn directory_with(service_name: &str, instances: Vec<ServiceInstance>) -> Arc<CountingDirectory> {
    let directory = Arc::new(CountingDirectory::new());
    directory.set(service_name, instances).await;
    directory
}
