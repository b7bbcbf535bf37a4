//! 静态实例列表后端
//!
//! 实例来自配置（`backend_config.services`），本进程的注册/注销只在内存中生效。
//! 适用于没有注册中心的部署，也是测试替身的基础。

use anyhow::{Context, anyhow, bail};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::config::DirectoryConfig;
use crate::discovery::backend::InstanceDirectory;
use crate::discovery::instance::ServiceInstance;
use crate::error::InfraResult;

/// 静态实例列表后端
#[derive(Default)]
pub struct StaticDirectory {
    services: RwLock<HashMap<String, Vec<ServiceInstance>>>,
    registered: RwLock<Option<ServiceInstance>>,
}

impl StaticDirectory {
    /// 创建空的静态后端
    pub fn new() -> Self {
        Self::default()
    }

    /// 从配置创建
    ///
    /// `services` 的每个值可以是 `"ip:port"` 字符串，也可以是完整的实例对象：
    ///
    /// ```toml
    /// [directory.backend_config.services]
    /// order = ["10.0.0.1:8080", { ip = "10.0.0.2", host = "order-2", port = 8080 }]
    /// ```
    pub fn from_config(config: &DirectoryConfig) -> InfraResult<Self> {
        let mut services = HashMap::new();

        if let Some(value) = config.backend_config.get("services") {
            let table = value
                .as_object()
                .ok_or_else(|| anyhow!("backend_config.services must be a table"))?;

            for (service_name, entries) in table {
                let entries = entries.as_array().ok_or_else(|| {
                    anyhow!("backend_config.services.{service_name} must be an array")
                })?;
                let instances = entries
                    .iter()
                    .map(|entry| parse_entry(service_name, entry))
                    .collect::<InfraResult<Vec<_>>>()?;
                services.insert(service_name.clone(), instances);
            }
        }

        Ok(Self {
            services: RwLock::new(services),
            registered: RwLock::new(None),
        })
    }

    /// 设置某个服务的实例（构造时使用）
    pub fn with_instances(mut self, service_name: impl Into<String>, instances: Vec<ServiceInstance>) -> Self {
        self.services.get_mut().insert(service_name.into(), instances);
        self
    }

    /// 替换某个服务的实例列表
    pub async fn set_instances(&self, service_name: impl Into<String>, instances: Vec<ServiceInstance>) {
        let mut services = self.services.write().await;
        services.insert(service_name.into(), instances);
    }

    /// 移除某个服务
    pub async fn remove_service(&self, service_name: &str) {
        let mut services = self.services.write().await;
        services.remove(service_name);
    }

    /// 当前已注册的本进程实例
    pub async fn registered(&self) -> Option<ServiceInstance> {
        self.registered.read().await.clone()
    }
}

fn parse_entry(service_name: &str, entry: &serde_json::Value) -> InfraResult<ServiceInstance> {
    match entry {
        serde_json::Value::String(addr) => {
            let (ip, port) = addr
                .rsplit_once(':')
                .ok_or_else(|| anyhow!("address [{addr}] of {service_name} has no port"))?;
            let port = port
                .parse::<u16>()
                .with_context(|| format!("invalid port in [{addr}] of {service_name}"))?;
            Ok(ServiceInstance::new(service_name, ip, port))
        }
        serde_json::Value::Object(fields) => {
            let mut fields = fields.clone();
            fields
                .entry("service_name")
                .or_insert_with(|| serde_json::Value::String(service_name.to_string()));
            if !fields.contains_key("host") {
                if let Some(ip) = fields.get("ip").cloned() {
                    fields.insert("host".to_string(), ip);
                }
            }
            serde_json::from_value(serde_json::Value::Object(fields))
                .with_context(|| format!("invalid instance entry of {service_name}"))
        }
        other => bail!("unsupported instance entry of {service_name}: {other}"),
    }
}

#[async_trait]
impl InstanceDirectory for StaticDirectory {
    async fn register(&self, instance: ServiceInstance) -> InfraResult<()> {
        let mut services = self.services.write().await;
        let list = services.entry(instance.service_name.clone()).or_default();
        list.retain(|existing| existing != &instance);
        list.push(instance.clone());
        *self.registered.write().await = Some(instance);
        Ok(())
    }

    async fn unregister(&self) -> InfraResult<()> {
        let Some(instance) = self.registered.write().await.take() else {
            return Ok(());
        };
        let mut services = self.services.write().await;
        if let Some(list) = services.get_mut(&instance.service_name) {
            list.retain(|existing| existing != &instance);
        }
        Ok(())
    }

    async fn instances(&self, service_name: &str) -> InfraResult<Vec<ServiceInstance>> {
        let services = self.services.read().await;
        Ok(services.get(service_name).cloned().unwrap_or_default())
    }

    async fn service_names(&self) -> InfraResult<Vec<String>> {
        let services = self.services.read().await;
        let mut names: Vec<String> = services.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
