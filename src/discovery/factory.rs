//! 注册中心后端工厂

use std::sync::Arc;
use tracing::info;

use crate::config::DirectoryConfig;
use crate::discovery::backend::{InstanceDirectory, StaticDirectory};
use crate::error::{DiscoveryError, Result};

/// 内置后端类型
///
/// ZooKeeper、Consul 等后端在外部实现 [`InstanceDirectory`] 后直接注入协调器。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    Static,
}

impl std::str::FromStr for BackendType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "static" | "list" | "memory" => Ok(BackendType::Static),
            _ => Err(format!("Unknown directory backend: {}", s)),
        }
    }
}

/// 注册中心工厂
pub struct DirectoryFactory;

impl DirectoryFactory {
    /// 从配置创建注册中心后端
    pub fn create(config: &DirectoryConfig) -> Result<Arc<dyn InstanceDirectory>> {
        let backend_type: BackendType = config.backend.parse().map_err(DiscoveryError::config)?;

        match backend_type {
            BackendType::Static => {
                let directory = StaticDirectory::from_config(config)
                    .map_err(|e| DiscoveryError::config(format!("{e:#}")))?;
                info!(backend = %config.backend, "Instance directory created");
                Ok(Arc::new(directory))
            }
        }
    }
}
