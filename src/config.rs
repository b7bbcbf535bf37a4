//! 负载均衡与服务发现配置
//!
//! 所有字段都有默认值；配置文件的读取由外部完成，这里只负责从 TOML 文本解析与校验。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{DiscoveryError, Result};

/// 客户端负载均衡配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LbConfig {
    /// 本进程注册到注册中心时使用的服务名
    pub service_name: String,

    /// 实例缓存有效期（毫秒）
    pub cache_ttl_ms: u64,

    /// 实例缓存主动刷新间隔（毫秒），小于等于 0 表示不启用
    pub cache_refresh_interval_ms: i64,

    /// 缓存并发度，决定缓存分片数量
    pub cache_concurrency_level: usize,

    /// 实例统计数据的过期时间（分钟）
    pub stats_cache_expire_minutes: u64,

    /// 统计聚合间隔（毫秒），小于等于 0 表示不启用
    pub stats_aggregation_interval_ms: i64,

    /// 负载均衡类型：RoundRobin / BestAvailable / WeightedResponseTime / Random
    pub load_balancer_type: String,

    /// 构建地址时是否用 IP 替换域名
    pub prefer_ip_over_host: bool,

    /// 重试策略缓存的最大数量
    pub max_retry_config_cache_size: usize,

    /// 默认重试策略的最大尝试次数（包含第一次调用）
    pub default_max_attempts: usize,

    /// 默认重试策略的重试等待时间（毫秒）
    pub default_retry_wait_ms: u64,

    /// 注册中心配置
    pub directory: DirectoryConfig,
}

impl Default for LbConfig {
    fn default() -> Self {
        Self {
            service_name: String::new(),
            cache_ttl_ms: 30_000,
            cache_refresh_interval_ms: 60_000,
            cache_concurrency_level: 16,
            stats_cache_expire_minutes: 60,
            stats_aggregation_interval_ms: 1_000,
            load_balancer_type: "RoundRobin".to_string(),
            prefer_ip_over_host: false,
            max_retry_config_cache_size: 9_999,
            default_max_attempts: 3,
            default_retry_wait_ms: 1_000,
            directory: DirectoryConfig::default(),
        }
    }
}

impl LbConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 TOML 文本解析并校验
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: LbConfig = toml::from_str(content)
            .map_err(|e| DiscoveryError::config(format!("invalid lb config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.default_max_attempts == 0 {
            return Err(DiscoveryError::config("default_max_attempts must be >= 1"));
        }
        if self.cache_concurrency_level == 0 {
            return Err(DiscoveryError::config("cache_concurrency_level must be >= 1"));
        }
        if self.max_retry_config_cache_size == 0 {
            return Err(DiscoveryError::config(
                "max_retry_config_cache_size must be >= 1",
            ));
        }
        Ok(())
    }

    /// 实例缓存有效期
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    /// 主动刷新间隔，未启用时返回 None
    pub fn cache_refresh_interval(&self) -> Option<Duration> {
        positive_millis(self.cache_refresh_interval_ms)
    }

    /// 统计聚合间隔，未启用时返回 None
    pub fn stats_aggregation_interval(&self) -> Option<Duration> {
        positive_millis(self.stats_aggregation_interval_ms)
    }

    /// 实例统计数据的过期时间
    pub fn stats_cache_expire(&self) -> Duration {
        Duration::from_secs(self.stats_cache_expire_minutes.saturating_mul(60))
    }

    /// 默认重试等待时间
    pub fn default_retry_wait(&self) -> Duration {
        Duration::from_millis(self.default_retry_wait_ms)
    }

    /// 设置服务名
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// 设置缓存有效期
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl_ms = ttl.as_millis() as u64;
        self
    }

    /// 设置主动刷新间隔（毫秒，小于等于 0 关闭）
    pub fn with_cache_refresh_interval_ms(mut self, interval_ms: i64) -> Self {
        self.cache_refresh_interval_ms = interval_ms;
        self
    }

    /// 设置统计聚合间隔（毫秒，小于等于 0 关闭）
    pub fn with_stats_aggregation_interval_ms(mut self, interval_ms: i64) -> Self {
        self.stats_aggregation_interval_ms = interval_ms;
        self
    }

    /// 设置负载均衡类型
    pub fn with_load_balancer(mut self, lb_type: impl Into<String>) -> Self {
        self.load_balancer_type = lb_type.into();
        self
    }

    /// 设置是否优先使用 IP
    pub fn with_prefer_ip(mut self, prefer_ip: bool) -> Self {
        self.prefer_ip_over_host = prefer_ip;
        self
    }

    /// 设置默认重试策略
    pub fn with_default_retry(mut self, max_attempts: usize, wait: Duration) -> Self {
        self.default_max_attempts = max_attempts;
        self.default_retry_wait_ms = wait.as_millis() as u64;
        self
    }

    /// 设置重试策略缓存上限
    pub fn with_max_retry_config_cache_size(mut self, size: usize) -> Self {
        self.max_retry_config_cache_size = size;
        self
    }

    /// 设置注册中心配置
    pub fn with_directory(mut self, directory: DirectoryConfig) -> Self {
        self.directory = directory;
        self
    }
}

fn positive_millis(ms: i64) -> Option<Duration> {
    if ms <= 0 {
        None
    } else {
        Some(Duration::from_millis(ms as u64))
    }
}

/// 注册中心配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// 后端类型，目前内置 static
    pub backend: String,

    /// 后端特定配置
    pub backend_config: HashMap<String, serde_json::Value>,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            backend: "static".to_string(),
            backend_config: HashMap::new(),
        }
    }
}
