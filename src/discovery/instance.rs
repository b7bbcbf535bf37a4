//! 服务实例定义

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// 服务实例
///
/// 实例身份由注册中心分配的 `id` 决定；没有 `id` 时由 `(ip, port)` 决定。
/// 统计数据与缓存都按身份索引，因此 `PartialEq`/`Hash` 只比较身份，不比较元数据。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInstance {
    /// 服务名
    pub service_name: String,

    /// 注册中心分配的实例 ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// 域名
    pub host: String,

    /// IP
    pub ip: String,

    /// 端口
    pub port: u16,

    /// 元数据
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// 实例身份
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InstanceKey {
    Id(String),
    Addr(String, u16),
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceKey::Id(id) => write!(f, "{id}"),
            InstanceKey::Addr(ip, port) => write!(f, "{ip}:{port}"),
        }
    }
}

impl ServiceInstance {
    /// 创建新的服务实例，域名默认与 IP 相同
    pub fn new(service_name: impl Into<String>, ip: impl Into<String>, port: u16) -> Self {
        let ip = ip.into();
        Self {
            service_name: service_name.into(),
            id: None,
            host: ip.clone(),
            ip,
            port,
            metadata: HashMap::new(),
        }
    }

    /// 设置域名
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// 设置实例 ID
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// 添加元数据
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// 实例身份
    pub fn key(&self) -> InstanceKey {
        match &self.id {
            Some(id) => InstanceKey::Id(id.clone()),
            None => InstanceKey::Addr(self.ip.clone(), self.port),
        }
    }

    /// 访问地址（`ip:port` 或 `host:port`）
    pub fn address(&self, prefer_ip: bool) -> String {
        if prefer_ip || self.host.is_empty() {
            format!("{}:{}", self.ip, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// 转换为 HTTP URL
    pub fn to_http_url(&self, prefer_ip: bool) -> String {
        format!("http://{}", self.address(prefer_ip))
    }

    /// 检查是否匹配元数据过滤条件
    pub fn matches_metadata(&self, filters: &HashMap<String, String>) -> bool {
        filters
            .iter()
            .all(|(key, value)| self.metadata.get(key).map(|v| v == value).unwrap_or(false))
    }
}

impl PartialEq for ServiceInstance {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ServiceInstance {}

impl Hash for ServiceInstance {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for ServiceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.service_name, self.ip, self.port)
    }
}

/// 注册事件
///
/// 由外部（启动流程）提供本进程的地址信息，转换为待注册的服务实例
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationEvent {
    pub host: String,
    pub ip: String,
    pub port: u16,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl RegistrationEvent {
    /// 转换为服务实例，并分配新的实例 ID
    pub fn into_instance(self, service_name: impl Into<String>) -> ServiceInstance {
        ServiceInstance {
            service_name: service_name.into(),
            id: Some(uuid::Uuid::new_v4().to_string()),
            host: self.host,
            ip: self.ip,
            port: self.port,
            metadata: self.metadata,
        }
    }
}
