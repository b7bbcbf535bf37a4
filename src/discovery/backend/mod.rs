//! 注册中心后端抽象和实现

pub mod static_dir;

use async_trait::async_trait;

use crate::discovery::instance::ServiceInstance;
use crate::error::InfraResult;

pub use static_dir::StaticDirectory;

/// 注册中心（实例目录）trait
///
/// 所有注册中心后端（ZooKeeper、Consul、静态列表等）都需要实现这个 trait。
/// 后端可以主动推送也可以轮询，核心只把它看作"视图可能滞后于现实"的实例来源。
///
/// 注意：由于需要动态分发（dyn），使用 async-trait
#[async_trait]
pub trait InstanceDirectory: Send + Sync {
    /// 初始化后端（建立连接等），默认无操作
    async fn init(&self) -> InfraResult<()> {
        Ok(())
    }

    /// 注册本进程实例
    async fn register(&self, instance: ServiceInstance) -> InfraResult<()>;

    /// 注销本进程实例
    async fn unregister(&self) -> InfraResult<()>;

    /// 查询服务实例
    ///
    /// 服务不存在时返回空列表而不是错误；错误只表示后端本身不可用。
    async fn instances(&self, service_name: &str) -> InfraResult<Vec<ServiceInstance>>;

    /// 查询所有服务名
    async fn service_names(&self) -> InfraResult<Vec<String>>;

    /// 关闭后端，默认无操作
    async fn close(&self) -> InfraResult<()> {
        Ok(())
    }
}
