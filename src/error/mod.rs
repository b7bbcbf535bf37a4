//! 错误处理模块
//!
//! 对外只暴露三类会到达调用方错误回调的错误：无可用实例、重试耗尽、不可重试的失败。
//! 注册中心与缓存的失败在内部被吸收（记录日志并回退到旧缓存）。

pub mod code;

pub use code::ErrorCode;

use thiserror::Error;

/// 调用方闭包返回的错误类型
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 基础设施层默认使用的结果类型（注册中心后端等）
pub type InfraResult<T> = anyhow::Result<T>;

/// 服务发现客户端统一错误类型
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// 过滤后没有任何候选实例
    #[error("服务 [{service}] 没有可用实例")]
    NoInstanceAvailable { service: String },

    /// 达到最大尝试次数，携带最后一次失败
    #[error("服务 [{service}] 重试耗尽: 共尝试 {attempts} 次, 最后实例 {last_instance}: {source}")]
    RetryExhausted {
        service: String,
        attempts: usize,
        last_instance: String,
        #[source]
        source: BoxError,
    },

    /// 重试策略不认为可重试的失败
    #[error("服务 [{service}] 调用失败 (第 {attempts} 次尝试, 不可重试): {source}")]
    NonRetryable {
        service: String,
        attempts: usize,
        #[source]
        source: BoxError,
    },

    /// 注册中心查询失败（仅用于日志，不向调用方传播）
    #[error("注册中心不可用, 服务 [{service}]: {reason}")]
    DirectoryUnavailable { service: String, reason: String },

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),
}

impl DiscoveryError {
    /// 创建无可用实例错误
    pub fn no_instance(service: impl Into<String>) -> Self {
        DiscoveryError::NoInstanceAvailable {
            service: service.into(),
        }
    }

    /// 从注册中心错误创建
    pub fn directory_unavailable(service: impl Into<String>, error: &anyhow::Error) -> Self {
        DiscoveryError::DirectoryUnavailable {
            service: service.into(),
            reason: format!("{error:#}"),
        }
    }

    /// 创建配置错误
    pub fn config(msg: impl Into<String>) -> Self {
        DiscoveryError::Config(msg.into())
    }

    /// 获取错误代码
    pub fn code(&self) -> ErrorCode {
        match self {
            DiscoveryError::NoInstanceAvailable { .. } => ErrorCode::NoInstanceAvailable,
            DiscoveryError::RetryExhausted { .. } => ErrorCode::RetryExhausted,
            DiscoveryError::NonRetryable { .. } => ErrorCode::NonRetryable,
            DiscoveryError::DirectoryUnavailable { .. } => ErrorCode::DirectoryUnavailable,
            DiscoveryError::Config(_) => ErrorCode::ConfigurationError,
        }
    }

    /// 获取服务名（如果有）
    pub fn service(&self) -> Option<&str> {
        match self {
            DiscoveryError::NoInstanceAvailable { service }
            | DiscoveryError::RetryExhausted { service, .. }
            | DiscoveryError::NonRetryable { service, .. }
            | DiscoveryError::DirectoryUnavailable { service, .. } => Some(service),
            DiscoveryError::Config(_) => None,
        }
    }

    /// 结束调用的底层失败（重试耗尽或不可重试时）
    pub fn last_failure(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            DiscoveryError::RetryExhausted { source, .. }
            | DiscoveryError::NonRetryable { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }

    /// 判断是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, DiscoveryError>;
