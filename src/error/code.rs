//! 错误代码定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 错误代码枚举
///
/// 错误代码按类别分组，每个类别占用1000个代码范围：
/// - 1000-1999: 实例选择相关错误
/// - 2000-2999: 调用与重试相关错误
/// - 3000-3999: 注册中心相关错误
/// - 9000-9999: 配置与通用错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
pub enum ErrorCode {
    // ============================================================
    // 实例选择相关错误 (1000-1999)
    // ============================================================
    NoInstanceAvailable = 1000,

    // ============================================================
    // 调用与重试相关错误 (2000-2999)
    // ============================================================
    RetryExhausted = 2000,
    NonRetryable = 2001,

    // ============================================================
    // 注册中心相关错误 (3000-3999)
    // ============================================================
    DirectoryUnavailable = 3000,

    // ============================================================
    // 配置与通用错误 (9000-9999)
    // ============================================================
    ConfigurationError = 9000,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ErrorCode {
    /// 获取错误代码的数字值
    #[inline]
    pub fn as_u32(&self) -> u32 {
        *self as u32
    }

    /// 从数字值创建错误代码
    pub fn from_u32(code: u32) -> Option<Self> {
        match code {
            1000 => Some(ErrorCode::NoInstanceAvailable),
            2000 => Some(ErrorCode::RetryExhausted),
            2001 => Some(ErrorCode::NonRetryable),
            3000 => Some(ErrorCode::DirectoryUnavailable),
            9000 => Some(ErrorCode::ConfigurationError),
            _ => None,
        }
    }

    /// 获取错误代码的英文标识符
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NoInstanceAvailable => "NO_INSTANCE_AVAILABLE",
            ErrorCode::RetryExhausted => "RETRY_EXHAUSTED",
            ErrorCode::NonRetryable => "NON_RETRYABLE",
            ErrorCode::DirectoryUnavailable => "DIRECTORY_UNAVAILABLE",
            ErrorCode::ConfigurationError => "CONFIGURATION_ERROR",
        }
    }

    /// 调用方稍后重新发起调用是否可能成功
    ///
    /// 实例暂缺和注册中心不可用通常是暂时的；重试耗尽与配置错误不是。
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::NoInstanceAvailable | ErrorCode::DirectoryUnavailable
        )
    }
}
