//! 日志初始化

use anyhow::anyhow;
use tracing_subscriber::EnvFilter;

use crate::error::InfraResult;

/// 安装全局 tracing 订阅者
///
/// 级别由 `RUST_LOG` 控制，默认 `info`。`json` 为 true 时输出 JSON 格式。
/// 已经安装过订阅者时返回错误。
pub fn init_tracing(json: bool) -> InfraResult<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}
