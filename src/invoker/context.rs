use crate::discovery::instance::ServiceInstance;
use crate::utils::ServiceUrl;

/// 单次尝试的调用上下文
///
/// 每次尝试都会生成新的上下文，绑定本次选中的实例
#[derive(Debug, Clone)]
pub struct InvokerContext {
    pub service_name: String,
    pub instance: ServiceInstance,
    /// 第几次尝试（从 1 开始）
    pub attempt: usize,
    pub prefer_ip: bool,
}

impl InvokerContext {
    pub fn new(service_name: &str, instance: ServiceInstance, attempt: usize, prefer_ip: bool) -> Self {
        Self {
            service_name: service_name.to_string(),
            instance,
            attempt,
            prefer_ip,
        }
    }

    /// 实例地址 `host:port` 或 `ip:port`
    pub fn address(&self) -> String {
        self.instance.address(self.prefer_ip)
    }

    /// 实例的 HTTP 基础地址
    pub fn base_url(&self) -> String {
        self.instance.to_http_url(self.prefer_ip)
    }

    /// 把网关形式的请求地址改写到当前实例
    pub fn rewrite_url(&self, url: &ServiceUrl) -> String {
        url.rebuild(&self.instance, self.prefer_ip)
    }

    pub fn is_retry(&self) -> bool {
        self.attempt > 1
    }
}
