//! 工具函数模块
//!
//! 网关形式的请求地址 `scheme://gateway/{service}/{path}?{query}` 与实例地址之间的转换。

use http::Uri;

use crate::discovery::instance::ServiceInstance;

/// 拆分后的服务请求地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceUrl {
    pub scheme: String,
    pub service_name: String,
    /// 服务名之后的路径，以 `/` 开头，包含查询参数
    pub path_and_query: String,
}

impl ServiceUrl {
    /// 改写为指向指定实例的地址
    pub fn rebuild(&self, instance: &ServiceInstance, prefer_ip: bool) -> String {
        format!(
            "{}://{}{}",
            self.scheme,
            instance.address(prefer_ip),
            self.path_and_query
        )
    }
}

/// 拆分服务请求地址
///
/// 路径的第一段作为服务名，服务名之后必须还有路径，否则返回 None
///
/// ```
/// use flare_discovery_client::utils::split_service_url;
///
/// let url = split_service_url("http://gateway.local/order/api/list?page=1").unwrap();
/// assert_eq!(url.service_name, "order");
/// assert_eq!(url.path_and_query, "/api/list?page=1");
/// ```
pub fn split_service_url(url: &str) -> Option<ServiceUrl> {
    let uri: Uri = url.parse().ok()?;
    let scheme = uri.scheme_str()?.to_string();
    let (service_name, path) = split_host_and_path(uri.path())?;

    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path,
    };

    Some(ServiceUrl {
        scheme,
        service_name,
        path_and_query,
    })
}

/// 从路径中拆出服务名与剩余路径
///
/// `"/order/api/list"` 拆为 `("order", "/api/list")`；开头的多个 `/` 会被忽略
pub fn split_host_and_path(path: &str) -> Option<(String, String)> {
    let trimmed = path.trim_start_matches('/');
    let index = trimmed.find('/')?;
    if index == 0 {
        return None;
    }
    let (service_name, rest) = trimmed.split_at(index);
    Some((service_name.to_string(), rest.to_string()))
}
