//! 负载均衡模块
//!
//! 提供多种负载均衡策略，用于从候选实例中选择一个。策略按名称注册，
//! 名称匹配时忽略大小写以及 `_`、`-`。

pub mod best_available;
pub mod random;
pub mod round_robin;
pub mod selector;
pub mod weighted;

use dashmap::DashMap;
use std::sync::Arc;
use tracing::warn;

use crate::discovery::instance::ServiceInstance;
use crate::stats::StatsRegistry;

pub use best_available::BestAvailable;
pub use random::RandomBalancer;
pub use round_robin::RoundRobin;
pub use selector::InstanceSelector;
pub use weighted::WeightedResponseTime;

/// 负载均衡策略 trait
pub trait LoadBalancer: Send + Sync {
    /// 策略名称
    fn lb_type(&self) -> &str;

    /// 从非空候选列表中选择一个实例
    fn select<'a>(
        &self,
        service_name: &str,
        instances: &'a [ServiceInstance],
    ) -> Option<&'a ServiceInstance>;

    /// 选择实例，候选列表为空时返回 None
    fn choose(&self, service_name: &str, instances: &[ServiceInstance]) -> Option<ServiceInstance> {
        if instances.is_empty() {
            return None;
        }
        self.select(service_name, instances).cloned()
    }
}

/// 负载均衡策略注册表
///
/// 内置 RoundRobin、BestAvailable、WeightedResponseTime 和 Random。
/// 未知名称回退到 RoundRobin。
pub struct LoadBalancerRegistry {
    balancers: DashMap<String, Arc<dyn LoadBalancer>>,
    default: Arc<dyn LoadBalancer>,
}

impl LoadBalancerRegistry {
    pub fn new(stats: Arc<StatsRegistry>) -> Self {
        let default: Arc<dyn LoadBalancer> = Arc::new(RoundRobin::new());
        let registry = Self {
            balancers: DashMap::new(),
            default: Arc::clone(&default),
        };
        registry.register(default);
        registry.register(Arc::new(BestAvailable::new(Arc::clone(&stats))));
        registry.register(Arc::new(WeightedResponseTime::new(stats)));
        registry.register(Arc::new(RandomBalancer));
        registry
    }

    /// 注册策略，同名覆盖
    pub fn register(&self, balancer: Arc<dyn LoadBalancer>) {
        self.balancers
            .insert(normalize(balancer.lb_type()), balancer);
    }

    /// 按名称查找策略
    pub fn find(&self, name: &str) -> Option<Arc<dyn LoadBalancer>> {
        self.balancers
            .get(&normalize(name))
            .map(|balancer| Arc::clone(&balancer))
    }

    /// 按名称获取策略，未知名称回退到默认策略
    pub fn get(&self, name: &str) -> Arc<dyn LoadBalancer> {
        match self.find(name) {
            Some(balancer) => balancer,
            None => {
                warn!(load_balancer = %name, "Unknown load balancer, using RoundRobin");
                Arc::clone(&self.default)
            }
        }
    }

    /// 默认策略
    pub fn default_balancer(&self) -> Arc<dyn LoadBalancer> {
        Arc::clone(&self.default)
    }

    /// 已注册的策略名称
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .balancers
            .iter()
            .map(|entry| entry.value().lb_type().to_string())
            .collect();
        names.sort();
        names
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}
