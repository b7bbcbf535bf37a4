//! 实例选择
//!
//! 从缓存取实例列表，经过过滤器链后交给负载均衡策略选择。

use std::sync::Arc;
use tracing::debug;

use super::{LoadBalancer, LoadBalancerRegistry};
use crate::discovery::cache::InstanceCache;
use crate::discovery::filter::FilterChain;
use crate::discovery::instance::{InstanceKey, ServiceInstance};

pub struct InstanceSelector {
    cache: Arc<InstanceCache>,
    filters: FilterChain,
    balancers: LoadBalancerRegistry,
    lb_type: String,
}

impl InstanceSelector {
    pub fn new(
        cache: Arc<InstanceCache>,
        balancers: LoadBalancerRegistry,
        lb_type: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            filters: FilterChain::new(),
            balancers,
            lb_type: lb_type.into(),
        }
    }

    pub fn filters(&self) -> &FilterChain {
        &self.filters
    }

    pub fn balancers(&self) -> &LoadBalancerRegistry {
        &self.balancers
    }

    /// 配置的负载均衡策略
    pub fn configured_balancer(&self) -> Arc<dyn LoadBalancer> {
        self.balancers.get(&self.lb_type)
    }

    /// 过滤后的候选实例
    pub async fn candidates(&self, service_name: &str) -> Vec<ServiceInstance> {
        let instances = self.cache.get(service_name).await;
        self.filters.apply(instances)
    }

    /// 缓存中当前列表经过过滤器链后的结果，不访问注册中心
    pub fn cached_candidates(&self, service_name: &str) -> Option<Vec<ServiceInstance>> {
        self.cache
            .peek(service_name)
            .map(|instances| self.filters.apply(instances))
    }

    /// 使用配置的策略选择实例
    pub async fn choose(&self, service_name: &str) -> Option<ServiceInstance> {
        let balancer = self.configured_balancer();
        self.choose_with(service_name, balancer.as_ref()).await
    }

    /// 使用指定策略选择实例
    pub async fn choose_with(
        &self,
        service_name: &str,
        balancer: &dyn LoadBalancer,
    ) -> Option<ServiceInstance> {
        let candidates = self.candidates(service_name).await;
        balancer.choose(service_name, &candidates)
    }

    /// 尽量避开已失败的实例
    ///
    /// `excluded` 按失败先后排列。所有候选都在其中时只避开最近失败的那个，
    /// 仅剩这一个候选时才重复使用它
    pub async fn choose_excluding(
        &self,
        service_name: &str,
        balancer: &dyn LoadBalancer,
        excluded: &[InstanceKey],
    ) -> Option<ServiceInstance> {
        let candidates = self.candidates(service_name).await;
        let remaining = without(&candidates, excluded);
        if !remaining.is_empty() {
            return balancer.choose(service_name, &remaining);
        }

        debug!(
            service = %service_name,
            candidates = candidates.len(),
            "All candidates already failed, avoiding only the latest"
        );
        let latest = excluded.last().map(std::slice::from_ref).unwrap_or_default();
        let remaining = without(&candidates, latest);
        if remaining.is_empty() {
            return balancer.choose(service_name, &candidates);
        }
        balancer.choose(service_name, &remaining)
    }
}

fn without(candidates: &[ServiceInstance], excluded: &[InstanceKey]) -> Vec<ServiceInstance> {
    candidates
        .iter()
        .filter(|inst| !excluded.contains(&inst.key()))
        .cloned()
        .collect()
}
