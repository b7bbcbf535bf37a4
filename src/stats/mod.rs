//! 调用统计模块
//!
//! 记录每个实例的调用统计，并周期性为每个服务计算按响应时间的选择权重。

pub mod aggregator;
pub mod instance;
pub mod service;

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::discovery::instance::ServiceInstance;

pub use aggregator::StatsAggregator;
pub use instance::{InstanceStats, InstanceStatsSnapshot};
pub use service::{ServiceStats, ServiceStatsSnapshot};

/// 统计注册表
///
/// 按服务名持有 [`ServiceStats`]，在所有调用方之间共享
pub struct StatsRegistry {
    expire: Duration,
    services: DashMap<String, Arc<ServiceStats>>,
}

impl StatsRegistry {
    /// `expire` 为单实例统计自创建起的存活时间
    pub fn new(expire: Duration) -> Self {
        Self {
            expire,
            services: DashMap::new(),
        }
    }

    /// 获取服务级统计，不存在时创建
    pub fn service_stats(&self, service_name: &str) -> Arc<ServiceStats> {
        if let Some(stats) = self.services.get(service_name) {
            return Arc::clone(&stats);
        }
        self.services
            .entry(service_name.to_string())
            .or_insert_with(|| Arc::new(ServiceStats::new(service_name, self.expire)))
            .clone()
    }

    /// 获取实例统计
    pub fn instance_stats(&self, instance: &ServiceInstance) -> Arc<InstanceStats> {
        self.service_stats(&instance.service_name).get_stats(instance)
    }

    /// 调用前记录，返回本次调用使用的统计句柄
    ///
    /// 调用结束时应在同一个句柄上记录结果
    pub fn before_call(&self, instance: &ServiceInstance) -> Arc<InstanceStats> {
        let stats = self.instance_stats(instance);
        stats.before_call();
        stats
    }

    pub fn after_success(&self, instance: &ServiceInstance, elapsed_ms: u64) {
        self.instance_stats(instance).after_success(elapsed_ms);
    }

    pub fn after_failure(&self, instance: &ServiceInstance, elapsed_ms: u64) {
        self.instance_stats(instance).after_failure(elapsed_ms);
    }

    /// 已跟踪的服务名
    pub fn services(&self) -> Vec<String> {
        self.services.iter().map(|entry| entry.key().clone()).collect()
    }

    /// 对所有服务执行一轮聚合
    ///
    /// `lookup` 返回服务当前的实例列表，返回 None 或空列表的服务本轮跳过
    pub fn aggregate_all<F>(&self, lookup: F) -> usize
    where
        F: Fn(&str) -> Option<Vec<ServiceInstance>>,
    {
        let services: Vec<Arc<ServiceStats>> =
            self.services.iter().map(|entry| Arc::clone(entry.value())).collect();

        let mut aggregated = 0;
        for stats in services {
            let purged = stats.purge_expired();
            if purged > 0 {
                debug!(service = %stats.service_name(), purged, "Purged expired instance stats");
            }

            match lookup(stats.service_name()) {
                Some(instances) if !instances.is_empty() => {
                    stats.aggregate(&instances);
                    aggregated += 1;
                }
                _ => {
                    debug!(service = %stats.service_name(), "No cached instances, skipping aggregation");
                }
            }
        }
        aggregated
    }

    /// 所有服务的统计快照
    pub fn snapshot(&self) -> Vec<ServiceStatsSnapshot> {
        let mut snapshots: Vec<_> = self
            .services
            .iter()
            .map(|entry| entry.value().snapshot())
            .collect();
        snapshots.sort_by(|a, b| a.service_name.cmp(&b.service_name));
        snapshots
    }
}
