//! 服务级统计与选择权重

use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::discovery::instance::{InstanceKey, ServiceInstance};
use crate::stats::instance::{InstanceStats, InstanceStatsSnapshot};

/// 服务级统计
///
/// 持有该服务下每个实例的统计数据，以及按响应时间计算的累积选择权重。
/// 权重表整体替换发布，读取方不会看到半更新的表。
pub struct ServiceStats {
    service_name: String,
    expire: Duration,
    instances: DashMap<InstanceKey, Arc<InstanceStats>>,
    weights: ArcSwapOption<Vec<f64>>,
}

impl ServiceStats {
    pub fn new(service_name: impl Into<String>, expire: Duration) -> Self {
        Self {
            service_name: service_name.into(),
            expire,
            instances: DashMap::new(),
            weights: ArcSwapOption::empty(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// 获取实例统计，不存在或已过期时创建新的
    pub fn get_stats(&self, instance: &ServiceInstance) -> Arc<InstanceStats> {
        let key = instance.key();
        if let Some(stats) = self.instances.get(&key) {
            if !stats.is_expired(self.expire, Instant::now()) {
                return Arc::clone(&stats);
            }
        }

        let mut entry = self
            .instances
            .entry(key)
            .or_insert_with(|| Arc::new(InstanceStats::new()));
        if entry.is_expired(self.expire, Instant::now()) {
            *entry = Arc::new(InstanceStats::new());
        }
        Arc::clone(&entry)
    }

    /// 按实例列表计算权重
    ///
    /// `w_i = Σavg - avg_i`，发布的是按列表顺序的累积和。平均耗时越低的实例
    /// 占据的权重区间越大。
    pub fn aggregate(&self, instances: &[ServiceInstance]) -> Arc<Vec<f64>> {
        let averages: Vec<f64> = instances
            .iter()
            .map(|inst| self.get_stats(inst).avg_latency_ms())
            .collect();
        let total: f64 = averages.iter().sum();

        let mut cumulative = 0.0;
        let weights: Vec<f64> = averages
            .iter()
            .map(|avg| {
                cumulative += total - avg;
                cumulative
            })
            .collect();

        let weights = Arc::new(weights);
        self.weights.store(Some(Arc::clone(&weights)));
        weights
    }

    /// 当前发布的累积权重表
    pub fn selection_weights(&self) -> Option<Arc<Vec<f64>>> {
        self.weights.load_full()
    }

    /// 清理过期的实例统计，返回清理数量
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.instances.len();
        self.instances
            .retain(|_, stats| !stats.is_expired(self.expire, now));
        before - self.instances.len()
    }

    /// 跟踪的实例数量
    pub fn tracked_instances(&self) -> usize {
        self.instances.len()
    }

    /// 当前快照
    pub fn snapshot(&self) -> ServiceStatsSnapshot {
        let instances = self
            .instances
            .iter()
            .map(|entry| (entry.key().to_string(), entry.value().snapshot()))
            .collect();
        ServiceStatsSnapshot {
            service_name: self.service_name.clone(),
            instances,
            selection_weights: self.selection_weights().map(|w| w.as_ref().clone()),
        }
    }
}

/// 服务级统计快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatsSnapshot {
    pub service_name: String,
    pub instances: BTreeMap<String, InstanceStatsSnapshot>,
    pub selection_weights: Option<Vec<f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(stats: &ServiceStats, inst: &ServiceInstance, latency_ms: u64) {
        let s = stats.get_stats(inst);
        s.before_call();
        s.after_success(latency_ms);
    }

    #[test]
    fn aggregate_publishes_cumulative_weights() {
        let stats = ServiceStats::new("order", Duration::from_secs(600));
        let a = ServiceInstance::new("order", "10.0.0.1", 80);
        let b = ServiceInstance::new("order", "10.0.0.2", 80);
        let c = ServiceInstance::new("order", "10.0.0.3", 80);
        record(&stats, &a, 10);
        record(&stats, &b, 30);
        record(&stats, &c, 20);

        assert!(stats.selection_weights().is_none());
        let weights = stats.aggregate(&[a, b, c]);
        assert_eq!(weights.as_slice(), &[50.0, 80.0, 120.0]);
        assert_eq!(stats.selection_weights().unwrap().as_slice(), &[50.0, 80.0, 120.0]);
    }

    #[test]
    fn same_identity_shares_stats() {
        let stats = ServiceStats::new("order", Duration::from_secs(600));
        let a = ServiceInstance::new("order", "10.0.0.1", 80);
        let a_refreshed = ServiceInstance::new("order", "10.0.0.1", 80).with_metadata("v", "2");
        assert!(Arc::ptr_eq(&stats.get_stats(&a), &stats.get_stats(&a_refreshed)));
        assert_eq!(stats.tracked_instances(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_stats_are_replaced_and_purged() {
        let stats = ServiceStats::new("order", Duration::from_secs(60));
        let a = ServiceInstance::new("order", "10.0.0.1", 80);
        let b = ServiceInstance::new("order", "10.0.0.2", 80);
        let first = stats.get_stats(&a);
        stats.get_stats(&b);

        tokio::time::advance(Duration::from_secs(61)).await;

        let second = stats.get_stats(&a);
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(stats.purge_expired(), 1);
        assert_eq!(stats.tracked_instances(), 1);
    }

    #[test]
    fn snapshot_serializes() {
        let stats = ServiceStats::new("order", Duration::from_secs(600));
        let a = ServiceInstance::new("order", "10.0.0.1", 80);
        record(&stats, &a, 12);
        stats.aggregate(std::slice::from_ref(&a));

        let json = serde_json::to_value(stats.snapshot()).unwrap();
        assert_eq!(json["service_name"], "order");
        assert_eq!(json["instances"]["10.0.0.1:80"]["total_requests"], 1);
        assert_eq!(json["selection_weights"][0], 0.0);
    }
}
