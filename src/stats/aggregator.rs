//! 周期性权重聚合任务

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, trace};

use crate::balancer::InstanceSelector;
use crate::stats::StatsRegistry;

/// 权重聚合器
///
/// 按固定间隔遍历统计注册表，用实例缓存中的当前列表（经过过滤器链，与负载均衡
/// 看到的候选一致）为每个服务重新计算权重。只读取缓存，不会触发注册中心访问。
pub struct StatsAggregator {
    stats: Arc<StatsRegistry>,
    selector: Arc<InstanceSelector>,
}

impl StatsAggregator {
    pub fn new(stats: Arc<StatsRegistry>, selector: Arc<InstanceSelector>) -> Self {
        Self { stats, selector }
    }

    /// 执行一轮聚合，返回完成聚合的服务数
    pub fn run_once(&self) -> usize {
        let aggregated = self
            .stats
            .aggregate_all(|service| self.selector.cached_candidates(service));
        trace!(aggregated, "Aggregated selection weights");
        aggregated
    }

    /// 启动后台聚合任务
    pub fn start(self, interval: Duration) -> JoinHandle<()> {
        info!(interval_ms = interval.as_millis() as u64, "Started stats aggregation task");

        tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                timer.tick().await;
                self.run_once();
            }
        })
    }
}
