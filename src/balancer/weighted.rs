//! 按响应时间加权的负载均衡

use rand::Rng;
use std::sync::Arc;
use tracing::debug;

use super::LoadBalancer;
use super::round_robin::RoundRobin;
use crate::discovery::instance::ServiceInstance;
use crate::stats::StatsRegistry;

/// 按响应时间加权
///
/// 使用聚合任务发布的累积权重表做一次随机抽样。权重表尚未生成或不可用时
/// 退化为轮询；候选数量与权重表长度不一致时先同步重新计算一次。
pub struct WeightedResponseTime {
    stats: Arc<StatsRegistry>,
    fallback: RoundRobin,
}

impl WeightedResponseTime {
    pub const NAME: &'static str = "WeightedResponseTime";

    pub fn new(stats: Arc<StatsRegistry>) -> Self {
        Self {
            stats,
            fallback: RoundRobin::new(),
        }
    }
}

impl LoadBalancer for WeightedResponseTime {
    fn lb_type(&self) -> &str {
        Self::NAME
    }

    fn select<'a>(
        &self,
        service_name: &str,
        instances: &'a [ServiceInstance],
    ) -> Option<&'a ServiceInstance> {
        let service_stats = self.stats.service_stats(service_name);
        let Some(mut weights) = service_stats.selection_weights() else {
            return self.fallback.select(service_name, instances);
        };

        if weights.len() != instances.len() {
            debug!(
                service = %service_name,
                weights = weights.len(),
                instances = instances.len(),
                "Instance list changed, recomputing weights"
            );
            weights = service_stats.aggregate(instances);
        }

        let max = weights.last().copied().unwrap_or(0.0);
        // 单个实例或平均耗时都为 0 时权重全为 0
        if max.is_nan() || max <= 0.0 {
            return self.fallback.select(service_name, instances);
        }

        let draw = rand::thread_rng().gen_range(0.0..max);
        weights
            .iter()
            .position(|cumulative| *cumulative >= draw)
            .and_then(|index| instances.get(index))
            .or_else(|| instances.first())
    }
}
