//! 轮询负载均衡

use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::LoadBalancer;
use crate::discovery::instance::ServiceInstance;

/// 轮询
///
/// 每个服务一个计数器，每次选择都会递增，包括候选列表只有一个实例的情况
#[derive(Default)]
pub struct RoundRobin {
    counters: DashMap<String, AtomicUsize>,
}

impl RoundRobin {
    pub const NAME: &'static str = "RoundRobin";

    pub fn new() -> Self {
        Self::default()
    }

    /// 取下一个下标
    pub fn next_index(&self, service_name: &str, len: usize) -> usize {
        let index = match self.counters.get(service_name) {
            Some(counter) => counter.fetch_add(1, Ordering::Relaxed),
            None => self
                .counters
                .entry(service_name.to_string())
                .or_default()
                .fetch_add(1, Ordering::Relaxed),
        };
        index % len
    }
}

impl LoadBalancer for RoundRobin {
    fn lb_type(&self) -> &str {
        Self::NAME
    }

    fn select<'a>(
        &self,
        service_name: &str,
        instances: &'a [ServiceInstance],
    ) -> Option<&'a ServiceInstance> {
        instances.get(self.next_index(service_name, instances.len()))
    }
}
