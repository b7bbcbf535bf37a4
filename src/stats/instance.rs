//! 单实例调用统计

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// 单实例调用统计
///
/// 由多个调用方并发修改，全部使用原子操作；`active_requests` 在 0 处截断，不会为负。
#[derive(Debug)]
pub struct InstanceStats {
    active_requests: AtomicU64,
    total_requests: AtomicU64,
    failed_requests: AtomicU64,
    cumulative_latency_ms: AtomicU64,
    created_at: Instant,
}

impl Default for InstanceStats {
    fn default() -> Self {
        Self::new()
    }
}

impl InstanceStats {
    pub fn new() -> Self {
        Self {
            active_requests: AtomicU64::new(0),
            total_requests: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
            cumulative_latency_ms: AtomicU64::new(0),
            created_at: Instant::now(),
        }
    }

    /// 调用前
    pub fn before_call(&self) {
        self.active_requests.fetch_add(1, Ordering::Relaxed);
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// 调用成功
    pub fn after_success(&self, elapsed_ms: u64) {
        self.complete(elapsed_ms);
    }

    /// 调用失败
    pub fn after_failure(&self, elapsed_ms: u64) {
        self.complete(elapsed_ms);
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
    }

    fn complete(&self, elapsed_ms: u64) {
        let _ = self
            .active_requests
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |active| {
                Some(active.saturating_sub(1))
            });
        self.cumulative_latency_ms
            .fetch_add(elapsed_ms, Ordering::Relaxed);
    }

    /// 正在进行的请求数
    pub fn active_requests(&self) -> u64 {
        self.active_requests.load(Ordering::Acquire)
    }

    /// 请求总数（包含进行中的请求）
    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    /// 失败请求数
    pub fn failed_requests(&self) -> u64 {
        self.failed_requests.load(Ordering::Relaxed)
    }

    /// 累计耗时（毫秒）
    pub fn cumulative_latency_ms(&self) -> u64 {
        self.cumulative_latency_ms.load(Ordering::Relaxed)
    }

    /// 平均耗时（毫秒），没有请求时为 0
    pub fn avg_latency_ms(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            return 0.0;
        }
        self.cumulative_latency_ms() as f64 / total as f64
    }

    /// 自创建起是否已超过 `expire`
    pub fn is_expired(&self, expire: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) >= expire
    }

    /// 当前快照
    pub fn snapshot(&self) -> InstanceStatsSnapshot {
        InstanceStatsSnapshot {
            active_requests: self.active_requests(),
            total_requests: self.total_requests(),
            failed_requests: self.failed_requests(),
            cumulative_latency_ms: self.cumulative_latency_ms(),
            avg_latency_ms: self.avg_latency_ms(),
        }
    }
}

/// 单实例统计快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceStatsSnapshot {
    pub active_requests: u64,
    pub total_requests: u64,
    pub failed_requests: u64,
    pub cumulative_latency_ms: u64,
    pub avg_latency_ms: f64,
}
