//! 实例缓存
//!
//! 按服务名缓存注册中心返回的实例列表，避免每次调用都访问注册中心。
//!
//! - 未过期：直接返回缓存，不访问注册中心
//! - 已过期：同步重新加载；加载失败时返回旧值（没有旧值则返回空列表）
//! - 同一服务同一时刻最多只有一个加载在进行，其余调用等待并复用结果（加载失败时复用旧值）

use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::discovery::backend::InstanceDirectory;
use crate::discovery::instance::ServiceInstance;
use crate::error::DiscoveryError;

/// 缓存条目
#[derive(Debug, Clone)]
pub struct InstanceCacheEntry {
    pub service_name: String,
    pub instances: Vec<ServiceInstance>,
    pub resolved_at: Instant,
    pub ttl: Duration,
}

impl InstanceCacheEntry {
    fn new(service_name: &str, instances: Vec<ServiceInstance>, ttl: Duration) -> Self {
        Self {
            service_name: service_name.to_string(),
            instances,
            resolved_at: Instant::now(),
            ttl,
        }
    }

    /// `now > resolved_at + ttl` 时过期
    pub fn is_expired(&self, now: Instant) -> bool {
        now > self.resolved_at + self.ttl
    }
}

#[derive(Default)]
struct CacheSlot {
    entry: ArcSwapOption<InstanceCacheEntry>,
    load_lock: Mutex<()>,
    /// 已完成的加载次数，成功失败都计
    loads: AtomicU64,
}

/// 实例缓存
pub struct InstanceCache {
    directory: Arc<dyn InstanceDirectory>,
    ttl: Duration,
    slots: DashMap<String, Arc<CacheSlot>>,
}

impl InstanceCache {
    /// 创建实例缓存
    ///
    /// `concurrency_level` 决定内部分片数量（向上取 2 的幂）
    pub fn new(directory: Arc<dyn InstanceDirectory>, ttl: Duration, concurrency_level: usize) -> Self {
        let shards = concurrency_level.next_power_of_two().max(2);
        Self {
            directory,
            ttl,
            slots: DashMap::with_shard_amount(shards),
        }
    }

    /// 缓存有效期
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// 获取服务实例列表
    pub async fn get(&self, service_name: &str) -> Vec<ServiceInstance> {
        let slot = self.slot(service_name);
        let observed = slot.loads.load(Ordering::Acquire);
        if let Some(entry) = fresh(&slot) {
            return entry.instances.clone();
        }

        let _guard = slot.load_lock.lock().await;
        // 等锁期间其他调用已经完成一次加载，直接复用当前值（可能是旧值）
        if slot.loads.load(Ordering::Acquire) != observed {
            return current(&slot);
        }
        self.load(service_name, &slot).await
    }

    /// 查看当前缓存（不论是否过期），不访问注册中心
    pub fn peek(&self, service_name: &str) -> Option<Vec<ServiceInstance>> {
        self.entry(service_name).map(|entry| entry.instances.clone())
    }

    /// 当前缓存条目
    pub fn entry(&self, service_name: &str) -> Option<Arc<InstanceCacheEntry>> {
        let slot = self.slots.get(service_name)?.clone();
        slot.entry.load_full()
    }

    /// 强制重新加载某个服务
    pub async fn refresh(&self, service_name: &str) -> Vec<ServiceInstance> {
        let slot = self.slot(service_name);
        let _guard = slot.load_lock.lock().await;
        self.load(service_name, &slot).await
    }

    /// 重新加载所有已知服务
    pub async fn refresh_all(&self) {
        for service_name in self.services() {
            self.refresh(&service_name).await;
        }
    }

    /// 使某个服务的缓存失效，下次访问时重新加载
    pub fn invalidate(&self, service_name: &str) {
        if let Some(slot) = self.slots.get(service_name) {
            slot.entry.store(None);
        }
    }

    /// 所有访问过的服务名
    pub fn services(&self) -> Vec<String> {
        self.slots.iter().map(|slot| slot.key().clone()).collect()
    }

    /// 启动后台刷新任务
    ///
    /// 每隔 `interval` 重新加载所有已知服务，使热点服务在过期前就拿到新列表
    pub fn start_refresh_task(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        info!(interval_ms = interval.as_millis() as u64, "Started instance cache refresh task");

        tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            // 跳过第一次立即触发的 tick
            timer.tick().await;
            loop {
                timer.tick().await;
                cache.refresh_all().await;
            }
        })
    }

    fn slot(&self, service_name: &str) -> Arc<CacheSlot> {
        if let Some(slot) = self.slots.get(service_name) {
            return Arc::clone(&slot);
        }
        self.slots
            .entry(service_name.to_string())
            .or_default()
            .clone()
    }

    async fn load(&self, service_name: &str, slot: &CacheSlot) -> Vec<ServiceInstance> {
        let instances = match self.directory.instances(service_name).await {
            Ok(instances) => {
                debug!(
                    service = %service_name,
                    instances = instances.len(),
                    "Loaded instances from directory"
                );
                let entry = Arc::new(InstanceCacheEntry::new(service_name, instances, self.ttl));
                slot.entry.store(Some(Arc::clone(&entry)));
                entry.instances.clone()
            }
            Err(e) => {
                let stale = slot.entry.load_full();
                let error = DiscoveryError::directory_unavailable(service_name, &e);
                warn!(
                    service = %service_name,
                    error = %error,
                    stale_fallback = stale.is_some(),
                    "Failed to load instances, using cached value"
                );
                stale.map(|entry| entry.instances.clone()).unwrap_or_default()
            }
        };
        slot.loads.fetch_add(1, Ordering::Release);
        instances
    }
}

fn current(slot: &CacheSlot) -> Vec<ServiceInstance> {
    slot.entry
        .load_full()
        .map(|entry| entry.instances.clone())
        .unwrap_or_default()
}

fn fresh(slot: &CacheSlot) -> Option<Arc<InstanceCacheEntry>> {
    slot.entry
        .load_full()
        .filter(|entry| !entry.is_expired(Instant::now()))
}
