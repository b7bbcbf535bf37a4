//! 实例过滤器
//!
//! 选择实例之前按注册顺序依次应用，负载均衡器只看到过滤后的候选列表。

use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::Arc;

use crate::discovery::instance::ServiceInstance;

/// 实例过滤器 trait
pub trait InstanceFilter: Send + Sync {
    /// 过滤实例列表
    fn filter(&self, instances: Vec<ServiceInstance>) -> Vec<ServiceInstance>;
}

impl<F> InstanceFilter for F
where
    F: Fn(Vec<ServiceInstance>) -> Vec<ServiceInstance> + Send + Sync,
{
    fn filter(&self, instances: Vec<ServiceInstance>) -> Vec<ServiceInstance> {
        self(instances)
    }
}

/// 元数据过滤器
///
/// `value` 为 None 时只检查键是否存在
#[derive(Debug, Clone)]
pub struct MetadataFilter {
    pub key: String,
    pub value: Option<String>,
}

impl MetadataFilter {
    /// 要求元数据键等于指定值
    pub fn equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }

    /// 只要求元数据键存在
    pub fn exists(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }

    fn matches(&self, instance: &ServiceInstance) -> bool {
        match &self.value {
            Some(value) => {
                let expected = HashMap::from([(self.key.clone(), value.clone())]);
                instance.matches_metadata(&expected)
            }
            None => instance.metadata.contains_key(&self.key),
        }
    }
}

impl InstanceFilter for MetadataFilter {
    fn filter(&self, instances: Vec<ServiceInstance>) -> Vec<ServiceInstance> {
        instances.into_iter().filter(|inst| self.matches(inst)).collect()
    }
}

/// 过滤器链
///
/// 注册时复制一份新列表再整体替换，读取方无需加锁
#[derive(Default)]
pub struct FilterChain {
    filters: ArcSwap<Vec<Arc<dyn InstanceFilter>>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加过滤器
    pub fn add(&self, filter: Arc<dyn InstanceFilter>) {
        self.filters.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(Arc::clone(&filter));
            next
        });
    }

    /// 过滤器数量
    pub fn len(&self) -> usize {
        self.filters.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 依次应用所有过滤器
    pub fn apply(&self, instances: Vec<ServiceInstance>) -> Vec<ServiceInstance> {
        self.filters
            .load()
            .iter()
            .fold(instances, |acc, filter| filter.filter(acc))
    }
}
