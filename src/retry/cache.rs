//! 重试策略缓存

use dashmap::DashMap;
use std::sync::Arc;
use tracing::warn;

use super::policy::RetryPolicy;

/// 按名称缓存重试策略
///
/// 同名策略只保留第一次声明的版本。缓存达到上限后，新名称的策略不再缓存，
/// 改用共享的默认策略。
pub struct RetryPolicyCache {
    default: Arc<RetryPolicy>,
    policies: DashMap<String, Arc<RetryPolicy>>,
    max_size: usize,
}

impl RetryPolicyCache {
    pub fn new(default: RetryPolicy, max_size: usize) -> Self {
        Self {
            default: Arc::new(default),
            policies: DashMap::new(),
            max_size,
        }
    }

    /// 默认策略
    pub fn default_policy(&self) -> Arc<RetryPolicy> {
        Arc::clone(&self.default)
    }

    /// 解析调用使用的策略
    pub fn resolve(&self, policy: Option<RetryPolicy>) -> Arc<RetryPolicy> {
        let Some(policy) = policy else {
            return self.default_policy();
        };

        if let Some(cached) = self.policies.get(policy.name()) {
            return Arc::clone(&cached);
        }

        if self.policies.len() >= self.max_size {
            warn!(
                policy = %policy.name(),
                max_size = self.max_size,
                "Retry policy cache is full, using default policy"
            );
            return self.default_policy();
        }

        self.policies
            .entry(policy.name().to_string())
            .or_insert_with(|| Arc::new(policy))
            .clone()
    }

    /// 已缓存的策略数量
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}
