//! 重试执行
//!
//! 第一次尝试使用配置的负载均衡策略，重试使用独立的轮询并尽量避开本次调用中
//! 已经失败的实例。每次尝试都经过统计钩子。

use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::policy::RetryPolicy;
use crate::balancer::{InstanceSelector, RoundRobin};
use crate::discovery::instance::{InstanceKey, ServiceInstance};
use crate::error::{BoxError, DiscoveryError, Result};
use crate::invoker::InvokerContext;
use crate::stats::StatsRegistry;

/// 单次尝试记录
#[derive(Debug, Clone)]
pub struct InvocationAttempt {
    pub attempt: usize,
    pub instance: InstanceKey,
    pub elapsed_ms: u64,
    pub failure: Option<String>,
}

pub struct RetryEngine {
    selector: Arc<InstanceSelector>,
    stats: Arc<StatsRegistry>,
    retry_balancer: RoundRobin,
    prefer_ip: bool,
}

impl RetryEngine {
    pub fn new(selector: Arc<InstanceSelector>, stats: Arc<StatsRegistry>, prefer_ip: bool) -> Self {
        Self {
            selector,
            stats,
            retry_balancer: RoundRobin::new(),
            prefer_ip,
        }
    }

    /// 执行调用
    ///
    /// 结果分类器要求重试但次数已用完时，返回最后一次的结果
    pub async fn execute<T, E, F, Fut>(
        &self,
        service_name: &str,
        policy: &RetryPolicy,
        mut work: F,
    ) -> Result<T>
    where
        T: 'static,
        E: Into<BoxError>,
        F: FnMut(InvokerContext) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let max_attempts = policy.max_attempts().max(1);
        let mut failed: Vec<InstanceKey> = Vec::new();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let instance = self.select(service_name, attempt, &failed).await;
            let Some(instance) = instance else {
                debug!(service = %service_name, attempt, "No instance available");
                return Err(DiscoveryError::no_instance(service_name));
            };

            let stats = self.stats.before_call(&instance);
            let started = Instant::now();
            let outcome = work(InvokerContext::new(
                service_name,
                instance.clone(),
                attempt,
                self.prefer_ip,
            ))
            .await;
            let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            let has_next = attempt < max_attempts;

            match outcome {
                Ok(result) => {
                    if !policy.should_retry_result(&result) {
                        stats.after_success(elapsed_ms);
                        return Ok(result);
                    }

                    stats.after_failure(elapsed_ms);
                    let record = InvocationAttempt {
                        attempt,
                        instance: instance.key(),
                        elapsed_ms,
                        failure: Some("result rejected by retry policy".to_string()),
                    };
                    debug!(service = %service_name, policy = %policy.name(), ?record, "Invocation attempt");
                    if !has_next {
                        warn!(
                            service = %service_name,
                            attempts = attempt,
                            "Retry attempts exhausted, returning last result"
                        );
                        return Ok(result);
                    }
                    failed.push(record.instance);
                }
                Err(e) => {
                    let error: BoxError = e.into();
                    stats.after_failure(elapsed_ms);
                    let record = InvocationAttempt {
                        attempt,
                        instance: instance.key(),
                        elapsed_ms,
                        failure: Some(error.to_string()),
                    };
                    debug!(service = %service_name, policy = %policy.name(), ?record, "Invocation attempt");

                    if !policy.should_retry_error(error.as_ref()) {
                        return Err(DiscoveryError::NonRetryable {
                            service: service_name.to_string(),
                            attempts: attempt,
                            source: error,
                        });
                    }
                    if !has_next {
                        warn!(
                            service = %service_name,
                            attempts = attempt,
                            last_instance = %record.instance,
                            error = %error,
                            "Retry attempts exhausted"
                        );
                        return Err(DiscoveryError::RetryExhausted {
                            service: service_name.to_string(),
                            attempts: attempt,
                            last_instance: record.instance.to_string(),
                            source: error,
                        });
                    }
                    failed.push(record.instance);
                }
            }

            let delay = policy.delay(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    async fn select(
        &self,
        service_name: &str,
        attempt: usize,
        failed: &[InstanceKey],
    ) -> Option<ServiceInstance> {
        if attempt == 1 {
            return self.selector.choose(service_name).await;
        }
        self.selector
            .choose_excluding(service_name, &self.retry_balancer, failed)
            .await
    }
}
