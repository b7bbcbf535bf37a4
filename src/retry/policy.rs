//! 重试策略

use std::any::Any;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::backoff::Backoff;
use super::classifier::{
    ErrorClassifier, ResultClassifier, default_error_classifier, never_retry_result,
};
use crate::config::LbConfig;

/// 默认策略名称
pub const DEFAULT_POLICY_NAME: &str = "default";

/// 重试策略
///
/// 错误分类器和结果分类器相互独立：抛出的错误只交给错误分类器，
/// 返回的结果只交给结果分类器。`max_attempts` 是硬上限，与分类结果无关。
#[derive(Clone)]
pub struct RetryPolicy {
    name: String,
    max_attempts: usize,
    backoff: Backoff,
    retry_on_error: ErrorClassifier,
    retry_on_result: ResultClassifier,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("name", &self.name)
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy {
    pub fn builder(name: impl Into<String>) -> RetryPolicyBuilder {
        RetryPolicyBuilder::new(name)
    }

    /// 由配置生成的默认策略
    pub fn from_config(config: &LbConfig) -> Self {
        Self::builder(DEFAULT_POLICY_NAME)
            .max_attempts(config.default_max_attempts)
            .retry_wait(config.default_retry_wait())
            .build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// 第 `failed_attempts` 次失败后的等待时间
    pub fn delay(&self, failed_attempts: usize) -> Duration {
        self.backoff.delay(failed_attempts)
    }

    /// 错误是否可以重试
    pub fn should_retry_error(&self, err: &(dyn Error + Send + Sync + 'static)) -> bool {
        (self.retry_on_error)(err)
    }

    /// 结果是否需要重试
    pub fn should_retry_result<T: Any>(&self, result: &T) -> bool {
        (self.retry_on_result)(result as &dyn Any)
    }
}

/// 重试策略构建器
pub struct RetryPolicyBuilder {
    name: String,
    max_attempts: usize,
    backoff: Backoff,
    retry_on_error: ErrorClassifier,
    retry_on_result: ResultClassifier,
}

impl RetryPolicyBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_attempts: 3,
            backoff: Backoff::default(),
            retry_on_error: default_error_classifier(),
            retry_on_result: never_retry_result(),
        }
    }

    /// 最大尝试次数（包含第一次），最小为 1
    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// 固定重试间隔
    pub fn retry_wait(mut self, wait: Duration) -> Self {
        self.backoff = Backoff::Fixed(wait);
        self
    }

    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// 自定义错误分类器
    pub fn retry_on_error<F>(mut self, classifier: F) -> Self
    where
        F: Fn(&(dyn Error + Send + Sync + 'static)) -> bool + Send + Sync + 'static,
    {
        self.retry_on_error = Arc::new(classifier);
        self
    }

    /// 对指定类型的错误重试（沿 `source()` 链查找）
    pub fn retry_on_error_type<E: Error + 'static>(self) -> Self {
        self.retry_on_error(|err| {
            let mut current: Option<&(dyn Error + 'static)> = Some(err);
            while let Some(e) = current {
                if e.is::<E>() {
                    return true;
                }
                current = e.source();
            }
            false
        })
    }

    /// 按结果重试
    ///
    /// 只对类型为 `T` 的结果生效，其他类型的结果视为可接受
    pub fn retry_on_result<T, F>(mut self, predicate: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.retry_on_result = Arc::new(move |result: &dyn Any| {
            result.downcast_ref::<T>().is_some_and(&predicate)
        });
        self
    }

    pub fn build(self) -> RetryPolicy {
        RetryPolicy {
            name: self.name,
            max_attempts: self.max_attempts,
            backoff: self.backoff,
            retry_on_error: self.retry_on_error,
            retry_on_result: self.retry_on_result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use std::io;

    #[test]
    fn defaults_follow_config() {
        let config = LbConfig::default().with_default_retry(5, Duration::from_millis(20));
        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy.name(), DEFAULT_POLICY_NAME);
        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(policy.delay(1), Duration::from_millis(20));
    }

    #[test]
    fn max_attempts_is_at_least_one() {
        let policy = RetryPolicy::builder("p").max_attempts(0).build();
        assert_eq!(policy.max_attempts(), 1);
    }

    #[test]
    fn default_error_classifier_retries_io_only() {
        let policy = RetryPolicy::builder("p").build();
        let io: BoxError = io::Error::other("reset").into();
        let other: BoxError = "invalid argument".into();
        assert!(policy.should_retry_error(io.as_ref()));
        assert!(!policy.should_retry_error(other.as_ref()));
    }

    #[test]
    fn typed_result_classifier() {
        let policy = RetryPolicy::builder("p")
            .retry_on_result(|status: &u16| *status >= 500)
            .build();
        assert!(policy.should_retry_result(&503u16));
        assert!(!policy.should_retry_result(&200u16));
        // 类型不匹配的结果视为可接受
        assert!(!policy.should_retry_result(&"503"));
    }

    #[test]
    fn error_type_classifier() {
        let policy = RetryPolicy::builder("p")
            .retry_on_error_type::<std::fmt::Error>()
            .build();
        let fmt_err: BoxError = Box::new(std::fmt::Error);
        let io: BoxError = io::Error::other("reset").into();
        assert!(policy.should_retry_error(fmt_err.as_ref()));
        assert!(!policy.should_retry_error(io.as_ref()));
    }
}
