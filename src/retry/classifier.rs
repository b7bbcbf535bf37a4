//! 错误分类
//!
//! 默认只重试 I/O 错误和超时，沿 `source()` 链查找，包装过的错误同样生效。

use std::error::Error;
use std::sync::Arc;

/// 错误分类器，返回 true 表示可以重试
pub type ErrorClassifier = Arc<dyn Fn(&(dyn Error + Send + Sync + 'static)) -> bool + Send + Sync>;

/// 结果分类器，返回 true 表示结果不可接受、需要重试
pub type ResultClassifier = Arc<dyn Fn(&dyn std::any::Any) -> bool + Send + Sync>;

/// 是否为传输层错误（I/O 错误或超时）
pub fn is_transport_error(err: &(dyn Error + Send + Sync + 'static)) -> bool {
    let mut current: Option<&(dyn Error + 'static)> = Some(err);
    while let Some(e) = current {
        if e.is::<std::io::Error>() || e.is::<tokio::time::error::Elapsed>() {
            return true;
        }
        current = e.source();
    }
    false
}

pub(crate) fn default_error_classifier() -> ErrorClassifier {
    Arc::new(is_transport_error)
}

pub(crate) fn never_retry_result() -> ResultClassifier {
    Arc::new(|_| false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use std::fmt;
    use std::io;

    #[derive(Debug)]
    struct Wrapped(io::Error);

    impl fmt::Display for Wrapped {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "call failed")
        }
    }

    impl Error for Wrapped {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn io_errors_are_transport_errors() {
        let err: BoxError = io::Error::new(io::ErrorKind::ConnectionRefused, "refused").into();
        assert!(is_transport_error(err.as_ref()));
    }

    #[test]
    fn source_chain_is_walked() {
        let err: BoxError = Box::new(Wrapped(io::Error::new(io::ErrorKind::TimedOut, "slow")));
        assert!(is_transport_error(err.as_ref()));
    }

    #[tokio::test]
    async fn elapsed_is_transport_error() {
        let elapsed = tokio::time::timeout(std::time::Duration::ZERO, std::future::pending::<()>())
            .await
            .unwrap_err();
        let err: BoxError = Box::new(elapsed);
        assert!(is_transport_error(err.as_ref()));
    }

    #[test]
    fn other_errors_are_not_retried() {
        let err: BoxError = "bad request".into();
        assert!(!is_transport_error(err.as_ref()));
    }
}
