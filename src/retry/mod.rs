//! 重试策略模块

pub mod backoff;
pub mod cache;
pub mod classifier;
pub mod engine;
pub mod policy;

pub use backoff::Backoff;
pub use cache::RetryPolicyCache;
pub use classifier::{ErrorClassifier, ResultClassifier, is_transport_error};
pub use engine::{InvocationAttempt, RetryEngine};
pub use policy::{DEFAULT_POLICY_NAME, RetryPolicy, RetryPolicyBuilder};
