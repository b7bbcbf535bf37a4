//! Flare Discovery Client
//!
//! Client-side service discovery, instance caching, load balancing and retry-with-failover.
//!
//! 调用方只需提供服务名和一个以实例为参数的异步闭包，协调器负责从注册中心取实例、
//! 过滤、负载均衡、记录调用统计，并在失败时切换实例重试。

pub mod balancer;
pub mod config;
pub mod discovery;
pub mod error;
pub mod invoker;
pub mod logging;
pub mod retry;
pub mod stats;
pub mod utils;

// Re-exports
pub use balancer::{
    BestAvailable, InstanceSelector, LoadBalancer, LoadBalancerRegistry, RandomBalancer,
    RoundRobin, WeightedResponseTime,
};
pub use config::{DirectoryConfig, LbConfig};
pub use discovery::{
    BackendType, DirectoryFactory, FilterChain, InstanceCache, InstanceDirectory, InstanceFilter,
    InstanceKey, MetadataFilter, RegistrationEvent, ServiceInstance, StaticDirectory,
};
pub use error::{BoxError, DiscoveryError, ErrorCode, InfraResult, Result};
pub use invoker::{InvocationCoordinator, InvokerContext};
pub use logging::init_tracing;
pub use retry::{Backoff, RetryPolicy, RetryPolicyBuilder, RetryPolicyCache};
pub use stats::{InstanceStats, ServiceStats, StatsRegistry};
pub use utils::{ServiceUrl, split_service_url};
