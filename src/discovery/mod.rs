//! 服务发现模块
//!
//! 注册中心抽象、实例定义、实例缓存与实例过滤器。

pub mod backend;
pub mod cache;
pub mod factory;
pub mod filter;
pub mod instance;

pub use backend::{InstanceDirectory, StaticDirectory};
pub use cache::{InstanceCache, InstanceCacheEntry};
pub use factory::{BackendType, DirectoryFactory};
pub use filter::{FilterChain, InstanceFilter, MetadataFilter};
pub use instance::{InstanceKey, RegistrationEvent, ServiceInstance};
