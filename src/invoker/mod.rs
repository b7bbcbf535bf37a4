//! 调用模块

pub mod context;
pub mod coordinator;

pub use context::InvokerContext;
pub use coordinator::InvocationCoordinator;
