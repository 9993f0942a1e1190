//! Locator Shared Types
//! 容器、参数解析与配置层共用的类型定义

#![warn(missing_docs)]

pub mod error;
pub mod name;

// Re-export commonly used types
pub use error::*;
pub use name::*;

use std::any::Any;
use std::sync::Arc;

/// A materialised service as handed out by the container.
///
/// Identity matters: shared services are returned as clones of the same `Arc`.
pub type Service = Arc<dyn Any + Send + Sync>;

/// Wrap a concrete value into a [`Service`].
pub fn into_service<T: Any + Send + Sync>(value: T) -> Service {
    Arc::new(value)
}
