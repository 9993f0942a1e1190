//! 服务定位接口

use locator_types::{ContainerError, Service};

/// 服务定位器trait - 按名称提供服务
///
/// [`ServiceContainer`](super::ServiceContainer) 实现了该 trait；对等查找只依赖该 trait，对等方不必是具体容器。
pub trait ServiceLocator: Send + Sync {
    /// 解析服务，本地未命中时可回退到对等容器
    fn locate(&self, name: &str, use_peering: bool) -> Result<Service, ContainerError>;

    /// 检查 `locate` 能否找到服务（不会构建）
    fn can_locate(&self, name: &str, use_peering: bool) -> bool;

    /// 作用域生命周期能力（如果支持）
    fn scoped(&self) -> Result<&dyn ScopedLocator, ContainerError> {
        Err(ContainerError::UnsupportedScope {
            operation: "scoped",
        })
    }
}

/// 可选能力 - 支持请求级作用域的定位器
pub trait ScopedLocator: ServiceLocator {
    /// 进入作用域
    fn enter_scope(&self) -> Result<(), ContainerError>;

    /// 离开作用域
    fn leave_scope(&self) -> Result<(), ContainerError>;
}
