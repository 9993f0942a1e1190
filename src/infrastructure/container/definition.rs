//! 服务定义与工厂抽象
//!
//! 构建器是普通闭包或 trait 对象，运行时不会按类型名字符串实例化。
//! 配置驱动的服务通过
//! [`crate::infrastructure::provider::ProviderCatalog`] 把类型引用映射到这里定义的值。

use super::ServiceContainer;
use locator_types::{BoxError, ContainerError, Service, ServiceName};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 传给委托器的无参访问器，返回上一阶段的结果
pub type InnerBuilder<'a> = &'a dyn Fn() -> Result<Service, ContainerError>;

/// 服务工厂trait - 为指定名称构建服务
pub trait ServiceFactory: Send + Sync {
    /// 创建服务实例。`name` 为规范名称，`requested` 为调用方请求的原始名称
    fn create(
        &self,
        container: &ServiceContainer,
        name: &str,
        requested: &str,
    ) -> Result<Service, BoxError>;
}

impl<F> ServiceFactory for F
where
    F: Fn(&ServiceContainer, &str, &str) -> Result<Service, BoxError> + Send + Sync,
{
    fn create(
        &self,
        container: &ServiceContainer,
        name: &str,
        requested: &str,
    ) -> Result<Service, BoxError> {
        self(container, name, requested)
    }
}

/// 抽象工厂trait - 为谓词接受的任意名称构建服务
pub trait AbstractFactory: Send + Sync {
    /// 检查能否构建该名称（不得构建实例）
    fn can_create(&self, container: &ServiceContainer, name: &str, requested: &str) -> bool;

    /// 构建服务，仅在 `can_create` 返回真后调用
    fn create(
        &self,
        container: &ServiceContainer,
        name: &str,
        requested: &str,
    ) -> Result<Service, BoxError>;
}

/// 由谓词闭包和构建闭包组成的抽象工厂
pub struct PredicateFactory<P, F> {
    predicate: P,
    builder: F,
}

impl<P, F> PredicateFactory<P, F> {
    /// 创建谓词工厂
    pub fn new(predicate: P, builder: F) -> Self {
        Self { predicate, builder }
    }
}

impl<P, F> AbstractFactory for PredicateFactory<P, F>
where
    P: Fn(&ServiceContainer, &str, &str) -> bool + Send + Sync,
    F: Fn(&ServiceContainer, &str, &str) -> Result<Service, BoxError> + Send + Sync,
{
    fn can_create(&self, container: &ServiceContainer, name: &str, requested: &str) -> bool {
        (self.predicate)(container, name, requested)
    }

    fn create(
        &self,
        container: &ServiceContainer,
        name: &str,
        requested: &str,
    ) -> Result<Service, BoxError> {
        (self.builder)(container, name, requested)
    }
}

/// 委托器trait - 装饰真实构建器的输出
pub trait DelegatorFactory: Send + Sync {
    /// 生成替换后的服务，调用 `inner` 执行上一阶段
    fn decorate(
        &self,
        container: &ServiceContainer,
        name: &str,
        inner: InnerBuilder<'_>,
    ) -> Result<Service, BoxError>;
}

impl<F> DelegatorFactory for F
where
    F: Fn(&ServiceContainer, &str, InnerBuilder<'_>) -> Result<Service, BoxError> + Send + Sync,
{
    fn decorate(
        &self,
        container: &ServiceContainer,
        name: &str,
        inner: InnerBuilder<'_>,
    ) -> Result<Service, BoxError> {
        self(container, name, inner)
    }
}

/// 初始化器trait - 对每个新构建的服务执行的后置钩子
///
/// 初始化器可以通过内部可变性修改服务，但不能替换实例。
pub trait Initializer: Send + Sync {
    fn initialize(&self, container: &ServiceContainer, service: &Service) -> Result<(), BoxError>;
}

impl<F> Initializer for F
where
    F: Fn(&ServiceContainer, &Service) -> Result<(), BoxError> + Send + Sync,
{
    fn initialize(&self, container: &ServiceContainer, service: &Service) -> Result<(), BoxError> {
        self(container, service)
    }
}

/// 可无参构建的类型
#[derive(Clone, Copy)]
pub struct InvokableType {
    type_name: &'static str,
    construct: fn() -> Service,
}

impl InvokableType {
    /// 通过 `T::default()` 构建
    pub fn of<T>() -> Self
    where
        T: Default + Any + Send + Sync,
    {
        Self {
            type_name: std::any::type_name::<T>(),
            construct: construct_default::<T>,
        }
    }

    /// 通过显式构造函数构建
    pub fn from_fn(type_name: &'static str, construct: fn() -> Service) -> Self {
        Self {
            type_name,
            construct,
        }
    }

    /// 获取类型名称（用于错误信息）
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// 构建实例
    pub fn construct(&self) -> Service {
        (self.construct)()
    }
}

fn construct_default<T>() -> Service
where
    T: Default + Any + Send + Sync,
{
    Arc::new(T::default())
}

impl fmt::Debug for InvokableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvokableType")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// 以规范名称保存的直接定义
#[derive(Clone)]
pub enum Definition {
    /// 无参构建
    Invokable(InvokableType),
    /// 以容器和名称调用构建器
    Factory(Arc<dyn ServiceFactory>),
    /// 指向另一个名称的别名
    Alias(ServiceName),
}

impl Definition {
    /// 用于日志和列表的类型标签
    pub fn kind(&self) -> &'static str {
        match self {
            Definition::Invokable(_) => "invokable",
            Definition::Factory(_) => "factory",
            Definition::Alias(_) => "alias",
        }
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Definition::Invokable(invokable) => f.debug_tuple("Invokable").field(invokable).finish(),
            Definition::Factory(_) => f.write_str("Factory(..)"),
            Definition::Alias(target) => f.debug_tuple("Alias").field(target).finish(),
        }
    }
}
