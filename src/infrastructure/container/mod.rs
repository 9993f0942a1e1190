//! 服务容器
//!
//! 每次调用都会规范化名称，注册和查找不区分大小写，并忽略 `-`、`_`、空格、`\` 和 `/` 分隔符。

pub mod definition;
pub mod guard;
pub mod locator;
pub mod peering;
pub mod registry;
pub mod service_container;

pub use definition::{
    AbstractFactory, Definition, DelegatorFactory, InnerBuilder, Initializer, InvokableType,
    PredicateFactory, ServiceFactory,
};
pub use locator::{ScopedLocator, ServiceLocator};
pub use peering::PeeringChain;
pub use registry::ServiceRegistry;
pub use service_container::{ContainerStats, ServiceContainer};

pub use locator_types::{into_service, BoxError, ContainerError, Service, ServiceName};
