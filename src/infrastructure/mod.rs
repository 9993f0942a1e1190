//! 基础设施层
//!
//! - 服务容器 (解析引擎、注册表、对等容器)
//! - 服务提供者目录
//! - 模块引导

pub mod container;
pub mod module;
pub mod provider;

pub use container::{ContainerError, ContainerStats, ServiceContainer, ServiceLocator};
pub use module::{Module, ModuleError, ModuleManager, ModuleStatus};
pub use provider::{build_container, ProviderCatalog};
