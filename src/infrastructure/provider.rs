//! 服务提供者目录
//!
//! 配置通过类型引用字符串指定实现，目录把每个引用映射到已注册的构造器，运行时不按类型名查找。

use super::container::{
    AbstractFactory, BoxError, DelegatorFactory, InnerBuilder, Initializer, InvokableType,
    PredicateFactory, Service, ServiceContainer, ServiceFactory,
};
use crate::config::{ContainerConfig, ServicesConfig};
use crate::errors::ConfigError;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 服务提供者目录 - 把 [`ServicesConfig`] 转换为注册调用的类型引用表
#[derive(Clone, Default)]
pub struct ProviderCatalog {
    invokables: HashMap<String, InvokableType>,
    factories: HashMap<String, Arc<dyn ServiceFactory>>,
    abstract_factories: HashMap<String, Arc<dyn AbstractFactory>>,
    delegators: HashMap<String, Arc<dyn DelegatorFactory>>,
    initializers: HashMap<String, Arc<dyn Initializer>>,
}

impl ProviderCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// `type_ref` 通过 `T::default()` 构建
    pub fn with_invokable<T>(self, type_ref: &str) -> Self
    where
        T: Default + Any + Send + Sync,
    {
        self.with_invokable_type(type_ref, InvokableType::of::<T>())
    }

    pub fn with_invokable_type(mut self, type_ref: &str, invokable: InvokableType) -> Self {
        self.invokables.insert(type_ref.to_string(), invokable);
        self
    }

    pub fn with_factory<F>(mut self, type_ref: &str, factory: F) -> Self
    where
        F: Fn(&ServiceContainer, &str, &str) -> Result<Service, BoxError> + Send + Sync + 'static,
    {
        self.factories
            .insert(type_ref.to_string(), Arc::new(factory));
        self
    }

    pub fn with_abstract_factory<P, F>(mut self, type_ref: &str, predicate: P, builder: F) -> Self
    where
        P: Fn(&ServiceContainer, &str, &str) -> bool + Send + Sync + 'static,
        F: Fn(&ServiceContainer, &str, &str) -> Result<Service, BoxError> + Send + Sync + 'static,
    {
        self.abstract_factories.insert(
            type_ref.to_string(),
            Arc::new(PredicateFactory::new(predicate, builder)),
        );
        self
    }

    pub fn with_delegator<F>(mut self, type_ref: &str, delegator: F) -> Self
    where
        F: Fn(&ServiceContainer, &str, InnerBuilder<'_>) -> Result<Service, BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.delegators
            .insert(type_ref.to_string(), Arc::new(delegator));
        self
    }

    pub fn with_initializer<F>(mut self, type_ref: &str, initializer: F) -> Self
    where
        F: Fn(&ServiceContainer, &Service) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.initializers
            .insert(type_ref.to_string(), Arc::new(initializer));
        self
    }

    /// 把配置中的全部服务注册到容器
    ///
    /// 遇到目录中不存在的类型引用时返回 [`ConfigError::UnknownType`]。
    pub fn apply(
        &self,
        services: &ServicesConfig,
        container: &ServiceContainer,
    ) -> Result<(), ConfigError> {
        if let Some(allow) = services.allow_override {
            container.set_allow_override(allow);
        }
        if let Some(shared) = services.shared_by_default {
            container.set_shared_by_default(shared);
        }

        for (name, type_ref) in &services.invokables {
            let invokable = lookup(&self.invokables, "invokable", type_ref)?;
            container.register_invokable_with(name, *invokable, services.is_shared(name))?;
        }
        for (name, type_ref) in &services.factories {
            let factory = lookup(&self.factories, "factory", type_ref)?;
            container.register_factory_with(name, Arc::clone(factory), services.is_shared(name))?;
        }
        for type_ref in &services.abstract_factories {
            let factory = lookup(&self.abstract_factories, "abstract factory", type_ref)?;
            container.add_abstract_factory(Arc::clone(factory));
        }
        for (name, target) in &services.aliases {
            container.alias(name, target)?;
        }
        for (name, type_refs) in &services.delegators {
            for type_ref in type_refs {
                let delegator = lookup(&self.delegators, "delegator", type_ref)?;
                container.add_delegator(name, Arc::clone(delegator));
            }
        }
        for type_ref in &services.initializers {
            let initializer = lookup(&self.initializers, "initializer", type_ref)?;
            container.add_initializer(Arc::clone(initializer));
        }
        for (name, shared) in &services.shared {
            container.set_shared(name, *shared);
        }

        tracing::debug!(
            definitions = services.definition_count(),
            abstract_factories = services.abstract_factories.len(),
            initializers = services.initializers.len(),
            "applied service configuration"
        );
        Ok(())
    }
}

fn lookup<'a, T>(
    table: &'a HashMap<String, T>,
    kind: &'static str,
    type_ref: &str,
) -> Result<&'a T, ConfigError> {
    table.get(type_ref).ok_or_else(|| ConfigError::UnknownType {
        kind,
        type_ref: type_ref.to_string(),
    })
}

impl fmt::Debug for ProviderCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCatalog")
            .field("invokables", &sorted_keys(&self.invokables))
            .field("factories", &sorted_keys(&self.factories))
            .field("abstract_factories", &sorted_keys(&self.abstract_factories))
            .field("delegators", &sorted_keys(&self.delegators))
            .field("initializers", &sorted_keys(&self.initializers))
            .finish()
    }
}

fn sorted_keys<T>(table: &HashMap<String, T>) -> Vec<&str> {
    let mut keys: Vec<&str> = table.keys().map(String::as_str).collect();
    keys.sort_unstable();
    keys
}

/// 根据配置构建完整的服务容器
///
/// 参数会预先全部解析，错误的占位符在这里就会失败，而不是等到首次使用。
pub fn build_container(
    config: &ContainerConfig,
    catalog: &ProviderCatalog,
) -> Result<ServiceContainer, ConfigError> {
    let parameters = config.parameter_store();
    parameters.resolve_all()?;

    let container = ServiceContainer::new().with_parameters(parameters);
    catalog.apply(&config.services, &container)?;

    tracing::info!(
        services = config.services.definition_count(),
        parameters = config.parameters.len(),
        "container built"
    );
    Ok(container)
}
