//! 服务容器 - 解析引擎
//!
//! 缓存未命中时按以下顺序解析名称：
//!
//! 1. 沿别名链找到实际名称
//! 2. 可调用类型或工厂定义
//! 3. 第一个谓词接受该名称的抽象工厂
//! 4. 启用对等查找时依次询问对等容器
//!
//! 构建结果再依次经过该名称的委托器和全局初始化器，共享服务最后写入缓存。

use super::definition::{
    AbstractFactory, Definition, DelegatorFactory, InnerBuilder, Initializer, InvokableType,
    PredicateFactory, ServiceFactory,
};
use super::guard::ResolutionStack;
use super::locator::ServiceLocator;
use super::peering::PeeringChain;
use super::registry::ServiceRegistry;
use crate::parameters::ParameterStore;
use dashmap::DashMap;
use locator_types::{closest_match, BoxError, ContainerError, Service, ServiceName};
use parking_lot::RwLock;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// 服务容器 - 按名称惰性构建服务，并持有服务配置所用的参数
pub struct ServiceContainer {
    registry: RwLock<ServiceRegistry>,
    /// 共享实例缓存（含 `set` 写入的实例）
    instances: DashMap<ServiceName, Service>,
    resolving: ResolutionStack,
    /// `has` 探测专用栈，与 `resolving` 分开
    probing: ResolutionStack,
    peers: PeeringChain,
    parameters: RwLock<ParameterStore>,
    stats: InnerStats,
}

#[derive(Default)]
struct InnerStats {
    resolutions: AtomicUsize,
    cache_hits: AtomicUsize,
    builds: AtomicUsize,
    peer_hits: AtomicUsize,
}

/// 容器统计信息快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContainerStats {
    pub resolutions: usize,
    pub cache_hits: usize,
    pub builds: usize,
    pub peer_hits: usize,
    pub cached_instances: usize,
}

impl ContainerStats {
    /// 获取缓存命中率
    pub fn hit_rate(&self) -> f64 {
        if self.resolutions == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.resolutions as f64
        }
    }
}

enum Builder {
    Invokable(InvokableType),
    Factory(Arc<dyn ServiceFactory>),
    Abstract(Arc<dyn AbstractFactory>),
}

impl ServiceContainer {
    /// 创建新的容器实例
    pub fn new() -> Self {
        Self::with_registry(ServiceRegistry::new())
    }

    /// 基于已有注册表创建容器
    pub fn with_registry(registry: ServiceRegistry) -> Self {
        Self {
            registry: RwLock::new(registry),
            instances: DashMap::new(),
            resolving: ResolutionStack::new(),
            probing: ResolutionStack::new(),
            peers: PeeringChain::new(),
            parameters: RwLock::new(ParameterStore::new()),
            stats: InnerStats::default(),
        }
    }

    /// 替换参数存储
    pub fn with_parameters(self, parameters: ParameterStore) -> Self {
        *self.parameters.write() = parameters;
        self
    }

    // ---------------------------------------------------------------------
    // resolution
    // ---------------------------------------------------------------------

    /// 解析服务 - 主要API，本地未命中时询问对等容器
    pub fn get(&self, name: &str) -> Result<Service, ContainerError> {
        self.get_with(name, true)
    }

    /// 解析服务，仅在 `use_peering` 为真时询问对等容器
    pub fn get_with(&self, name: &str, use_peering: bool) -> Result<Service, ContainerError> {
        self.stats.resolutions.fetch_add(1, Ordering::Relaxed);

        let mut current = ServiceName::new(name);
        let mut guards = Vec::new();
        loop {
            if let Some(instance) = self.cached(&current) {
                self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(service = %current, "instance cache hit");
                return Ok(instance);
            }

            guards.push(self.resolving.enter(current.as_str())?);

            let target = self.registry.read().alias_target(&current).cloned();
            match target {
                Some(target) => {
                    tracing::debug!(alias = %current, target = %target, "following alias");
                    current = target;
                }
                None => break,
            }
        }

        self.build(&current, name, use_peering)
    }

    /// 解析服务并转换为具体类型 `T`
    pub fn get_as<T>(&self, name: &str) -> Result<Arc<T>, ContainerError>
    where
        T: Any + Send + Sync,
    {
        self.get(name)?
            .downcast::<T>()
            .map_err(|_| ContainerError::TypeCastFailed {
                name: ServiceName::new(name).into_inner(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// 检查服务是否可解析（不会构建实例）
    pub fn has(&self, name: &str) -> bool {
        self.has_with(name, true)
    }

    /// 检查服务是否可解析，可控制是否询问对等容器
    ///
    /// 对正在探测中的同一名称再次探测时返回 `false`。
    pub fn has_with(&self, name: &str, use_peering: bool) -> bool {
        let mut current = ServiceName::new(name);
        let mut guards = Vec::new();
        loop {
            if self.instances.contains_key(&current) {
                return true;
            }
            match self.probing.enter(current.as_str()) {
                Ok(guard) => guards.push(guard),
                Err(_) => return false,
            }
            let target = self.registry.read().alias_target(&current).cloned();
            match target {
                Some(target) => current = target,
                None => break,
            }
        }

        let (defined, abstract_factories) = {
            let registry = self.registry.read();
            (
                registry.contains(&current),
                registry.abstract_factories().to_vec(),
            )
        };
        if defined {
            return true;
        }
        if abstract_factories
            .iter()
            .any(|factory| factory.can_create(self, current.as_str(), name))
        {
            return true;
        }
        use_peering && self.peers.contains(current.as_str())
    }

    fn cached(&self, name: &ServiceName) -> Option<Service> {
        self.instances.get(name).map(|entry| entry.value().clone())
    }

    fn build(
        &self,
        name: &ServiceName,
        requested: &str,
        use_peering: bool,
    ) -> Result<Service, ContainerError> {
        let (definition, abstract_factories, delegators, initializers, shared) = {
            let registry = self.registry.read();
            (
                registry.definition(name).cloned(),
                registry.abstract_factories().to_vec(),
                registry.delegators(name).to_vec(),
                registry.initializers().to_vec(),
                registry.is_shared(name),
            )
        };

        let builder = match definition {
            Some(Definition::Invokable(invokable)) => Builder::Invokable(invokable),
            Some(Definition::Factory(factory)) => Builder::Factory(factory),
            Some(Definition::Alias(_)) | None => {
                match abstract_factories
                    .into_iter()
                    .find(|factory| factory.can_create(self, name.as_str(), requested))
                {
                    Some(factory) => Builder::Abstract(factory),
                    None => return self.from_peers(name, use_peering),
                }
            }
        };

        tracing::debug!(service = %name, requested, "building service");
        let real = || -> Result<Service, ContainerError> {
            let created = match &builder {
                Builder::Invokable(invokable) => Ok(invokable.construct()),
                Builder::Factory(factory) => factory.create(self, name.as_str(), requested),
                Builder::Abstract(factory) => factory.create(self, name.as_str(), requested),
            };
            created.map_err(|err| builder_failure(name, err))
        };

        let service = self.decorate(name, &delegators, &real)?;
        for initializer in &initializers {
            initializer
                .initialize(self, &service)
                .map_err(|err| builder_failure(name, err))?;
        }
        self.stats.builds.fetch_add(1, Ordering::Relaxed);

        if !shared {
            return Ok(service);
        }
        // A concurrent build may have won the race; hand out whichever got cached.
        let stored = self
            .instances
            .entry(name.clone())
            .or_insert(service)
            .value()
            .clone();
        Ok(stored)
    }

    /// 应用委托器 - 最后注册的在最外层
    fn decorate(
        &self,
        name: &ServiceName,
        delegators: &[Arc<dyn DelegatorFactory>],
        real: InnerBuilder<'_>,
    ) -> Result<Service, ContainerError> {
        match delegators.split_last() {
            None => real(),
            Some((outer, rest)) => {
                let inner = || self.decorate(name, rest, real);
                outer
                    .decorate(self, name.as_str(), &inner)
                    .map_err(|err| builder_failure(name, err))
            }
        }
    }

    fn from_peers(&self, name: &ServiceName, use_peering: bool) -> Result<Service, ContainerError> {
        if use_peering {
            if let Some(service) = self.peers.locate(name.as_str())? {
                self.stats.peer_hits.fetch_add(1, Ordering::Relaxed);
                return Ok(service);
            }
        }
        Err(self.not_found(name, use_peering))
    }

    fn not_found(&self, name: &ServiceName, use_peering: bool) -> ContainerError {
        let mut known: Vec<String> = self
            .registry
            .read()
            .names()
            .map(ServiceName::to_string)
            .collect();
        known.extend(self.instances.iter().map(|entry| entry.key().to_string()));

        let suggestion =
            closest_match(name.as_str(), known.iter().map(String::as_str)).map(str::to_string);
        ContainerError::ServiceNotFound {
            name: name.to_string(),
            peers_consulted: if use_peering { self.peers.len() } else { 0 },
            suggestion,
        }
    }

    // ---------------------------------------------------------------------
    // registration
    // ---------------------------------------------------------------------

    /// 直接写入服务实例
    pub fn set(&self, name: &str, service: Service) {
        self.set_with(name, service, true);
    }

    /// 直接写入服务实例，覆盖已有实例
    ///
    /// 写入的实例总是共享的：每次 `get` 都返回同一引用，与 `shared` 无关。
    /// `shared` 只记录到注册表，不会让写入的实例变成每次新建。
    pub fn set_with(&self, name: &str, service: Service, shared: bool) {
        let key = ServiceName::new(name);
        self.registry.write().set_shared(key.as_str(), shared);
        tracing::debug!(service = %key, "seeding instance");
        self.instances.insert(key, service);
    }

    /// 注册可调用类型，通过 `T::default()` 构建
    pub fn register_invokable<T>(&self, name: &str) -> Result<(), ContainerError>
    where
        T: Default + Any + Send + Sync,
    {
        let shared = self.registry.read().shared_by_default();
        self.register_invokable_with(name, InvokableType::of::<T>(), shared)
    }

    /// 注册可调用类型，显式指定是否共享
    pub fn register_invokable_with(
        &self,
        name: &str,
        invokable: InvokableType,
        shared: bool,
    ) -> Result<(), ContainerError> {
        self.register(name, Definition::Invokable(invokable), shared)
    }

    /// 注册服务工厂
    pub fn register_factory<F>(&self, name: &str, factory: F) -> Result<(), ContainerError>
    where
        F: Fn(&ServiceContainer, &str, &str) -> Result<Service, BoxError> + Send + Sync + 'static,
    {
        let shared = self.registry.read().shared_by_default();
        self.register_factory_with(name, Arc::new(factory), shared)
    }

    /// 注册服务工厂，显式指定是否共享
    pub fn register_factory_with(
        &self,
        name: &str,
        factory: Arc<dyn ServiceFactory>,
        shared: bool,
    ) -> Result<(), ContainerError> {
        self.register(name, Definition::Factory(factory), shared)
    }

    /// 注册抽象工厂 - 谓词加构建函数
    pub fn register_abstract_factory<P, F>(&self, predicate: P, builder: F)
    where
        P: Fn(&ServiceContainer, &str, &str) -> bool + Send + Sync + 'static,
        F: Fn(&ServiceContainer, &str, &str) -> Result<Service, BoxError> + Send + Sync + 'static,
    {
        self.add_abstract_factory(Arc::new(PredicateFactory::new(predicate, builder)));
    }

    /// 注册抽象工厂对象
    pub fn add_abstract_factory(&self, factory: Arc<dyn AbstractFactory>) {
        self.registry.write().add_abstract_factory(factory);
    }

    /// 注册委托器，后注册的包裹先注册的
    pub fn register_delegator<F>(&self, name: &str, delegator: F)
    where
        F: Fn(&ServiceContainer, &str, InnerBuilder<'_>) -> Result<Service, BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.add_delegator(name, Arc::new(delegator));
    }

    /// 注册委托器对象
    pub fn add_delegator(&self, name: &str, delegator: Arc<dyn DelegatorFactory>) {
        self.registry.write().add_delegator(name, delegator);
    }

    /// 注册初始化器，对每个新构建的服务执行
    pub fn register_initializer<F>(&self, initializer: F)
    where
        F: Fn(&ServiceContainer, &Service) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.add_initializer(Arc::new(initializer));
    }

    /// 注册初始化器对象
    pub fn add_initializer(&self, initializer: Arc<dyn Initializer>) {
        self.registry.write().add_initializer(initializer);
    }

    /// 注册别名
    pub fn alias(&self, name: &str, target: &str) -> Result<(), ContainerError> {
        let key = self.registry.write().alias(name, target)?;
        self.evict(&key);
        Ok(())
    }

    /// 设置共享标记，下次构建时生效
    pub fn set_shared(&self, name: &str, shared: bool) {
        self.registry.write().set_shared(name, shared);
    }

    /// 设置是否允许覆盖已有定义
    pub fn set_allow_override(&self, allow: bool) {
        self.registry.write().set_allow_override(allow);
    }

    /// 设置新定义默认是否共享
    pub fn set_shared_by_default(&self, shared: bool) {
        self.registry.write().set_shared_by_default(shared);
    }

    /// 添加对等容器
    pub fn add_peer(&self, peer: Arc<dyn ServiceLocator>) {
        self.peers.add(peer);
    }

    /// 对等容器数量
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    fn register(
        &self,
        name: &str,
        definition: Definition,
        shared: bool,
    ) -> Result<(), ContainerError> {
        let kind = definition.kind();
        let key = self.registry.write().register(name, definition, shared)?;
        tracing::debug!(service = %key, kind, shared, "registered service");
        self.evict(&key);
        Ok(())
    }

    fn evict(&self, key: &ServiceName) {
        if self.instances.remove(key).is_some() {
            tracing::debug!(service = %key, "evicted cached instance after redefinition");
        }
    }

    // ---------------------------------------------------------------------
    // introspection
    // ---------------------------------------------------------------------

    /// 沿别名链解析实际名称
    pub fn resolve_alias(&self, name: &str) -> Result<ServiceName, ContainerError> {
        self.registry.read().resolve_alias(name)
    }

    /// 已直接定义的服务名（排序后）
    pub fn service_names(&self) -> Vec<ServiceName> {
        let mut names: Vec<ServiceName> = self.registry.read().names().cloned().collect();
        names.sort();
        names
    }

    /// 检查实例是否已缓存
    pub fn is_cached(&self, name: &str) -> bool {
        self.instances.contains_key(&ServiceName::new(name))
    }

    /// 获取容器统计信息
    pub fn get_stats(&self) -> ContainerStats {
        ContainerStats {
            resolutions: self.stats.resolutions.load(Ordering::Relaxed),
            cache_hits: self.stats.cache_hits.load(Ordering::Relaxed),
            builds: self.stats.builds.load(Ordering::Relaxed),
            peer_hits: self.stats.peer_hits.load(Ordering::Relaxed),
            cached_instances: self.instances.len(),
        }
    }

    // ---------------------------------------------------------------------
    // parameters
    // ---------------------------------------------------------------------

    /// 获取解析后的参数值
    pub fn get_parameter(&self, name: &str) -> Result<Value, ContainerError> {
        Ok(self.parameters.read().get(name)?)
    }

    /// 检查参数是否存在
    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameters.read().has(name)
    }

    /// 设置参数（读取时解析）
    pub fn set_parameter(&self, name: &str, value: impl Into<Value>) {
        self.parameters.write().set(name, value);
    }

    /// 用容器参数解析任意字符串中的占位符
    pub fn resolve_placeholders(&self, value: &str) -> Result<Value, ContainerError> {
        Ok(self.parameters.read().resolve_string(value)?)
    }

    /// 参数存储快照（未解析）
    pub fn parameters(&self) -> ParameterStore {
        self.parameters.read().clone()
    }
}

/// 用正在构建的服务名包装构建错误
///
/// 循环依赖保留原有链路，已归属于 `name` 的错误不再重复包装。
fn builder_failure(name: &ServiceName, err: BoxError) -> ContainerError {
    let source = match err.downcast::<ContainerError>() {
        Ok(inner) => match *inner {
            circular @ ContainerError::CircularDependency { .. } => return circular,
            ContainerError::BuilderFailure {
                name: inner_name,
                source,
            } if inner_name == name.as_str() => {
                return ContainerError::BuilderFailure {
                    name: inner_name,
                    source,
                }
            }
            other => Box::new(other) as BoxError,
        },
        Err(err) => err,
    };
    ContainerError::BuilderFailure {
        name: name.to_string(),
        source,
    }
}

impl ServiceLocator for ServiceContainer {
    fn locate(&self, name: &str, use_peering: bool) -> Result<Service, ContainerError> {
        self.get_with(name, use_peering)
    }

    fn can_locate(&self, name: &str, use_peering: bool) -> bool {
        self.has_with(name, use_peering)
    }
}

impl Default for ServiceContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("definitions", &self.registry.read().len())
            .field("instances", &self.instances.len())
            .field("peers", &self.peers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use locator_types::{into_service, ParameterError};
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct Clock;

    #[test]
    fn test_shared_invokable_is_cached() {
        let container = ServiceContainer::new();
        container.register_invokable::<Clock>("clock").unwrap();

        let first = container.get("Clock").unwrap();
        let second = container.get("clock").unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let stats = container.get_stats();
        assert_eq!(stats.resolutions, 2);
        assert_eq!(stats.builds, 1);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cached_instances, 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_redefinition_evicts_cached_instance() {
        let container = ServiceContainer::new();
        container
            .register_factory("level", |_, _, _| Ok(into_service(1u8)))
            .unwrap();
        assert_eq!(*container.get_as::<u8>("level").unwrap(), 1);

        container
            .register_factory("level", |_, _, _| Ok(into_service(2u8)))
            .unwrap();
        assert!(!container.is_cached("level"));
        assert_eq!(*container.get_as::<u8>("level").unwrap(), 2);
    }

    #[test]
    fn test_get_as_wrong_type() {
        let container = ServiceContainer::new();
        container.set("answer", into_service(42u32));

        let err = container.get_as::<String>("answer").unwrap_err();
        assert!(matches!(
            err,
            ContainerError::TypeCastFailed { ref name, expected } if name == "answer" && expected.contains("String")
        ));
    }

    #[test]
    fn test_builder_error_is_wrapped_once() {
        let container = ServiceContainer::new();
        container
            .register_factory("broken", |_, _, _| Err("boom".into()))
            .unwrap();
        container.register_delegator("broken", |_, _, inner| Ok(inner()?));

        let err = container.get("broken").unwrap_err();
        assert_eq!(err.chain_message(), "Failed to create service 'broken': boom");
    }

    #[test]
    fn test_initializer_failure_is_attributed() {
        let container = ServiceContainer::new();
        container.register_invokable::<Clock>("clock").unwrap();
        container.register_initializer(|_, _| Err("not ready".into()));

        let err = container.get("clock").unwrap_err();
        assert!(matches!(err, ContainerError::BuilderFailure { ref name, .. } if name == "clock"));
        assert!(!container.is_cached("clock"));
    }

    #[test]
    fn test_non_shared_skips_cache() {
        let container = ServiceContainer::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        container
            .register_factory_with(
                "ticket",
                Arc::new(
                    move |_: &ServiceContainer, _: &str, _: &str| -> Result<Service, BoxError> {
                        Ok(into_service(counter.fetch_add(1, Ordering::SeqCst)))
                    },
                ),
                false,
            )
            .unwrap();

        assert_eq!(*container.get_as::<usize>("ticket").unwrap(), 0);
        assert_eq!(*container.get_as::<usize>("ticket").unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_not_found_suggests_close_name() {
        let container = ServiceContainer::new();
        container.register_invokable::<Clock>("logger").unwrap();

        match container.get("loger").unwrap_err() {
            ContainerError::ServiceNotFound {
                name,
                peers_consulted,
                suggestion,
            } => {
                assert_eq!(name, "loger");
                assert_eq!(peers_consulted, 0);
                assert_eq!(suggestion.as_deref(), Some("logger"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parameters_round_trip() {
        let container = ServiceContainer::new();
        container.set_parameter("host", "db1");
        container.set_parameter("dsn", "pg://%host%");

        assert!(container.has_parameter("dsn"));
        assert_eq!(container.get_parameter("dsn").unwrap(), Value::from("pg://db1"));
        assert!(matches!(
            container.get_parameter("missing"),
            Err(ContainerError::Parameter(_))
        ));
    }

    #[test]
    fn test_resolve_placeholders_keeps_native_type() {
        let container = ServiceContainer::new();
        container.set_parameter("port", 5432);
        container.set_parameter("host", "db1");

        assert_eq!(container.resolve_placeholders("%port%").unwrap(), Value::from(5432));
        assert_eq!(
            container.resolve_placeholders("%host%:%port%").unwrap(),
            Value::from("db1:5432")
        );
        assert!(matches!(
            container.resolve_placeholders("%user%@%host%"),
            Err(ContainerError::Parameter(ParameterError::UnresolvedParameter { ref name, .. })) if name == "user"
        ));
    }

    #[test]
    fn test_set_value_is_always_shared() {
        let container = ServiceContainer::new();
        let clock = into_service(Clock);
        container.set_with("clock", Arc::clone(&clock), false);

        let first = container.get("clock").unwrap();
        let second = container.get("clock").unwrap();
        assert!(Arc::ptr_eq(&first, &clock));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(container.get_stats().builds, 0);
    }

    #[test]
    fn test_scopes_unsupported() {
        let container = ServiceContainer::new();
        assert!(matches!(
            container.scoped(),
            Err(ContainerError::UnsupportedScope { .. })
        ));
    }
}
