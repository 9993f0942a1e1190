//! 服务注册表
//!
//! 只保存容器构建服务所需的数据：直接定义、抽象工厂、委托器、初始化器和共享标记。
//! 注册表本身从不构建任何实例。

use super::definition::{AbstractFactory, Definition, DelegatorFactory, Initializer};
use locator_types::{ContainerError, ServiceName};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// 服务注册表 - 以规范名称为键的服务定义
#[derive(Clone)]
pub struct ServiceRegistry {
    definitions: HashMap<ServiceName, Definition>,
    abstract_factories: Vec<Arc<dyn AbstractFactory>>,
    delegators: HashMap<ServiceName, Vec<Arc<dyn DelegatorFactory>>>,
    initializers: Vec<Arc<dyn Initializer>>,
    shared: HashMap<ServiceName, bool>,
    shared_by_default: bool,
    allow_override: bool,
}

impl ServiceRegistry {
    /// 创建空注册表（允许覆盖，默认共享）
    pub fn new() -> Self {
        Self {
            definitions: HashMap::new(),
            abstract_factories: Vec::new(),
            delegators: HashMap::new(),
            initializers: Vec::new(),
            shared: HashMap::new(),
            shared_by_default: true,
            allow_override: true,
        }
    }

    /// 获取名称的规范键
    pub fn canonicalize(name: &str) -> ServiceName {
        ServiceName::new(name)
    }

    /// 是否允许覆盖已有定义
    pub fn allow_override(&self) -> bool {
        self.allow_override
    }

    /// 设置是否允许覆盖已有定义
    pub fn set_allow_override(&mut self, allow: bool) {
        self.allow_override = allow;
    }

    /// 新定义默认是否共享
    pub fn shared_by_default(&self) -> bool {
        self.shared_by_default
    }

    /// 设置新定义默认是否共享
    pub fn set_shared_by_default(&mut self, shared: bool) {
        self.shared_by_default = shared;
    }

    /// 注册直接定义
    ///
    /// 名称已定义且不允许覆盖时返回 [`ContainerError::DuplicateDefinition`]。
    pub fn register(
        &mut self,
        name: &str,
        definition: Definition,
        shared: bool,
    ) -> Result<ServiceName, ContainerError> {
        let key = ServiceName::new(name);
        self.ensure_definable(&key)?;

        if let Some(previous) = self.definitions.get(&key) {
            tracing::warn!(
                service = %key,
                previous = previous.kind(),
                replacement = definition.kind(),
                "overriding service definition"
            );
        }

        self.definitions.insert(key.clone(), definition);
        self.shared.insert(key.clone(), shared);
        Ok(key)
    }

    /// 注册别名
    ///
    /// 会形成闭环的别名在注册时即被拒绝；之后才出现的环在解析时检测。
    pub fn alias(&mut self, name: &str, target: &str) -> Result<ServiceName, ContainerError> {
        let key = ServiceName::new(name);
        let target = ServiceName::new(target);
        self.ensure_definable(&key)?;

        let mut chain = vec![key.to_string()];
        let mut current = target.clone();
        loop {
            chain.push(current.to_string());
            if current == key {
                return Err(ContainerError::CircularDependency {
                    name: key.into_inner(),
                    chain,
                });
            }
            match self.definitions.get(&current) {
                Some(Definition::Alias(next)) => current = next.clone(),
                _ => break,
            }
        }

        self.definitions.insert(key.clone(), Definition::Alias(target));
        self.shared.remove(&key);
        Ok(key)
    }

    /// 追加抽象工厂，按注册顺序匹配
    pub fn add_abstract_factory(&mut self, factory: Arc<dyn AbstractFactory>) {
        self.abstract_factories.push(factory);
    }

    /// 追加委托器，后注册的包裹先注册的
    pub fn add_delegator(&mut self, name: &str, delegator: Arc<dyn DelegatorFactory>) {
        self.delegators
            .entry(ServiceName::new(name))
            .or_default()
            .push(delegator);
    }

    /// 追加全局初始化器
    pub fn add_initializer(&mut self, initializer: Arc<dyn Initializer>) {
        self.initializers.push(initializer);
    }

    /// 设置共享标记
    pub fn set_shared(&mut self, name: &str, shared: bool) {
        self.shared.insert(ServiceName::new(name), shared);
    }

    /// 检查构建结果是否缓存
    pub fn is_shared(&self, name: &ServiceName) -> bool {
        self.shared
            .get(name)
            .copied()
            .unwrap_or(self.shared_by_default)
    }

    /// 获取直接定义
    pub fn definition(&self, name: &ServiceName) -> Option<&Definition> {
        self.definitions.get(name)
    }

    /// 检查名称是否已定义
    pub fn contains(&self, name: &ServiceName) -> bool {
        self.definitions.contains_key(name)
    }

    /// 别名的直接目标
    pub fn alias_target(&self, name: &ServiceName) -> Option<&ServiceName> {
        match self.definitions.get(name) {
            Some(Definition::Alias(target)) => Some(target),
            _ => None,
        }
    }

    /// 沿别名链解析实际名称
    pub fn resolve_alias(&self, name: &str) -> Result<ServiceName, ContainerError> {
        let start = ServiceName::new(name);
        let mut visited = HashSet::new();
        let mut chain = Vec::new();
        let mut current = start.clone();
        while let Some(target) = self.alias_target(&current) {
            chain.push(current.to_string());
            if !visited.insert(current.clone()) {
                return Err(ContainerError::CircularDependency {
                    name: start.into_inner(),
                    chain,
                });
            }
            current = target.clone();
        }
        Ok(current)
    }

    /// 已注册的抽象工厂（按注册顺序）
    pub fn abstract_factories(&self) -> &[Arc<dyn AbstractFactory>] {
        &self.abstract_factories
    }

    /// 名称对应的委托器（按注册顺序）
    pub fn delegators(&self, name: &ServiceName) -> &[Arc<dyn DelegatorFactory>] {
        self.delegators.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// 已注册的全局初始化器
    pub fn initializers(&self) -> &[Arc<dyn Initializer>] {
        &self.initializers
    }

    /// 所有已定义的规范名称
    pub fn names(&self) -> impl Iterator<Item = &ServiceName> {
        self.definitions.keys()
    }

    /// 定义数量
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// 注册表是否为空
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    fn ensure_definable(&self, key: &ServiceName) -> Result<(), ContainerError> {
        if !self.allow_override && self.definitions.contains_key(key) {
            return Err(ContainerError::DuplicateDefinition {
                name: key.to_string(),
            });
        }
        Ok(())
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
