//! 模块抽象层
//!
//! 模块提供配置和引导钩子。管理器按依赖排序模块，汇总配置并构建容器，然后依次执行各模块的引导。

use super::container::{BoxError, ContainerError, ServiceContainer};
use super::provider::{build_container, ProviderCatalog};
use crate::config::ContainerConfig;
use crate::errors::ConfigError;
use crate::logging::OperationTimer;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

/// 模块状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleStatus {
    /// 未加载
    NotLoaded,
    /// 已加载
    Loaded,
    /// 加载失败
    Failed,
    /// 已禁用
    Disabled,
}

/// 模块接口
pub trait Module: Send + Sync {
    /// 模块名称
    fn name(&self) -> &str;

    /// 依赖的模块
    fn dependencies(&self) -> Vec<&str> {
        Vec::new()
    }

    fn is_enabled(&self) -> bool {
        true
    }

    /// 模块提供的配置，在构建容器前合并
    fn config(&self) -> ContainerConfig {
        ContainerConfig::default()
    }

    /// 容器构建后按依赖顺序执行
    fn on_bootstrap(&self, _container: &ServiceContainer) -> Result<(), BoxError> {
        Ok(())
    }
}

/// 模块错误
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("Dependency module not found: '{dependency}' (required by '{module}')")]
    DependencyNotFound { module: String, dependency: String },
    #[error("Dependency module '{dependency}' of '{module}' is disabled")]
    DependencyDisabled { module: String, dependency: String },
    #[error("Circular module dependency detected: {}", .0.join(" -> "))]
    CircularDependency(Vec<String>),
    #[error("Module '{module}' failed to bootstrap")]
    BootstrapFailed {
        module: String,
        #[source]
        source: BoxError,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Container(#[from] ContainerError),
}

/// 模块管理器
#[derive(Default)]
pub struct ModuleManager {
    modules: RwLock<Vec<Arc<dyn Module>>>,
    status: RwLock<HashMap<String, ModuleStatus>>,
}

impl ModuleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册模块，同名模块重复注册时忽略
    pub fn register_module(&self, module: Arc<dyn Module>) -> bool {
        let mut modules = self.modules.write();
        let name = module.name().to_string();
        if modules.iter().any(|m| m.name() == name) {
            tracing::debug!(module = %name, "module already registered");
            return false;
        }

        let initial = if module.is_enabled() {
            ModuleStatus::NotLoaded
        } else {
            ModuleStatus::Disabled
        };
        modules.push(module);
        self.status.write().insert(name, initial);
        true
    }

    /// 计算加载顺序 - 依赖排在被依赖者之前
    ///
    /// 无依赖关系的模块保持注册顺序。
    pub fn load_order(&self) -> Result<Vec<Arc<dyn Module>>, ModuleError> {
        let modules = self.modules.read().clone();
        let by_name: HashMap<&str, &Arc<dyn Module>> =
            modules.iter().map(|m| (m.name(), m)).collect();

        let mut order = Vec::with_capacity(modules.len());
        let mut done = HashSet::new();
        let mut visiting = Vec::new();
        for module in modules.iter().filter(|m| m.is_enabled()) {
            visit(module, &by_name, &mut visiting, &mut done, &mut order)?;
        }
        Ok(order)
    }

    /// 按加载顺序汇总模块配置，`app_config` 最后合并
    pub fn aggregate_config(
        &self,
        app_config: ContainerConfig,
    ) -> Result<ContainerConfig, ModuleError> {
        let mut merged = ContainerConfig::default();
        for module in self.load_order()? {
            merged.merge(module.config())?;
        }
        merged.merge(app_config)?;
        Ok(merged)
    }

    /// 对容器执行所有启用模块的引导钩子
    pub fn bootstrap(&self, container: &ServiceContainer) -> Result<(), ModuleError> {
        for module in self.load_order()? {
            let name = module.name().to_string();
            match module.on_bootstrap(container) {
                Ok(()) => {
                    tracing::debug!(module = %name, "module loaded");
                    self.set_status(&name, ModuleStatus::Loaded);
                }
                Err(source) => {
                    tracing::warn!(module = %name, error = %source, "module bootstrap failed");
                    self.set_status(&name, ModuleStatus::Failed);
                    return Err(ModuleError::BootstrapFailed {
                        module: name,
                        source,
                    });
                }
            }
        }
        Ok(())
    }

    /// 汇总配置、构建容器并引导全部模块
    pub fn build_container(
        &self,
        app_config: ContainerConfig,
        catalog: &ProviderCatalog,
    ) -> Result<ServiceContainer, ModuleError> {
        let timer = OperationTimer::new("container_bootstrap");
        let config = self.aggregate_config(app_config)?;
        let container = build_container(&config, catalog)?;
        self.bootstrap(&container)?;
        timer.finish();
        Ok(container)
    }

    /// 获取模块状态
    pub fn get_module_status(&self, name: &str) -> Option<ModuleStatus> {
        self.status.read().get(name).copied()
    }

    pub fn get_all_module_statuses(&self) -> HashMap<String, ModuleStatus> {
        self.status.read().clone()
    }

    /// 已加载模块名（排序后）
    pub fn loaded_modules(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .status
            .read()
            .iter()
            .filter(|(_, status)| **status == ModuleStatus::Loaded)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    fn set_status(&self, name: &str, status: ModuleStatus) {
        self.status.write().insert(name.to_string(), status);
    }
}

fn visit(
    module: &Arc<dyn Module>,
    by_name: &HashMap<&str, &Arc<dyn Module>>,
    visiting: &mut Vec<String>,
    done: &mut HashSet<String>,
    order: &mut Vec<Arc<dyn Module>>,
) -> Result<(), ModuleError> {
    let name = module.name();
    if done.contains(name) {
        return Ok(());
    }
    if visiting.iter().any(|entry| entry == name) {
        let mut chain = visiting.clone();
        chain.push(name.to_string());
        return Err(ModuleError::CircularDependency(chain));
    }

    visiting.push(name.to_string());
    for dependency in module.dependencies() {
        let Some(&target) = by_name.get(dependency) else {
            return Err(ModuleError::DependencyNotFound {
                module: name.to_string(),
                dependency: dependency.to_string(),
            });
        };
        if !target.is_enabled() {
            return Err(ModuleError::DependencyDisabled {
                module: name.to_string(),
                dependency: dependency.to_string(),
            });
        }
        visit(target, by_name, visiting, done, order)?;
    }
    visiting.pop();

    done.insert(name.to_string());
    order.push(Arc::clone(module));
    Ok(())
}
