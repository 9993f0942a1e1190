//! 容器配置
//!
//! 容器由声明式的 `{parameters, services}` 配置树构建，服务条目通过目录类型引用指定实现，
//! 见 [`crate::infrastructure::provider::ProviderCatalog`]。

pub mod loader;

pub use loader::{merge_values, ConfigLoader};

use crate::errors::ConfigError;
use crate::parameters::ParameterStore;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// 容器配置 - 参数与服务定义
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// 原始参数树，字符串叶子可包含 `%占位符%`
    pub parameters: Map<String, Value>,
    pub services: ServicesConfig,
}

/// 服务配置 - 以服务名为键的声明式定义
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// 未设置时为 `true`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_by_default: Option<bool>,
    /// 未设置时为 `true`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_override: Option<bool>,
    /// 服务名 -> 可调用类型引用
    pub invokables: BTreeMap<String, String>,
    /// 服务名 -> 工厂类型引用
    pub factories: BTreeMap<String, String>,
    /// 抽象工厂类型引用，按此顺序匹配
    pub abstract_factories: Vec<String>,
    /// 别名 -> 目标名
    pub aliases: BTreeMap<String, String>,
    /// 服务名 -> 委托器类型引用，最内层在前
    pub delegators: BTreeMap<String, Vec<String>>,
    pub initializers: Vec<String>,
    /// 按名称覆盖共享标记
    pub shared: BTreeMap<String, bool>,
}

impl ServicesConfig {
    pub fn shared_by_default(&self) -> bool {
        self.shared_by_default.unwrap_or(true)
    }

    pub fn allow_override(&self) -> bool {
        self.allow_override.unwrap_or(true)
    }

    /// 获取服务的实际共享标记
    pub fn is_shared(&self, name: &str) -> bool {
        self.shared
            .get(name)
            .copied()
            .unwrap_or_else(|| self.shared_by_default())
    }

    /// 具名定义数量（可调用类型、工厂和别名）
    pub fn definition_count(&self) -> usize {
        self.invokables.len() + self.factories.len() + self.aliases.len()
    }
}

impl ContainerConfig {
    /// 从合并后的值树反序列化，`origin` 用于错误信息
    pub fn from_value(value: Value, origin: &str) -> Result<Self, ConfigError> {
        serde_json::from_value(value).map_err(|e| ConfigError::Invalid(origin.to_string(), e))
    }

    /// 按加载器的合并规则把 `other` 合并到当前配置
    pub fn merge(&mut self, other: ContainerConfig) -> Result<(), ConfigError> {
        let mut base = to_value(self)?;
        merge_values(&mut base, to_value(&other)?);
        *self = Self::from_value(base, "<merged>")?;
        Ok(())
    }

    /// 基于原始参数副本创建参数存储
    pub fn parameter_store(&self) -> ParameterStore {
        ParameterStore::from_map(self.parameters.clone())
    }
}

fn to_value(config: &ContainerConfig) -> Result<Value, ConfigError> {
    serde_json::to_value(config).map_err(|e| ConfigError::Invalid("<merged>".to_string(), e))
}
