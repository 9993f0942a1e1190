use locator_types::{ContainerError, ParameterError};
use thiserror::Error;

/// 配置错误 - 加载配置或构建容器时的失败
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read file '{0}': {1}")]
    FileRead(String, #[source] std::io::Error),
    #[error("Failed to parse TOML from '{0}': {1}")]
    TomlParse(String, #[source] toml::de::Error),
    #[error("Invalid container configuration in '{0}': {1}")]
    Invalid(String, #[source] serde_json::Error),
    #[error("Unknown {kind} type reference '{type_ref}'")]
    UnknownType { kind: &'static str, type_ref: String },
    #[error(transparent)]
    Container(#[from] ContainerError),
    #[error(transparent)]
    Parameter(#[from] ParameterError),
}
