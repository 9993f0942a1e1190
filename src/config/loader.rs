use super::ContainerConfig;
use crate::errors::ConfigError;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// 配置加载器 - 从多个 TOML 源加载并合并容器配置
///
/// 后加载的源优先：表递归合并，数组拼接，标量被替换。
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    sources: Vec<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加配置文件，开头的 `~` 展开为用户主目录
    pub fn with_source(mut self, path: impl AsRef<str>) -> Self {
        self.add_source(path);
        self
    }

    pub fn add_source(&mut self, path: impl AsRef<str>) {
        self.sources.push(expand_path(path.as_ref()));
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// 按顺序读取并合并所有配置源
    pub fn load(&self) -> Result<ContainerConfig, ConfigError> {
        let merged = self.load_value()?;
        let origin = self
            .sources
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        ContainerConfig::from_value(merged, &origin)
    }

    /// 合并后的原始值树
    pub fn load_value(&self) -> Result<Value, ConfigError> {
        let mut merged = Value::Object(Default::default());
        for path in &self.sources {
            let value = read_source(path)?;
            tracing::debug!(source = %path.display(), "merging configuration source");
            merge_values(&mut merged, value);
        }
        Ok(merged)
    }

    /// 解析内存中的 TOML 文本
    pub fn load_str(source: &str) -> Result<ContainerConfig, ConfigError> {
        let value = parse_toml(source, "<inline>")?;
        ContainerConfig::from_value(value, "<inline>")
    }
}

fn read_source(path: &Path) -> Result<Value, ConfigError> {
    let origin = path.to_string_lossy().to_string();
    let content = fs::read_to_string(path).map_err(|e| ConfigError::FileRead(origin.clone(), e))?;
    parse_toml(&content, &origin)
}

fn parse_toml(source: &str, origin: &str) -> Result<Value, ConfigError> {
    toml::from_str::<Value>(source).map_err(|e| ConfigError::TomlParse(origin.to_string(), e))
}

fn expand_path(raw: &str) -> PathBuf {
    let expanded = shellexpand::tilde(raw);
    PathBuf::from(expanded.as_ref())
}

/// 把 `overlay` 合并到 `base`
pub fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(base), Value::Array(overlay)) => base.extend(overlay),
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_rules() {
        let mut base = json!({
            "table": {"keep": 1, "replace": "old", "nested": {"a": 1}},
            "list": [1, 2],
            "scalar": "old",
        });
        merge_values(
            &mut base,
            json!({
                "table": {"replace": "new", "nested": {"b": 2}},
                "list": [3],
                "scalar": {"now": "a table"},
            }),
        );
        assert_eq!(
            base,
            json!({
                "table": {"keep": 1, "replace": "new", "nested": {"a": 1, "b": 2}},
                "list": [1, 2, 3],
                "scalar": {"now": "a table"},
            })
        );
    }

    #[test]
    fn test_load_str() {
        let config = ConfigLoader::load_str(
            r#"
            [parameters]
            dsn = "%db.host%:5432"

            [parameters.db]
            host = "localhost"

            [services.invokables]
            clock = "system_clock"

            [services.aliases]
            time = "clock"
            "#,
        )
        .unwrap();

        assert_eq!(config.parameters["db"], json!({"host": "localhost"}));
        assert_eq!(config.services.aliases["time"], "clock");
        assert_eq!(
            config.parameter_store().get("dsn").unwrap(),
            json!("localhost:5432")
        );
    }

    #[test]
    fn test_bad_toml() {
        let err = ConfigLoader::load_str("[parameters\nx = 1").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(origin, _) if origin == "<inline>"));
    }

    #[test]
    fn test_tilde_expansion() {
        let loader = ConfigLoader::new().with_source("/etc/app.toml");
        assert_eq!(loader.sources()[0], PathBuf::from("/etc/app.toml"));

        if std::env::var_os("HOME").is_some() {
            let home = ConfigLoader::new().with_source("~/app.toml");
            assert!(!home.sources()[0].to_string_lossy().starts_with('~'));
        }
    }
}
