//! 参数存储与占位符解析
//!
//! 参数是由标量和嵌套表组成的树，字符串叶子可以嵌入引用其他参数的 `%name%` 占位符。
//! [`ParameterStore`] 递归解析占位符，每次解析调用中每个参数只解析一次，并拒绝自引用链。

pub mod placeholder;

use locator_types::ParameterError;
use placeholder::Segment;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// 参数存储 - 支持 `%占位符%` 的具名配置参数
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterStore {
    parameters: Map<String, Value>,
}

impl ParameterStore {
    /// 创建空参数存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 从已解析的参数表创建
    pub fn from_map(parameters: Map<String, Value>) -> Self {
        Self { parameters }
    }

    /// 顶层参数数量
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// 是否没有参数
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// 顶层参数名
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parameters.keys().map(String::as_str)
    }

    /// 原始（未解析）参数表
    pub fn raw(&self) -> &Map<String, Value> {
        &self.parameters
    }

    /// 检查参数是否存在（顶层键或指向嵌套表的点分路径）
    pub fn has(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// 获取原始（未解析）参数值
    pub fn get_raw(&self, name: &str) -> Option<&Value> {
        self.lookup(name)
    }

    /// 获取解析后的参数值
    pub fn get(&self, name: &str) -> Result<Value, ParameterError> {
        Resolution::new(self).parameter(name)
    }

    /// 设置顶层参数，按原始值保存，读取时解析
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.parameters.insert(name.into(), value.into());
    }

    /// 移除顶层参数并返回原始值
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.parameters.remove(name)
    }

    /// 按键合并另一张参数表，后者优先
    pub fn extend(&mut self, parameters: Map<String, Value>) {
        self.parameters.extend(parameters);
    }

    /// 解析字符串中的全部占位符
    ///
    /// 整个字符串只有一个占位符时保留被引用值的原生类型，有其他文本时拼接为字符串。
    pub fn resolve_string(&self, value: &str) -> Result<Value, ParameterError> {
        Resolution::new(self).string(value)
    }

    /// 解析值树中的每个字符串叶子，保持结构不变
    pub fn resolve_value(&self, tree: &Value) -> Result<Value, ParameterError> {
        Resolution::new(self).value(tree)
    }

    /// 解析整棵参数树
    pub fn resolve_all(&self) -> Result<Map<String, Value>, ParameterError> {
        let mut resolution = Resolution::new(self);
        let mut resolved = Map::with_capacity(self.parameters.len());
        for name in self.parameters.keys() {
            let value = resolution.parameter(name)?;
            resolved.insert(name.clone(), value);
        }
        Ok(resolved)
    }

    fn lookup(&self, name: &str) -> Option<&Value> {
        if let Some(value) = self.parameters.get(name) {
            return Some(value);
        }
        let mut parts = name.split('.');
        let mut current = self.parameters.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }
}

impl From<Map<String, Value>> for ParameterStore {
    fn from(parameters: Map<String, Value>) -> Self {
        Self::from_map(parameters)
    }
}

/// 一次解析调用的状态：进行中的栈和已解析的值
struct Resolution<'a> {
    store: &'a ParameterStore,
    in_progress: Vec<String>,
    resolved: HashMap<String, Value>,
}

impl<'a> Resolution<'a> {
    fn new(store: &'a ParameterStore) -> Self {
        Self {
            store,
            in_progress: Vec::new(),
            resolved: HashMap::new(),
        }
    }

    fn parameter(&mut self, name: &str) -> Result<Value, ParameterError> {
        if let Some(value) = self.resolved.get(name) {
            return Ok(value.clone());
        }

        if self.in_progress.iter().any(|entry| entry == name) {
            let mut chain = self.in_progress.clone();
            chain.push(name.to_string());
            return Err(ParameterError::CircularParameter { chain });
        }

        let store = self.store;
        let Some(raw) = store.lookup(name) else {
            let err = ParameterError::UnresolvedParameter {
                name: name.to_string(),
                referenced_by: self.in_progress.last().cloned(),
            };
            self.in_progress.push(name.to_string());
            let found = self.through_resolved_prefix(name);
            self.in_progress.pop();
            let value = found?.ok_or(err)?;
            self.resolved.insert(name.to_string(), value.clone());
            return Ok(value);
        };

        self.in_progress.push(name.to_string());
        let result = self.value(raw);
        self.in_progress.pop();

        let value = result?;
        self.resolved.insert(name.to_string(), value.clone());
        Ok(value)
    }

    /// 点分路径穿过一个占位符字符串时，先解析最长的已存在前缀，再在解析结果中继续查找。
    fn through_resolved_prefix(&mut self, name: &str) -> Result<Option<Value>, ParameterError> {
        let parts: Vec<&str> = name.split('.').collect();
        for split in (1..parts.len()).rev() {
            let prefix = parts[..split].join(".");
            match self.store.lookup(&prefix) {
                Some(Value::String(_)) => {
                    let base = self.parameter(&prefix)?;
                    let found = parts[split..]
                        .iter()
                        .try_fold(&base, |node, part| node.as_object()?.get(*part));
                    return Ok(found.cloned());
                }
                Some(_) => return Ok(None),
                None => {}
            }
        }
        Ok(None)
    }

    fn value(&mut self, value: &Value) -> Result<Value, ParameterError> {
        match value {
            Value::String(s) => self.string(s),
            Value::Array(items) => items
                .iter()
                .map(|item| self.value(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::Object(table) => {
                let mut resolved = Map::with_capacity(table.len());
                for (key, item) in table {
                    resolved.insert(key.clone(), self.value(item)?);
                }
                Ok(Value::Object(resolved))
            }
            scalar => Ok(scalar.clone()),
        }
    }

    fn string(&mut self, input: &str) -> Result<Value, ParameterError> {
        let segments = placeholder::parse(input);

        if let [Segment::Placeholder(name)] = segments.as_slice() {
            return self.parameter(name);
        }

        let mut output = String::with_capacity(input.len());
        for segment in &segments {
            match segment {
                Segment::Literal(text) => output.push_str(text),
                Segment::Placeholder(name) => {
                    let value = self.parameter(name)?;
                    output.push_str(&scalar_to_string(name, &value)?);
                }
            }
        }
        Ok(Value::String(output))
    }
}

fn scalar_to_string(name: &str, value: &Value) -> Result<String, ParameterError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        Value::Array(_) | Value::Object(_) => Err(ParameterError::NonScalarInterpolation {
            name: name.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store(value: Value) -> ParameterStore {
        match value {
            Value::Object(map) => ParameterStore::from_map(map),
            other => panic!("expected a table, got {other}"),
        }
    }

    #[test]
    fn test_nested_reference_with_surrounding_text() {
        let params = store(json!({"db": {"host": "h"}, "dsn": "%db.host%:5432"}));
        assert_eq!(params.get("dsn").unwrap(), json!("h:5432"));
    }

    #[test]
    fn test_whole_token_keeps_native_type() {
        let params = store(json!({
            "port": 5432,
            "debug": true,
            "hosts": ["a", "b"],
            "port_ref": "%port%",
            "debug_ref": "%debug%",
            "hosts_ref": "%hosts%",
        }));
        assert_eq!(params.get("port_ref").unwrap(), json!(5432));
        assert_eq!(params.get("debug_ref").unwrap(), json!(true));
        assert_eq!(params.get("hosts_ref").unwrap(), json!(["a", "b"]));
    }

    #[test]
    fn test_transitive_references() {
        let params = store(json!({
            "root": "/srv",
            "app_dir": "%root%/app",
            "cache_dir": "%app_dir%/cache",
        }));
        assert_eq!(params.get("cache_dir").unwrap(), json!("/srv/app/cache"));
    }

    #[test]
    fn test_flat_dotted_key_wins_over_path() {
        let params = store(json!({"db.host": "flat", "db": {"host": "nested"}}));
        assert_eq!(params.resolve_string("%db.host%").unwrap(), json!("flat"));
    }

    #[test]
    fn test_circular_reference() {
        let params = store(json!({"a": "%b%", "b": "%a%"}));
        let err = params.get("a").unwrap_err();
        assert_eq!(
            err,
            ParameterError::CircularParameter {
                chain: vec!["a".into(), "b".into(), "a".into()]
            }
        );
    }

    #[test]
    fn test_self_reference_inside_text() {
        let params = store(json!({"path": "%path%/bin"}));
        assert!(matches!(
            params.get("path"),
            Err(ParameterError::CircularParameter { .. })
        ));
    }

    #[test]
    fn test_unresolved_reference_names_referrer() {
        let params = store(json!({"dsn": "%db.host%:5432"}));
        assert_eq!(
            params.get("dsn").unwrap_err(),
            ParameterError::UnresolvedParameter {
                name: "db.host".into(),
                referenced_by: Some("dsn".into()),
            }
        );
    }

    #[test]
    fn test_non_scalar_interpolation_fails() {
        let params = store(json!({"hosts": ["a"], "label": "hosts=%hosts%"}));
        assert_eq!(
            params.get("label").unwrap_err(),
            ParameterError::NonScalarInterpolation { name: "hosts".into() }
        );
    }

    #[test]
    fn test_scalar_rendering_in_text() {
        let params = store(json!({"n": 3, "flag": false, "nothing": null}));
        assert_eq!(
            params.resolve_string("n=%n% flag=%flag% nothing=[%nothing%]").unwrap(),
            json!("n=3 flag=false nothing=[]")
        );
    }

    #[test]
    fn test_resolve_value_preserves_structure() {
        let params = store(json!({"host": "h", "port": 80}));
        let tree = json!({
            "servers": [{"url": "http://%host%:%port%"}, {"port": "%port%"}],
            "untouched": 1.5,
        });
        assert_eq!(
            params.resolve_value(&tree).unwrap(),
            json!({
                "servers": [{"url": "http://h:80"}, {"port": 80}],
                "untouched": 1.5,
            })
        );
    }

    #[test]
    fn test_resolve_all_leaves_no_tokens() {
        let params = store(json!({
            "base": "x",
            "derived": {"one": "%base%1", "two": ["%base%2"]},
            "escaped": "100%%",
        }));
        let resolved = params.resolve_all().unwrap();
        assert_eq!(
            Value::Object(resolved),
            json!({
                "base": "x",
                "derived": {"one": "x1", "two": ["x2"]},
                "escaped": "100%",
            })
        );
    }

    #[test]
    fn test_set_and_has() {
        let mut params = ParameterStore::new();
        assert!(!params.has("env"));
        params.set("env", "prod");
        params.set("label", "env=%env%");
        assert!(params.has("env"));
        assert_eq!(params.get("label").unwrap(), json!("env=prod"));
        assert_eq!(params.get_raw("label"), Some(&json!("env=%env%")));
    }

    #[test]
    fn test_dotted_path_through_reference_cycle() {
        let params = store(json!({"db": "%db.host%"}));
        assert_eq!(
            params.get("db").unwrap_err(),
            ParameterError::CircularParameter {
                chain: vec!["db".into(), "db.host".into(), "db".into()]
            }
        );
    }

    #[test]
    fn test_dotted_path_missing_below_reference() {
        let params = store(json!({"conn": {"host": "h"}, "db": "%conn%", "dsn": "%db.port%"}));
        assert_eq!(
            params.get("dsn").unwrap_err(),
            ParameterError::UnresolvedParameter {
                name: "db.port".into(),
                referenced_by: Some("dsn".into()),
            }
        );
    }

    #[test]
    fn test_failed_resolution_does_not_poison_store() {
        let mut params = store(json!({"dsn": "%host%"}));
        assert!(params.get("dsn").is_err());
        params.set("host", "db1");
        assert_eq!(params.get("dsn").unwrap(), json!("db1"));
    }
}
