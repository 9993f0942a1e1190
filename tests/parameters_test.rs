//! 参数解析集成测试

use locator::{ParameterError, ParameterStore};
use serde_json::{json, Map, Value};

fn store(value: Value) -> ParameterStore {
    let map: Map<String, Value> = serde_json::from_value(value).unwrap();
    ParameterStore::from(map)
}

#[test]
fn test_dsn_from_nested_host() {
    let params = store(json!({"db": {"host": "h"}, "dsn": "%db.host%:5432"}));
    assert_eq!(params.get("dsn").unwrap(), json!("h:5432"));
}

#[test]
fn test_mutual_reference_is_circular() {
    let params = store(json!({"a": "%b%", "b": "%a%"}));
    assert!(matches!(
        params.get("a"),
        Err(ParameterError::CircularParameter { .. })
    ));
    assert!(matches!(
        params.resolve_all(),
        Err(ParameterError::CircularParameter { .. })
    ));
}

#[test]
fn test_longer_cycle_chain() {
    let params = store(json!({"a": "x%b%", "b": "%c%", "c": "y%a%"}));
    match params.get("a") {
        Err(ParameterError::CircularParameter { chain }) => {
            assert_eq!(chain, vec!["a", "b", "c", "a"]);
        }
        other => panic!("expected a cycle, got {:?}", other),
    }
}

#[test]
fn test_shared_reference_is_resolved_once_and_consistently() {
    // "base" is referenced twice within one resolution; both uses agree
    let params = store(json!({
        "base": "/srv/%env%",
        "env": "prod",
        "paths": {"logs": "%base%/logs", "cache": "%base%/cache"},
    }));
    assert_eq!(
        params.get("paths").unwrap(),
        json!({"logs": "/srv/prod/logs", "cache": "/srv/prod/cache"})
    );
}

#[test]
fn test_native_types_survive_single_token() {
    let params = store(json!({
        "limits": {"max": 10, "ratio": 0.5},
        "max": "%limits.max%",
        "limits_copy": "%limits%",
        "label": "max=%limits.max%",
    }));
    assert_eq!(params.get("max").unwrap(), json!(10));
    assert_eq!(params.get("limits_copy").unwrap(), json!({"max": 10, "ratio": 0.5}));
    assert_eq!(params.get("label").unwrap(), json!("max=10"));
}

#[test]
fn test_unresolved_placeholder() {
    let params = store(json!({"url": "http://%host%/"}));
    let err = params.resolve_all().unwrap_err();
    assert_eq!(err.parameter(), "host");
    assert!(err.to_string().contains("referenced by 'url'"));
}

#[test]
fn test_names_are_case_sensitive() {
    let params = store(json!({"Host": "h", "url": "%host%"}));
    assert!(params.has("Host"));
    assert!(!params.has("host"));
    assert!(params.get("url").is_err());
}

#[test]
fn test_resolved_tree_has_no_tokens_left() {
    let params = store(json!({
        "app": {"name": "shop", "title": "%app.name% admin"},
        "greeting": "Welcome to %app.title%",
        "discount": "50% off",
        "list": ["%app.name%", 3, true],
    }));
    let resolved = Value::Object(params.resolve_all().unwrap());
    assert_eq!(resolved["greeting"], json!("Welcome to shop admin"));
    assert_eq!(resolved["discount"], json!("50% off"));
    assert_eq!(resolved["list"], json!(["shop", 3, true]));

    fn leaves_clean(value: &Value) -> bool {
        match value {
            Value::String(s) => !locator::parameters::placeholder::contains_placeholder(s),
            Value::Array(items) => items.iter().all(leaves_clean),
            Value::Object(map) => map.values().all(leaves_clean),
            _ => true,
        }
    }
    assert!(leaves_clean(&resolved));
}

#[test]
fn test_extend_overrides_top_level_keys() {
    let mut params = store(json!({"env": "dev", "label": "%env%"}));
    let mut overlay = Map::new();
    overlay.insert("env".to_string(), json!("prod"));
    params.extend(overlay);

    assert_eq!(params.get("label").unwrap(), json!("prod"));
    assert_eq!(params.len(), 2);
    assert_eq!(params.remove("env"), Some(json!("prod")));
    assert!(params.get("label").is_err());
}

#[test]
fn test_dotted_path_through_referenced_table() {
    let params = store(json!({
        "conn": {"host": "h"},
        "db": "%conn%",
        "dsn": "%db.host%:5432",
    }));
    assert_eq!(params.get("db").unwrap(), json!({"host": "h"}));
    assert_eq!(params.get("dsn").unwrap(), json!("h:5432"));

    let resolved = params.resolve_all().unwrap();
    assert_eq!(resolved["dsn"], json!("h:5432"));
}
