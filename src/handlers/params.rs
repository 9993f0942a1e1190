use anyhow::Context;
use serde_json::Value;

pub fn handle_params(config: &[String], name: Option<&str>) -> anyhow::Result<()> {
    let config = super::load_config(config)?;
    let store = config.parameter_store();

    let value = match name {
        Some(name) => store
            .get(name)
            .with_context(|| format!("无法解析参数 '{name}'"))?,
        None => Value::Object(store.resolve_all().context("无法解析参数树")?),
    };

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
