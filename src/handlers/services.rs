use locator::config::ServicesConfig;
use locator::infrastructure::container::{ServiceName, ServiceRegistry};
use locator::ContainerError;

/// 服务列表中的一行
#[derive(Debug, PartialEq, Eq)]
pub struct ServiceRow {
    pub name: String,
    pub kind: &'static str,
    /// 类型引用，别名则为实际目标
    pub target: String,
    pub shared: Option<bool>,
}

pub fn handle_services(config: &[String]) -> anyhow::Result<()> {
    let config = super::load_config(config)?;
    let rows = describe(&config.services)?;

    if rows.is_empty() {
        println!("未配置任何服务");
        return Ok(());
    }
    for row in rows {
        let shared = match row.shared {
            Some(true) => " (shared)",
            Some(false) => " (not shared)",
            None => "",
        };
        println!("{:<28} {:<18} {}{}", row.name, row.kind, row.target, shared);
    }
    Ok(())
}

/// 把配置的服务展开为按规范名称排序的列表行
///
/// 别名会沿链解析到实际名称，别名环在这里报错。
pub fn describe(services: &ServicesConfig) -> Result<Vec<ServiceRow>, ContainerError> {
    let mut aliases = ServiceRegistry::new();
    for (name, target) in &services.aliases {
        aliases.alias(name, target)?;
    }

    let mut rows = Vec::new();
    for (name, type_ref) in &services.invokables {
        rows.push(ServiceRow {
            name: ServiceName::new(name).into_inner(),
            kind: "invokable",
            target: type_ref.clone(),
            shared: Some(services.is_shared(name)),
        });
    }
    for (name, type_ref) in &services.factories {
        rows.push(ServiceRow {
            name: ServiceName::new(name).into_inner(),
            kind: "factory",
            target: type_ref.clone(),
            shared: Some(services.is_shared(name)),
        });
    }
    for name in services.aliases.keys() {
        rows.push(ServiceRow {
            name: ServiceName::new(name).into_inner(),
            kind: "alias",
            target: aliases.resolve_alias(name)?.into_inner(),
            shared: None,
        });
    }
    for (name, type_refs) in &services.delegators {
        rows.push(ServiceRow {
            name: ServiceName::new(name).into_inner(),
            kind: "delegators",
            target: type_refs.join(" <- "),
            shared: None,
        });
    }
    rows.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.kind.cmp(b.kind)));

    for type_ref in &services.abstract_factories {
        rows.push(ServiceRow {
            name: "*".to_string(),
            kind: "abstract factory",
            target: type_ref.clone(),
            shared: None,
        });
    }
    for type_ref in &services.initializers {
        rows.push(ServiceRow {
            name: "*".to_string(),
            kind: "initializer",
            target: type_ref.clone(),
            shared: None,
        });
    }
    Ok(rows)
}
