pub mod params;
pub mod services;

use anyhow::Context;
use locator::config::{ConfigLoader, ContainerConfig};

/// 加载并合并配置文件
pub(crate) fn load_config(paths: &[String]) -> anyhow::Result<ContainerConfig> {
    let loader = paths
        .iter()
        .fold(ConfigLoader::new(), |loader, path| loader.with_source(path));
    loader
        .load()
        .with_context(|| format!("无法加载配置: {}", paths.join(", ")))
}
