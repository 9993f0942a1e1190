use clap::{Parser, Subcommand};

/// locator - 服务容器配置检查工具
#[derive(Parser, Debug)]
#[command(name = "locator", version)]
#[command(about = "Inspect container configuration: resolved parameters and configured services")]
pub struct Args {
    /// 输出调试日志
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 输出解析后的参数树（或单个参数）
    Params {
        /// 配置文件，按顺序合并
        #[arg(short = 'c', long = "config", required = true)]
        config: Vec<String>,
        /// 参数名，支持 `db.host` 形式
        name: Option<String>,
    },
    /// 列出配置的服务与别名
    Services {
        /// 配置文件，按顺序合并
        #[arg(short = 'c', long = "config", required = true)]
        config: Vec<String>,
    },
}
