mod args;
mod handlers;

use args::{Args, Command};
use clap::Parser;
use handlers::params::handle_params;
use handlers::services::handle_services;
use locator::logging::{init_logging, LoggingConfig};

fn main() {
    let args = Args::parse();

    let logging = if args.verbose {
        LoggingConfig::development()
    } else {
        LoggingConfig::production()
    };
    if let Err(e) = init_logging(logging) {
        eprintln!("⚠️ 日志初始化失败: {e}");
    }

    if let Err(err) = run(args.command) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Params { config, name } => handle_params(&config, name.as_deref()),
        Command::Services { config } => handle_services(&config),
    }
}
