use clap::Parser;
use tracing::debug;

use linkrelay::cli::Cli;
use linkrelay::config::{get_config, init_config};
use linkrelay::runtime::modes;
use linkrelay::system::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = init_config(&cli.config) {
        eprintln!("{}", e.format_colored());
        std::process::exit(1);
    }
    let config = get_config();

    // guard 必须存活到进程结束，否则缓冲的日志会丢失
    let log_guard = init_logging(&config.logging)?;
    debug!("Configuration loaded from {}", cli.config);

    if let Err(e) = modes::run_cli(cli, config).await {
        eprintln!("{}", e.format_colored());
        drop(log_guard);
        std::process::exit(1);
    }

    Ok(())
}
