//! geomeasure 命令行入口
//! 测量 GeoJSON 几何，并把测量记录同步到本地快照存储

mod cli;
mod config;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use config::AppConfig;

fn main() -> Result<()> {
    let config = AppConfig::from_env()?;

    // 初始化日志
    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_max_level(config.log_level)
            .with_writer(std::io::stderr)
            .finish(),
    )?;

    info!(
        "Starting geomeasure (store {}, projection {:?})",
        config.store_path.display(),
        config.projection
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let args: Vec<String> = std::env::args().collect();
    runtime.block_on(cli::handle_commands(&args, &config))
}
