use anyhow::Result;
use clap::Parser;
use tracing::Level;
use video_portal::VideoManager;

mod cli;

use cli::{execute_command, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    let level = match cli.verbose {
        0 => config.level()?,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let manager = VideoManager::open(&config).await?;

    if let Some(command) = cli.command {
        execute_command(&manager, &config, command).await?;
    }

    Ok(())
}
