mod cli;
mod commands;
mod views;

use anyhow::Result;
use clap::Parser;

use crate::cli::CliArgs;

#[tokio::main]
async fn main() -> Result<()> {
    oncall_core::config::load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    let config = oncall_core::Config::from_env();
    commands::execute(args, config).await
}
