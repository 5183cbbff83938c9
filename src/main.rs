mod bot;
mod channel;
mod cli;
mod config;
mod dialogue;
mod dispatch;
mod menu;
mod preferences;
mod provider;
mod render;
mod server;
mod store;
mod telegram;
mod ui;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("menubot=info")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Some(Command::Check) => Ok(cli::check().await),
        Some(Command::Config) => {
            cli::config_cmd()?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Setup) => {
            cli::setup().await?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Preview(args)) => cli::preview(&args).await,
        Some(Command::Serve) => {
            bot::run(bot::Mode::Serve).await?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Poll) | None => {
            bot::run(bot::Mode::Poll).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
