//! SiteChat CLI
//!
//! Ask a website questions and get answers grounded in its own pages.

use anyhow::Result;
use clap::Parser;
use sitechat_core::error::exit_codes;
use sitechat_core::SiteChatError;

mod app;
mod commands;
mod output;

use app::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(cli).await {
        eprintln!("Error: {:#}", err);
        let code = err
            .downcast_ref::<SiteChatError>()
            .map(SiteChatError::exit_code)
            .unwrap_or(exit_codes::GENERAL_ERROR);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let format = cli.format;
    match cli.command {
        Commands::Terms(args) => commands::terms::run(args, format),
        Commands::Ask(args) => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::ask::run(args, &config, format).await
        }
        Commands::Chat(args) => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::chat::run(args, &config, format).await
        }
        Commands::Search(args) => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::search::run(args, &config, format).await
        }
        Commands::Inspect(args) => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::inspect::run(args, &config, format).await
        }
    }
}
