mod app;
mod config;
mod domain;
mod http;
mod infrastructure;
mod mail;
mod model;
mod pipeline;

use anyhow::Result;
use clap::{Parser, Subcommand};
use infrastructure::{directories, logging, shutdown};

#[derive(Parser)]
#[command(version, about = "Classifies messages and scans a Gmail inbox for spam")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service (default)
    Serve,
    /// Grant read-only Gmail access and store the token
    Authorize,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = config::load_config()?;
    let paths = directories::ensure_directories(&config.directories, &config.gmail)?;
    logging::init_tracing(&config, &paths)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Authorize => app::authorize(&config, &paths).await,
        Command::Serve => {
            let shutdown = shutdown::Shutdown::new();
            shutdown::install_signal_handlers(shutdown.clone());

            let app = app::SpamScannerApp::initialize(config, paths, shutdown)?;
            app.run().await
        }
    }
}
