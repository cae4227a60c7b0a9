//! RoadCrew CLI - chat-bot companion that files crew photos into dated
//! Google Drive folders

use clap::Parser;

mod bot;
mod cache;
mod cli;
mod config;
mod drive;
mod error;
mod output;
mod resolver;
mod session;
mod upload;

use cli::{Cli, Commands};
use error::Result;

#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    if cli.debug {
        eprintln!("Debug mode enabled");
    }

    match cli.command {
        Commands::Init => cli::init::run(cli.config.as_deref()).await,
        Commands::Status => cli::status::run(cli.config.as_deref()),
        Commands::Upload { event_file } => {
            cli::upload::run(&event_file, cli.config.as_deref()).await
        }
        Commands::Serve => cli::serve::run(cli.config.as_deref()).await,
        Commands::Check { share } => cli::check::run(share.as_deref(), cli.config.as_deref()).await,
        Commands::Completions { shell } => {
            cli::completions::run(shell);
            Ok(())
        }
        Commands::Version => {
            println!("roadcrew version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
