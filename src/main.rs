//! hostsmith - deploys declarative host configuration over SSH.

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use hostsmith::cli::{Cli, Commands};
use hostsmith::node::OsFamily;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Execute command
    match cli.command {
        Commands::Deploy { pattern, apply } => {
            hostsmith::commands::deploy::run(&cli.directory, pattern.as_deref(), apply).await
        }
        Commands::Render { pattern, os } => {
            let os: OsFamily = os.parse()?;
            hostsmith::commands::render::run(&cli.directory, pattern.as_deref(), os)
        }
        Commands::Exec { command, pattern } => {
            hostsmith::commands::exec::run(&cli.directory, &command, pattern.as_deref()).await
        }
        Commands::Nodes { pattern } => {
            hostsmith::commands::nodes::run(&cli.directory, pattern.as_deref())
        }
        Commands::Init { path } => hostsmith::commands::init::run(&path),
        Commands::Version => {
            println!("hostsmith {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
