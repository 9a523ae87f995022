mod commands;
mod core;
mod ui;
mod utils;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;

use crate::commands::{
    analyze::AnalyzeCommand, discover::DiscoverCommand, generate::GenerateCommand,
    setup_all::SetupAllCommand, verify::VerifyCommand,
};
use crate::core::context::AppContext;
use crate::core::error::CliError;

#[derive(Parser)]
#[command(name = "workflow-architect", version)]
#[command(about = "Resolve, pin and package the dependencies of generation workflows", long_about = None)]
struct Cli {
    /// Settings file (defaults to ./workflow-architect.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Registry file (.json, .toml, .yaml), overlaid on the curated seed
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the custom nodes and models a set of workflows depends on
    Analyze(AnalyzeCommand),
    /// Refresh registry entries from their upstream sources
    Discover(DiscoverCommand),
    /// Check every pinned version against upstream
    Verify(VerifyCommand),
    /// Write the installer, Dockerfile and Modal app
    Generate(GenerateCommand),
    /// Analyze, discover, verify and generate in one go
    SetupAll(SetupAllCommand),
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(cli).await {
        match err.downcast_ref::<CliError>() {
            Some(cli_err) => cli_err.render(),
            None => ui::error(format!("{:#}", err)),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = AppContext::load(cli.config.as_deref(), cli.registry)?;

    match cli.command {
        Commands::Analyze(cmd) => cmd.execute(&ctx).await,
        Commands::Discover(cmd) => cmd.execute(&ctx).await,
        Commands::Verify(cmd) => cmd.execute(&ctx).await,
        Commands::Generate(cmd) => cmd.execute(&ctx).await,
        Commands::SetupAll(cmd) => cmd.execute(&ctx).await,
    }
}
