use clap::{Parser, Subcommand};
use hub_steward_cli::{
    commands::{
        reconcile_cmd::{self, ReconcileArgs},
        watch_cmd::{self, WatchArgs},
    },
    config::{get_config_path, AppConfig},
    errors::Error,
};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// HubSteward CLI: Converge GitHub organizations, repositories, teams and branch protection
/// rules toward declared records
#[derive(Parser)]
#[command(name = "hub-steward")]
#[command(about = "Converge GitHub resources toward declared records", long_about = None)]
struct Cli {
    /// Path to the configuration file; defaults to ./hub-steward.toml
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile every declared record once
    Reconcile(ReconcileArgs),

    /// Keep reconciling declared records until interrupted
    Watch(WatchArgs),

    /// Show the CLI version
    Version,
}

async fn run(cli: &Cli) -> Result<(), Error> {
    match &cli.command {
        Commands::Reconcile(args) => {
            let config = AppConfig::load(&get_config_path(cli.config.as_deref()))?;
            reconcile_cmd::execute(args, &config).await
        }
        Commands::Watch(args) => {
            let config = AppConfig::load(&get_config_path(cli.config.as_deref()))?;
            watch_cmd::execute(args, &config).await
        }
        Commands::Version => {
            println!(
                "hub-steward version {}",
                option_env!("HUB_STEWARD_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
            );
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer().pretty())
        .with(EnvFilter::from_env("HUB_STEWARD_LOG"))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli).await {
        error!("Error: {e}");
        std::process::exit(1);
    }
}
