mod commands;
mod progress;
mod stack;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cirrus")]
#[command(version)]
#[command(about = "Declarative cloud topologies: deploy, monitor and tear down project blueprints", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a blueprint document into the project store
    Import {
        /// Path to a blueprint YAML file
        file: PathBuf,
    },
    /// List stored projects and their resource status
    List,
    /// Deploy a project's blueprint
    Deploy {
        /// Project slug
        project: String,
    },
    /// Tear down a project's tracked resources in dependency order
    Terminate {
        /// Project slug
        project: String,
        /// Explicit resources as kind:id (default: everything tracked)
        #[arg(short, long = "resource")]
        resources: Vec<String>,
    },
    /// Start or stop the project's instances and databases
    Power {
        /// "start" or "stop"
        action: String,
        /// Project slug
        project: String,
    },
    /// Scan provider regions for managed resources
    Scan {
        /// Regions to scan (default: the configured region)
        #[arg(short, long = "region")]
        regions: Vec<String>,
    },
    /// Re-issue commands for work interrupted by a crash
    Resume,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Import { file } => commands::import::handle(&file).await,
        Commands::List => commands::list::handle().await,
        Commands::Deploy { project } => commands::deploy::handle(&project).await,
        Commands::Terminate { project, resources } => {
            commands::terminate::handle(&project, &resources).await
        }
        Commands::Power { action, project } => commands::power::handle(&action, &project).await,
        Commands::Scan { regions } => commands::scan::handle(&regions).await,
        Commands::Resume => commands::resume::handle().await,
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_target(false)
        .init();
}
