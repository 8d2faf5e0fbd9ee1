use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fundfinder::cli::setup::setup;
use fundfinder::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for fundfinder::AppCommand {
    fn from(cmd: Commands) -> fundfinder::AppCommand {
        match cmd {
            Commands::Managers => fundfinder::AppCommand::Managers,
            Commands::Funds { manager_ids } => fundfinder::AppCommand::Funds { manager_ids },
            Commands::Prices => fundfinder::AppCommand::Prices,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Refresh the list of fund managers
    Managers,
    /// Refresh the funds of each manager
    Funds {
        /// Only these managers, e.g. 0303,0037 (default: every stored manager)
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
        manager_ids: Vec<i32>,
    },
    /// Refresh fund class costs and prices
    Prices,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(cmd) => fundfinder::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
