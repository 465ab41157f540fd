use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use ratecard::core::log::init_logging;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    /// Record file to read and write, overriding `output_path` from the config
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for ratecard::AppCommand {
    fn from(cmd: Commands) -> ratecard::AppCommand {
        match cmd {
            Commands::Fetch => ratecard::AppCommand::Fetch,
            Commands::Show => ratecard::AppCommand::Show,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Fetch the current rate and update the record
    Fetch,
    /// Display the stored rate card
    Show,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => {
            ratecard::cli::setup::setup().map(|_| ratecard::CommandStatus::Done)
        }
        Some(cmd) => {
            ratecard::run_command(cmd.into(), cli.config_path.as_deref(), cli.output.as_deref())
                .await
        }
        None => {
            Cli::command().print_help()?;
            Ok(ratecard::CommandStatus::Done)
        }
    };

    match result {
        Ok(ratecard::CommandStatus::Done) => Ok(ExitCode::SUCCESS),
        // Lets the scheduler and notifier see the failure; details are in the record
        Ok(ratecard::CommandStatus::RateUnavailable) => Ok(ExitCode::FAILURE),
        Err(e) => {
            tracing::error!(error = %e, "Application failed");
            Err(e)
        }
    }
}
