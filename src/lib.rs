pub mod cli;
pub mod core;
pub mod pipeline;
pub mod providers;
pub mod store;

use crate::core::config::AppConfig;
use crate::store::disk::JsonFileStore;
use anyhow::Result;
use std::path::Path;
use tracing::{debug, info};

pub enum AppCommand {
    Fetch,
    Show,
}

/// Whether the command did what was asked. A failed fetch still writes its
/// error record, so this is not an `Err`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Done,
    RateUnavailable,
}

pub async fn run_command(
    command: AppCommand,
    config_path: Option<&str>,
    output_path: Option<&Path>,
) -> Result<CommandStatus> {
    let mut config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    if let Some(path) = output_path {
        config.output_path = path.to_path_buf();
    }
    debug!("Loaded config: {config:#?}");

    let store = JsonFileStore::new(&config.output_path);

    match command {
        AppCommand::Fetch => {
            info!("Fetching {} into {}", config.quote.pair, store.path().display());
            let outcome = cli::fetch::run(&config, &store).await?;
            Ok(if outcome.is_success() {
                CommandStatus::Done
            } else {
                CommandStatus::RateUnavailable
            })
        }
        AppCommand::Show => {
            cli::show::run(&store)?;
            Ok(CommandStatus::Done)
        }
    }
}
