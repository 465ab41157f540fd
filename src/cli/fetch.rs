use super::ui;
use crate::core::config::AppConfig;
use crate::pipeline::{self, RunOutcome};
use crate::providers::BocProvider;
use crate::store::RecordStore;
use anyhow::Result;
use tracing::debug;

/// Runs one fetch cycle against the configured bank page and prints a one-line
/// result. Pipeline failures are reported in the outcome, not as `Err`.
pub async fn run(config: &AppConfig, store: &dyn RecordStore) -> Result<RunOutcome> {
    let provider = BocProvider::new(&config.source, &config.quote)?;
    debug!(url = %config.source.url, "Starting fetch");

    let pb = ui::new_spinner(&format!("Fetching {}", config.quote.pair));
    let outcome = pipeline::run(&provider, store, &config.quote).await;
    pb.finish_and_clear();
    let outcome = outcome?;

    println!("{}", summary_line(&outcome));
    if !outcome.persisted {
        println!(
            "{}",
            ui::style_text(
                &format!(
                    "Existing record at {} is unreadable and was left as is",
                    config.output_path.display()
                ),
                ui::StyleType::Subtle
            )
        );
    }
    Ok(outcome)
}

fn summary_line(outcome: &RunOutcome) -> String {
    let record = &outcome.record;
    match &outcome.error {
        None => {
            let rate = record.rate.map(|r| r.to_string()).unwrap_or_default();
            let change = match (record.rate_change, record.rate_change_percent) {
                (Some(abs), Some(pct)) => format!(" ({abs:+} / {pct:+}%)"),
                _ => String::new(),
            };
            format!(
                "{} {}: {}{}",
                ui::style_text("✓", ui::StyleType::Success),
                record.pair,
                rate,
                ui::style_text(&change, ui::StyleType::Subtle)
            )
        }
        Some(e) => format!(
            "{} {}: {}",
            ui::style_text("✗", ui::StyleType::Error),
            record.pair,
            ui::style_text(&e.to_string(), ui::StyleType::Error)
        ),
    }
}
