//! Fetch, validate and persist one rate record

use crate::core::config::QuoteConfig;
use crate::core::error::RateError;
use crate::core::record::{Quote, RateRecord};
use crate::core::source::RateSource;
use crate::core::validate::check_range;
use crate::store::RecordStore;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

/// What a single run wrote and, if it failed, why.
#[derive(Debug)]
pub struct RunOutcome {
    pub record: RateRecord,
    pub error: Option<RateError>,
    /// False when a failed run left an unreadable existing record in place.
    pub persisted: bool,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

pub async fn run(
    source: &dyn RateSource,
    store: &dyn RecordStore,
    config: &QuoteConfig,
) -> Result<RunOutcome> {
    run_at(source, store, config, Utc::now()).await
}

/// Runs the pipeline with an explicit clock.
///
/// Fetch, parse and range failures never escape: they are written as an
/// error-status record that keeps the previous numbers. An existing record
/// that cannot be read is never replaced by an error record, only by a fresh
/// successful one. Only a failure to write the record itself is returned as
/// `Err`.
pub async fn run_at(
    source: &dyn RateSource,
    store: &dyn RecordStore,
    config: &QuoteConfig,
    now: DateTime<Utc>,
) -> Result<RunOutcome> {
    let (previous, unreadable) = match store.load() {
        Ok(previous) => (previous, false),
        Err(e) => {
            warn!(error = %format!("{e:#}"), "Previous record is unreadable");
            (None, true)
        }
    };

    let outcome = match fetch_validated(source, config).await {
        Ok(quote) => {
            let record = RateRecord::from_quote(quote, config, source.source_url(), now)
                .with_change_from(previous.as_ref());
            info!(
                pair = %record.pair,
                rate = ?record.rate,
                change = ?record.rate_change,
                change_percent = ?record.rate_change_percent,
                "Fetched new rate"
            );
            RunOutcome {
                record,
                error: None,
                persisted: true,
            }
        }
        Err(e) => {
            error!(kind = %e.kind(), error = %e, "Rate update failed");
            if previous.is_some() {
                info!("Keeping previous rate in error record");
            }
            let record = RateRecord::failed(previous, &e, config, source.source_url(), now);
            RunOutcome {
                record,
                error: Some(e),
                persisted: !unreadable,
            }
        }
    };

    if !outcome.persisted {
        warn!("Leaving unreadable record in place");
        return Ok(outcome);
    }
    store
        .save(&outcome.record)
        .context("Failed to persist rate record")?;
    Ok(outcome)
}

async fn fetch_validated(
    source: &dyn RateSource,
    config: &QuoteConfig,
) -> Result<Quote, RateError> {
    let quote = source.fetch_quote().await?;
    check_range(quote.rate, config.min_rate, config.max_rate)?;
    Ok(quote)
}
