//! Typed failures of the fetch-validate-persist pipeline

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use thiserror::Error;

/// Everything that can go wrong between requesting the page and having a
/// validated quote. None of these abort the process; the pipeline turns them
/// into an error-status record.
#[derive(Debug, Error)]
pub enum RateError {
    #[error("Failed to fetch {url} after {attempts} attempts: {source}")]
    Network {
        url: String,
        attempts: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("Could not parse rate from page: {0}")]
    Parse(String),

    #[error("Rate {rate} is outside valid range [{min}, {max}]")]
    Range {
        rate: Decimal,
        min: Decimal,
        max: Decimal,
    },
}

/// Stable, serializable tag for a [`RateError`], written into error records so
/// the notifier can tell failures apart without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Network,
    Parse,
    Range,
}

impl RateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RateError::Network { .. } => ErrorKind::Network,
            RateError::Parse(_) => ErrorKind::Parse,
            RateError::Range { .. } => ErrorKind::Range,
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ErrorKind::Network => "network",
                ErrorKind::Parse => "parse",
                ErrorKind::Range => "range",
            }
        )
    }
}
