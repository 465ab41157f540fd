//! The persisted rate card and the quote it is built from

use crate::core::config::QuoteConfig;
use crate::core::error::{ErrorKind, RateError};
use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt::Display;

/// Decimal places kept for the per-unit rate and the absolute change.
pub const RATE_DP: u32 = 4;
/// Decimal places kept for the per-100 rate, as quoted by the bank.
pub const SCALED_RATE_DP: u32 = 2;
/// Decimal places kept for the percent change.
pub const PERCENT_DP: u32 = 4;

/// A single quote as read off the bank page, before it becomes a record.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    /// Currency label exactly as the bank prints it, e.g. `英镑`.
    pub currency: String,
    /// Rate in local currency per one unit of foreign currency.
    pub rate: Decimal,
    /// Publish time cell text, whitespace collapsed.
    pub publish_time_raw: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Success,
    Error,
}

impl Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                RecordStatus::Success => "success",
                RecordStatus::Error => "error",
            }
        )
    }
}

/// Direction of the last change, as rendered by the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    pub fn arrow(&self) -> &'static str {
        match self {
            Trend::Up => "▲",
            Trend::Down => "▼",
            Trend::Flat => "–",
        }
    }
}

/// Absolute and relative difference between two consecutive rates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateChange {
    pub absolute: Decimal,
    pub percent: Decimal,
}

impl RateChange {
    /// Returns `None` when there is no meaningful base to compare against.
    pub fn between(previous: Decimal, current: Decimal) -> Option<Self> {
        if previous.is_zero() {
            return None;
        }
        let absolute = current - previous;
        let percent = (absolute / previous * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(PERCENT_DP, RoundingStrategy::MidpointAwayFromZero);
        Some(Self { absolute, percent })
    }
}

/// The JSON document consumed by the static front end.
///
/// Numeric fields are optional because an error record written before any
/// successful fetch has nothing to carry over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRecord {
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub pair: String,
    #[serde(default, alias = "boc_field")]
    pub source_field: String,
    #[serde(
        default,
        alias = "rate_cny_per_gbp",
        skip_serializing_if = "Option::is_none",
        serialize_with = "as_json_number"
    )]
    pub rate: Option<Decimal>,
    #[serde(
        default,
        alias = "rate_cny_per_100_gbp",
        skip_serializing_if = "Option::is_none",
        serialize_with = "as_json_number"
    )]
    pub rate_per_100: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_time_raw: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at_utc: Option<DateTime<Utc>>,
    #[serde(
        default,
        alias = "fetched_at_beijing",
        skip_serializing_if = "Option::is_none"
    )]
    pub fetched_at_local: Option<String>,
    pub source: String,
    pub status: RecordStatus,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "as_json_number"
    )]
    pub rate_change: Option<Decimal>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "as_json_number"
    )]
    pub rate_change_percent: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked_at_utc: Option<DateTime<Utc>>,
}

impl RateRecord {
    /// Builds a success record from a validated quote.
    pub fn from_quote(
        quote: Quote,
        config: &QuoteConfig,
        source: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            currency: quote.currency,
            pair: config.pair.clone(),
            source_field: config.field.clone(),
            rate: Some(
                quote
                    .rate
                    .round_dp_with_strategy(RATE_DP, RoundingStrategy::MidpointAwayFromZero),
            ),
            rate_per_100: Some(
                (quote.rate * Decimal::ONE_HUNDRED).round_dp_with_strategy(
                    SCALED_RATE_DP,
                    RoundingStrategy::MidpointAwayFromZero,
                ),
            ),
            publish_time_raw: Some(quote.publish_time_raw),
            fetched_at_utc: Some(now),
            fetched_at_local: Some(format_local(now, config.utc_offset())),
            source: source.to_string(),
            status: RecordStatus::Success,
            rate_change: None,
            rate_change_percent: None,
            error_kind: None,
            error_message: None,
            checked_at_utc: Some(now),
        }
    }

    /// Fills the change fields against the previous record, if it had a rate.
    pub fn with_change_from(mut self, previous: Option<&RateRecord>) -> Self {
        let change = match (previous.and_then(|p| p.rate), self.rate) {
            (Some(prev), Some(curr)) => RateChange::between(prev, curr),
            _ => None,
        };
        self.rate_change = change.map(|c| c.absolute);
        self.rate_change_percent = change.map(|c| c.percent);
        self
    }

    /// Builds the error record for a failed run.
    ///
    /// Every field of the previous record is carried over unchanged, including
    /// `fetched_at_*` and the change fields, so the card keeps showing the last
    /// good data and its real age. Only `status`, the error fields and
    /// `checked_at_utc` describe this run. Without a previous record only the
    /// identity fields from the config are filled in.
    pub fn failed(
        previous: Option<RateRecord>,
        error: &RateError,
        config: &QuoteConfig,
        source: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let base = previous.unwrap_or_else(|| Self {
            currency: config.currency_label().to_string(),
            pair: config.pair.clone(),
            source_field: config.field.clone(),
            rate: None,
            rate_per_100: None,
            publish_time_raw: None,
            fetched_at_utc: None,
            fetched_at_local: None,
            source: source.to_string(),
            status: RecordStatus::Error,
            rate_change: None,
            rate_change_percent: None,
            error_kind: None,
            error_message: None,
            checked_at_utc: None,
        });

        Self {
            status: RecordStatus::Error,
            error_kind: Some(error.kind()),
            error_message: Some(error.to_string()),
            checked_at_utc: Some(now),
            ..base
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RecordStatus::Success
    }

    pub fn trend(&self) -> Option<Trend> {
        self.rate_change.map(|change| {
            if change.is_sign_positive() && !change.is_zero() {
                Trend::Up
            } else if change.is_sign_negative() && !change.is_zero() {
                Trend::Down
            } else {
                Trend::Flat
            }
        })
    }
}

/// Writes a decimal as a plain JSON number with the same digits, which is what
/// the front end reads. Reading back goes through `Decimal`'s own visitor.
fn as_json_number<S: Serializer>(
    value: &Option<Decimal>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(decimal) => {
            let number: f64 = decimal
                .to_string()
                .parse()
                .map_err(serde::ser::Error::custom)?;
            serializer.serialize_f64(number)
        }
        None => serializer.serialize_none(),
    }
}

fn format_local(now: DateTime<Utc>, offset: FixedOffset) -> String {
    now.with_timezone(&offset)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
