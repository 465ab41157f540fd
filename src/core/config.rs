use anyhow::{Context, Result};
use chrono::{FixedOffset, Offset, Utc};
use directories::ProjectDirs;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

pub const DEFAULT_SOURCE_URL: &str = "https://www.boc.cn/sourcedb/whpj/";
pub const DEFAULT_OUTPUT_PATH: &str = "docs/data.json";
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Where and how to fetch the bank page.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SourceConfig {
    pub url: String,
    pub timeout_secs: u64,
    /// Total number of requests, including the first one.
    pub max_attempts: usize,
    pub retry_delay_ms: u64,
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            url: DEFAULT_SOURCE_URL.to_string(),
            timeout_secs: 30,
            max_attempts: 3,
            retry_delay_ms: 5000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Which row and columns hold the rate, and what counts as a sane value.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct QuoteConfig {
    /// Labels that identify the currency row; the first one is used as the
    /// record label when the page never matched.
    pub aliases: Vec<String>,
    pub pair: String,
    /// Header text of the rate column.
    pub field: String,
    /// Header text of the publish time column.
    pub time_field: String,
    /// Header text of a separate publish date column, joined in front of the
    /// time when the page has one.
    pub date_field: String,
    /// Number of foreign currency units the page quotes for.
    pub unit: Decimal,
    /// Column positions used when the page has no recognizable header row.
    pub rate_column: usize,
    pub time_column: usize,
    pub min_rate: Decimal,
    pub max_rate: Decimal,
    pub utc_offset_hours: i32,
}

impl Default for QuoteConfig {
    fn default() -> Self {
        QuoteConfig {
            aliases: vec!["英镑".to_string(), "GBP".to_string()],
            pair: "GBP/CNY".to_string(),
            field: "现汇卖出价".to_string(),
            time_field: "发布时间".to_string(),
            date_field: "发布日期".to_string(),
            unit: Decimal::ONE_HUNDRED,
            rate_column: 3,
            time_column: 6,
            min_rate: Decimal::new(5, 0),
            max_rate: Decimal::new(15, 0),
            utc_offset_hours: 8,
        }
    }
}

impl QuoteConfig {
    pub fn currency_label(&self) -> &str {
        self.aliases.first().map_or("", String::as_str)
    }

    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub quote: QuoteConfig,
    pub output_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            source: SourceConfig::default(),
            quote: QuoteConfig::default(),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
        }
    }
}

impl AppConfig {
    /// Loads the config from the default location, falling back to built-in
    /// defaults when no file has been set up.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("cn", "ratecard", "ratecard")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
