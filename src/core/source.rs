//! Rate source abstraction

use crate::core::error::RateError;
use crate::core::record::Quote;
use async_trait::async_trait;

#[async_trait]
pub trait RateSource: Send + Sync {
    /// Where the quote comes from, recorded in the `source` field.
    fn source_url(&self) -> &str;

    /// Fetches and parses one quote. Range validation is left to the caller.
    async fn fetch_quote(&self) -> Result<Quote, RateError>;
}
