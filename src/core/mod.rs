//! Core types and abstractions

pub mod config;
pub mod error;
pub mod log;
pub mod record;
pub mod source;
pub mod validate;

// Re-export main types for cleaner imports
pub use error::{ErrorKind, RateError};
pub use record::{Quote, RateRecord, RecordStatus, Trend};
pub use source::RateSource;
