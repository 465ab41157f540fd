pub mod boc;
pub mod util;

pub use boc::{BocProvider, extract_quote};
