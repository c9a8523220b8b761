//! Day reconstruction, caching and range reporting.
//!
//! `day` rebuilds one device-day from raw vendor samples, `cache` decides
//! when that work can be skipped, and `range` strings cached days into the
//! chart series the dashboard consumes.

mod cache;
mod day;
mod range;

pub use cache::*;
pub use day::*;
pub use range::*;

#[cfg(test)]
pub(crate) mod testutil;

use crate::db::DbError;
use crate::vbox::VendorError;
use thiserror::Error;

/// History pipeline error types.
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("no counter monitor on device {0}")]
    CounterNotFound(String),
    #[error("invalid day or range: {0}")]
    InvalidDay(String),
    #[error(transparent)]
    Vendor(#[from] VendorError),
    #[error(transparent)]
    Db(#[from] DbError),
}
