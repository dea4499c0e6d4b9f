//! Per-test trends across a patient's documents.

pub mod compute;

pub use compute::*;

use thiserror::Error;

use crate::models::NO_TREND_DATA;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrendError {
    #[error("{}", NO_TREND_DATA)]
    NoData,
}
