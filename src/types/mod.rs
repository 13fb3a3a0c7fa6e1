// src/types/mod.rs
//! Validated domain types: time intervals, coverage, identifiers and keys.

use thiserror::Error;

mod domain_types;
mod ids;
mod interval;

pub use domain_types::*;
pub use ids::*;
pub use interval::*;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Interval ends before it starts: {start} > {end}")]
    InvertedInterval { start: String, end: String },

    #[error("Interval {0} is too short to be split")]
    IntervalTooShort(String),

    #[error("Intervals {left} and {right} neither overlap nor touch")]
    DisjointIntervals { left: String, right: String },

    #[error("Cannot partition an interval into zero parts")]
    ZeroPartitions,

    #[error("Invalid flickr user id (NSID): {0}")]
    InvalidNsid(String),

    #[error("Invalid flickr photo id: {0}")]
    InvalidPhotoId(String),

    #[error("Invalid API key format: {reason}")]
    InvalidApiKey { reason: String },

    #[error("Value out of bounds: {value}, expected {min}..={max}")]
    OutOfBounds { value: u64, min: u64, max: u64 },
}
