//! Error taxonomy for `audit_core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid stage-time string, expected YYYY-MM-DD-HH-MM-SS")]
    InvalidTimestamp,

    #[error("audit seed must be a nonnegative base-10 integer, got {0:?}")]
    InvalidSeed(String),

    #[error("tally mismatch: {0}")]
    TallyMismatch(String),

    #[error("sampler received an invalid parameter: {0}")]
    InvalidSamplerParam(String),

    #[error("attempted to draw {requested} item(s) from a population of {available}")]
    SampleExceedsPopulation { requested: usize, available: usize },
}
