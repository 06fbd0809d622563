//! Error taxonomy for `audit_model`.

use audit_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("contest group {gid} is not reachable from any declared group")]
    UnknownGroup { gid: String },

    #[error("contest {cid} has no declared votes, cannot compute outcome")]
    EmptyContest { cid: String },

    #[error("measurement {mid} attempted an invalid status transition: {from:?} -> {to:?}")]
    InvalidStatusTransition {
        mid: String,
        from: MeasurementStatus,
        to: MeasurementStatus,
    },

    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

use crate::measurement::MeasurementStatus;
