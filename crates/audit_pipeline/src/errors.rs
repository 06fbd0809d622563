//! Error composition for the stage loop: every fatal condition the driver
//! can hit, whether it bubbles up from I/O, the model, or the algorithms.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Io(#[from] audit_io::IoError),

    #[error(transparent)]
    Model(#[from] audit_model::ModelError),

    #[error(transparent)]
    Algo(#[from] audit_algo::AlgoError),

    #[error("pre-audit validation failed with {0} warning(s); aborting before the stage loop")]
    ValidationFailed(usize),

    #[error("current stage time {current} did not advance past previous stage time {previous}")]
    StageTimeDidNotAdvance { previous: String, current: String },
}

pub type StageResult<T> = Result<T, StageError>;
