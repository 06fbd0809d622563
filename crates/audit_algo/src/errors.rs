//! Error taxonomy for `audit_algo`.

use audit_model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AlgoError {
    #[error(transparent)]
    Model(#[from] ModelError),

    /// The social-choice rule could not pick a winner from a tally — only
    /// ever emitted inside a Monte Carlo trial, where it is a model error
    /// rather than something to retry (§4.2, §7 Taxonomy).
    #[error("no valid outcome for contest {cid} under rule {rule:?}")]
    NoValidOutcome { cid: String, rule: String },

    #[error("social-choice rule {0:?} is not registered")]
    UnknownRule(String),

    #[error("planner parameter invalid: {0}")]
    InvalidPlannerParam(String),
}
