//! Identifiers, tally primitives, and deterministic RNG for the audit
//! engine: the leaf crate everything else in the workspace builds on.

pub mod errors;
pub mod ids;
pub mod rng;
pub mod sampler;
pub mod tally;

pub use errors::CoreError;
pub use ids::{BallotId, CollectionId, ContestId, GroupId, MeasurementId, SelId, StageTime, Vote};
pub use rng::{audit_order, shuffle_keyed, shuffle_step_index, shuffle_step_index_keyed, AuditSeed};
pub use sampler::{
    compute_prior_pseudocounts, dirichlet, draw_nonsample_tally, gamma, multinomial,
    DEFAULT_ALPHA_BASE, DEFAULT_ALPHA_MATCH,
};
pub use tally::{compute_tally, compute_tally2};
