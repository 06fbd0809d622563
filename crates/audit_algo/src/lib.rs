//! Social-choice oracle, Monte Carlo Bayes-risk kernel, and sample planner
//! (`spec.md` §4.2, §4.5, §4.7) built on top of `audit_core`'s deterministic
//! RNG and posterior sampler and `audit_model`'s election state.

pub mod errors;
pub mod kernel;
pub mod oracle;
pub mod planner;

pub use errors::AlgoError;
pub use kernel::{compute_risk, compute_risk_with_tweak, DEFAULT_N_TRIALS};
pub use oracle::{OracleRegistry, Plurality, SocialChoiceRule};
pub use planner::{
    compute_plan, plan_baseline, plan_dirichlet_sim, plan_robbins_monro, PickCountyFunc,
    PlannerConfig,
};
