//! Election/audit data model and invariants (`spec.md` §3): contests,
//! collections, contest groups, the reported and audited tensors,
//! measurements, the plan, and the aggregate `Election` state.

pub mod audited;
pub mod collection;
pub mod contest;
pub mod election;
pub mod errors;
pub mod group;
pub mod measurement;
pub mod plan;
pub mod reported;

pub use audited::{AuditedTensor, SampleTallies};
pub use collection::{BallotMeta, Collection, CvrMode};
pub use contest::{Contest, ContestType, WriteInPolicy};
pub use election::Election;
pub use errors::ModelError;
pub use group::{expand_all_groups, expand_group, ContestGroup, GroupMember};
pub use measurement::{Measurement, MeasurementStatus, RiskMethod, SamplingMode};
pub use plan::Plan;
pub use reported::ReportedTensor;
