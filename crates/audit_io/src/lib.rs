//! CSV readers/writers, directory layout, saved-state snapshots, and
//! canonical-JSON hashing for the audit engine. Nothing in this crate
//! touches the statistical core directly; it only gets data in and out of
//! the shapes `audit_model`/`audit_algo` expect.

pub mod atomic;
pub mod audit_order;
pub mod audit_output;
pub mod audit_spec;
pub mod audited_votes;
pub mod csv_util;
pub mod election_spec;
pub mod errors;
pub mod layout;
pub mod reported_files;
pub mod saved_state;

pub use errors::{IoError, IoResult};
pub use layout::ElectionLayout;
