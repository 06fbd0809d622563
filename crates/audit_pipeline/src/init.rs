//! Loading an election from disk and establishing the initial state the
//! stage loop starts from (`spec.md` §4.1, §4.6 "Initialisation").

use std::collections::BTreeMap;

use audit_core::{AuditSeed, CollectionId};
use audit_io::layout::ElectionLayout;
use audit_io::{audit_order, audit_spec, election_spec, reported_files};
use audit_model::Election;

use crate::clock;
use crate::errors::StageResult;
use crate::stage;

/// Everything `run_to_completion` needs to drive a fresh stage loop: the
/// loaded election, its audit seed, and the shuffled audit order for every
/// collection (computed once, up front, and sliced by each stage).
pub struct Initialised {
    pub election: Election,
    pub seed: AuditSeed,
    pub audit_order: BTreeMap<CollectionId, Vec<audit_core::BallotId>>,
    pub max_audit_rate_p: BTreeMap<CollectionId, u64>,
}

/// Read `1-election-spec/`, `2-reported/`, and `3-audit/31-audit-spec/`,
/// validate the result, and materialise the audit order for every
/// collection — which writes each collection's `32-audit-orders/` file to
/// disk (`audit_order::make_audit_order`) as a side effect of computing it.
/// `write_initial_saved_state` and the first `34-audit-output/` snapshot
/// are still the caller's job; only those are left for a dry run
/// (`--read_election_spec` et al.) to skip.
pub fn load(layout: &ElectionLayout) -> StageResult<Initialised> {
    let mut election = election_spec::read_election_spec(layout)?;
    reported_files::read_all_reported(layout, &mut election)?;
    audit_spec::read_measurements(layout, &mut election)?;
    let max_audit_rate_p = audit_spec::read_max_audit_rates(layout, &mut election)?;
    let seed = audit_spec::read_seed(layout)?;

    let t0 = clock::now();
    stage::validate_or_abort(&election, &t0)?;

    let mut order = BTreeMap::new();
    for (pbcid, coll) in &election.collections {
        let shuffled = audit_order::make_audit_order(layout, &seed, pbcid, &coll.bids, audit_core::StageTime::initial().as_str())?;
        order.insert(pbcid.clone(), shuffled);
    }

    Ok(Initialised { election, seed, audit_order: order, max_audit_rate_p })
}
