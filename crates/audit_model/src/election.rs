//! The top-level election/audit aggregate and its invariants
//! (`spec.md` §3 "Invariants", "Lifecycle").

use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use audit_core::{CollectionId, ContestId, GroupId, MeasurementId, Vote};

use crate::audited::{AuditedTensor, SampleTallies};
use crate::collection::Collection;
use crate::contest::Contest;
use crate::errors::ModelError;
use crate::group::{expand_all_groups, ContestGroup};
use crate::measurement::Measurement;
use crate::plan::Plan;
use crate::reported::ReportedTensor;

/// The full in-memory election/audit state: static spec data (contests,
/// collections, groups, measurements), the reported tensor loaded once,
/// and the audited tensor / sample tallies / plan that accumulate across
/// stages.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Election {
    pub contests: BTreeMap<ContestId, Contest>,
    pub collections: BTreeMap<CollectionId, Collection>,
    pub groups: BTreeMap<GroupId, ContestGroup>,
    pub measurements: BTreeMap<MeasurementId, Measurement>,
    pub reported: ReportedTensor,
    /// `ro_c[cid]`: the reported outcome, loaded from
    /// `23-reported-outcomes.csv`.
    pub reported_outcomes: BTreeMap<ContestId, Vote>,
    pub audited: AuditedTensor,
    pub samples: SampleTallies,
    pub plan: Plan,
}

impl Election {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expand every declared group into its flat contest list, returning
    /// cycle warnings alongside (cycles are warned, never fatal — §3/§9).
    pub fn expand_groups(&self) -> (BTreeMap<GroupId, Vec<ContestId>>, Vec<GroupId>) {
        expand_all_groups(&self.groups)
    }

    /// `required_cid_p[pbcid]` / `possible_cid_p[pbcid]`: the contests a
    /// collection is required/possible for, derived from its declared
    /// group memberships via reachability expansion.
    pub fn required_cids_for(&self, pbcid: &CollectionId) -> BTreeSet<ContestId> {
        self.cids_for_gids(pbcid, true)
    }

    pub fn possible_cids_for(&self, pbcid: &CollectionId) -> BTreeSet<ContestId> {
        self.cids_for_gids(pbcid, false)
    }

    fn cids_for_gids(&self, pbcid: &CollectionId, required: bool) -> BTreeSet<ContestId> {
        let Some(coll) = self.collections.get(pbcid) else {
            return BTreeSet::new();
        };
        let (cids_g, _warnings) = self.expand_groups();
        let gids = if required { &coll.required_gids } else { &coll.possible_gids };
        let mut out = BTreeSet::new();
        for gid in gids {
            if let Some(cids) = cids_g.get(gid) {
                out.extend(cids.iter().cloned());
            }
        }
        out
    }

    /// The inverse view: `possible_pbcid_c[cid]`, every collection that
    /// carries (possible) ballots for a contest, sorted for deterministic
    /// iteration by the risk kernel (§4.5).
    pub fn possible_pbcids_for_contest(&self, cid: &ContestId) -> BTreeSet<CollectionId> {
        self.collections
            .keys()
            .filter(|pbcid| self.possible_cids_for(pbcid).contains(cid))
            .cloned()
            .collect()
    }

    pub fn required_pbcids_for_contest(&self, cid: &ContestId) -> BTreeSet<CollectionId> {
        self.collections
            .keys()
            .filter(|pbcid| self.required_cids_for(pbcid).contains(cid))
            .cloned()
            .collect()
    }

    /// Check every invariant of `spec.md` §3 that can be verified purely
    /// from in-memory state (invariants that concern a specific stage `t`
    /// take `t` explicitly). Returns all violations found rather than
    /// stopping at the first, matching the "warnings accumulate" model of
    /// §4.6's failure semantics.
    pub fn check_invariants(&self, t: &audit_core::StageTime) -> Vec<ModelError> {
        let mut errors = Vec::new();

        // Invariant 1: sum of rn_cpr over (pbcid, rv) equals rn_c.
        for cid in self.contests.keys() {
            let total = self.reported.total_over_strata(cid);
            let rn_c = self.reported.rn_c(cid);
            if total != rn_c {
                errors.push(ModelError::InvariantViolation(format!(
                    "contest {cid}: sum(rn_cpr) = {total} != rn_c = {rn_c}"
                )));
            }
        }

        // Invariant 2: 0 <= sn_tcpr <= rn_cpr for every stratum.
        for cid in self.contests.keys() {
            for pbcid in self.possible_pbcids_for_contest(cid) {
                let rn_cpr = self.reported.rn_cpr(cid, &pbcid);
                let sn_tcpr = self.samples.sn_tcpr(t, cid, &pbcid);
                for (rv, &sampled) in &sn_tcpr {
                    let available = rn_cpr.get(rv).copied().unwrap_or(0);
                    if sampled > available {
                        errors.push(ModelError::InvariantViolation(format!(
                            "contest {cid} pbcid {pbcid} rv {rv}: sampled {sampled} > available {available}"
                        )));
                    }
                }
            }
        }

        // Invariant 7: plan bounds.
        for (pbcid, coll) in &self.collections {
            if let Some(planned) = self.plan.get(t, pbcid) {
                let population = coll.ballot_count() as u64;
                let sampled = self.samples.sn_tp_for(t, pbcid);
                if planned > population {
                    errors.push(ModelError::InvariantViolation(format!(
                        "pbcid {pbcid}: plan {planned} exceeds population {population}"
                    )));
                }
                if planned < sampled {
                    errors.push(ModelError::InvariantViolation(format!(
                        "pbcid {pbcid}: plan {planned} below already-sampled {sampled}"
                    )));
                }
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::CvrMode;
    use crate::group::GroupMember;
    use audit_core::{BallotId, SelId, StageTime};

    fn build_small_election() -> Election {
        let mut e = Election::new();
        let cid = ContestId::new("C1");
        e.contests.insert(cid.clone(), Contest::new(cid.clone(), crate::contest::ContestType::Plurality));

        let pbcid = CollectionId::new("P1");
        let mut coll = Collection::new(pbcid.clone(), CvrMode::Cvr);
        coll.required_gids.push(GroupId::new("G1"));
        coll.bids = vec![BallotId::new("b1"), BallotId::new("b2")];
        e.collections.insert(pbcid.clone(), coll);

        let gid = GroupId::new("G1");
        e.groups.insert(
            gid.clone(),
            ContestGroup { gid, members: vec![GroupMember::Contest(cid.clone())] },
        );

        e.reported.set(&cid, &pbcid, &BallotId::new("b1"), Vote::single(SelId::new("Alice")));
        e.reported.set(&cid, &pbcid, &BallotId::new("b2"), Vote::single(SelId::new("Bob")));
        e
    }

    #[test]
    fn required_cids_resolve_through_groups() {
        let e = build_small_election();
        let pbcid = CollectionId::new("P1");
        let required = e.required_cids_for(&pbcid);
        assert!(required.contains(&ContestId::new("C1")));
    }

    #[test]
    fn possible_pbcids_for_contest_is_inverse_of_required() {
        let e = build_small_election();
        let cid = ContestId::new("C1");
        let pbcids = e.required_pbcids_for_contest(&cid);
        assert!(pbcids.contains(&CollectionId::new("P1")));
    }

    #[test]
    fn invariants_hold_on_fresh_election() {
        let e = build_small_election();
        let errs = e.check_invariants(&StageTime::initial());
        assert!(errs.is_empty(), "{errs:?}");
    }
}
