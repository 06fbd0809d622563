//! The reported-vote tensor and its derived counts (`spec.md` §3 "Reported
//! tensor").

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use audit_core::{BallotId, CollectionId, ContestId, Vote};

/// `rv_cpb[cid][pbcid][bid] -> vote`: the reported vote for every ballot
/// the reported CVR/manifest data names.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReportedTensor {
    pub rv_cpb: BTreeMap<ContestId, BTreeMap<CollectionId, BTreeMap<BallotId, Vote>>>,
}

impl ReportedTensor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, cid: &ContestId, pbcid: &CollectionId, bid: &BallotId, vote: Vote) {
        self.rv_cpb
            .entry(cid.clone())
            .or_default()
            .entry(pbcid.clone())
            .or_default()
            .insert(bid.clone(), vote);
    }

    pub fn get(&self, cid: &ContestId, pbcid: &CollectionId, bid: &BallotId) -> Option<&Vote> {
        self.rv_cpb.get(cid)?.get(pbcid)?.get(bid)
    }

    /// `rn_cpr[cid][pbcid][rv]`: stratum size by reported vote.
    pub fn rn_cpr(&self, cid: &ContestId, pbcid: &CollectionId) -> BTreeMap<Vote, u64> {
        let mut out = BTreeMap::new();
        if let Some(by_pbcid) = self.rv_cpb.get(cid) {
            if let Some(by_bid) = by_pbcid.get(pbcid) {
                for vote in by_bid.values() {
                    *out.entry(vote.clone()).or_insert(0) += 1;
                }
            }
        }
        out
    }

    /// `rn_c[cid]`: total reported ballots for a contest across every
    /// collection it appears in.
    pub fn rn_c(&self, cid: &ContestId) -> u64 {
        self.rv_cpb
            .get(cid)
            .map(|by_pbcid| by_pbcid.values().map(|by_bid| by_bid.len() as u64).sum())
            .unwrap_or(0)
    }

    /// `rn_p[pbcid]`: total reported ballots in a collection across every
    /// contest on it (a ballot with `n` possible contests is counted once
    /// per contest it's reported for; callers typically intersect with the
    /// manifest's ballot count when they need the ballot-level total).
    pub fn rn_p(&self, pbcid: &CollectionId) -> u64 {
        self.rv_cpb
            .values()
            .filter_map(|by_pbcid| by_pbcid.get(pbcid))
            .map(|by_bid| by_bid.len() as u64)
            .sum()
    }

    /// `rn_cr[cid][rv]`: aggregate count by reported vote across every
    /// collection for a contest.
    pub fn rn_cr(&self, cid: &ContestId) -> BTreeMap<Vote, u64> {
        let mut out = BTreeMap::new();
        if let Some(by_pbcid) = self.rv_cpb.get(cid) {
            for by_bid in by_pbcid.values() {
                for vote in by_bid.values() {
                    *out.entry(vote.clone()).or_insert(0) += 1;
                }
            }
        }
        out
    }

    /// `votes_c[cid]`: the set of all observed reported votes for a contest
    /// (sorted, deduplicated by `BTreeMap` key order).
    pub fn votes_c(&self, cid: &ContestId) -> Vec<Vote> {
        self.rn_cr(cid).into_keys().collect()
    }

    /// Every `pbcid` that carries reported data for `cid`.
    pub fn collections_for_contest(&self, cid: &ContestId) -> Vec<CollectionId> {
        self.rv_cpb
            .get(cid)
            .map(|by_pbcid| by_pbcid.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Sum of `rn_cpr` over every `(pbcid, rv)` pair for `cid`; equals
    /// `rn_c[cid]` by invariant 1 of `spec.md` §3.
    pub fn total_over_strata(&self, cid: &ContestId) -> u64 {
        self.rv_cpb
            .get(cid)
            .map(|by_pbcid| {
                by_pbcid
                    .keys()
                    .map(|pbcid| self.rn_cpr(cid, pbcid).values().sum::<u64>())
                    .sum()
            })
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_core::SelId;

    fn v(s: &str) -> Vote {
        Vote::single(SelId::new(s))
    }

    #[test]
    fn derived_counts_are_consistent() {
        let mut t = ReportedTensor::new();
        let cid = ContestId::new("C1");
        let pbcid = CollectionId::new("P1");
        t.set(&cid, &pbcid, &BallotId::new("b1"), v("Alice"));
        t.set(&cid, &pbcid, &BallotId::new("b2"), v("Alice"));
        t.set(&cid, &pbcid, &BallotId::new("b3"), v("Bob"));

        assert_eq!(t.rn_c(&cid), 3);
        assert_eq!(t.rn_p(&pbcid), 3);
        assert_eq!(t.rn_cpr(&cid, &pbcid)[&v("Alice")], 2);
        assert_eq!(t.rn_cr(&cid)[&v("Bob")], 1);
        assert_eq!(t.total_over_strata(&cid), t.rn_c(&cid));
    }
}
