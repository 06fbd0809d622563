//! The audited-vote tensor and sample tallies (`spec.md` §3 "Audited
//! tensor", "Sample tallies").

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use audit_core::{BallotId, CollectionId, ContestId, SelId, StageTime, Vote};

/// `av_cpb[cid][pbcid][bid] -> vote`: the hand-examined vote for every
/// ballot inspected so far. Missing entries default to `(-NoSuchContest,)`
/// per invariant 6, handled by `get_or_default`.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AuditedTensor {
    pub av_cpb: BTreeMap<ContestId, BTreeMap<CollectionId, BTreeMap<BallotId, Vote>>>,
}

impl AuditedTensor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, cid: &ContestId, pbcid: &CollectionId, bid: &BallotId, vote: Vote) {
        self.av_cpb
            .entry(cid.clone())
            .or_default()
            .entry(pbcid.clone())
            .or_default()
            .insert(bid.clone(), vote);
    }

    pub fn get(&self, cid: &ContestId, pbcid: &CollectionId, bid: &BallotId) -> Option<&Vote> {
        self.av_cpb.get(cid)?.get(pbcid)?.get(bid)
    }

    /// The audited vote for an inspected ballot, defaulting to
    /// `(-NoSuchContest,)` when no audited record was supplied.
    pub fn get_or_default(&self, cid: &ContestId, pbcid: &CollectionId, bid: &BallotId) -> Vote {
        self.get(cid, pbcid, bid)
            .cloned()
            .unwrap_or_else(|| Vote::single(SelId::no_such_contest()))
    }
}

/// Per-stage sample tallies: `sn_tcpra`, its `rv`-marginal `sn_tcpr`, and
/// the per-collection ballot count `sn_tp`.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SampleTallies {
    /// `sn_tcpra[t][cid][pbcid][rv][av]`.
    pub sn_tcpra: BTreeMap<
        StageTime,
        BTreeMap<ContestId, BTreeMap<CollectionId, BTreeMap<Vote, BTreeMap<Vote, u64>>>>,
    >,
    /// `sn_tp[t][pbcid]`.
    pub sn_tp: BTreeMap<StageTime, BTreeMap<CollectionId, u64>>,
}

impl SampleTallies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        t: &StageTime,
        cid: &ContestId,
        pbcid: &CollectionId,
        rv: Vote,
        av: Vote,
    ) {
        *self
            .sn_tcpra
            .entry(t.clone())
            .or_default()
            .entry(cid.clone())
            .or_default()
            .entry(pbcid.clone())
            .or_default()
            .entry(rv)
            .or_default()
            .entry(av)
            .or_insert(0) += 1;
    }

    /// `sn_tcpr[t][cid][pbcid][rv]`: marginal over actual vote.
    pub fn sn_tcpr(&self, t: &StageTime, cid: &ContestId, pbcid: &CollectionId) -> BTreeMap<Vote, u64> {
        let mut out = BTreeMap::new();
        if let Some(by_rv) = self
            .sn_tcpra
            .get(t)
            .and_then(|m| m.get(cid))
            .and_then(|m| m.get(pbcid))
        {
            for (rv, by_av) in by_rv {
                out.insert(rv.clone(), by_av.values().sum());
            }
        }
        out
    }

    /// The full per-`av` tally for one `(t, cid, pbcid, rv)` stratum.
    pub fn sample_tally_for_stratum(
        &self,
        t: &StageTime,
        cid: &ContestId,
        pbcid: &CollectionId,
        rv: &Vote,
    ) -> BTreeMap<Vote, u64> {
        self.sn_tcpra
            .get(t)
            .and_then(|m| m.get(cid))
            .and_then(|m| m.get(pbcid))
            .and_then(|m| m.get(rv))
            .cloned()
            .unwrap_or_default()
    }

    pub fn sn_tp_for(&self, t: &StageTime, pbcid: &CollectionId) -> u64 {
        self.sn_tp.get(t).and_then(|m| m.get(pbcid)).copied().unwrap_or(0)
    }

    pub fn set_sn_tp(&mut self, t: &StageTime, pbcid: &CollectionId, n: u64) {
        self.sn_tp.entry(t.clone()).or_default().insert(pbcid.clone(), n);
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
    fn audited_tensor_defaults_missing_entries() {
        let t = AuditedTensor::new();
        let cid = ContestId::new("C1");
        let pbcid = CollectionId::new("P1");
        let bid = BallotId::new("b1");
        assert_eq!(t.get_or_default(&cid, &pbcid, &bid), Vote::single(SelId::no_such_contest()));
    }

    #[test]
    fn sample_tallies_record_and_marginalize() {
        let mut st = SampleTallies::new();
        let t = StageTime::initial();
        let cid = ContestId::new("C1");
        let pbcid = CollectionId::new("P1");
        st.record(&t, &cid, &pbcid, v("Alice"), v("Alice"));
        st.record(&t, &cid, &pbcid, v("Alice"), v("Bob"));
        let marginal = st.sn_tcpr(&t, &cid, &pbcid);
        assert_eq!(marginal[&v("Alice")], 2);
    }
}
