//! The sample plan (`spec.md` §3 "Plan").

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use audit_core::{CollectionId, StageTime};

/// `plan_tp[t][pbcid]`: target cumulative sample size for `pbcid` after the
/// next draw.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Plan {
    pub plan_tp: BTreeMap<StageTime, BTreeMap<CollectionId, u64>>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, t: &StageTime, pbcid: &CollectionId) -> Option<u64> {
        self.plan_tp.get(t).and_then(|m| m.get(pbcid)).copied()
    }

    pub fn set(&mut self, t: &StageTime, pbcid: &CollectionId, n: u64) {
        self.plan_tp.entry(t.clone()).or_default().insert(pbcid.clone(), n);
    }

    pub fn for_stage(&self, t: &StageTime) -> BTreeMap<CollectionId, u64> {
        self.plan_tp.get(t).cloned().unwrap_or_default()
    }

    /// The plan recorded at the greatest stage time strictly before `t` —
    /// "the target cumulative sample size to draw up to this stage",
    /// i.e. the previous stage's plan becoming this stage's draw target.
    pub fn latest_before(&self, t: &StageTime) -> BTreeMap<CollectionId, u64> {
        self.plan_tp.range(..t.clone()).next_back().map(|(_, m)| m.clone()).unwrap_or_default()
    }
}
