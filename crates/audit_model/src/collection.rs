//! Paper-ballot collection definitions (`spec.md` §3, "Collection `pbcid`").

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use audit_core::{BallotId, CollectionId, GroupId};

/// Whether a collection carries comparison (CVR) evidence or is audited by
/// ballot-polling alone.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CvrMode {
    Cvr,
    NoCvr,
}

/// Manifest metadata for one ballot: its physical location and identifying
/// stamp, carried through for provenance but not consulted by the
/// statistical core.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BallotMeta {
    pub box_label: String,
    pub position: String,
    pub stamp: String,
    pub comments: String,
}

/// A paper-ballot collection (`pbcid`): manager, CVR mode, the contest
/// groups it is required/possible for, its audit-rate cap, and the ordered
/// ballot manifest `bids_p[pbcid]`.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Collection {
    pub pbcid: CollectionId,
    pub manager: String,
    pub cvr_mode: CvrMode,
    pub required_gids: Vec<GroupId>,
    pub possible_gids: Vec<GroupId>,
    pub max_audit_rate: u64,
    /// Manifest order; this is the population the audit-order shuffle
    /// (§4.3) permutes.
    pub bids: Vec<BallotId>,
    pub ballot_meta: BTreeMap<BallotId, BallotMeta>,
}

impl Collection {
    pub fn new(pbcid: CollectionId, cvr_mode: CvrMode) -> Self {
        Self {
            pbcid,
            manager: String::new(),
            cvr_mode,
            required_gids: Vec::new(),
            possible_gids: Vec::new(),
            max_audit_rate: 0,
            bids: Vec::new(),
            ballot_meta: BTreeMap::new(),
        }
    }

    pub fn ballot_count(&self) -> usize {
        self.bids.len()
    }
}
