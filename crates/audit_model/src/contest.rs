//! Contest definitions (`spec.md` §3, "Contest `cid`").

use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use audit_core::{ContestId, SelId};

/// The social-choice rule a contest is tabulated under. `Plurality` is the
/// only rule the kernel and oracle are required to evaluate; `Other` carries
/// an opaque name through so the architecture stays pluggable (§4.2) without
/// the model needing to know about every rule in advance.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ContestType {
    Plurality,
    Other(String),
}

impl ContestType {
    pub fn as_str(&self) -> &str {
        match self {
            ContestType::Plurality => "plurality",
            ContestType::Other(s) => s.as_str(),
        }
    }
}

impl From<&str> for ContestType {
    fn from(s: &str) -> Self {
        match s {
            "plurality" => ContestType::Plurality,
            other => ContestType::Other(other.to_string()),
        }
    }
}

/// Whether write-in selections (`+`-prefixed selids) are accepted for a
/// contest.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum WriteInPolicy {
    Allowed,
    Disallowed,
}

/// A contest under audit: its type, any opaque tabulation parameters, its
/// write-in policy, and the set of declared (non-write-in) selections.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Contest {
    pub cid: ContestId,
    pub contest_type: ContestType,
    /// Opaque parameters for the contest type (e.g. number of seats for a
    /// rule this crate doesn't know about). Plurality ignores this.
    pub params: Vec<String>,
    pub write_in_policy: WriteInPolicy,
    pub declared_selids: BTreeSet<SelId>,
}

impl Contest {
    pub fn new(cid: ContestId, contest_type: ContestType) -> Self {
        Self {
            cid,
            contest_type,
            params: Vec::new(),
            write_in_policy: WriteInPolicy::Disallowed,
            declared_selids: BTreeSet::new(),
        }
    }

    pub fn accepts_write_ins(&self) -> bool {
        matches!(self.write_in_policy, WriteInPolicy::Allowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contest_type_round_trips_plurality() {
        assert_eq!(ContestType::from("plurality"), ContestType::Plurality);
        assert_eq!(ContestType::Plurality.as_str(), "plurality");
    }

    #[test]
    fn unknown_contest_type_is_preserved_opaquely() {
        let t = ContestType::from("irv");
        assert_eq!(t.as_str(), "irv");
        assert_ne!(t, ContestType::Plurality);
    }
}
