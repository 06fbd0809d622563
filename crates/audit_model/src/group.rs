//! Contest groups and reachability expansion (`spec.md` §3 "Contest group
//! `gid`" and §9 "Reachability in contest-group graph").

use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use audit_core::{ContestId, GroupId};

/// One entry in a contest group's member list: either a contest or a
/// nested group, expanded by depth-first reachability.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum GroupMember {
    Contest(ContestId),
    Group(GroupId),
}

/// A named list of contest-or-group ids.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContestGroup {
    pub gid: GroupId,
    pub members: Vec<GroupMember>,
}

impl ContestGroup {
    pub fn new(gid: GroupId) -> Self {
        Self { gid, members: Vec::new() }
    }
}

/// Depth-first expansion of `gid` into a flat, duplicate-suppressed,
/// first-occurrence-ordered contest list (`cids_g[gid]`). Cycles are
/// reported via `cycle_warnings` rather than treated as fatal, per §3/§9.
pub fn expand_group(
    gid: &GroupId,
    groups: &BTreeMap<GroupId, ContestGroup>,
    cycle_warnings: &mut Vec<GroupId>,
) -> Vec<ContestId> {
    let mut out = Vec::new();
    let mut seen_cids = BTreeSet::new();
    let mut visiting = BTreeSet::new();
    expand_group_inner(gid, groups, &mut visiting, &mut seen_cids, &mut out, cycle_warnings);
    out
}

fn expand_group_inner(
    gid: &GroupId,
    groups: &BTreeMap<GroupId, ContestGroup>,
    visiting: &mut BTreeSet<GroupId>,
    seen_cids: &mut BTreeSet<ContestId>,
    out: &mut Vec<ContestId>,
    cycle_warnings: &mut Vec<GroupId>,
) {
    if visiting.contains(gid) {
        cycle_warnings.push(gid.clone());
        return;
    }
    let Some(group) = groups.get(gid) else {
        return;
    };
    visiting.insert(gid.clone());
    for member in &group.members {
        match member {
            GroupMember::Contest(cid) => {
                if seen_cids.insert(cid.clone()) {
                    out.push(cid.clone());
                }
            }
            GroupMember::Group(child) => {
                expand_group_inner(child, groups, visiting, seen_cids, out, cycle_warnings);
            }
        }
    }
    visiting.remove(gid);
}

/// Expand every declared group, returning both the per-group flattened
/// contest lists and the accumulated cycle warnings (sorted, deduplicated).
pub fn expand_all_groups(
    groups: &BTreeMap<GroupId, ContestGroup>,
) -> (BTreeMap<GroupId, Vec<ContestId>>, Vec<GroupId>) {
    let mut cids_g = BTreeMap::new();
    let mut warnings = Vec::new();
    for gid in groups.keys() {
        let expanded = expand_group(gid, groups, &mut warnings);
        cids_g.insert(gid.clone(), expanded);
    }
    warnings.sort();
    warnings.dedup();
    (cids_g, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g(gid: &str, members: Vec<GroupMember>) -> (GroupId, ContestGroup) {
        let id = GroupId::new(gid);
        (id.clone(), ContestGroup { gid: id, members })
    }

    #[test]
    fn expands_dfs_order_with_dedup() {
        let mut groups = BTreeMap::new();
        let (id, grp) = g(
            "G1",
            vec![
                GroupMember::Contest(ContestId::new("C1")),
                GroupMember::Group(GroupId::new("G2")),
                GroupMember::Contest(ContestId::new("C1")), // duplicate, suppressed
            ],
        );
        groups.insert(id, grp);
        let (id2, grp2) = g("G2", vec![GroupMember::Contest(ContestId::new("C2"))]);
        groups.insert(id2, grp2);

        let mut warnings = Vec::new();
        let expanded = expand_group(&GroupId::new("G1"), &groups, &mut warnings);
        assert_eq!(expanded, vec![ContestId::new("C1"), ContestId::new("C2")]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn cycle_is_warned_not_fatal() {
        let mut groups = BTreeMap::new();
        let (id_a, grp_a) = g("A", vec![GroupMember::Group(GroupId::new("B"))]);
        groups.insert(id_a, grp_a);
        let (id_b, grp_b) = g(
            "B",
            vec![GroupMember::Contest(ContestId::new("C1")), GroupMember::Group(GroupId::new("A"))],
        );
        groups.insert(id_b, grp_b);

        let (cids_g, warnings) = expand_all_groups(&groups);
        assert_eq!(cids_g[&GroupId::new("A")], vec![ContestId::new("C1")]);
        assert!(warnings.contains(&GroupId::new("A")));
    }
}
