//! Readers for `1-election-spec/*.csv` into an `audit_model::Election`.

use audit_core::{ContestId, GroupId, SelId};
use audit_model::{Collection, Contest, ContestGroup, ContestType, CvrMode, Election, GroupMember, WriteInPolicy};

use crate::csv_util::{read_fixed_table, read_varlen_table};
use crate::errors::IoResult;
use crate::layout::ElectionLayout;

/// `election-spec-general.csv` (Attribute,Value): currently informational;
/// returned as a plain key/value list for callers that want it (election
/// name, jurisdiction, etc. — none of it feeds the statistical core).
pub fn read_general(layout: &ElectionLayout) -> IoResult<Vec<(String, String)>> {
    let path = layout.election_spec_general_csv();
    let table = read_fixed_table(&path, &["Attribute", "Value"])?;
    let attr = table.col("Attribute").unwrap_or(0);
    let val = table.col("Value").unwrap_or(1);
    Ok(table.rows.iter().map(|r| (r.get(attr).to_string(), r.get(val).to_string())).collect())
}

/// `election-spec-contests.csv` (Contest,Contest type,Params,Write-ins,
/// Selections...), varlen on the trailing selections.
pub fn read_contests(layout: &ElectionLayout, election: &mut Election) -> IoResult<()> {
    let path = layout.election_spec_contests_csv();
    let table = read_varlen_table(&path, &["Contest", "Contest type", "Params", "Write-ins"])?;
    let c_contest = table.col("Contest").unwrap_or(0);
    let c_type = table.col("Contest type").unwrap_or(1);
    let c_params = table.col("Params").unwrap_or(2);
    let c_writeins = table.col("Write-ins").unwrap_or(3);

    for row in &table.rows {
        let cid = ContestId::new(row.get(c_contest));
        let contest_type = ContestType::from(row.get(c_type));
        let write_in_policy = if row.get(c_writeins).eq_ignore_ascii_case("yes") {
            WriteInPolicy::Allowed
        } else {
            WriteInPolicy::Disallowed
        };
        let mut contest = Contest::new(cid.clone(), contest_type);
        contest.write_in_policy = write_in_policy;
        if !row.get(c_params).is_empty() {
            contest.params = row.get(c_params).split(';').map(|s| s.trim().to_string()).collect();
        }
        for sel in &row.rest {
            if !sel.is_empty() {
                contest.declared_selids.insert(SelId::new(sel));
            }
        }
        election.contests.insert(cid, contest);
    }
    Ok(())
}

/// `election-spec-contest-groups.csv` (Contest group,Contest(s) or
/// group(s)...), varlen. Members are disambiguated against the contests
/// already loaded: anything matching a known `cid` is a contest member,
/// everything else is a nested group reference.
pub fn read_contest_groups(layout: &ElectionLayout, election: &mut Election) -> IoResult<()> {
    let path = layout.election_spec_contest_groups_csv();
    if !path.exists() {
        return Ok(());
    }
    let table = read_varlen_table(&path, &["Contest group"])?;
    let c_group = table.col("Contest group").unwrap_or(0);

    for row in &table.rows {
        let gid = GroupId::new(row.get(c_group));
        let mut members = Vec::new();
        for entry in &row.rest {
            if entry.is_empty() {
                continue;
            }
            let cid = ContestId::new(entry);
            if election.contests.contains_key(&cid) {
                members.push(GroupMember::Contest(cid));
            } else {
                members.push(GroupMember::Group(GroupId::new(entry)));
            }
        }
        election.groups.insert(gid.clone(), ContestGroup { gid, members });
    }
    Ok(())
}

/// `election-spec-collections.csv` (Collection,Manager,CVR type,Required
/// Contests,Possible Contests). Required/possible contests are given as
/// group ids (possibly singleton groups naming one contest directly).
pub fn read_collections(layout: &ElectionLayout, election: &mut Election) -> IoResult<()> {
    let path = layout.election_spec_collections_csv();
    let table = read_fixed_table(
        &path,
        &["Collection", "Manager", "CVR type", "Required Contests", "Possible Contests"],
    )?;
    let c_coll = table.col("Collection").unwrap_or(0);
    let c_mgr = table.col("Manager").unwrap_or(1);
    let c_cvr = table.col("CVR type").unwrap_or(2);
    let c_req = table.col("Required Contests").unwrap_or(3);
    let c_poss = table.col("Possible Contests").unwrap_or(4);

    for row in &table.rows {
        let pbcid = audit_core::CollectionId::new(row.get(c_coll));
        let cvr_mode = if row.get(c_cvr).eq_ignore_ascii_case("cvr") { CvrMode::Cvr } else { CvrMode::NoCvr };
        let mut coll = Collection::new(pbcid.clone(), cvr_mode);
        coll.manager = row.get(c_mgr).to_string();
        coll.required_gids = split_ids(row.get(c_req));
        coll.possible_gids = split_ids(row.get(c_poss));
        election.collections.insert(pbcid, coll);
    }
    Ok(())
}

fn split_ids(field: &str) -> Vec<GroupId> {
    field.split(';').map(str::trim).filter(|s| !s.is_empty()).map(GroupId::new).collect()
}

/// Load the full `1-election-spec/` tree into a fresh `Election`.
pub fn read_election_spec(layout: &ElectionLayout) -> IoResult<Election> {
    let mut election = Election::new();
    read_contests(layout, &mut election)?;
    read_contest_groups(layout, &mut election)?;
    read_collections(layout, &mut election)?;
    Ok(election)
}
