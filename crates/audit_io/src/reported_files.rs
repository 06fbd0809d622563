//! Readers for `2-reported/*` into `Election::collections` (manifests) and
//! `Election::reported`/`reported_outcomes` (CVRs and outcomes).

use audit_core::{BallotId, CollectionId, ContestId, SelId, Vote};
use audit_model::{BallotMeta, Election};

use crate::csv_util::{read_fixed_table, read_varlen_table};
use crate::errors::IoResult;
use crate::layout::ElectionLayout;

/// `manifest-<pbcid>.csv` (Collection,Box,Position,Stamp,Ballot id,Number
/// of ballots,Required Contests,Possible Contests,Comments). One row names
/// one ballot (or, via "Number of ballots" > 1, an anonymous batch —
/// batches are expanded into synthetic sequential ballot ids so every entry
/// in `bids_p[pbcid]` stays individually addressable).
pub fn read_manifest(layout: &ElectionLayout, election: &mut Election, pbcid: &CollectionId) -> IoResult<()> {
    let path = layout.manifest_csv(pbcid.as_str());
    let table = read_fixed_table(
        &path,
        &["Collection", "Box", "Position", "Stamp", "Ballot id", "Number of ballots"],
    )?;
    let c_box = table.col("Box").unwrap_or(1);
    let c_pos = table.col("Position").unwrap_or(2);
    let c_stamp = table.col("Stamp").unwrap_or(3);
    let c_bid = table.col("Ballot id").unwrap_or(4);
    let c_n = table.col("Number of ballots").unwrap_or(5);
    let c_comments = table.col("Comments");

    let Some(coll) = election.collections.get_mut(pbcid) else {
        return Ok(());
    };

    for row in &table.rows {
        let n: u64 = row.get(c_n).parse().unwrap_or(1).max(1);
        let base = row.get(c_bid);
        for i in 0..n {
            let bid = if n == 1 { BallotId::new(base) } else { BallotId::new(format!("{base}-{i}")) };
            let meta = BallotMeta {
                box_label: row.get(c_box).to_string(),
                position: row.get(c_pos).to_string(),
                stamp: row.get(c_stamp).to_string(),
                comments: c_comments.map(|c| row.get(c).to_string()).unwrap_or_default(),
            };
            coll.ballot_meta.insert(bid.clone(), meta);
            coll.bids.push(bid);
        }
    }
    Ok(())
}

/// `reported-cvrs-<pbcid>.csv` (Collection,Scanner,Ballot id,Contest,
/// Selections...), varlen on the trailing selections.
pub fn read_reported_cvrs(layout: &ElectionLayout, election: &mut Election, pbcid: &CollectionId) -> IoResult<()> {
    let path = layout.reported_cvrs_csv(pbcid.as_str());
    if !path.exists() {
        return Ok(());
    }
    let table = read_varlen_table(&path, &["Collection", "Ballot id", "Contest"])?;
    let c_bid = table.col("Ballot id").unwrap_or(2);
    let c_contest = table.col("Contest").unwrap_or(3);

    for row in &table.rows {
        let bid = BallotId::new(row.get(c_bid));
        let cid = ContestId::new(row.get(c_contest));
        let vote = selids_to_vote(&row.rest);
        election.reported.set(&cid, pbcid, &bid, vote);
    }
    Ok(())
}

/// `23-reported-outcomes.csv` (Contest,Winner(s)...), varlen.
pub fn read_reported_outcomes(layout: &ElectionLayout, election: &mut Election) -> IoResult<()> {
    let path = layout.reported_outcomes_csv();
    let table = read_varlen_table(&path, &["Contest"])?;
    let c_contest = table.col("Contest").unwrap_or(0);

    for row in &table.rows {
        let cid = ContestId::new(row.get(c_contest));
        let vote = selids_to_vote(&row.rest);
        election.reported_outcomes.insert(cid, vote);
    }
    Ok(())
}

fn selids_to_vote(rest: &[String]) -> Vote {
    let sels: Vec<SelId> = rest.iter().filter(|s| !s.is_empty()).map(|s| SelId::new(s)).collect();
    Vote::new(sels)
}

/// Load every manifest and CVR file for the collections already present in
/// `election` (from `read_election_spec`), plus the shared outcomes file.
pub fn read_all_reported(layout: &ElectionLayout, election: &mut Election) -> IoResult<()> {
    let pbcids: Vec<CollectionId> = election.collections.keys().cloned().collect();
    for pbcid in &pbcids {
        read_manifest(layout, election, pbcid)?;
        read_reported_cvrs(layout, election, pbcid)?;
    }
    read_reported_outcomes(layout, election)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_model::{Collection, CvrMode};
    use std::path::Path;

    fn write(dir: &Path, rel: &str, contents: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn manifest_expands_ballot_batches() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ElectionLayout::new(dir.path(), "e1");
        write(
            &layout.root,
            "2-reported/21-reported-ballot-manifests/manifest-P1.csv",
            "Collection,Box,Position,Stamp,Ballot id,Number of ballots,Required Contests,Possible Contests,Comments\n\
             P1,B1,1,S1,b,3,,,\n",
        );
        let mut election = Election::new();
        let pbcid = CollectionId::new("P1");
        election.collections.insert(pbcid.clone(), Collection::new(pbcid.clone(), CvrMode::Cvr));
        read_manifest(&layout, &mut election, &pbcid).unwrap();
        assert_eq!(election.collections[&pbcid].bids.len(), 3);
    }

    #[test]
    fn cvr_and_outcomes_build_votes() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ElectionLayout::new(dir.path(), "e1");
        write(
            &layout.root,
            "2-reported/22-reported-cvrs/reported-cvrs-P1.csv",
            "Collection,Scanner,Ballot id,Contest,Selections\nP1,S1,b1,C1,Alice\n",
        );
        write(&layout.root, "2-reported/23-reported-outcomes.csv", "Contest,Winner(s)\nC1,Alice\n");

        let mut election = Election::new();
        let pbcid = CollectionId::new("P1");
        election.collections.insert(pbcid.clone(), Collection::new(pbcid.clone(), CvrMode::Cvr));
        read_reported_cvrs(&layout, &mut election, &pbcid).unwrap();
        read_reported_outcomes(&layout, &mut election).unwrap();

        let cid = ContestId::new("C1");
        assert_eq!(election.reported.get(&cid, &pbcid, &BallotId::new("b1")), Some(&Vote::single(SelId::new("Alice"))));
        assert_eq!(election.reported_outcomes[&cid], Vote::single(SelId::new("Alice")));
    }
}
