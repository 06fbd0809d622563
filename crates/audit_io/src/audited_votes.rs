//! Reader for `33-audited-votes/audited-votes-<pbcid>.csv`: the
//! hand-examined vote for each inspected ballot, accumulated into
//! `Election::audited` across stages (§3 "Audited tensor").

use audit_core::{BallotId, CollectionId, ContestId, SelId, Vote};
use audit_model::Election;

use crate::csv_util::read_varlen_table;
use crate::errors::IoResult;
use crate::layout::ElectionLayout;

/// `audited-votes-<pbcid>.csv` (Collection,Ballot id,Contest,
/// Selections...), varlen.
pub fn read_audited_votes(layout: &ElectionLayout, election: &mut Election, pbcid: &CollectionId) -> IoResult<()> {
    let path = layout.audited_votes_csv(pbcid.as_str());
    if !path.exists() {
        return Ok(());
    }
    let table = read_varlen_table(&path, &["Collection", "Ballot id", "Contest"])?;
    let c_bid = table.col("Ballot id").unwrap_or(1);
    let c_contest = table.col("Contest").unwrap_or(2);

    for row in &table.rows {
        let bid = BallotId::new(row.get(c_bid));
        let cid = ContestId::new(row.get(c_contest));
        let sels: Vec<SelId> = row.rest.iter().filter(|s| !s.is_empty()).map(|s| SelId::new(s)).collect();
        election.audited.set(&cid, pbcid, &bid, Vote::new(sels));
    }
    Ok(())
}

/// Read audited votes for every collection currently in `election`.
pub fn read_all_audited_votes(layout: &ElectionLayout, election: &mut Election) -> IoResult<()> {
    let pbcids: Vec<CollectionId> = election.collections.keys().cloned().collect();
    for pbcid in &pbcids {
        read_audited_votes(layout, election, pbcid)?;
    }
    Ok(())
}
