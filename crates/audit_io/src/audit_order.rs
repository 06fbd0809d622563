//! The per-collection audit-order artefact: the Fisher–Yates shuffle of a
//! collection's ballot manifest, written once and sliced by the stage loop
//! to derive each stage's drawn sample.

use std::path::Path;

use audit_core::{AuditSeed, BallotId, CollectionId};

use crate::csv_util::write_table;
use crate::errors::IoResult;
use crate::layout::{greatest_versioned, ElectionLayout};

/// Compute the audit order for `pbcid` from its manifest order and write it
/// to `32-audit-orders/audit-order-<pbcid>-<stamp>.csv` (one ballot id per
/// row, in shuffled order).
pub fn make_audit_order(
    layout: &ElectionLayout,
    seed: &AuditSeed,
    pbcid: &CollectionId,
    manifest_bids: &[BallotId],
    stamp: &str,
) -> IoResult<Vec<BallotId>> {
    let shuffled = audit_core::audit_order(seed, pbcid.as_str(), manifest_bids.to_vec());
    let path = layout.audit_order_csv(pbcid.as_str(), stamp);
    let rows: Vec<Vec<String>> = shuffled.iter().map(|b| vec![b.as_str().to_string()]).collect();
    write_table(&path, &["Ballot id"], &rows)?;
    Ok(shuffled)
}

/// Read back a previously written audit-order file.
pub fn read_audit_order(path: &Path) -> IoResult<Vec<BallotId>> {
    let table = crate::csv_util::read_fixed_table(path, &["Ballot id"])?;
    Ok(table.rows.iter().map(|r| BallotId::new(r.get(0))).collect())
}

/// Locate the most recent audit-order file for `pbcid` at or before
/// `max_stamp`.
pub fn latest_audit_order_path(
    layout: &ElectionLayout,
    pbcid: &CollectionId,
    max_stamp: Option<&str>,
) -> IoResult<std::path::PathBuf> {
    let dir = layout.audit_orders_dir();
    greatest_versioned(&dir, &format!("audit-order-{pbcid}-"), ".csv", max_stamp)
}
