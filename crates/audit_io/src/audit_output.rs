//! Writers for `34-audit-output/audit-output-{contest,collection}-status-
//! <stage_time>.csv` — the per-stage human/machine-readable status report
//! (the saved-state JSON snapshot lives in `saved_state`).

use audit_core::{MeasurementId, StageTime};
use audit_model::{Election, MeasurementStatus};

use crate::csv_util::write_table;
use crate::errors::IoResult;
use crate::layout::ElectionLayout;

/// One row per measurement: mid, contest, method, mode, risk, limit,
/// upset threshold, status.
pub fn write_contest_status(layout: &ElectionLayout, election: &Election, t: &StageTime, risk_tm: &std::collections::BTreeMap<MeasurementId, f64>) -> IoResult<()> {
    let path = layout.contest_status_csv(t.as_str());
    let header = [
        "Measurement id",
        "Contest",
        "Risk Measurement Method",
        "Sampling Mode",
        "Risk",
        "Risk Limit",
        "Risk Upset Threshold",
        "Status",
    ];
    let mut rows = Vec::new();
    for (mid, m) in &election.measurements {
        let risk = risk_tm.get(mid).copied();
        rows.push(vec![
            mid.to_string(),
            m.cid.to_string(),
            format!("{:?}", m.risk_method),
            format!("{:?}", m.sampling_mode),
            risk.map(|r| format!("{r:.6}")).unwrap_or_default(),
            m.risk_limit.to_string(),
            m.upset_threshold.to_string(),
            m.status.as_str().to_string(),
        ]);
    }
    write_table(&path, &header, &rows)
}

/// One row per collection: pbcid, sampled count, plan target, manifest
/// size.
pub fn write_collection_status(
    layout: &ElectionLayout,
    election: &Election,
    t: &StageTime,
) -> IoResult<()> {
    let path = layout.collection_status_csv(t.as_str());
    let header = ["Collection", "Sampled", "Plan", "Manifest Size"];
    let mut rows = Vec::new();
    for (pbcid, coll) in &election.collections {
        let sampled = election.samples.sn_tp_for(t, pbcid);
        let plan = election.plan.get(t, pbcid).unwrap_or(0);
        rows.push(vec![
            pbcid.to_string(),
            sampled.to_string(),
            plan.to_string(),
            coll.ballot_count().to_string(),
        ]);
    }
    write_table(&path, &header, &rows)
}

/// The election-wide status summary: the sorted distinct set of
/// measurement statuses present at stage `t` (§4.6 `election_status[t]`).
pub fn election_status(election: &Election) -> Vec<MeasurementStatus> {
    let mut statuses: Vec<MeasurementStatus> = election.measurements.values().map(|m| m.status).collect();
    statuses.sort();
    statuses.dedup();
    statuses
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_core::ContestId;
    use audit_model::{Collection, Contest, ContestType, CvrMode, Measurement};
    use std::collections::BTreeMap;

    fn sample_election() -> Election {
        let mut e = Election::new();
        let cid = ContestId::new("C1");
        e.contests.insert(cid.clone(), Contest::new(cid.clone(), ContestType::Plurality));
        let pbcid = CollectionId::new("P1");
        e.collections.insert(pbcid, Collection::new(CollectionId::new("P1"), CvrMode::Cvr));
        let mid = MeasurementId::new("M1");
        e.measurements.insert(mid, Measurement::new(MeasurementId::new("M1"), cid, 0.05, 0.98));
        e
    }

    #[test]
    fn writes_contest_and_collection_status() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ElectionLayout::new(dir.path(), "e1");
        let election = sample_election();
        let t = StageTime::initial();
        let mut risk = BTreeMap::new();
        risk.insert(MeasurementId::new("M1"), 0.02);

        write_contest_status(&layout, &election, &t, &risk).unwrap();
        write_collection_status(&layout, &election, &t).unwrap();

        assert!(layout.contest_status_csv(t.as_str()).exists());
        assert!(layout.collection_status_csv(t.as_str()).exists());
    }

    #[test]
    fn election_status_is_sorted_and_deduped() {
        let mut e = sample_election();
        let mid2 = MeasurementId::new("M2");
        e.measurements.insert(mid2, Measurement::new(MeasurementId::new("M2"), ContestId::new("C1"), 0.05, 0.98));
        let statuses = election_status(&e);
        assert_eq!(statuses, vec![MeasurementStatus::Open]);
    }
}
