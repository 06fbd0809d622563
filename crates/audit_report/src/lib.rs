//! Offline report model and renderers for one stage of the audit, or the
//! whole run (`spec.md` §7 "User-visible behaviour").
//!
//! This crate reads only already-computed in-memory state (an `Election`
//! plus a `StageOutcome`) and never touches the filesystem or a clock —
//! rendering is pure so the same stage always prints the same report.

use std::collections::BTreeMap;

use audit_core::{CollectionId, ContestId, MeasurementId, StageTime, Vote};
use audit_model::{Election, MeasurementStatus};
use audit_pipeline::StageOutcome;

#[cfg(feature = "render_json")]
use serde::Serialize;

/// One measurement's reported line: `mid contest method mode Risk=r
/// (limits α,β) status`.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "render_json", derive(Serialize))]
pub struct MeasurementLine {
    pub mid: MeasurementId,
    pub cid: ContestId,
    pub method: String,
    pub mode: String,
    pub risk: f64,
    pub risk_limit: f64,
    pub upset_threshold: f64,
    pub status: MeasurementStatus,
}

impl MeasurementLine {
    /// `M1 C1 Bayes Active Risk=0.0123 (limits 0.05,0.98) Open`
    pub fn to_line(&self) -> String {
        format!(
            "{} {} {} {} Risk={:.4} (limits {},{}) {}",
            self.mid, self.cid, self.method, self.mode, self.risk, self.risk_limit, self.upset_threshold,
            self.status.as_str()
        )
    }
}

/// One collection's actual-vs-reported vote counts at this stage: the
/// reported tally for the contest restricted to this stratum, and the
/// audited tally drawn so far.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "render_json", derive(Serialize))]
pub struct StratumCounts {
    pub pbcid: CollectionId,
    pub sample_size: u64,
    pub target_sample_size: u64,
    /// Keyed by `Vote`'s display form (`"(Alice)"`), not `Vote` itself —
    /// JSON object keys must be strings.
    pub reported: BTreeMap<String, u64>,
    pub actual: BTreeMap<String, u64>,
}

fn stringify_votes(tally: BTreeMap<Vote, u64>) -> BTreeMap<String, u64> {
    tally.into_iter().map(|(v, n)| (v.to_string(), n)).collect()
}

/// Why the run stopped, for the completion block (§7).
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "render_json", derive(Serialize))]
pub enum TerminationReason {
    AllMeasurementsTerminal,
    TimeExceeded,
    StillRunning,
}

impl TerminationReason {
    pub fn as_str(self) -> &'static str {
        match self {
            TerminationReason::AllMeasurementsTerminal => "all measurements reached a terminal status",
            TerminationReason::TimeExceeded => "max_stage_time exceeded",
            TerminationReason::StillRunning => "still running",
        }
    }
}

/// The full report for one stage: its target sample sizes, per-stratum
/// counts, per-measurement lines, and the election-wide status summary.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "render_json", derive(Serialize))]
pub struct StageReport {
    pub stage_time: StageTime,
    pub targets: BTreeMap<CollectionId, u64>,
    pub strata: Vec<StratumCounts>,
    pub measurements: Vec<MeasurementLine>,
    pub status_summary: BTreeMap<String, usize>,
    pub termination: TerminationReason,
}

/// Build a `StageReport` from the election state and the just-completed
/// stage's outcome.
pub fn build_stage_report(election: &Election, outcome: &StageOutcome, termination: TerminationReason) -> StageReport {
    let t = &outcome.stage_time;

    let mut strata = Vec::new();
    for pbcid in election.collections.keys() {
        let cids = election.possible_cids_for(pbcid);
        let Some(cid) = cids.iter().next() else { continue };
        strata.push(StratumCounts {
            pbcid: pbcid.clone(),
            sample_size: election.samples.sn_tp_for(t, pbcid),
            target_sample_size: outcome.plan.get(pbcid).copied().unwrap_or(0),
            reported: stringify_votes(election.reported.rn_cpr(cid, pbcid)),
            actual: stringify_votes(election.samples.sn_tcpr(t, cid, pbcid)),
        });
    }

    let measurements: Vec<MeasurementLine> = election
        .measurements
        .iter()
        .map(|(mid, m)| MeasurementLine {
            mid: mid.clone(),
            cid: m.cid.clone(),
            method: format!("{:?}", m.risk_method),
            mode: format!("{:?}", m.sampling_mode),
            risk: outcome.risks.get(mid).copied().unwrap_or(f64::NAN),
            risk_limit: m.risk_limit,
            upset_threshold: m.upset_threshold,
            status: outcome.statuses.get(mid).copied().unwrap_or(m.status),
        })
        .collect();

    let mut status_summary: BTreeMap<String, usize> = BTreeMap::new();
    for line in &measurements {
        *status_summary.entry(line.status.as_str().to_string()).or_insert(0) += 1;
    }

    StageReport { stage_time: t.clone(), targets: outcome.plan.clone(), strata, measurements, status_summary, termination }
}

/// Render the report exactly as the stage loop prints it to the console
/// (§7): target sizes, per-stratum counts, per-measurement lines, the
/// status summary, and (if the run ended) a completion block.
pub fn render_text(report: &StageReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("stage {}\n", report.stage_time));

    out.push_str("targets:\n");
    for (pbcid, n) in &report.targets {
        out.push_str(&format!("  {pbcid}: {n}\n"));
    }

    out.push_str("strata:\n");
    for s in &report.strata {
        out.push_str(&format!(
            "  {} sampled={}/{} reported={:?} actual={:?}\n",
            s.pbcid, s.sample_size, s.target_sample_size, s.reported, s.actual
        ));
    }

    out.push_str("measurements:\n");
    for m in &report.measurements {
        out.push_str(&format!("  {}\n", m.to_line()));
    }

    out.push_str("status summary:\n");
    for (status, count) in &report.status_summary {
        out.push_str(&format!("  {status}: {count}\n"));
    }

    if report.termination != TerminationReason::StillRunning {
        out.push_str(&format!("complete: {}\n", report.termination.as_str()));
    }

    out
}

#[cfg(feature = "render_json")]
pub fn render_json(report: &StageReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_core::{BallotId, GroupId, SelId};
    use audit_model::{Collection, Contest, ContestGroup, ContestType, CvrMode, GroupMember, Measurement};
    use audit_pipeline::StageOutcome;

    fn sample_report() -> (Election, StageOutcome) {
        let mut e = Election::new();
        let cid = ContestId::new("C1");
        e.contests.insert(cid.clone(), Contest::new(cid.clone(), ContestType::Plurality));

        let pbcid = CollectionId::new("P1");
        let mut coll = Collection::new(pbcid.clone(), CvrMode::Cvr);
        coll.possible_gids.push(GroupId::new("G1"));
        coll.bids = vec![BallotId::new("b1"), BallotId::new("b2")];
        e.collections.insert(pbcid.clone(), coll);

        e.groups.insert(
            GroupId::new("G1"),
            ContestGroup { gid: GroupId::new("G1"), members: vec![GroupMember::Contest(cid.clone())] },
        );

        e.reported.set(&cid, &pbcid, &BallotId::new("b1"), Vote::single(SelId::new("Alice")));
        e.reported.set(&cid, &pbcid, &BallotId::new("b2"), Vote::single(SelId::new("Bob")));

        let mid = MeasurementId::new("M1");
        e.measurements.insert(mid.clone(), Measurement::new(mid.clone(), cid, 0.05, 0.98));

        let t = StageTime::parse("2026-01-01-00-00-00").unwrap();
        let mut risks = BTreeMap::new();
        risks.insert(mid.clone(), 0.01);
        let mut statuses = BTreeMap::new();
        statuses.insert(mid, MeasurementStatus::Passed);
        let mut plan = BTreeMap::new();
        plan.insert(pbcid, 2);

        (e, StageOutcome { stage_time: t, risks, statuses, plan })
    }

    #[test]
    fn text_report_includes_measurement_line_and_status_summary() {
        let (election, outcome) = sample_report();
        let report = build_stage_report(&election, &outcome, TerminationReason::AllMeasurementsTerminal);
        let text = render_text(&report);
        assert!(text.contains("M1 C1"));
        assert!(text.contains("Passed: 1"));
        assert!(text.contains("complete: all measurements reached a terminal status"));
    }

    #[cfg(feature = "render_json")]
    #[test]
    fn json_report_round_trips_through_serde() {
        let (election, outcome) = sample_report();
        let report = build_stage_report(&election, &outcome, TerminationReason::StillRunning);
        let json = render_json(&report).unwrap();
        assert!(json.contains("\"stage_time\""));
    }
}
