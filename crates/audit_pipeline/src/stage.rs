//! The stage loop (`spec.md` §4.6): draw, measure, decide statuses, plan,
//! persist, repeat until every measurement is terminal-or-inactive or the
//! run has passed its time budget.

use std::collections::BTreeMap;

use audit_core::{AuditSeed, CollectionId, MeasurementId, StageTime};
use audit_model::{Election, MeasurementStatus};
use audit_algo::{compute_plan, compute_risk, OracleRegistry, PlannerConfig, DEFAULT_N_TRIALS};
use audit_io::layout::ElectionLayout;
use audit_io::{audit_output, audited_votes, saved_state};
use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;
use tracing::info;

use crate::errors::{StageError, StageResult};

/// Configuration for a full run of the stage loop.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub max_stage_time: Option<StageTime>,
    pub n_trials: u64,
    pub planner: PlannerConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { max_stage_time: None, n_trials: DEFAULT_N_TRIALS, planner: PlannerConfig::default() }
    }
}

/// Outcome of one completed stage: the new risks, statuses, and plan, kept
/// alongside the stage time they were computed at for reporting.
pub struct StageOutcome {
    pub stage_time: StageTime,
    pub risks: BTreeMap<MeasurementId, f64>,
    pub statuses: BTreeMap<MeasurementId, MeasurementStatus>,
    pub plan: BTreeMap<CollectionId, u64>,
}

/// Write the `stage_time = "0000-00-00-00-00-00"` snapshot before any
/// ballots are drawn. `plan_tp` is seeded from each collection's
/// `max_audit_rate`, not zero, per §4.8.
pub fn write_initial_saved_state(
    layout: &ElectionLayout,
    election: &mut Election,
    max_audit_rate_p: &BTreeMap<CollectionId, u64>,
) -> StageResult<()> {
    let state = saved_state::initial_saved_state(election, max_audit_rate_p);
    for (pbcid, &n) in &state.plan_tp {
        election.plan.set(&state.stage_time, pbcid, n);
    }
    saved_state::write_saved_state(layout, &state)?;
    Ok(())
}

/// Derive `sn_tcpra`/`sn_tcpr`/`sn_tp` at stage `t` by slicing the first
/// `plan_tp[pbcid]` entries of each collection's audit order and looking
/// up the audited vote (defaulting to `(-NoSuchContest,)`) for every
/// sliced ballot (§4.3 "Draw semantics").
pub fn draw_sample(
    election: &mut Election,
    audit_order: &BTreeMap<CollectionId, Vec<audit_core::BallotId>>,
    t: &StageTime,
    plan_tp: &BTreeMap<CollectionId, u64>,
) {
    let pbcids: Vec<CollectionId> = election.collections.keys().cloned().collect();
    for pbcid in &pbcids {
        let target = plan_tp.get(pbcid).copied().unwrap_or(0) as usize;
        let Some(order) = audit_order.get(pbcid) else { continue };
        let slice = &order[..target.min(order.len())];

        let cids: Vec<_> = election.possible_cids_for(pbcid).into_iter().collect();
        for bid in slice {
            for cid in &cids {
                let rv = election.reported.get(cid, pbcid, bid).cloned().unwrap_or_default();
                let av = election.audited.get_or_default(cid, pbcid, bid);
                election.samples.record(t, cid, pbcid, rv, av);
            }
        }
        election.samples.set_sn_tp(t, pbcid, slice.len() as u64);
    }
}

/// Compute `risk_tm[t][mid]` for every measurement (§4.5).
pub fn compute_risks(
    election: &Election,
    oracle: &OracleRegistry,
    t: &StageTime,
    n_trials: u64,
    rng: &mut ChaCha20Rng,
) -> StageResult<BTreeMap<MeasurementId, f64>> {
    let mut risks = BTreeMap::new();
    for mid in election.measurements.keys() {
        let risk = compute_risk(election, oracle, mid, t, n_trials, rng)?;
        risks.insert(mid.clone(), risk);
    }
    Ok(risks)
}

/// Advance every currently-`Open` measurement's status per the stage state
/// machine (§4.6): exhausted if every pbcid in the whole election is fully
/// sampled, else passed/upset by threshold, else remains open.
///
/// Exhaustion is checked across *every* collection in the election, not
/// only those possible for the measurement's own contest — this preserves
/// the source's (possibly over-eager) behaviour rather than narrowing it;
/// see `DESIGN.md` for the rationale.
pub fn compute_statuses(
    election: &mut Election,
    t: &StageTime,
    risks: &BTreeMap<MeasurementId, f64>,
) -> BTreeMap<MeasurementId, MeasurementStatus> {
    let mids: Vec<MeasurementId> = election.measurements.keys().cloned().collect();
    for mid in &mids {
        let (is_open, limit, upset) = {
            let m = &election.measurements[mid];
            (m.is_open(), m.risk_limit, m.upset_threshold)
        };
        if !is_open {
            continue;
        }
        let Some(&risk) = risks.get(mid) else { continue };

        let exhausted = election.collections.keys().all(|pbcid| {
            let sampled = election.samples.sn_tp_for(t, pbcid);
            let population = election.collections.get(pbcid).map(|c| c.ballot_count() as u64).unwrap_or(0);
            sampled >= population
        });

        let next = if exhausted {
            MeasurementStatus::Exhausted
        } else if risk < limit {
            MeasurementStatus::Passed
        } else if risk > upset {
            MeasurementStatus::Upset
        } else {
            MeasurementStatus::Open
        };

        if next != MeasurementStatus::Open {
            election.measurements.get_mut(mid).unwrap().set_status(next);
        }
    }

    election.measurements.iter().map(|(mid, m)| (mid.clone(), m.status)).collect()
}

/// Whether any measurement is both `Open` and actively sampled — the stage
/// loop's continuation condition (§4.6).
pub fn any_open_and_active(election: &Election) -> bool {
    election.measurements.values().any(|m| m.is_open() && m.is_active())
}

/// Run one full stage: draw, measure, decide, persist contest/collection
/// status reports and an intermediate saved-state, then compute the next
/// plan. Does not sleep or loop — callers drive repetition (`run_to_completion`).
#[allow(clippy::too_many_arguments)]
pub fn run_one_stage(
    layout: &ElectionLayout,
    election: &mut Election,
    oracle: &OracleRegistry,
    audit_order: &BTreeMap<CollectionId, Vec<audit_core::BallotId>>,
    t: StageTime,
    config: &RunConfig,
    rng: &mut ChaCha20Rng,
) -> StageResult<StageOutcome> {
    audited_votes::read_all_audited_votes(layout, election)?;

    let previous_plan = previous_stage_plan(election, &t);
    draw_sample(election, audit_order, &t, &previous_plan);

    let risks = compute_risks(election, oracle, &t, config.n_trials, rng)?;
    let statuses = compute_statuses(election, &t, &risks);

    audit_output::write_contest_status(layout, election, &t, &risks)?;
    audit_output::write_collection_status(layout, election, &t)?;

    info!(stage = %t, open = statuses.values().filter(|s| **s == MeasurementStatus::Open).count(), "stage complete");

    let plan = if any_open_and_active(election) {
        let plan = compute_plan(election, oracle, &t, &config.planner, rng)?;
        for (pbcid, &n) in &plan {
            election.plan.set(&t, pbcid, n);
        }
        plan
    } else {
        election.plan.for_stage(&t)
    };

    let state = saved_state::SavedState {
        stage_time: t.clone(),
        sn_tp: election.samples.sn_tp.get(&t).cloned().unwrap_or_default(),
        status_tm: statuses.clone(),
        plan_tp: plan.clone(),
    };
    saved_state::write_saved_state(layout, &state)?;

    Ok(StageOutcome { stage_time: t, risks, statuses, plan })
}

/// Validate a freshly loaded election and return `Err` before any stage
/// runs if invariants are violated (§4.6 "Failure semantics": warnings
/// during spec/reported validation accumulate; nonzero count aborts).
pub fn validate_or_abort(election: &Election, t: &StageTime) -> StageResult<()> {
    let violations = election.check_invariants(t);
    if !violations.is_empty() {
        for v in &violations {
            tracing::warn!(%v, "invariant violation during pre-audit validation");
        }
        return Err(StageError::ValidationFailed(violations.len()));
    }
    Ok(())
}

pub fn seed_rng(seed: &AuditSeed) -> ChaCha20Rng {
    ChaCha20Rng::from_seed(seed.chacha_seed())
}

/// The plan computed at the end of the previous stage becomes this
/// stage's draw target (`draw_sample` slices up to it).
fn previous_stage_plan(election: &Election, t: &StageTime) -> BTreeMap<CollectionId, u64> {
    election.plan.latest_before(t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_core::{BallotId, ContestId, SelId};
    use audit_model::{Collection, Contest, ContestGroup, ContestType, CvrMode, GroupMember, Measurement};

    fn build_election() -> (Election, BTreeMap<CollectionId, Vec<BallotId>>) {
        let mut e = Election::new();
        let cid = ContestId::new("C1");
        e.contests.insert(cid.clone(), Contest::new(cid.clone(), ContestType::Plurality));

        let pbcid = CollectionId::new("P1");
        let mut coll = Collection::new(pbcid.clone(), CvrMode::Cvr);
        coll.max_audit_rate = 10;
        let bids: Vec<BallotId> = (0..20).map(|i| BallotId::new(format!("b{i}"))).collect();
        coll.bids = bids.clone();
        coll.possible_gids.push(audit_core::GroupId::new("G1"));
        e.collections.insert(pbcid.clone(), coll);

        let gid = audit_core::GroupId::new("G1");
        e.groups.insert(gid.clone(), ContestGroup { gid, members: vec![GroupMember::Contest(cid.clone())] });

        for (i, bid) in bids.iter().enumerate() {
            let v = if i < 12 { Vote::single(SelId::new("Alice")) } else { Vote::single(SelId::new("Bob")) };
            e.reported.set(&cid, &pbcid, bid, v.clone());
            e.audited.set(&cid, &pbcid, bid, v);
        }
        e.reported_outcomes.insert(cid.clone(), Vote::single(SelId::new("Alice")));

        let mid = MeasurementId::new("M1");
        e.measurements.insert(mid, Measurement::new(MeasurementId::new("M1"), cid, 0.05, 0.98));

        let mut order = BTreeMap::new();
        order.insert(pbcid, bids);
        (e, order)
    }

    use audit_core::Vote;

    #[test]
    fn draw_sample_fills_sn_tp_from_plan() {
        let (mut e, order) = build_election();
        let t = StageTime::parse("2026-01-01-00-00-00").unwrap();
        let mut plan = BTreeMap::new();
        plan.insert(CollectionId::new("P1"), 10);
        draw_sample(&mut e, &order, &t, &plan);
        assert_eq!(e.samples.sn_tp_for(&t, &CollectionId::new("P1")), 10);
    }

    #[test]
    fn exhausted_when_fully_sampled() {
        let (mut e, order) = build_election();
        let t = StageTime::parse("2026-01-01-00-00-00").unwrap();
        let mut plan = BTreeMap::new();
        plan.insert(CollectionId::new("P1"), 20);
        draw_sample(&mut e, &order, &t, &plan);

        let oracle = OracleRegistry::with_defaults();
        let mut rng = ChaCha20Rng::from_seed([1u8; 32]);
        let risks = compute_risks(&e, &oracle, &t, 200, &mut rng).unwrap();
        let statuses = compute_statuses(&mut e, &t, &risks);
        assert_eq!(statuses[&MeasurementId::new("M1")], MeasurementStatus::Exhausted);
    }

    #[test]
    fn passes_when_risk_below_limit_and_not_exhausted() {
        let (mut e, order) = build_election();
        let t = StageTime::parse("2026-01-01-00-00-00").unwrap();
        let mut plan = BTreeMap::new();
        plan.insert(CollectionId::new("P1"), 10);
        draw_sample(&mut e, &order, &t, &plan);

        let oracle = OracleRegistry::with_defaults();
        let mut rng = ChaCha20Rng::from_seed([2u8; 32]);
        let risks = compute_risks(&e, &oracle, &t, 500, &mut rng).unwrap();
        let statuses = compute_statuses(&mut e, &t, &risks);
        assert_eq!(statuses[&MeasurementId::new("M1")], MeasurementStatus::Passed);
    }
}
