//! End-to-end literal scenarios from `spec.md` §8, driven directly through
//! `audit_pipeline::stage`'s pure in-memory functions (no CSV/layout I/O —
//! that plumbing is exercised separately by `audit_io`'s own tests).

use std::collections::BTreeMap;

use audit_algo::{compute_plan, OracleRegistry, PlannerConfig};
use audit_core::{BallotId, CollectionId, ContestId, GroupId, MeasurementId, SelId, StageTime, Vote};
use audit_model::{
    Collection, Contest, ContestGroup, ContestType, CvrMode, Election, GroupMember, Measurement,
    MeasurementStatus,
};
use audit_pipeline::stage::{compute_risks, compute_statuses, draw_sample};
use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;

fn v(s: &str) -> Vote {
    Vote::single(SelId::new(s))
}

/// Monotone stage times for a test loop: second `n` after the epoch,
/// formatted the way the real clock would ("YYYY-MM-DD-HH-MM-SS").
fn nth_stage_time(n: u64) -> StageTime {
    let ss = n % 60;
    let mm = (n / 60) % 60;
    let hh = (n / 3600) % 24;
    StageTime::parse(&format!("2026-01-01-{hh:02}-{mm:02}-{ss:02}")).unwrap()
}

fn one_cvr_collection_election(
    n_alice: u64,
    n_bob: u64,
    max_audit_rate: u64,
    risk_limit: f64,
    upset_threshold: f64,
) -> (Election, BTreeMap<CollectionId, Vec<BallotId>>) {
    let mut e = Election::new();
    let cid = ContestId::new("C1");
    e.contests.insert(cid.clone(), Contest::new(cid.clone(), ContestType::Plurality));

    let pbcid = CollectionId::new("P1");
    let mut coll = Collection::new(pbcid.clone(), CvrMode::Cvr);
    coll.max_audit_rate = max_audit_rate;
    let bids: Vec<BallotId> = (0..(n_alice + n_bob)).map(|i| BallotId::new(format!("b{i}"))).collect();
    coll.bids = bids.clone();
    coll.possible_gids.push(GroupId::new("G1"));
    e.collections.insert(pbcid.clone(), coll);

    let gid = GroupId::new("G1");
    e.groups.insert(gid.clone(), ContestGroup { gid, members: vec![GroupMember::Contest(cid.clone())] });

    for (i, bid) in bids.iter().enumerate() {
        let vote = if (i as u64) < n_alice { v("Alice") } else { v("Bob") };
        e.reported.set(&cid, &pbcid, bid, vote);
    }
    e.reported_outcomes.insert(cid.clone(), v("Alice"));

    let mid = MeasurementId::new("M1");
    e.measurements.insert(mid, Measurement::new(MeasurementId::new("M1"), cid, risk_limit, upset_threshold));

    let mut order = BTreeMap::new();
    order.insert(pbcid, bids);
    (e, order)
}

/// Drive the stage loop in-memory (draw → risk → status → plan) until
/// every measurement is terminal or `max_stages` is hit. Returns the
/// number of stages run and the final total sampled ballots per pbcid.
fn run_stages(
    e: &mut Election,
    order: &BTreeMap<CollectionId, Vec<BallotId>>,
    n_trials: u64,
    max_stages: u64,
) -> (u64, BTreeMap<CollectionId, u64>) {
    let oracle = OracleRegistry::with_defaults();
    let mut rng = ChaCha20Rng::from_seed([7u8; 32]);
    let config = PlannerConfig::default();

    // plan_tp at t0 seeds the first draw with one max_audit_rate increment,
    // matching `write_initial_saved_state`'s "seeded from max_audit_rate,
    // not zero" rule (spec.md §4.8).
    let t0 = StageTime::initial();
    for (pbcid, coll) in &e.collections {
        e.plan.set(&t0, pbcid, coll.max_audit_rate.min(coll.ballot_count() as u64));
    }

    let mut stage_n = 0;
    loop {
        let t = nth_stage_time(stage_n + 1);
        let plan = e.plan.latest_before(&t);
        draw_sample(e, order, &t, &plan);

        let risks = compute_risks(e, &oracle, &t, n_trials, &mut rng).unwrap();
        let statuses = compute_statuses(e, &t, &risks);

        stage_n += 1;
        let all_terminal = statuses.values().all(|s| *s != MeasurementStatus::Open);
        if all_terminal || stage_n >= max_stages {
            let sampled = e.collections.keys().map(|p| (p.clone(), e.samples.sn_tp_for(&t, p))).collect();
            return (stage_n, sampled);
        }

        let next_plan = compute_plan(e, &oracle, &t, &config, &mut rng).unwrap();
        for (pbcid, n) in next_plan {
            e.plan.set(&t, &pbcid, n);
        }
    }
}

/// (S1) Trivial pass: Alice wins 3,103/6,103 against Bob's 3,000, audited
/// votes agree exactly with reported. The measurement must reach `Passed`
/// before the collection is exhausted.
#[test]
fn s1_trivial_pass() {
    let (mut e, order) = one_cvr_collection_election(3_103, 3_000, 40, 0.05, 0.98);
    // Audited votes agree with reported everywhere.
    let cid = ContestId::new("C1");
    let pbcid = CollectionId::new("P1");
    for bid in order[&pbcid].iter() {
        let rv = e.reported.get(&cid, &pbcid, bid).cloned().unwrap();
        e.audited.set(&cid, &pbcid, bid, rv);
    }

    let (stages, sampled) = run_stages(&mut e, &order, 1_000, 400);
    assert!(stages > 0);
    let total = sampled[&pbcid];
    assert!(total < 6_103, "expected the audit to pass before exhausting the collection, sampled {total}");

    let t = nth_stage_time(stages);
    assert_eq!(e.measurements[&MeasurementId::new("M1")].status, MeasurementStatus::Passed, "{t}");
}

/// (S2) Upset: swapping the actual vote on 10% of the reported-Alice
/// ballots over to Bob flips the true winner (Alice 3,103/Bob 3,000
/// reported -> Alice 2,793/Bob 3,310 actual). The measurement must reach
/// `Upset` strictly before the collection is exhausted.
#[test]
fn s2_upset_before_exhaustion() {
    let (mut e, order) = one_cvr_collection_election(3_103, 3_000, 40, 0.05, 0.98);
    let cid = ContestId::new("C1");
    let pbcid = CollectionId::new("P1");
    let bids = order[&pbcid].clone();
    let flip_count = 310; // 10% of the 3,103 reported-Alice ballots
    for (i, bid) in bids.iter().enumerate() {
        let rv = e.reported.get(&cid, &pbcid, bid).cloned().unwrap();
        // The first `flip_count` reported-Alice ballots are actually Bob
        // votes; every other ballot's actual vote matches its reported one.
        let av = if rv == v("Alice") && i < flip_count { v("Bob") } else { rv };
        e.audited.set(&cid, &pbcid, bid, av);
    }

    let (stages, sampled) = run_stages(&mut e, &order, 1_000, 400);
    let total = sampled[&pbcid];
    assert!(total < 6_103, "expected upset to be signalled before exhaustion, sampled {total} over {stages} stages");
    assert_eq!(e.measurements[&MeasurementId::new("M1")].status, MeasurementStatus::Upset);
}

/// (S3) Exhaustion: a close 51/49 split in a 100-ballot collection with
/// `max_audit_rate = 40` draws 40, then 40, then 20 ballots and reaches
/// `Exhausted` with `sn_tp = 100`.
#[test]
fn s3_exhaustion() {
    let (mut e, order) = one_cvr_collection_election(51, 49, 40, 0.05, 0.98);
    let cid = ContestId::new("C1");
    let pbcid = CollectionId::new("P1");
    for bid in order[&pbcid].iter() {
        let rv = e.reported.get(&cid, &pbcid, bid).cloned().unwrap();
        e.audited.set(&cid, &pbcid, bid, rv);
    }

    let (_, sampled) = run_stages(&mut e, &order, 2_000, 10);
    assert_eq!(sampled[&pbcid], 100);
    assert_eq!(e.measurements[&MeasurementId::new("M1")].status, MeasurementStatus::Exhausted);
}

/// (S4) noCVR ballot poll: every reported vote is `(-noCVR,)`; a sample of
/// 55 out of 1,000 ballots splits Alice 30 / Bob 25. The risk estimate must
/// be strictly inside `(0, 1)`.
#[test]
fn s4_nocvr_ballot_poll_risk_is_interior() {
    let mut e = Election::new();
    let cid = ContestId::new("C1");
    e.contests.insert(cid.clone(), Contest::new(cid.clone(), ContestType::Plurality));

    let pbcid = CollectionId::new("P2");
    let mut coll = Collection::new(pbcid.clone(), CvrMode::NoCvr);
    coll.max_audit_rate = 55;
    let bids: Vec<BallotId> = (0..1_000u32).map(|i| BallotId::new(format!("b{i}"))).collect();
    coll.bids = bids.clone();
    coll.possible_gids.push(GroupId::new("G1"));
    e.collections.insert(pbcid.clone(), coll);

    let gid = GroupId::new("G1");
    e.groups.insert(gid.clone(), ContestGroup { gid, members: vec![GroupMember::Contest(cid.clone())] });

    // noCVR: every reported vote defaults to the `(-noCVR,)` sentinel.
    let no_cvr = Vote::single(SelId::no_cvr());
    for bid in &bids {
        e.reported.set(&cid, &pbcid, bid, no_cvr.clone());
    }
    e.reported_outcomes.insert(cid.clone(), v("Alice"));

    for (i, bid) in bids.iter().take(55).enumerate() {
        let av = if i < 30 { v("Alice") } else if i < 55 { v("Bob") } else { unreachable!() };
        e.audited.set(&cid, &pbcid, bid, av);
    }

    let mid = MeasurementId::new("M1");
    e.measurements.insert(mid.clone(), Measurement::new(mid.clone(), cid.clone(), 0.05, 0.98));

    let t = StageTime::parse("2026-01-01-00-00-01").unwrap();
    let mut order = BTreeMap::new();
    order.insert(pbcid.clone(), bids.clone());
    let mut plan = BTreeMap::new();
    plan.insert(pbcid.clone(), 55);
    draw_sample(&mut e, &order, &t, &plan);

    let oracle = OracleRegistry::with_defaults();
    let mut rng = ChaCha20Rng::from_seed([11u8; 32]);
    let risks = compute_risks(&e, &oracle, &t, 5_000, &mut rng).unwrap();
    let risk = risks[&mid];
    assert!(risk > 0.0 && risk < 1.0, "risk {risk} should be strictly interior for a thin 30/25 sample");
}

/// (S6) Seed width: a 20-digit audit seed must parse and drive a fully
/// reproducible run (same seed, same inputs -> bit-identical risk stream).
#[test]
fn s6_twenty_digit_seed_is_reproducible() {
    let seed = audit_core::AuditSeed::parse("12345678901234567890").unwrap();

    let (e, _order) = one_cvr_collection_election(60, 40, 10, 0.05, 0.98);
    let oracle = OracleRegistry::with_defaults();
    let t = StageTime::initial();

    let mut rng_a = seed.make_rng();
    let mut rng_b = seed.make_rng();
    let risk_a = audit_algo::compute_risk(&e, &oracle, &MeasurementId::new("M1"), &t, 500, &mut rng_a).unwrap();
    let risk_b = audit_algo::compute_risk(&e, &oracle, &MeasurementId::new("M1"), &t, 500, &mut rng_b).unwrap();
    assert_eq!(risk_a, risk_b);
}
