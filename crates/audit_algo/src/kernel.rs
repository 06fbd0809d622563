//! The Monte Carlo Bayes-risk estimator (`spec.md` §4.5).
//!
//! All iteration here is over `BTreeMap`/`BTreeSet` keys, which are
//! already in sorted order — that, plus consulting the shared RNG stream
//! in the same call order every time, is what keeps the estimate
//! reproducible from `(audit_seed, audited_votes)` (§5).

use std::collections::BTreeMap;

use rand::Rng;

use audit_core::{compute_prior_pseudocounts, draw_nonsample_tally, CollectionId, MeasurementId, StageTime, Vote, DEFAULT_ALPHA_BASE, DEFAULT_ALPHA_MATCH};
use audit_model::Election;

use crate::errors::AlgoError;
use crate::oracle::OracleRegistry;

/// Default Monte Carlo trial count (`spec.md` §4.5).
pub const DEFAULT_N_TRIALS: u64 = 100_000;

/// `risk_tm[t][mid]`: the Monte Carlo estimate of
/// `Pr[reported outcome is wrong | sample]`.
pub fn compute_risk<R: Rng>(
    election: &Election,
    oracle: &OracleRegistry,
    mid: &MeasurementId,
    t: &StageTime,
    trials: u64,
    rng: &mut R,
) -> Result<f64, AlgoError> {
    compute_risk_generic(election, oracle, mid, t, trials, None, rng)
}

/// `compute_risk_with_tweak` (§4.5): scale each `pbcid`'s observed
/// per-stratum sample counts upward in place by
/// `1 + tweak[pbcid] / sn_tcp[t][cid][pbcid]`, subject to
/// `0 <= tweak[pbcid] <= slack[pbcid]`. Pure with respect to persistent
/// state — used by the planner to evaluate counterfactual sample
/// increments without mutating `election`.
pub fn compute_risk_with_tweak<R: Rng>(
    election: &Election,
    oracle: &OracleRegistry,
    mid: &MeasurementId,
    t: &StageTime,
    trials: u64,
    slack: &BTreeMap<CollectionId, f64>,
    tweak: &BTreeMap<CollectionId, f64>,
    rng: &mut R,
) -> Result<f64, AlgoError> {
    for (pbcid, &amount) in tweak {
        let cap = slack.get(pbcid).copied().unwrap_or(0.0);
        if amount < 0.0 || amount > cap {
            return Err(AlgoError::InvalidPlannerParam(format!(
                "tweak[{pbcid}] = {amount} outside [0, {cap}]"
            )));
        }
    }

    let measurement = election
        .measurements
        .get(mid)
        .ok_or_else(|| AlgoError::InvalidPlannerParam(format!("unknown measurement {mid}")))?;
    let cid = &measurement.cid;

    let mut scale: BTreeMap<CollectionId, f64> = BTreeMap::new();
    for pbcid in election.possible_pbcids_for_contest(cid) {
        let sn_tcp: u64 = election
            .samples
            .sn_tcpr(t, cid, &pbcid)
            .values()
            .sum();
        let amount = tweak.get(&pbcid).copied().unwrap_or(0.0);
        let factor = if sn_tcp == 0 { 1.0 } else { 1.0 + amount / sn_tcp as f64 };
        scale.insert(pbcid, factor);
    }

    compute_risk_generic(election, oracle, mid, t, trials, Some(&scale), rng)
}

fn compute_risk_generic<R: Rng>(
    election: &Election,
    oracle: &OracleRegistry,
    mid: &MeasurementId,
    t: &StageTime,
    trials: u64,
    scale: Option<&BTreeMap<CollectionId, f64>>,
    rng: &mut R,
) -> Result<f64, AlgoError> {
    let measurement = election
        .measurements
        .get(mid)
        .ok_or_else(|| AlgoError::InvalidPlannerParam(format!("unknown measurement {mid}")))?;
    let cid = &measurement.cid;
    let contest = election
        .contests
        .get(cid)
        .ok_or_else(|| AlgoError::InvalidPlannerParam(format!("unknown contest {cid}")))?;

    let reported_outcome = election
        .reported_outcomes
        .get(cid)
        .cloned()
        .unwrap_or_default();

    let votes_c = election.reported.votes_c(cid);
    let possible_pbcids = election.possible_pbcids_for_contest(cid);

    let mut wrong_count: u64 = 0;
    let actual_trials = trials.max(1);

    for _ in 0..actual_trials {
        let mut test_tally: BTreeMap<Vote, f64> = votes_c.iter().cloned().map(|v| (v, 0.0)).collect();

        for pbcid in &possible_pbcids {
            let rn_cpr = election.reported.rn_cpr(cid, pbcid);
            let factor = scale.and_then(|s| s.get(pbcid)).copied().unwrap_or(1.0);

            for (rv, &stratum_size) in &rn_cpr {
                let sample_tally_u64 = election.samples.sample_tally_for_stratum(t, cid, pbcid, rv);
                let sample_size: u64 = sample_tally_u64.values().sum();
                let nonsample_size = (stratum_size.saturating_sub(sample_size)) as f64;

                // Add the (possibly tweaked) observed sample tally.
                for (av, &count) in &sample_tally_u64 {
                    *test_tally.entry(av.clone()).or_insert(0.0) += count as f64 * factor;
                }

                // Draw and add the nonsample completion from the
                // Dirichlet-Multinomial posterior.
                let prior = compute_prior_pseudocounts(&votes_c, rv, DEFAULT_ALPHA_BASE, DEFAULT_ALPHA_MATCH);
                let sample_tally_f64: BTreeMap<Vote, f64> =
                    sample_tally_u64.into_iter().map(|(v, c)| (v, c as f64)).collect();
                let nonsample_tally =
                    draw_nonsample_tally(&sample_tally_f64, &prior, nonsample_size, rng);
                for (av, count) in nonsample_tally {
                    *test_tally.entry(av).or_insert(0.0) += count;
                }
            }
        }

        let int_tally: BTreeMap<Vote, u64> = test_tally
            .into_iter()
            .map(|(v, c)| (v, c.round().max(0.0) as u64))
            .collect();

        let params = &contest.params;
        match oracle.outcome(cid.as_str(), &contest.contest_type, params, &int_tally) {
            Ok(outcome) if outcome == reported_outcome => {}
            Ok(_) => wrong_count += 1,
            // No valid outcome in a trial is itself evidence the reported
            // outcome could be wrong under that draw.
            Err(_) => wrong_count += 1,
        }
    }

    Ok(wrong_count as f64 / actual_trials as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_core::{BallotId, ContestId, SelId};
    use audit_model::{Collection, Contest, ContestType, CvrMode, Measurement};
    use rand_chacha::ChaCha20Rng;
    use rand_core::SeedableRng;

    fn v(s: &str) -> Vote {
        Vote::single(SelId::new(s))
    }

    /// One CVR pbcid, 100 reported ballots (60 Alice / 40 Bob), fully
    /// sampled and matching the reported votes exactly: risk should be
    /// near zero (reported outcome very likely correct).
    fn full_agreement_election(n_alice: u64, n_bob: u64) -> (Election, MeasurementId) {
        let mut e = Election::new();
        let cid = ContestId::new("C1");
        e.contests.insert(cid.clone(), Contest::new(cid.clone(), ContestType::Plurality));

        let pbcid = CollectionId::new("P1");
        let mut coll = Collection::new(pbcid.clone(), CvrMode::Cvr);
        for i in 0..(n_alice + n_bob) {
            coll.bids.push(BallotId::new(format!("b{i}")));
        }
        e.collections.insert(pbcid.clone(), coll);

        let gid = audit_core::GroupId::new("G1");
        e.groups.insert(
            gid.clone(),
            audit_model::ContestGroup { gid, members: vec![audit_model::GroupMember::Contest(cid.clone())] },
        );
        e.collections.get_mut(&pbcid).unwrap().possible_gids.push(audit_core::GroupId::new("G1"));

        let t = StageTime::initial();
        for i in 0..n_alice {
            let bid = BallotId::new(format!("b{i}"));
            e.reported.set(&cid, &pbcid, &bid, v("Alice"));
            e.samples.record(&t, &cid, &pbcid, v("Alice"), v("Alice"));
        }
        for i in 0..n_bob {
            let bid = BallotId::new(format!("b{}", n_alice + i));
            e.reported.set(&cid, &pbcid, &bid, v("Bob"));
            e.samples.record(&t, &cid, &pbcid, v("Bob"), v("Bob"));
        }
        e.reported_outcomes.insert(cid.clone(), v("Alice"));

        let mid = MeasurementId::new("M1");
        e.measurements.insert(mid.clone(), Measurement::new(mid.clone(), cid, 0.05, 0.98));
        (e, mid)
    }

    #[test]
    fn full_sample_matching_reported_gives_zero_risk() {
        let (e, mid) = full_agreement_election(60, 40);
        let oracle = OracleRegistry::with_defaults();
        let mut rng = ChaCha20Rng::from_seed([1u8; 32]);
        let risk = compute_risk(&e, &oracle, &mid, &StageTime::initial(), 200, &mut rng).unwrap();
        assert_eq!(risk, 0.0);
    }

    #[test]
    fn risk_is_bounded_in_zero_one() {
        let (e, mid) = full_agreement_election(6, 4);
        let oracle = OracleRegistry::with_defaults();
        let mut rng = ChaCha20Rng::from_seed([2u8; 32]);
        let risk = compute_risk(&e, &oracle, &mid, &StageTime::initial(), 500, &mut rng).unwrap();
        assert!((0.0..=1.0).contains(&risk));
    }

    #[test]
    fn tweak_rejects_out_of_range_amounts() {
        let (e, mid) = full_agreement_election(6, 4);
        let oracle = OracleRegistry::with_defaults();
        let mut rng = ChaCha20Rng::from_seed([3u8; 32]);
        let mut slack = BTreeMap::new();
        slack.insert(CollectionId::new("P1"), 1.0);
        let mut tweak = BTreeMap::new();
        tweak.insert(CollectionId::new("P1"), 5.0);
        let res = compute_risk_with_tweak(&e, &oracle, &mid, &StageTime::initial(), 10, &slack, &tweak, &mut rng);
        assert!(res.is_err());
    }
}
