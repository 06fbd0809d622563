//! The sample planner (`spec.md` §4.7): baseline allocation plus two
//! optional, strictly advisory refinements (a Dirichlet–Multinomial
//! simulation planner and a discrete Robbins–Monro planner).
//!
//! Both refinements are heuristics for *where* to spend the next batch of
//! ballots; the engine always caps the result at the baseline's bounds
//! (never below the current sample, never above the collection's ballot
//! count), so a buggy or degenerate refinement can only misallocate
//! within those bounds, never violate invariant 7.

use std::collections::BTreeMap;

use rand::Rng;

use audit_core::{dirichlet, multinomial, CollectionId, ContestId, StageTime, Vote};
use audit_model::{Election, Measurement};

use crate::errors::AlgoError;
use crate::oracle::OracleRegistry;

/// How the Dirichlet–Multinomial simulation planner chooses which
/// collection to extend at each inner iteration (§4.7).
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum PickCountyFunc {
    RoundRobin,
    RandomNaive,
    RandomMinVar,
}

#[derive(Clone, Debug)]
pub struct PlannerConfig {
    pub use_dirichlet_sim: bool,
    pub use_discrete_rm: bool,
    pub num_winners: usize,
    pub max_num_it: usize,
    pub pick_county_func: PickCountyFunc,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            use_dirichlet_sim: false,
            use_discrete_rm: false,
            num_winners: 1,
            max_num_it: 20,
            pick_county_func: PickCountyFunc::RoundRobin,
        }
    }
}

/// Pseudocount used by the simulation planner for any vote with zero
/// observed occurrences in a stratum, per §4.7.
const SIM_ZERO_CELL_PSEUDOCOUNT: f64 = 50.0;

fn aggregate_sample_tally(
    election: &Election,
    t: &StageTime,
    cid: &ContestId,
    pbcid: &CollectionId,
) -> BTreeMap<Vote, u64> {
    let mut out = BTreeMap::new();
    for rv in election.reported.rn_cpr(cid, pbcid).keys() {
        for (av, &c) in &election.samples.sample_tally_for_stratum(t, cid, pbcid, rv) {
            *out.entry(av.clone()).or_insert(0) += c;
        }
    }
    out
}

fn completion_tally<R: Rng>(
    votes: &[Vote],
    sample_tally: &BTreeMap<Vote, u64>,
    extra_size: f64,
    rng: &mut R,
) -> BTreeMap<Vote, f64> {
    let mut concentration: BTreeMap<Vote, f64> = BTreeMap::new();
    for v in votes {
        let c = sample_tally.get(v).copied().unwrap_or(0);
        concentration.insert(v.clone(), if c == 0 { SIM_ZERO_CELL_PSEUDOCOUNT } else { c as f64 });
    }
    for (v, &c) in sample_tally {
        concentration
            .entry(v.clone())
            .or_insert(if c == 0 { SIM_ZERO_CELL_PSEUDOCOUNT } else { c as f64 });
    }
    let probs = dirichlet(&concentration, rng);
    multinomial(extra_size.max(0.0), &probs, rng)
}

fn remaining_for(election: &Election, t: &StageTime, cid: &ContestId, pbcid: &CollectionId) -> f64 {
    let population: u64 = election.reported.rn_cpr(cid, pbcid).values().sum();
    let sampled: u64 = aggregate_sample_tally(election, t, cid, pbcid).values().sum();
    population.saturating_sub(sampled) as f64
}

/// `plan_tp[t][pbcid] = min(sn_tp[t][pbcid] + max_audit_rate_p[pbcid],
/// rn_p[pbcid])` for every pbcid "possible" for a still-Open, Active
/// measurement; other pbcids keep their current sample size.
pub fn plan_baseline(election: &Election, t: &StageTime) -> BTreeMap<CollectionId, u64> {
    let relevant = relevant_pbcids(election);
    let mut out = BTreeMap::new();
    for (pbcid, coll) in &election.collections {
        let current = election.samples.sn_tp_for(t, pbcid);
        let population = coll.ballot_count() as u64;
        let planned = if relevant.contains(pbcid) {
            current.saturating_add(coll.max_audit_rate).min(population)
        } else {
            current
        };
        out.insert(pbcid.clone(), planned);
    }
    out
}

fn relevant_pbcids(election: &Election) -> std::collections::BTreeSet<CollectionId> {
    let mut set = std::collections::BTreeSet::new();
    for m in election.measurements.values() {
        if m.is_open() && m.is_active() {
            set.extend(election.possible_pbcids_for_contest(&m.cid));
        }
    }
    set
}

fn pick_pbcid<R: Rng>(
    pbcids: &[CollectionId],
    election: &Election,
    t: &StageTime,
    cid: &ContestId,
    func: PickCountyFunc,
    iteration: usize,
    rng: &mut R,
) -> CollectionId {
    match func {
        PickCountyFunc::RoundRobin => pbcids[iteration % pbcids.len()].clone(),
        PickCountyFunc::RandomNaive => {
            let idx = rng.gen_range(0..pbcids.len());
            pbcids[idx].clone()
        }
        PickCountyFunc::RandomMinVar => pbcids
            .iter()
            .max_by(|a, b| {
                variance_estimate(election, t, cid, a)
                    .partial_cmp(&variance_estimate(election, t, cid, b))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .cloned()
            .unwrap_or_else(|| pbcids[0].clone()),
    }
}

/// Normal-approximation variance `n^2 p q / (s - 1)` of the extrapolated
/// top-candidate count, used by `random_min_var` to pick the pbcid whose
/// next increment most reduces overall uncertainty (§4.7).
fn variance_estimate(election: &Election, t: &StageTime, cid: &ContestId, pbcid: &CollectionId) -> f64 {
    let n: u64 = election.reported.rn_cpr(cid, pbcid).values().sum();
    let sample_tally = aggregate_sample_tally(election, t, cid, pbcid);
    let s: u64 = sample_tally.values().sum();
    if s <= 1 {
        return f64::INFINITY;
    }
    let top = sample_tally.values().copied().max().unwrap_or(0) as f64;
    let p = top / s as f64;
    let q = 1.0 - p;
    (n as f64).powi(2) * p * q / ((s as f64) - 1.0)
}

/// The Dirichlet–Multinomial simulation planner (§4.7a). Returns the
/// final per-pbcid increments `x[pbcid]` for one contest's measurement.
pub fn plan_dirichlet_sim<R: Rng>(
    election: &Election,
    oracle: &OracleRegistry,
    t: &StageTime,
    cid: &ContestId,
    measurement: &Measurement,
    config: &PlannerConfig,
    rng: &mut R,
) -> Result<BTreeMap<CollectionId, f64>, AlgoError> {
    let contest = election
        .contests
        .get(cid)
        .ok_or_else(|| AlgoError::InvalidPlannerParam(format!("unknown contest {cid}")))?;
    let pbcids: Vec<CollectionId> = election.possible_pbcids_for_contest(cid).into_iter().collect();
    if pbcids.is_empty() {
        return Ok(BTreeMap::new());
    }
    let votes_c = election.reported.votes_c(cid);
    let reported_outcome = election.reported_outcomes.get(cid).cloned().unwrap_or_default();
    let alpha = measurement.risk_limit;
    let num_winners = config.num_winners.max(1);

    let mut x: BTreeMap<CollectionId, f64> = pbcids.iter().map(|p| (p.clone(), 1.0)).collect();

    for iteration in 0..config.max_num_it {
        let picked = pick_pbcid(&pbcids, election, t, cid, config.pick_county_func, iteration, rng);

        let mut all_match = true;
        for _ in 0..num_winners {
            let mut merged: BTreeMap<Vote, f64> = votes_c.iter().cloned().map(|v| (v, 0.0)).collect();
            for pbcid in &pbcids {
                let sample_tally = aggregate_sample_tally(election, t, cid, pbcid);
                for (v, &c) in &sample_tally {
                    *merged.entry(v.clone()).or_insert(0.0) += c as f64;
                }
                let remaining = remaining_for(election, t, cid, pbcid);
                let extend_amt = if pbcid == &picked {
                    x.get(pbcid).copied().unwrap_or(0.0).min(remaining)
                } else {
                    0.0
                };
                if extend_amt > 0.0 {
                    for (v, c) in completion_tally(&votes_c, &sample_tally, extend_amt, rng) {
                        *merged.entry(v).or_insert(0.0) += c;
                    }
                }
                let rest = (remaining - extend_amt).max(0.0);
                if rest > 0.0 {
                    for (v, c) in completion_tally(&votes_c, &sample_tally, rest, rng) {
                        *merged.entry(v).or_insert(0.0) += c;
                    }
                }
            }
            let int_tally: BTreeMap<Vote, u64> =
                merged.into_iter().map(|(v, c)| (v, c.round().max(0.0) as u64)).collect();
            match oracle.outcome(cid.as_str(), &contest.contest_type, &contest.params, &int_tally) {
                Ok(o) if o == reported_outcome => {}
                _ => all_match = false,
            }
        }

        let p_increment = (1.0 - alpha).powi(num_winners as i32);
        let roll: f64 = rng.gen();
        let remaining = remaining_for(election, t, cid, &picked);
        let cur = x.entry(picked.clone()).or_insert(1.0);
        if all_match {
            if roll < (1.0 - p_increment) {
                *cur = (*cur - 1.0).max(0.0);
            }
        } else if roll < p_increment {
            *cur = (*cur + 1.0).min(remaining);
        }
    }

    Ok(x)
}

/// The discrete Robbins–Monro planner (§4.7b): a Kiefer–Wolfowitz-style
/// finite-difference stochastic approximation of the additional sample
/// size that drives `|risk - alpha|` toward zero, then distributed across
/// the contest's collections proportional to their remaining unsampled
/// population.
pub fn plan_robbins_monro<R: Rng>(
    election: &Election,
    oracle: &OracleRegistry,
    t: &StageTime,
    cid: &ContestId,
    measurement: &Measurement,
    rng: &mut R,
) -> Result<BTreeMap<CollectionId, f64>, AlgoError> {
    let contest = election
        .contests
        .get(cid)
        .ok_or_else(|| AlgoError::InvalidPlannerParam(format!("unknown contest {cid}")))?;
    let pbcids: Vec<CollectionId> = election.possible_pbcids_for_contest(cid).into_iter().collect();
    if pbcids.is_empty() {
        return Ok(BTreeMap::new());
    }
    let votes_c = election.reported.votes_c(cid);
    let reported_outcome = election.reported_outcomes.get(cid).cloned().unwrap_or_default();
    let alpha = measurement.risk_limit;

    const INNER_TRIALS: u64 = 100;
    const OUTER_ITERATIONS: usize = 40;

    let loss = |add: f64, rng: &mut R| -> f64 {
        let remaining: BTreeMap<CollectionId, f64> =
            pbcids.iter().map(|p| (p.clone(), remaining_for(election, t, cid, p))).collect();
        let total_remaining: f64 = remaining.values().sum();
        if total_remaining <= 0.0 {
            return alpha.abs();
        }
        let mut wrong = 0u64;
        for _ in 0..INNER_TRIALS {
            let mut merged: BTreeMap<Vote, f64> = votes_c.iter().cloned().map(|v| (v, 0.0)).collect();
            for p in &pbcids {
                let sample_tally = aggregate_sample_tally(election, t, cid, p);
                for (v, &c) in &sample_tally {
                    *merged.entry(v.clone()).or_insert(0.0) += c as f64;
                }
                let share = add * (remaining[p] / total_remaining);
                let extend = completion_tally(&votes_c, &sample_tally, share.min(remaining[p]), rng);
                for (v, c) in extend {
                    *merged.entry(v).or_insert(0.0) += c;
                }
                let rest = (remaining[p] - share).max(0.0);
                let nonsample = completion_tally(&votes_c, &sample_tally, rest, rng);
                for (v, c) in nonsample {
                    *merged.entry(v).or_insert(0.0) += c;
                }
            }
            let int_tally: BTreeMap<Vote, u64> =
                merged.into_iter().map(|(v, c)| (v, c.round().max(0.0) as u64)).collect();
            match oracle.outcome(cid.as_str(), &contest.contest_type, &contest.params, &int_tally) {
                Ok(o) if o == reported_outcome => {}
                _ => wrong += 1,
            }
        }
        (wrong as f64 / INNER_TRIALS as f64 - alpha).abs()
    };

    let mut xk: f64 = pbcids
        .iter()
        .filter_map(|p| election.collections.get(p))
        .map(|c| c.max_audit_rate as f64)
        .sum::<f64>()
        .max(1.0);

    for k in 0..OUTER_ITERATIONS {
        let step = (k as f64 + 1.0).powf(-2.0 / 3.0);
        let delta = xk.max(1.0) * 0.1 + 1.0;
        let loss_plus = loss(xk + delta, rng);
        let loss_minus = loss((xk - delta).max(0.0), rng);
        let grad = (loss_plus - loss_minus) / (2.0 * delta);
        xk = (xk - step * grad * xk.max(1.0)).max(0.0);
    }

    let remaining: BTreeMap<CollectionId, f64> =
        pbcids.iter().map(|p| (p.clone(), remaining_for(election, t, cid, p))).collect();
    let total_remaining: f64 = remaining.values().sum();
    let mut out = BTreeMap::new();
    for p in &pbcids {
        let share = if total_remaining > 0.0 { xk * (remaining[p] / total_remaining) } else { 0.0 };
        out.insert(p.clone(), share.floor().max(0.0));
    }
    Ok(out)
}

/// Compute the full next-stage plan: the baseline allocation, optionally
/// refined by one of the two advisory planners for every still-Open,
/// Active measurement, then clamped to `[current sample, population]`
/// (invariant 7) regardless of what the refinement suggested.
pub fn compute_plan<R: Rng>(
    election: &Election,
    oracle: &OracleRegistry,
    t: &StageTime,
    config: &PlannerConfig,
    rng: &mut R,
) -> Result<BTreeMap<CollectionId, u64>, AlgoError> {
    let mut plan = plan_baseline(election, t);

    if config.use_dirichlet_sim || config.use_discrete_rm {
        for measurement in election.measurements.values() {
            if !(measurement.is_open() && measurement.is_active()) {
                continue;
            }
            let increments = if config.use_dirichlet_sim {
                plan_dirichlet_sim(election, oracle, t, &measurement.cid, measurement, config, rng)?
            } else {
                plan_robbins_monro(election, oracle, t, &measurement.cid, measurement, rng)?
            };
            for (pbcid, x) in increments {
                let current = election.samples.sn_tp_for(t, &pbcid);
                let entry = plan.entry(pbcid).or_insert(current);
                *entry = entry.saturating_add(x.round().max(0.0) as u64);
            }
        }
    }

    for (pbcid, coll) in &election.collections {
        let population = coll.ballot_count() as u64;
        let current = election.samples.sn_tp_for(t, pbcid);
        let entry = plan.entry(pbcid.clone()).or_insert(current);
        *entry = (*entry).max(current).min(population);
    }

    Ok(plan)
}
