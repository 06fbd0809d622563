//! Posterior sampler: Gamma, Dirichlet, Multinomial, and the Dirichlet–
//! Multinomial prior/posterior helpers the risk kernel and planner draw
//! from (§4.4).
//!
//! Iteration over any vote-keyed map happens in `BTreeMap`'s natural sorted
//! order throughout this module, which is what keeps the RNG call sequence
//! — and hence every Monte Carlo estimate — reproducible.

use std::collections::BTreeMap;

use rand::Rng;
use rand_distr::{Binomial, Distribution, Gamma as GammaDist};

/// Jeffreys-prior pseudocount for a non-matching cell.
pub const DEFAULT_ALPHA_BASE: f64 = 0.5;
/// Pseudocount for the cell where actual vote equals reported vote.
pub const DEFAULT_ALPHA_MATCH: f64 = 50.0;

/// Draw from Gamma(shape = `k`, scale = 1). Returns 0 for `k <= 0` (the
/// degenerate point mass at the origin).
pub fn gamma<R: Rng>(k: f64, rng: &mut R) -> f64 {
    if k <= 0.0 {
        return 0.0;
    }
    GammaDist::new(k, 1.0)
        .expect("gamma shape validated positive above")
        .sample(rng)
}

/// Draw a Dirichlet vector from a tally of nonnegative concentration
/// parameters, keyed by vote and iterated in sorted order.
pub fn dirichlet<V, R>(tally: &BTreeMap<V, f64>, rng: &mut R) -> BTreeMap<V, f64>
where
    V: Ord + Clone,
    R: Rng,
{
    let draws: BTreeMap<V, f64> = tally.iter().map(|(v, &k)| (v.clone(), gamma(k, rng))).collect();
    let sum: f64 = draws.values().sum();
    if sum <= 0.0 {
        let n = draws.len().max(1) as f64;
        return draws.into_iter().map(|(v, _)| (v, 1.0 / n)).collect();
    }
    draws.into_iter().map(|(v, g)| (v, g / sum)).collect()
}

/// Draw counts from a multinomial with (possibly fractional) total `n` and
/// probability mapping `ps`. `n_f = floor(n)` integer draws come from the
/// standard sequential-binomial construction; the fractional remainder
/// `n_r` is distributed proportionally so the total sums exactly to `n`.
pub fn multinomial<V, R>(n: f64, ps: &BTreeMap<V, f64>, rng: &mut R) -> BTreeMap<V, f64>
where
    V: Ord + Clone,
    R: Rng,
{
    let n_f = n.floor();
    let n_r = n - n_f;
    let mut remaining_trials = n_f as u64;
    let mut remaining_mass = 1.0f64;
    let mut counts: BTreeMap<V, f64> = BTreeMap::new();

    for (v, &p) in ps.iter() {
        let p_cond = if remaining_mass > 1e-15 {
            (p / remaining_mass).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let c = if remaining_trials == 0 {
            0
        } else {
            Binomial::new(remaining_trials, p_cond)
                .expect("binomial params validated above")
                .sample(rng)
        };
        counts.insert(v.clone(), c as f64);
        remaining_trials = remaining_trials.saturating_sub(c);
        remaining_mass -= p;
    }

    if n_r > 0.0 {
        for (v, &p) in ps.iter() {
            if let Some(c) = counts.get_mut(v) {
                *c += n_r * p;
            }
        }
    }

    counts
}

/// `{v: α_match if v == rv else α_base}` over the contest's full vote
/// vocabulary. For noCVR strata `rv` is the `-noCVR` sentinel, which never
/// equals a real vote, so every cell falls back to `α_base` — not a special
/// case, just a consequence of the sentinel never matching.
pub fn compute_prior_pseudocounts<V>(
    votes: &[V],
    rv: &V,
    alpha_base: f64,
    alpha_match: f64,
) -> BTreeMap<V, f64>
where
    V: Ord + Clone + PartialEq,
{
    votes
        .iter()
        .map(|v| (v.clone(), if v == rv { alpha_match } else { alpha_base }))
        .collect()
}

/// `multinomial(nonsample_size, dirichlet(sample_tally ⊕ prior))`.
pub fn draw_nonsample_tally<V, R>(
    sample_tally: &BTreeMap<V, f64>,
    prior: &BTreeMap<V, f64>,
    nonsample_size: f64,
    rng: &mut R,
) -> BTreeMap<V, f64>
where
    V: Ord + Clone,
    R: Rng,
{
    let mut combined: BTreeMap<V, f64> = BTreeMap::new();
    for (v, &c) in sample_tally {
        *combined.entry(v.clone()).or_insert(0.0) += c;
    }
    for (v, &c) in prior {
        *combined.entry(v.clone()).or_insert(0.0) += c;
    }
    let probs = dirichlet(&combined, rng);
    multinomial(nonsample_size, &probs, rng)
}
