//! Pure tallying primitives: `compute_tally` and `compute_tally2`.

use std::collections::BTreeMap;
use std::hash::Hash;

/// Count occurrences of each distinct element in `sequence`.
///
/// `BTreeMap` is used (rather than a hash map) so the result iterates in a
/// deterministic, sorted order — the risk kernel and planner depend on that
/// for reproducible RNG call sequences.
pub fn compute_tally<T>(sequence: impl IntoIterator<Item = T>) -> BTreeMap<T, u64>
where
    T: Ord,
{
    let mut out = BTreeMap::new();
    for item in sequence {
        *out.entry(item).or_insert(0) += 1;
    }
    out
}

/// Cross-tabulate `(reported_vote, actual_vote)` pairs: for each distinct
/// reported vote `rv`, the tally of actual votes among pairs with that `rv`.
pub fn compute_tally2<R, A>(pairs: impl IntoIterator<Item = (R, A)>) -> BTreeMap<R, BTreeMap<A, u64>>
where
    R: Ord + Clone + Hash + Eq,
    A: Ord,
{
    let mut out: BTreeMap<R, BTreeMap<A, u64>> = BTreeMap::new();
    for (rv, av) in pairs {
        *out.entry(rv).or_default().entry(av).or_insert(0) += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_counts_occurrences() {
        let t = compute_tally(["a", "b", "a", "a", "c"]);
        assert_eq!(t.get("a"), Some(&3));
        assert_eq!(t.get("b"), Some(&1));
        assert_eq!(t.get("c"), Some(&1));
        assert_eq!(t.get("d"), None);
    }

    #[test]
    fn tally_empty_sequence() {
        let t: BTreeMap<&str, u64> = compute_tally(std::iter::empty());
        assert!(t.is_empty());
    }

    #[test]
    fn tally2_cross_tabulates_per_reported_vote() {
        let pairs = [("Alice", "Alice"), ("Alice", "Bob"), ("Alice", "Alice"), ("Bob", "Bob")];
        let t2 = compute_tally2(pairs);
        let alice_stratum = &t2["Alice"];
        assert_eq!(alice_stratum.get("Alice"), Some(&2));
        assert_eq!(alice_stratum.get("Bob"), Some(&1));
        let bob_stratum = &t2["Bob"];
        assert_eq!(bob_stratum.get("Bob"), Some(&1));
        assert_eq!(bob_stratum.get("Alice"), None);
    }
}
