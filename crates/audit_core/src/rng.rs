//! Audit seed handling, the SHA-256-keyed shuffle, and the ChaCha20 stream
//! used by the posterior sampler.
//!
//! The audit seed is an arbitrary-precision nonnegative decimal integer (the
//! spec requires accepting 20+ digit values). Two independent uses are
//! derived from it:
//!
//! - the audit-order shuffle (§4.3) hashes the seed string directly, once
//!   per Fisher–Yates step, and needs no fixed-width RNG state at all;
//! - the posterior sampler (Gamma/Dirichlet/Multinomial) needs a real PRNG
//!   stream, so the seed string is hashed once down to a 32-byte ChaCha20
//!   seed.

use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;
use sha2::{Digest, Sha256};

use crate::errors::CoreError;

/// An arbitrary-precision nonnegative decimal audit seed.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct AuditSeed(String);

impl AuditSeed {
    /// Parse and validate a seed string: nonempty, ASCII digits only.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CoreError::InvalidSeed(raw.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive the 32-byte ChaCha20 seed used by the continuous-distribution
    /// stream: `SHA-256(seed_string)`.
    pub fn chacha_seed(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        hasher.finalize().into()
    }

    /// Build the deterministic ChaCha20 stream for this audit.
    pub fn make_rng(&self) -> ChaCha20Rng {
        ChaCha20Rng::from_seed(self.chacha_seed())
    }
}

/// Reduce a 256-bit big-endian hash to `hash mod modulus` without ever
/// materialising the number as a 256-bit integer type: base-256 long
/// division, carrying the remainder byte by byte.
fn hash_mod(hash: &[u8; 32], modulus: u64) -> u64 {
    let mut rem: u128 = 0;
    for &byte in hash.iter() {
        rem = (rem << 8) | byte as u128;
        rem %= modulus as u128;
    }
    rem as u64
}

/// `j` at shuffle step `i` (0-based) for an arbitrary hash key:
/// `SHA-256(key || "," || i) mod (i + 1)`.
pub fn shuffle_step_index_keyed(key: &str, i: u64) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hasher.update(b",");
    hasher.update(i.to_string().as_bytes());
    let digest: [u8; 32] = hasher.finalize().into();
    hash_mod(&digest, i + 1)
}

/// `j` at Fisher–Yates step `i` (0-based), per §4.3:
/// `SHA-256(seed || "," || pbcid || "," || i) mod (i + 1)`. Equivalent to
/// `shuffle_step_index_keyed` with key `"{seed},{pbcid}"`.
pub fn shuffle_step_index(seed: &AuditSeed, pbcid: &str, i: u64) -> u64 {
    let key = format!("{},{}", seed.as_str(), pbcid);
    shuffle_step_index_keyed(&key, i)
}

/// Shuffle `items` using an arbitrary hash key directly (no audit-seed/
/// pbcid structure assumed); the primitive `audit_order` is built on.
pub fn shuffle_keyed<T>(key: &str, mut items: Vec<T>) -> Vec<T> {
    let n = items.len();
    for i in 0..n {
        let j = shuffle_step_index_keyed(key, i as u64) as usize;
        items.swap(i, j);
    }
    items
}

/// Produce the deterministic audit order for one `pbcid`: a permutation of
/// `items` (typically ballot ids in manifest order) via Fisher–Yates, where
/// the swap index at step `i` is `shuffle_step_index(seed, pbcid, i)`.
///
/// Steps run forward, `i = 0, 1, ..., n-1`, each swapping position `i` with
/// a uniformly chosen `j` in `0..=i` (so `i = 0` is always a no-op swap
/// with itself). This is the constructive mirror of the textbook backward
/// Fisher–Yates walk; it matches the reference audit tool this was ported
/// from digit-for-digit, which is what §8's literal shuffle scenario
/// checks against.
pub fn audit_order<T>(seed: &AuditSeed, pbcid: &str, items: Vec<T>) -> Vec<T> {
    let key = format!("{},{}", seed.as_str(), pbcid);
    shuffle_keyed(&key, items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_twenty_digit_seed() {
        let s = AuditSeed::parse("12345678901234567890").unwrap();
        assert_eq!(s.as_str(), "12345678901234567890");
    }

    #[test]
    fn rejects_non_digit_seed() {
        assert!(AuditSeed::parse("12a34").is_err());
        assert!(AuditSeed::parse("").is_err());
        assert!(AuditSeed::parse("-5").is_err());
    }

    #[test]
    fn shuffle_is_deterministic_given_seed_and_pbcid() {
        let seed = AuditSeed::parse("42").unwrap();
        let a = audit_order(&seed, "pbc1", vec![1, 2, 3, 4, 5]);
        let b = audit_order(&seed, "pbc1", vec![1, 2, 3, 4, 5]);
        assert_eq!(a, b);
    }

    #[test]
    fn shuffle_differs_across_pbcids() {
        let seed = AuditSeed::parse("42").unwrap();
        let a = audit_order(&seed, "pbc1", vec![1, 2, 3, 4, 5, 6, 7, 8]);
        let b = audit_order(&seed, "pbc2", vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_ne!(a, b);
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let seed = AuditSeed::parse("999999999999999999999").unwrap();
        let input: Vec<u32> = (0..50).collect();
        let mut shuffled = audit_order(&seed, "pbcX", input.clone());
        shuffled.sort_unstable();
        assert_eq!(shuffled, input);
    }

    #[test]
    fn shuffle_matches_literal_scenario_s5() {
        // spec.md §8 (S5): shuffle([1..20], seed=1234567890) against the
        // bare seed as hash key (no pbcid component), matching the
        // reference tool's own `test_shuffle`.
        let input: Vec<u32> = (0..20).collect();
        let shuffled = shuffle_keyed("1234567890", input);
        assert_eq!(
            shuffled,
            vec![12, 13, 2, 18, 3, 8, 9, 7, 17, 6, 16, 5, 11, 19, 1, 14, 10, 0, 4, 15]
        );
    }

    #[test]
    fn hash_mod_is_in_range() {
        let hash = [0xFFu8; 32];
        for m in 1..200u64 {
            assert!(hash_mod(&hash, m) < m);
        }
    }

    #[test]
    fn chacha_seed_is_stable_for_same_seed() {
        let s1 = AuditSeed::parse("7").unwrap();
        let s2 = AuditSeed::parse("7").unwrap();
        assert_eq!(s1.chacha_seed(), s2.chacha_seed());
    }
}
