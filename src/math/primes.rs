//! NTT-friendly prime search.
//!
//! Primality uses Miller-Rabin with a fixed witness set, which is
//! deterministic over the whole `u64` range. `n - 1` is written as
//! `d * 2^r`; every base must either hit `1`/`n - 1` directly or reach
//! `n - 1` by repeated squaring, otherwise `n` is composite.
//! Reference:
//! https://en.wikipedia.org/wiki/Miller%E2%80%93Rabin_primality_test

use super::modular::{mod_pow, mul_mod};
use crate::errors::{HeError, HeResult};
use rand::Rng;
use std::collections::HashSet;
use tracing::debug;

// Deterministic for all n < 318,665,857,834,031,151,167,461.
// Source: https://miller-rabin.appspot.com/
const MILLER_RABIN_BASES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

/// Largest prime size accepted for ring moduli. Keeps centered
/// coefficients and their sums inside `i64`.
pub const MAX_PRIME_BITS: u32 = 62;

/// Returns `(odd_part, power_of_two)` such that `n = odd_part * 2^power_of_two`.
fn decompose(n: u64) -> (u64, u32) {
    debug_assert!(n > 0, "decompose: n must be positive");
    let mut d = n;
    let mut r = 0;
    while d & 1 == 0 {
        d >>= 1;
        r += 1;
    }
    (d, r)
}

/// Returns `true` if `n` is prime using deterministic Miller-Rabin on `u64`.
pub fn is_prime(n: u64) -> bool {
    match n {
        0 | 1 => return false,
        2 | 3 => return true,
        _ if n & 1 == 0 => return false,
        _ => {}
    }

    let (d, r) = decompose(n - 1);
    'bases: for &a in MILLER_RABIN_BASES.iter() {
        if a >= n {
            continue;
        }
        let mut x = mod_pow(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 1..r {
            x = mul_mod(x, x, n);
            if x == n - 1 {
                continue 'bases;
            }
        }
        return false;
    }
    true
}

/// Slow-but-clear reference test using `6k +/- 1` trial division.
pub fn is_prime_reference(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n == 2 || n == 3 {
        return true;
    }
    if n.is_multiple_of(2) || n.is_multiple_of(3) {
        return false;
    }
    let mut i = 5u64;
    while i.saturating_mul(i) <= n {
        if n.is_multiple_of(i) || n.is_multiple_of(i + 2) {
            return false;
        }
        i += 6;
    }
    true
}

/// Returns `true` when `p` is prime and `p = 1 (mod 2n)`, i.e. `Z_p`
/// contains a primitive `2n`-th root of unity for negacyclic NTT over
/// `X^n + 1`.
#[inline]
pub fn is_ntt_friendly_prime(p: u64, n: usize) -> bool {
    match (n as u64).checked_mul(2) {
        Some(order) if order > 0 => is_prime(p) && p % order == 1,
        _ => false,
    }
}

/// Draws a random `bit_length`-bit prime `p` with `p = 1 (mod 2n)`.
///
/// Candidates `k * 2n + 1` are visited downward from a random starting
/// point, wrapping around to the top of the range once, so the search
/// fails only when the range holds no such prime at all.
pub fn generate_prime<R: Rng + ?Sized>(
    bit_length: u32,
    degree: usize,
    rng: &mut R,
) -> HeResult<u64> {
    search_prime(bit_length, degree, &HashSet::new(), rng)
}

/// Draws one prime per entry of `bit_lengths`, pairwise distinct across
/// the whole batch.
pub fn generate_rns_bases<R: Rng + ?Sized>(
    bit_lengths: &[u32],
    degree: usize,
    rng: &mut R,
) -> HeResult<Vec<u64>> {
    let mut taken = HashSet::with_capacity(bit_lengths.len());
    let mut primes = Vec::with_capacity(bit_lengths.len());
    for &bits in bit_lengths {
        let prime = search_prime(bits, degree, &taken, rng)?;
        taken.insert(prime);
        primes.push(prime);
    }
    debug!(?bit_lengths, ?primes, degree, "generated RNS base");
    Ok(primes)
}

fn search_prime<R: Rng + ?Sized>(
    bits: u32,
    degree: usize,
    exclude: &HashSet<u64>,
    rng: &mut R,
) -> HeResult<u64> {
    if !(2..=MAX_PRIME_BITS).contains(&bits) {
        return Err(HeError::invalid(format!(
            "prime bit length must be in 2..={MAX_PRIME_BITS}, got {bits}"
        )));
    }
    if degree == 0 || !degree.is_power_of_two() {
        return Err(HeError::invalid(format!(
            "ring degree must be a power of two, got {degree}"
        )));
    }

    let step = 2 * degree as u64;
    let lower = 1u64 << (bits - 1);
    let upper = (1u64 << bits) - 1;
    // candidates are k * step + 1 within [lower, upper]
    let k_min = (lower - 1).div_ceil(step);
    let k_max = (upper - 1) / step;
    if k_min > k_max {
        return Err(HeError::NoPrimeInRange { bits, degree });
    }

    let start = rng.random_range(k_min..=k_max);
    let downward = (k_min..=start).rev();
    let wrapped = ((start + 1)..=k_max).rev();
    for k in downward.chain(wrapped) {
        let candidate = k * step + 1;
        if !exclude.contains(&candidate) && is_prime(candidate) {
            return Ok(candidate);
        }
    }
    Err(HeError::NoPrimeInRange { bits, degree })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    const KNOWN_SMALL_PRIMES: [u64; 8] = [2, 3, 5, 7, 11, 13, 17, 19];
    const KNOWN_SMALL_COMPOSITES: [u64; 10] = [0, 1, 4, 6, 8, 9, 10, 12, 15, 16];

    #[test]
    fn test_is_prime_basic() {
        for &prime in &KNOWN_SMALL_PRIMES {
            assert!(is_prime(prime));
            assert!(is_prime_reference(prime));
        }
        for &composite in &KNOWN_SMALL_COMPOSITES {
            assert!(!is_prime(composite));
            assert!(!is_prime_reference(composite));
        }
    }

    #[test]
    fn decompose_splits_power_of_two_factor() {
        assert_eq!(decompose(24), (3, 3));
        assert_eq!(decompose(40), (5, 3));
        assert_eq!(decompose(1), (1, 0));
    }

    #[test]
    fn test_is_prime_tricky_composites() {
        // Carmichael numbers and strong pseudoprimes for small base sets.
        let tricky = [561u64, 1_105, 1_729, 3_215_031_751];
        for &n in &tricky {
            assert!(!is_prime(n), "expected composite: {n}");
        }
    }

    #[test]
    fn miller_rabin_matches_reference_on_selected_ranges() {
        let ranges: [(u64, u64); 3] = [(2, 14), (10_000, 10_024), (1_000_000, 1_000_024)];
        for (start, end) in ranges {
            for n in start..=end {
                assert_eq!(is_prime(n), is_prime_reference(n), "mismatch at {n}");
            }
        }
    }

    #[test]
    fn test_ntt_friendly_condition() {
        assert!(is_ntt_friendly_prime(12289, 1024));
        assert!(!is_ntt_friendly_prime(2049, 1024));
        assert!(!is_ntt_friendly_prime(12289, 0));
    }

    #[test]
    fn generated_prime_has_requested_shape() {
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        for bits in [20u32, 30, 40, 61] {
            let p = generate_prime(bits, 1024, &mut rng).unwrap();
            assert!(is_ntt_friendly_prime(p, 1024));
            assert_eq!(64 - p.leading_zeros(), bits, "prime {p} should have {bits} bits");
        }
    }

    #[test]
    fn rns_bases_are_pairwise_distinct() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let primes = generate_rns_bases(&[20, 20, 20, 20, 30], 16, &mut rng).unwrap();
        let unique: HashSet<_> = primes.iter().copied().collect();
        assert_eq!(unique.len(), primes.len());
        for &p in &primes {
            assert!(is_ntt_friendly_prime(p, 16));
        }
    }

    #[test]
    fn exhausted_range_reports_no_prime() {
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        // 4-bit primes that are 1 mod 32 cannot exist
        assert!(matches!(
            generate_prime(4, 16, &mut rng),
            Err(HeError::NoPrimeInRange { bits: 4, degree: 16 })
        ));
        // only 17 is a 5-bit prime that is 1 mod 16; asking twice must fail
        let err = generate_rns_bases(&[5, 5], 8, &mut rng).unwrap_err();
        assert!(matches!(err, HeError::NoPrimeInRange { .. }));
    }

    #[test]
    fn rejects_out_of_range_bit_lengths() {
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        assert!(generate_prime(63, 16, &mut rng).is_err());
        assert!(generate_prime(1, 16, &mut rng).is_err());
        assert!(generate_prime(30, 12, &mut rng).is_err());
    }
}
