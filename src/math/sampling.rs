use rand::Rng;

/// Sample `len` integers uniformly from `[-bound, bound]`.
pub fn bounded_coefficients<R: Rng + ?Sized>(len: usize, bound: u64, rng: &mut R) -> Vec<i64> {
    let bound = bound.min(i64::MAX as u64) as i64;
    (0..len).map(|_| rng.random_range(-bound..=bound)).collect()
}

/// Sample `len` integers uniformly from `[0, max_value)`.
pub fn uniform_coefficients<R: Rng + ?Sized>(len: usize, max_value: u64, rng: &mut R) -> Vec<u64> {
    (0..len).map(|_| rng.random_range(0..max_value)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn bounded_stays_in_range_and_hits_both_signs() {
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let coeffs = bounded_coefficients(4096, 2, &mut rng);
        assert!(coeffs.iter().all(|c| (-2..=2).contains(c)));
        assert!(coeffs.iter().any(|&c| c == -2));
        assert!(coeffs.iter().any(|&c| c == 2));
    }

    #[test]
    fn zero_bound_gives_zero_poly() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        assert!(bounded_coefficients(64, 0, &mut rng).iter().all(|&c| c == 0));
    }

    #[test]
    fn test_uniform_distribution() {
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let modulus = 17u64;
        let samples = uniform_coefficients(170_000, modulus, &mut rng);
        let mut counts = vec![0usize; modulus as usize];
        for s in samples {
            counts[s as usize] += 1;
        }
        let expected = 10_000.0;
        for &count in &counts {
            assert!(
                (count as f64 - expected).abs() / expected < 0.1,
                "Distribution not uniform enough: count {count}, expected {expected}"
            );
        }
    }
}
