//! Negacyclic NTT over `Z_q[X] / (X^N + 1)`.
//!
//! The forward transform is a Cooley-Tukey network (natural order in,
//! bit-reversed order out) and the inverse is a Gentleman-Sande network
//! (bit-reversed in, natural out). Both use bit-reversed powers of a
//! primitive `2N`-th root `psi` directly, which folds the negacyclic twist
//! into the butterflies.
//!
//! Stages depend on each other; the butterflies inside a stage do not.

use crate::errors::{HeError, HeResult};
use crate::math::modular::{add_mod, mod_inverse, mod_pow, mul_mod, sub_mod};
use crate::math::primes::is_ntt_friendly_prime;

/// Precomputed twiddle tables for one `(N, q)` pair. Immutable once built
/// and shared behind an `Arc` by every polynomial over the same ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NttEngine {
    degree: usize,
    modulus: u64,
    psi: u64,
    psi_inv: u64,
    n_inv: u64,
    forward_table: Vec<u64>,
    inverse_table: Vec<u64>,
}

impl NttEngine {
    pub fn new(degree: usize, modulus: u64) -> HeResult<Self> {
        if degree < 2 || !degree.is_power_of_two() {
            return Err(HeError::invalid(format!(
                "ring degree must be a power of two >= 2, got {degree}"
            )));
        }
        if !is_ntt_friendly_prime(modulus, degree) {
            return Err(HeError::invalid(format!(
                "modulus {modulus} is not NTT-friendly for degree {degree}"
            )));
        }

        let psi = find_primitive_root(modulus, 2 * degree)?;
        // Fermat: psi^(q-2) = psi^-1 for prime q
        let psi_inv = mod_pow(psi, modulus - 2, modulus);
        let n_inv = mod_inverse(degree as u64, modulus)?;

        let bit_count = degree.trailing_zeros() as usize;
        let mut forward_table = vec![1u64; degree];
        let mut inverse_table = vec![1u64; degree];
        for index in 1..degree {
            let exponent = reverse_bits(index, bit_count) as u64;
            forward_table[index] = mod_pow(psi, exponent, modulus);
            inverse_table[index] = mod_pow(psi_inv, exponent, modulus);
        }

        Ok(Self {
            degree,
            modulus,
            psi,
            psi_inv,
            n_inv,
            forward_table,
            inverse_table,
        })
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn modulus(&self) -> u64 {
        self.modulus
    }

    /// The primitive `2N`-th root of unity the tables are built from.
    pub fn psi(&self) -> u64 {
        self.psi
    }

    pub fn psi_inv(&self) -> u64 {
        self.psi_inv
    }

    /// Forward transform in place. Input values must lie in `[0, q)`.
    pub fn forward(&self, a: &mut [u64]) -> HeResult<()> {
        self.check_len(a.len())?;
        let q = self.modulus;
        let n = self.degree;
        let mut t = n;
        let mut m = 1;
        while m < n {
            t >>= 1;
            for i in 0..m {
                let w = self.forward_table[m + i];
                let start = 2 * i * t;
                for j in start..start + t {
                    let u = a[j];
                    let v = mul_mod(a[j + t], w, q);
                    a[j] = add_mod(u, v, q);
                    a[j + t] = sub_mod(u, v, q);
                }
            }
            m <<= 1;
        }
        Ok(())
    }

    /// Inverse transform in place, including the final `N^-1` scaling.
    pub fn inverse(&self, a: &mut [u64]) -> HeResult<()> {
        self.check_len(a.len())?;
        let q = self.modulus;
        let mut t = 1;
        let mut m = self.degree >> 1;
        while m > 0 {
            for i in 0..m {
                let w = self.inverse_table[m + i];
                let start = 2 * i * t;
                for j in start..start + t {
                    let u = a[j];
                    let v = a[j + t];
                    a[j] = add_mod(u, v, q);
                    a[j + t] = mul_mod(sub_mod(u, v, q), w, q);
                }
            }
            t <<= 1;
            m >>= 1;
        }
        for value in a.iter_mut() {
            *value = mul_mod(*value, self.n_inv, q);
        }
        Ok(())
    }

    fn check_len(&self, len: usize) -> HeResult<()> {
        if len != self.degree {
            return Err(HeError::RingMismatch(format!(
                "NTT input has length {len}, engine degree is {}",
                self.degree
            )));
        }
        Ok(())
    }
}

/// Finds a primitive `order`-th root of unity in `Z_modulus`, `order` a
/// power of two dividing `modulus - 1`.
///
/// `c^((q-1)/order)` has order dividing `order`; it is primitive exactly
/// when its `order/2`-th power is `-1`.
fn find_primitive_root(modulus: u64, order: usize) -> HeResult<u64> {
    let exponent = (modulus - 1) / order as u64;
    let half = (order / 2) as u64;
    for candidate in 2..modulus {
        let root = mod_pow(candidate, exponent, modulus);
        if mod_pow(root, half, modulus) == modulus - 1 {
            return Ok(root);
        }
    }
    Err(HeError::invalid(format!(
        "no primitive {order}-th root of unity modulo {modulus}"
    )))
}

fn reverse_bits(value: usize, bit_count: usize) -> usize {
    if bit_count == 0 {
        return 0;
    }
    value.reverse_bits() >> (usize::BITS as usize - bit_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn psi_has_order_two_n() {
        let engine = NttEngine::new(8, 17).unwrap();
        let psi = engine.psi();
        assert_eq!(mod_pow(psi, 16, 17), 1);
        assert_eq!(mod_pow(psi, 8, 17), 16);
        assert_eq!(mul_mod(psi, engine.psi_inv(), 17), 1);
    }

    #[test]
    fn rejects_non_friendly_modulus() {
        assert!(matches!(
            NttEngine::new(8, 19),
            Err(HeError::InvalidParameter { .. })
        ));
        assert!(NttEngine::new(6, 13).is_err());
    }

    #[test]
    fn rejects_wrong_length_input() {
        let engine = NttEngine::new(8, 17).unwrap();
        let mut short = vec![1u64; 4];
        assert!(matches!(
            engine.forward(&mut short),
            Err(HeError::RingMismatch(_))
        ));
    }

    #[test]
    fn small_roundtrip() {
        let engine = NttEngine::new(8, 12289).unwrap();
        let original = vec![1u64, 2, 3, 4, 0, 0, 0, 0];
        let mut values = original.clone();
        engine.forward(&mut values).unwrap();
        assert_ne!(values, original);
        engine.inverse(&mut values).unwrap();
        assert_eq!(values, original);
    }

    #[test]
    fn forward_of_constant_is_constant() {
        // evaluating 5 at every odd power of psi gives 5
        let engine = NttEngine::new(16, 97).unwrap();
        let mut values = vec![0u64; 16];
        values[0] = 5;
        engine.forward(&mut values).unwrap();
        assert!(values.iter().all(|&v| v == 5));
    }

    #[test]
    fn pointwise_product_is_negacyclic_convolution() {
        // x^7 * x = x^8 = -1 in Z_q[x]/(x^8 + 1)
        let q = 12289;
        let engine = NttEngine::new(8, q).unwrap();
        let mut a = vec![0u64; 8];
        a[7] = 1;
        let mut b = vec![0u64; 8];
        b[1] = 1;
        engine.forward(&mut a).unwrap();
        engine.forward(&mut b).unwrap();
        let mut c: Vec<u64> = a.iter().zip(&b).map(|(&x, &y)| mul_mod(x, y, q)).collect();
        engine.inverse(&mut c).unwrap();
        let mut expected = vec![0u64; 8];
        expected[0] = q - 1;
        assert_eq!(c, expected);
    }

    #[test]
    fn large_prime_roundtrip() {
        let q = 1_073_750_017; // 30-bit, 1 mod 2048
        let engine = NttEngine::new(1024, q).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(9);
        let original: Vec<u64> = (0..1024).map(|_| rng.random_range(0..q)).collect();
        let mut values = original.clone();
        engine.forward(&mut values).unwrap();
        engine.inverse(&mut values).unwrap();
        assert_eq!(values, original);
    }
}
