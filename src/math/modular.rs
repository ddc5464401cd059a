//! Integer reduction helpers shared by every ring type.
//!
//! Coefficients are kept in centered form `(-m/2, m/2]` throughout the
//! crate. Plain `[0, m)` residues only appear at the NTT boundary and
//! inside CRT reconstruction.

use crate::errors::{HeError, HeResult};

/// Standard non-negative residue of `n` modulo `m`.
#[inline]
pub fn reduce(n: i128, m: u64) -> u64 {
    debug_assert!(m > 0, "reduce: modulus must be positive");
    n.rem_euclid(m as i128) as u64
}

/// Residue of `n` modulo `m` in `(-m/2, m/2]`.
#[inline]
pub fn centered_reduce(n: i128, m: u64) -> i64 {
    let r = reduce(n, m);
    if r > m / 2 {
        (r as i128 - m as i128) as i64
    } else {
        r as i64
    }
}

/// Maps a centered residue back into `[0, m)`.
#[inline]
pub(crate) fn to_unsigned(c: i64, m: u64) -> u64 {
    if c < 0 { (c as i128 + m as i128) as u64 } else { c as u64 }
}

/// Computes `(a * b) mod modulus` using `u128` intermediate arithmetic.
#[inline]
pub(crate) fn mul_mod(a: u64, b: u64, modulus: u64) -> u64 {
    ((a as u128 * b as u128) % modulus as u128) as u64
}

#[inline]
pub(crate) fn add_mod(a: u64, b: u64, q: u64) -> u64 {
    let s = a as u128 + b as u128;
    if s >= q as u128 { (s - q as u128) as u64 } else { s as u64 }
}

#[inline]
pub(crate) fn sub_mod(a: u64, b: u64, q: u64) -> u64 {
    if a >= b { a - b } else { a + (q - b) }
}

/// Computes `base^exp mod modulus` via binary exponentiation.
pub(crate) fn mod_pow(mut base: u64, mut exp: u64, modulus: u64) -> u64 {
    if modulus == 1 {
        return 0;
    }
    let mut acc = 1u64;
    base %= modulus;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = mul_mod(acc, base, modulus);
        }
        base = mul_mod(base, base, modulus);
        exp >>= 1;
    }
    acc
}

/// Inverse of `a` modulo `m` via the extended Euclidean algorithm.
///
/// Fails with [`HeError::NoInverse`] when `gcd(a, m) != 1`.
pub fn mod_inverse(a: u64, m: u64) -> HeResult<u64> {
    if m == 0 {
        return Err(HeError::NoInverse {
            value: a as i128,
            modulus: 0,
        });
    }
    let (mut old_r, mut r) = ((a % m) as i128, m as i128);
    let (mut old_s, mut s) = (1i128, 0i128);
    while r != 0 {
        let quotient = old_r / r;
        (old_r, r) = (r, old_r - quotient * r);
        (old_s, s) = (s, old_s - quotient * s);
    }
    if old_r != 1 {
        return Err(HeError::NoInverse {
            value: a as i128,
            modulus: m as i128,
        });
    }
    Ok(old_s.rem_euclid(m as i128) as u64)
}
