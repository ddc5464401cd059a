//! Parameter builder and the immutable context it produces.
//!
//! ```text
//! HeParameters::new(scheme)
//!     .set_poly_modulus(13)?            // N = 2^13
//!     .set_coeff_modulus(&[30, 30, 40], rng)?
//!     .set_plain_modulus(18, rng)?
//!     .set_bound(1, 2)
//!     .generate_context()?
//! ```
//!
//! Every setter drops a previously generated context; changing the ring
//! degree also drops the primes chosen for the old degree.

use crate::errors::{HeError, HeResult};
use crate::math::modular::{centered_reduce, mod_inverse, to_unsigned};
use crate::math::primes::{MAX_PRIME_BITS, generate_prime, generate_rns_bases, is_ntt_friendly_prime};
use crate::rings::{Form, NttEngine, Polynomial, RnsPoly};
use crypto_bigint::{Encoding, NonZero, U256};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Upper limit on `log2(Q)` for the product of the RNS base.
pub const MAX_TOTAL_MODULUS_BITS: u32 = 126;

/// Upper limit on `log2(N)`.
pub const MAX_LOG_DEGREE: u32 = 17;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Bv,
    Bgv,
    Bfv,
}

impl FromStr for Scheme {
    type Err = HeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bv" => Ok(Self::Bv),
            "bgv" => Ok(Self::Bgv),
            "bfv" => Ok(Self::Bfv),
            other => Err(HeError::invalid(format!("unknown scheme '{other}'"))),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bv => "bv",
            Self::Bgv => "bgv",
            Self::Bfv => "bfv",
        };
        f.write_str(name)
    }
}

// ─── Builder ─────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct HeParameters {
    scheme: Scheme,
    degree: Option<usize>,
    coeff_primes: Option<Vec<u64>>,
    plain_modulus: Option<u64>,
    bounds: Option<(u64, u64)>,
    context: Option<Arc<HeContext>>,
}

impl HeParameters {
    pub fn new(scheme: Scheme) -> Self {
        Self {
            scheme,
            degree: None,
            coeff_primes: None,
            plain_modulus: None,
            bounds: None,
            context: None,
        }
    }

    pub fn set_scheme(mut self, scheme: Scheme) -> Self {
        self.context = None;
        self.scheme = scheme;
        self
    }

    /// Sets `N = 2^log_degree`.
    pub fn set_poly_modulus(mut self, log_degree: u32) -> HeResult<Self> {
        if log_degree == 0 || log_degree > MAX_LOG_DEGREE {
            return Err(HeError::invalid(format!(
                "poly modulus degree must be in 1..={MAX_LOG_DEGREE}, got {log_degree}"
            )));
        }
        let degree = 1usize << log_degree;
        self.context = None;
        if self.degree != Some(degree) {
            self.coeff_primes = None;
            self.plain_modulus = None;
        }
        self.degree = Some(degree);
        Ok(self)
    }

    /// Draws one distinct NTT-friendly prime per requested bit length.
    pub fn set_coeff_modulus<R: Rng + ?Sized>(
        self,
        bit_lengths: &[u32],
        rng: &mut R,
    ) -> HeResult<Self> {
        let degree = self.require_degree("coeff modulus")?;
        let total_bits: u32 = bit_lengths.iter().sum();
        if bit_lengths.is_empty() || total_bits > MAX_TOTAL_MODULUS_BITS {
            return Err(HeError::invalid(format!(
                "coeff modulus needs 1 or more primes totalling at most {MAX_TOTAL_MODULUS_BITS} bits, got {bit_lengths:?}"
            )));
        }
        let primes = generate_rns_bases(bit_lengths, degree, rng)?;
        self.set_coeff_primes(primes)
    }

    /// Uses the given primes as the RNS base.
    pub fn set_coeff_primes(mut self, primes: Vec<u64>) -> HeResult<Self> {
        let degree = self.require_degree("coeff modulus")?;
        if primes.is_empty() {
            return Err(HeError::invalid("RNS base must contain at least one prime"));
        }
        for (i, &p) in primes.iter().enumerate() {
            check_prime(p, degree)?;
            if primes[..i].contains(&p) {
                return Err(HeError::invalid(format!("duplicate RNS prime {p}")));
            }
        }
        total_modulus(&primes)?;
        self.context = None;
        self.coeff_primes = Some(primes);
        Ok(self)
    }

    pub fn set_plain_modulus<R: Rng + ?Sized>(self, bits: u32, rng: &mut R) -> HeResult<Self> {
        let degree = self.require_degree("plain modulus")?;
        let prime = generate_prime(bits, degree, rng)?;
        self.set_plain_prime(prime)
    }

    pub fn set_plain_prime(mut self, prime: u64) -> HeResult<Self> {
        let degree = self.require_degree("plain modulus")?;
        check_prime(prime, degree)?;
        self.context = None;
        self.plain_modulus = Some(prime);
        Ok(self)
    }

    /// Secret-key sampling bound and fresh-ciphertext error bound.
    pub fn set_bound(mut self, secret_key_bound: u64, first_error_bound: u64) -> Self {
        self.context = None;
        self.bounds = Some((secret_key_bound, first_error_bound));
        self
    }

    /// Validates the collected settings and precomputes every table.
    pub fn generate_context(mut self) -> HeResult<Self> {
        let missing = |what: &str| HeError::ContextNotReady(format!("{what} not set"));
        let degree = self.degree.ok_or_else(|| missing("poly modulus"))?;
        let base = self.coeff_primes.clone().ok_or_else(|| missing("coeff modulus"))?;
        let plain_modulus = self.plain_modulus.ok_or_else(|| missing("plain modulus"))?;
        let (secret_key_bound, first_error_bound) =
            self.bounds.ok_or_else(|| missing("bounds"))?;

        let context = HeContext::new(
            self.scheme,
            degree,
            base,
            plain_modulus,
            secret_key_bound,
            first_error_bound,
        )?;
        self.context = Some(Arc::new(context));
        Ok(self)
    }

    pub fn is_ready(&self) -> bool {
        self.context.is_some()
    }

    /// The generated context, or `ContextNotReady`.
    pub fn context(&self) -> HeResult<&Arc<HeContext>> {
        self.context.as_ref().ok_or_else(|| {
            HeError::ContextNotReady("generate_context has not completed".into())
        })
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn degree(&self) -> Option<usize> {
        self.degree
    }

    fn require_degree(&self, what: &str) -> HeResult<usize> {
        self.degree.ok_or_else(|| {
            HeError::invalid(format!("poly modulus must be set before the {what}"))
        })
    }
}

impl fmt::Display for HeParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            Some(ctx) => write!(
                f,
                "{} N={} base={:?} t={} bounds=(sk {}, err {})",
                ctx.scheme,
                ctx.degree,
                ctx.rns_base,
                ctx.plain_modulus,
                ctx.secret_key_bound,
                ctx.first_error_bound
            ),
            None => write!(f, "{} (context not generated)", self.scheme),
        }
    }
}

fn check_prime(p: u64, degree: usize) -> HeResult<()> {
    if p >= 1u64 << MAX_PRIME_BITS || !is_ntt_friendly_prime(p, degree) {
        return Err(HeError::invalid(format!(
            "{p} is not an NTT-friendly prime below 2^{MAX_PRIME_BITS} for N={degree}"
        )));
    }
    Ok(())
}

fn total_modulus(primes: &[u64]) -> HeResult<u128> {
    let limit = 1u128 << MAX_TOTAL_MODULUS_BITS;
    primes
        .iter()
        .try_fold(1u128, |acc, &p| acc.checked_mul(p as u128))
        .filter(|&q| q < limit)
        .ok_or_else(|| {
            HeError::invalid(format!(
                "product of RNS base exceeds 2^{MAX_TOTAL_MODULUS_BITS}"
            ))
        })
}

// ─── Context ─────────────────────────────────────────────────────────────────

/// Everything downstream components need, fixed once built.
#[derive(Debug)]
pub struct HeContext {
    scheme: Scheme,
    degree: usize,
    rns_base: Vec<u64>,
    plain_modulus: u64,
    total_modulus: u128,
    crt_basis: Vec<u128>,
    secret_key_bound: u64,
    first_error_bound: u64,
    rns_engines: Vec<Arc<NttEngine>>,
    plain_engine: Arc<NttEngine>,
}

impl HeContext {
    fn new(
        scheme: Scheme,
        degree: usize,
        rns_base: Vec<u64>,
        plain_modulus: u64,
        secret_key_bound: u64,
        first_error_bound: u64,
    ) -> HeResult<Self> {
        let total = total_modulus(&rns_base)?;
        // basis_i = (Q / p_i) * ((Q / p_i)^-1 mod p_i), so sum r_i * basis_i = x mod Q
        let crt_basis = rns_base
            .iter()
            .map(|&p| {
                let cofactor = total / p as u128;
                let inv = mod_inverse((cofactor % p as u128) as u64, p)?;
                Ok(cofactor * inv as u128)
            })
            .collect::<HeResult<Vec<_>>>()?;

        let rns_engines = rns_base
            .iter()
            .map(|&p| NttEngine::new(degree, p).map(Arc::new))
            .collect::<HeResult<Vec<_>>>()?;
        let plain_engine = Arc::new(NttEngine::new(degree, plain_modulus)?);

        debug!(
            %scheme,
            degree,
            ?rns_base,
            plain_modulus,
            total_modulus_bits = 128 - total.leading_zeros(),
            "generated HE context"
        );

        Ok(Self {
            scheme,
            degree,
            rns_base,
            plain_modulus,
            total_modulus: total,
            crt_basis,
            secret_key_bound,
            first_error_bound,
            rns_engines,
            plain_engine,
        })
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn rns_base(&self) -> &[u64] {
        &self.rns_base
    }

    pub fn plain_modulus(&self) -> u64 {
        self.plain_modulus
    }

    /// `Q`, the product of the RNS base.
    pub fn total_modulus(&self) -> u128 {
        self.total_modulus
    }

    pub fn crt_basis(&self) -> &[u128] {
        &self.crt_basis
    }

    pub fn secret_key_bound(&self) -> u64 {
        self.secret_key_bound
    }

    pub fn first_error_bound(&self) -> u64 {
        self.first_error_bound
    }

    pub fn rns_engines(&self) -> &[Arc<NttEngine>] {
        &self.rns_engines
    }

    pub fn plain_engine(&self) -> &Arc<NttEngine> {
        &self.plain_engine
    }

    /// Engine for any modulus known to this context.
    pub fn engine(&self, modulus: u64) -> Option<&Arc<NttEngine>> {
        if modulus == self.plain_modulus {
            return Some(&self.plain_engine);
        }
        self.rns_engines.iter().find(|e| e.modulus() == modulus)
    }

    /// Zero over the RNS base with every engine attached.
    pub fn zero_rns_poly(&self, form: Form) -> HeResult<RnsPoly> {
        RnsPoly::zero(&self.rns_base, self.degree, form)?.with_engines(&self.rns_engines)
    }

    /// COEFF-form plaintext over `t` with the plaintext engine attached.
    pub fn plain_poly(&self, coeffs: Vec<i64>) -> HeResult<Polynomial> {
        Polynomial::new(self.plain_modulus, self.degree, coeffs, Form::Coeff)?
            .with_engine(Arc::clone(&self.plain_engine))
    }

    /// RNS decomposition of a COEFF-form polynomial.
    pub fn eval_rns(&self, poly: &Polynomial) -> HeResult<RnsPoly> {
        let mut out = self.zero_rns_poly(Form::Coeff)?;
        out.eval_rns(poly)?;
        Ok(out)
    }

    /// CRT reconstruction of one coefficient, centered modulo `Q`.
    pub fn reconstruct_coeff(&self, residues: &[u64]) -> HeResult<i128> {
        if residues.len() != self.rns_base.len() {
            return Err(HeError::SizeMismatch {
                lhs: self.rns_base.len(),
                rhs: residues.len(),
            });
        }
        let q = Option::<NonZero<U256>>::from(NonZero::new(U256::from_u128(self.total_modulus)))
            .ok_or_else(|| HeError::invalid("total modulus is zero"))?;
        let mut acc = U256::ZERO;
        for (&r, &b) in residues.iter().zip(&self.crt_basis) {
            let term = U256::from_u128(r as u128).wrapping_mul(&U256::from_u128(b));
            acc = acc.wrapping_add(&term);
        }
        let reduced = acc.rem(&q);
        let mut low = [0u8; 16];
        low.copy_from_slice(&reduced.to_le_bytes()[..16]);
        let value = u128::from_le_bytes(low);
        let centered = if value > self.total_modulus / 2 {
            value as i128 - self.total_modulus as i128
        } else {
            value as i128
        };
        Ok(centered)
    }

    /// CRT-reconstructs every coefficient of a COEFF-form RNS polynomial and
    /// reduces the result into the plaintext ring.
    pub fn recover_plain(&self, poly: &RnsPoly) -> HeResult<Polynomial> {
        if poly.is_ntt_form() {
            return Err(HeError::FormState(
                "CRT reconstruction needs coefficient form".into(),
            ));
        }
        if poly.base() != self.rns_base.as_slice() {
            return Err(HeError::RnsBaseMismatch {
                expected: self.rns_base.clone(),
                actual: poly.base().to_vec(),
            });
        }
        let t = self.plain_modulus;
        let mut residues = vec![0u64; self.rns_base.len()];
        let mut coeffs = Vec::with_capacity(self.degree);
        for i in 0..self.degree {
            for (slot, component) in residues.iter_mut().zip(poly.components()) {
                *slot = to_unsigned(component.coeff(i), component.modulus());
            }
            let value = self.reconstruct_coeff(&residues)?;
            coeffs.push(centered_reduce(value, t));
        }
        Polynomial::from_centered(t, self.degree, coeffs, Form::Coeff)
            .with_engine(Arc::clone(&self.plain_engine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn small_params() -> HeParameters {
        HeParameters::new(Scheme::Bfv)
            .set_poly_modulus(4)
            .unwrap()
            .set_coeff_primes(vec![97, 193, 257])
            .unwrap()
            .set_plain_prime(353)
            .unwrap()
            .set_bound(1, 2)
            .generate_context()
            .unwrap()
    }

    #[test]
    fn scheme_parses_case_insensitively() {
        assert_eq!("BGV".parse::<Scheme>().unwrap(), Scheme::Bgv);
        assert_eq!("bfv".parse::<Scheme>().unwrap(), Scheme::Bfv);
        assert!("ckks".parse::<Scheme>().is_err());
    }

    #[test]
    fn crt_basis_is_idempotent_per_prime() {
        let params = small_params();
        let ctx = params.context().unwrap();
        assert_eq!(ctx.total_modulus(), 97 * 193 * 257);
        for (i, &p) in ctx.rns_base().iter().enumerate() {
            for (j, &b) in ctx.crt_basis().iter().enumerate() {
                let expected = if i == j { 1 } else { 0 };
                assert_eq!(b % p as u128, expected);
            }
        }
    }

    #[test]
    fn reconstruct_recovers_signed_values() {
        let params = small_params();
        let ctx = params.context().unwrap();
        for value in [-2_000_000i128, -1, 0, 1, 42, 2_400_000] {
            let residues: Vec<u64> = ctx
                .rns_base()
                .iter()
                .map(|&p| crate::math::reduce(value, p))
                .collect();
            assert_eq!(ctx.reconstruct_coeff(&residues).unwrap(), value);
        }
        assert!(ctx.reconstruct_coeff(&[1, 2]).is_err());
    }

    #[test]
    fn missing_settings_block_context() {
        let err = HeParameters::new(Scheme::Bv)
            .set_poly_modulus(4)
            .unwrap()
            .set_bound(1, 1)
            .generate_context()
            .unwrap_err();
        assert!(matches!(err, HeError::ContextNotReady(_)));

        let params = HeParameters::new(Scheme::Bv);
        assert!(matches!(params.context(), Err(HeError::ContextNotReady(_))));
    }

    #[test]
    fn setters_invalidate_context() {
        let params = small_params().set_bound(2, 2);
        assert!(!params.is_ready());
        // changing N drops primes chosen for the old N
        let params = small_params().set_poly_modulus(5).unwrap();
        assert!(matches!(
            params.generate_context(),
            Err(HeError::ContextNotReady(_))
        ));
    }

    #[test]
    fn rejects_bad_primes() {
        let base = HeParameters::new(Scheme::Bv).set_poly_modulus(4).unwrap();
        assert!(base.clone().set_coeff_primes(vec![97, 97]).is_err());
        assert!(base.clone().set_coeff_primes(vec![101]).is_err());
        assert!(base.clone().set_coeff_primes(vec![]).is_err());
        assert!(base.set_plain_prime(19).is_err());
        assert!(
            HeParameters::new(Scheme::Bv)
                .set_coeff_primes(vec![97])
                .is_err()
        );
    }

    #[test]
    fn generated_moduli_respect_bit_budget() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let base = HeParameters::new(Scheme::Bgv).set_poly_modulus(10).unwrap();
        assert!(base.clone().set_coeff_modulus(&[62, 62, 20], &mut rng).is_err());
        let params = base
            .set_coeff_modulus(&[30, 30, 40], &mut rng)
            .unwrap()
            .set_plain_modulus(18, &mut rng)
            .unwrap()
            .set_bound(1, 2)
            .generate_context()
            .unwrap();
        let ctx = params.context().unwrap();
        assert_eq!(ctx.rns_base().len(), 3);
        assert!(ctx.engine(ctx.plain_modulus()).is_some());
        assert!(ctx.engine(ctx.rns_base()[2]).is_some());
    }

    #[test]
    fn recover_plain_roundtrips_decomposition() {
        let params = small_params();
        let ctx = params.context().unwrap();
        let plain = ctx.plain_poly(vec![3, -8, 0, 5, 1]).unwrap();
        let rns = ctx.eval_rns(&plain).unwrap();
        assert_eq!(ctx.recover_plain(&rns).unwrap(), plain);
    }
}
