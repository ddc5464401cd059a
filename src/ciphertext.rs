//! Ciphertexts as polynomials in the secret key.
//!
//! A ciphertext `[c_0, c_1, ..., c_{k-1}]` decrypts to
//! `c_0 + c_1*s + ... + c_{k-1}*s^{k-1}`. Addition is componentwise;
//! multiplication is the convolution of the two component lists, so the
//! size grows to `k_a + k_b - 1`.
//!
//! Each ciphertext carries an upper bound on its noise magnitude. The bound
//! is tracked for information only; nothing is refused when it grows.

use crate::errors::{HeError, HeResult};
use crate::params::HeContext;
use crate::rings::display::form_tag;
use crate::rings::{Form, Polynomial, RingElement, RnsPoly};
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct Ciphertext {
    components: Vec<RnsPoly>,
    error_bound: u128,
    context: Arc<HeContext>,
}

// ─── Constructors & accessors ────────────────────────────────────────────────

impl Ciphertext {
    /// Every component must live over the context's RNS base and share one
    /// form.
    pub fn new(
        context: &Arc<HeContext>,
        components: Vec<RnsPoly>,
        error_bound: u128,
    ) -> HeResult<Self> {
        let Some(first) = components.first() else {
            return Err(HeError::invalid("a ciphertext needs at least one component"));
        };
        let form = first.form();
        for c in &components {
            if c.base() != context.rns_base() {
                return Err(HeError::RnsBaseMismatch {
                    expected: context.rns_base().to_vec(),
                    actual: c.base().to_vec(),
                });
            }
            if c.form() != form || c.degree() != context.degree() {
                return Err(HeError::RingMismatch(
                    "ciphertext components disagree on form or degree".into(),
                ));
            }
        }
        Ok(Self {
            components,
            error_bound,
            context: Arc::clone(context),
        })
    }

    pub fn size(&self) -> usize {
        self.components.len()
    }

    pub fn components(&self) -> &[RnsPoly] {
        &self.components
    }

    pub fn component(&self, index: usize) -> Option<&RnsPoly> {
        self.components.get(index)
    }

    pub fn form(&self) -> Form {
        self.components[0].form()
    }

    pub fn is_ntt_form(&self) -> bool {
        self.form() == Form::Ntt
    }

    pub fn error_bound(&self) -> u128 {
        self.error_bound
    }

    pub fn context(&self) -> &Arc<HeContext> {
        &self.context
    }

    /// Whether the tracked bound still guarantees correct decryption.
    pub fn within_noise_budget(&self) -> bool {
        self.error_bound < self.context.total_modulus() / 2
    }

    fn check_compatible(&self, other: &Self) -> HeResult<()> {
        if self.form() != other.form() {
            return Err(HeError::RingMismatch(format!(
                "ciphertext forms differ: {:?} vs {:?}",
                self.form(),
                other.form()
            )));
        }
        Ok(())
    }

    fn check_same_size(&self, other: &Self) -> HeResult<()> {
        if self.size() != other.size() {
            return Err(HeError::SizeMismatch {
                lhs: self.size(),
                rhs: other.size(),
            });
        }
        self.check_compatible(other)
    }

    fn check_plain(&self, plain: &Polynomial) -> HeResult<()> {
        if plain.is_ntt_form() {
            return Err(HeError::FormState(
                "plaintext operand must be in coefficient form".into(),
            ));
        }
        if plain.degree() != self.context.degree() {
            return Err(HeError::RingMismatch(format!(
                "plaintext degree {} vs ring degree {}",
                plain.degree(),
                self.context.degree()
            )));
        }
        Ok(())
    }
}

// ─── Ciphertext-ciphertext arithmetic ────────────────────────────────────────

impl Ciphertext {
    pub fn add_inplace(&mut self, other: &Self) -> HeResult<()> {
        self.check_same_size(other)?;
        for (a, b) in self.components.iter_mut().zip(&other.components) {
            a.add_inplace(b)?;
        }
        self.error_bound = self.error_bound.saturating_add(other.error_bound);
        Ok(())
    }

    pub fn sub_inplace(&mut self, other: &Self) -> HeResult<()> {
        self.check_same_size(other)?;
        for (a, b) in self.components.iter_mut().zip(&other.components) {
            a.sub_inplace(b)?;
        }
        self.error_bound = self.error_bound.saturating_add(other.error_bound);
        Ok(())
    }

    pub fn neg_inplace(&mut self) {
        for c in self.components.iter_mut() {
            c.neg_inplace();
        }
    }

    /// `result[i + j] += a[i] * b[j]`, accumulated in a fixed order.
    pub fn mul_inplace(&mut self, other: &Self) -> HeResult<()> {
        self.check_compatible(other)?;
        let size = self.size() + other.size() - 1;
        let mut product = vec![self.context.zero_rns_poly(self.form())?; size];
        for (i, a) in self.components.iter().enumerate() {
            for (j, b) in other.components.iter().enumerate() {
                let term = a.mul(b)?;
                product[i + j].add_inplace(&term)?;
            }
        }
        self.components = product;
        self.error_bound = mul_bound(
            self.error_bound,
            other.error_bound,
            self.context.plain_modulus(),
        );
        Ok(())
    }

    pub fn add(&self, other: &Self) -> HeResult<Self> {
        let mut out = self.clone();
        out.add_inplace(other)?;
        Ok(out)
    }

    pub fn sub(&self, other: &Self) -> HeResult<Self> {
        let mut out = self.clone();
        out.sub_inplace(other)?;
        Ok(out)
    }

    pub fn mul(&self, other: &Self) -> HeResult<Self> {
        let mut out = self.clone();
        out.mul_inplace(other)?;
        Ok(out)
    }

    pub fn neg(&self) -> Self {
        let mut out = self.clone();
        out.neg_inplace();
        out
    }
}

// ─── Plaintext-mixed arithmetic ──────────────────────────────────────────────

impl Ciphertext {
    /// Adds `plain` to the constant term `c_0`.
    pub fn add_plain_inplace(&mut self, plain: &Polynomial) -> HeResult<()> {
        self.check_plain(plain)?;
        self.components[0].add_poly_inplace(plain)
    }

    pub fn sub_plain_inplace(&mut self, plain: &Polynomial) -> HeResult<()> {
        self.check_plain(plain)?;
        self.components[0].sub_poly_inplace(plain)
    }

    /// Multiplies every component by `plain`; the bound scales by its norm.
    pub fn mul_plain_inplace(&mut self, plain: &Polynomial) -> HeResult<()> {
        self.check_plain(plain)?;
        for c in self.components.iter_mut() {
            c.mul_poly_inplace(plain)?;
        }
        self.error_bound = self.error_bound.saturating_mul(plain.norm() as u128);
        Ok(())
    }

    pub fn add_plain(&self, plain: &Polynomial) -> HeResult<Self> {
        let mut out = self.clone();
        out.add_plain_inplace(plain)?;
        Ok(out)
    }

    pub fn sub_plain(&self, plain: &Polynomial) -> HeResult<Self> {
        let mut out = self.clone();
        out.sub_plain_inplace(plain)?;
        Ok(out)
    }

    pub fn mul_plain(&self, plain: &Polynomial) -> HeResult<Self> {
        let mut out = self.clone();
        out.mul_plain_inplace(plain)?;
        Ok(out)
    }
}

// ─── Form transitions ────────────────────────────────────────────────────────

impl Ciphertext {
    pub fn transform_to_ntt_form(&mut self) -> HeResult<()> {
        self.components
            .iter_mut()
            .try_for_each(RnsPoly::transform_to_ntt_form)
    }

    pub fn transform_from_ntt_form(&mut self) -> HeResult<()> {
        self.components
            .iter_mut()
            .try_for_each(RnsPoly::transform_from_ntt_form)
    }
}

/// Noise bound of a product: `bA*bB + (bA + bB)*t`.
pub fn mul_bound(lhs: u128, rhs: u128, plain_modulus: u64) -> u128 {
    lhs.saturating_mul(rhs)
        .saturating_add(lhs.saturating_add(rhs).saturating_mul(plain_modulus as u128))
}

impl PartialEq for Ciphertext {
    fn eq(&self, other: &Self) -> bool {
        self.error_bound == other.error_bound && self.components == other.components
    }
}

impl RingElement for Ciphertext {
    fn ring_add(&self, other: &Self) -> HeResult<Self> {
        self.add(other)
    }

    fn ring_sub(&self, other: &Self) -> HeResult<Self> {
        self.sub(other)
    }

    fn ring_mul(&self, other: &Self) -> HeResult<Self> {
        self.mul(other)
    }
}

impl fmt::Display for Ciphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let num = f.precision().unwrap_or(3);
        writeln!(
            f,
            "Ciphertext(size={}, {}, bound={})",
            self.size(),
            form_tag(self.form()),
            self.error_bound
        )?;
        for (i, c) in self.components.iter().enumerate() {
            writeln!(f, "  c{i}: {c:.num$}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{HeParameters, Scheme};

    fn context() -> Arc<HeContext> {
        let params = HeParameters::new(Scheme::Bv)
            .set_poly_modulus(3)
            .unwrap()
            .set_coeff_primes(vec![17, 97])
            .unwrap()
            .set_plain_prime(113)
            .unwrap()
            .set_bound(1, 2)
            .generate_context()
            .unwrap();
        Arc::clone(params.context().unwrap())
    }

    fn constant(ctx: &Arc<HeContext>, value: i64) -> RnsPoly {
        ctx.eval_rns(&ctx.plain_poly(vec![value]).unwrap()).unwrap()
    }

    fn ciphertext(ctx: &Arc<HeContext>, values: &[i64], bound: u128) -> Ciphertext {
        let components = values.iter().map(|&v| constant(ctx, v)).collect();
        Ciphertext::new(ctx, components, bound).unwrap()
    }

    #[test]
    fn add_sums_bounds() {
        let ctx = context();
        let a = ciphertext(&ctx, &[1, 2], 3);
        let b = ciphertext(&ctx, &[4, 5], 7);
        let c = a.add(&b).unwrap();
        assert_eq!(c.error_bound(), 10);
        assert_eq!(c, ciphertext(&ctx, &[5, 7], 10));
        assert_eq!(a.sub(&b).unwrap(), ciphertext(&ctx, &[-3, -3], 10));
    }

    #[test]
    fn size_mismatch_is_rejected() {
        let ctx = context();
        let a = ciphertext(&ctx, &[1, 2], 1);
        let b = ciphertext(&ctx, &[1, 2, 3], 1);
        assert!(matches!(a.add(&b), Err(HeError::SizeMismatch { lhs: 2, rhs: 3 })));
    }

    #[test]
    fn mul_convolves_components() {
        // (1 + 2s)(3 + s) = 3 + 7s + 2s^2
        let ctx = context();
        let a = ciphertext(&ctx, &[1, 2], 2);
        let b = ciphertext(&ctx, &[3, 1], 2);
        let c = a.mul(&b).unwrap();
        assert_eq!(c.size(), 3);
        assert_eq!(c.components()[0], constant(&ctx, 3));
        assert_eq!(c.components()[1], constant(&ctx, 7));
        assert_eq!(c.components()[2], constant(&ctx, 2));
        assert_eq!(c.error_bound(), 2 * 2 + 4 * 113);
    }

    #[test]
    fn plain_ops_touch_expected_components() {
        let ctx = context();
        let a = ciphertext(&ctx, &[1, 2], 5);
        let plain = ctx.plain_poly(vec![3]).unwrap();

        let added = a.add_plain(&plain).unwrap();
        assert_eq!(added, ciphertext(&ctx, &[4, 2], 5));
        let subbed = a.sub_plain(&plain).unwrap();
        assert_eq!(subbed, ciphertext(&ctx, &[-2, 2], 5));
        let scaled = a.mul_plain(&plain).unwrap();
        assert_eq!(scaled, ciphertext(&ctx, &[3, 6], 15));
    }

    #[test]
    fn plain_ops_require_coeff_form() {
        let ctx = context();
        let a = ciphertext(&ctx, &[1, 2], 1);
        let mut plain = ctx.plain_poly(vec![3]).unwrap();
        plain.transform_to_ntt_form().unwrap();
        assert!(matches!(a.add_plain(&plain), Err(HeError::FormState(_))));
    }

    #[test]
    fn ntt_roundtrip_and_mixed_forms() {
        let ctx = context();
        let a = ciphertext(&ctx, &[1, 2], 1);
        let mut b = a.clone();
        b.transform_to_ntt_form().unwrap();
        assert!(matches!(a.add(&b), Err(HeError::RingMismatch(_))));
        b.transform_from_ntt_form().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn noise_budget_and_saturation() {
        let ctx = context();
        let a = ciphertext(&ctx, &[1], 10);
        assert!(a.within_noise_budget());
        let huge = ciphertext(&ctx, &[1], u128::MAX / 2);
        assert!(!huge.within_noise_budget());
        assert_eq!(huge.mul(&huge).unwrap().error_bound(), u128::MAX);
    }

    #[test]
    fn zero_like_is_zero() {
        let ctx = context();
        let a = ciphertext(&ctx, &[4, 9], 2);
        let z = a.zero_like().unwrap();
        assert!(z.components().iter().all(RnsPoly::is_zero));
        assert_eq!(z.error_bound(), 4);
    }
}
