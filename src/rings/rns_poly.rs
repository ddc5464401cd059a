use super::ntt::NttEngine;
use super::poly::{Form, Polynomial};
use crate::errors::{HeError, HeResult};
use crate::math::modular::centered_reduce;
use std::sync::Arc;

/// One polynomial modulo `Q = p_0 * p_1 * ... * p_{L-1}`, stored as one
/// residue [`Polynomial`] per base prime.
///
/// # Invariants
/// - `components[i].modulus() == base[i]`, primes pairwise distinct
/// - all components share the ring degree and the form flag
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RnsPoly {
    base: Vec<u64>,
    components: Vec<Polynomial>,
}

// ─── Constructors ─────────────────────────────────────────────────────────────

impl RnsPoly {
    /// The zero polynomial over `base`.
    pub fn zero(base: &[u64], degree: usize, form: Form) -> HeResult<Self> {
        let components = base
            .iter()
            .map(|&p| Polynomial::zero(p, degree, form))
            .collect::<HeResult<Vec<_>>>()?;
        Self::from_components(components)
    }

    /// Assembles residues. Degrees and forms must agree, moduli must be
    /// distinct.
    pub fn from_components(components: Vec<Polynomial>) -> HeResult<Self> {
        let Some(first) = components.first() else {
            return Err(HeError::invalid("RNS base must contain at least one prime"));
        };
        let (degree, form) = (first.degree(), first.form());
        let mut base = Vec::with_capacity(components.len());
        for c in &components {
            if c.degree() != degree || c.form() != form {
                return Err(HeError::RingMismatch(format!(
                    "RNS component over q={} has (N={}, {:?}), expected (N={degree}, {form:?})",
                    c.modulus(),
                    c.degree(),
                    c.form()
                )));
            }
            if base.contains(&c.modulus()) {
                return Err(HeError::invalid(format!(
                    "duplicate RNS prime {}",
                    c.modulus()
                )));
            }
            base.push(c.modulus());
        }
        Ok(Self { base, components })
    }

    /// Attaches one engine per base prime, positionally.
    pub fn with_engines(mut self, engines: &[Arc<NttEngine>]) -> HeResult<Self> {
        if engines.len() != self.components.len() {
            return Err(HeError::RnsBaseMismatch {
                expected: self.base.clone(),
                actual: engines.iter().map(|e| e.modulus()).collect(),
            });
        }
        for (component, engine) in self.components.iter_mut().zip(engines) {
            component.set_engine(Arc::clone(engine))?;
        }
        Ok(self)
    }
}

// ─── Accessors ───────────────────────────────────────────────────────────────

impl RnsPoly {
    pub fn base(&self) -> &[u64] {
        &self.base
    }

    pub fn components(&self) -> &[Polynomial] {
        &self.components
    }

    /// Residue modulo `prime`, if it is part of the base.
    pub fn component(&self, prime: u64) -> Option<&Polynomial> {
        self.base
            .iter()
            .position(|&p| p == prime)
            .map(|i| &self.components[i])
    }

    pub fn degree(&self) -> usize {
        self.components[0].degree()
    }

    pub fn form(&self) -> Form {
        self.components[0].form()
    }

    pub fn is_ntt_form(&self) -> bool {
        self.form() == Form::Ntt
    }

    pub fn is_zero(&self) -> bool {
        self.components.iter().all(Polynomial::is_zero)
    }

    fn check_base(&self, other: &Self) -> HeResult<()> {
        if self.base != other.base {
            return Err(HeError::RnsBaseMismatch {
                expected: self.base.clone(),
                actual: other.base.clone(),
            });
        }
        Ok(())
    }

    /// Forward RNS decomposition of `poly` onto this polynomial's base,
    /// keeping the attached engines. The result is in COEFF form.
    fn decompose(&self, poly: &Polynomial) -> HeResult<Self> {
        if poly.is_ntt_form() {
            return Err(HeError::FormState(
                "RNS decomposition needs a coefficient-form polynomial".into(),
            ));
        }
        if poly.degree() != self.degree() {
            return Err(HeError::RingMismatch(format!(
                "cannot decompose degree {} polynomial onto degree {} base",
                poly.degree(),
                self.degree()
            )));
        }
        let components = self
            .components
            .iter()
            .map(|target| {
                let p = target.modulus();
                let coeffs = poly
                    .coeffs()
                    .iter()
                    .map(|&c| centered_reduce(c as i128, p))
                    .collect();
                let mut residue = Polynomial::from_centered(p, poly.degree(), coeffs, Form::Coeff);
                if let Some(engine) = target.engine() {
                    residue.set_engine(Arc::clone(engine))?;
                }
                Ok(residue)
            })
            .collect::<HeResult<Vec<_>>>()?;
        Ok(Self {
            base: self.base.clone(),
            components,
        })
    }
}

// ─── Per-component plumbing ──────────────────────────────────────────────────

impl RnsPoly {
    fn for_each_component<F>(&mut self, op: F) -> HeResult<()>
    where
        F: Fn(&mut Polynomial) -> HeResult<()> + Send + Sync,
    {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            self.components.par_iter_mut().try_for_each(op)
        }
        #[cfg(not(feature = "parallel"))]
        {
            self.components.iter_mut().try_for_each(op)
        }
    }

    fn zip_apply<F>(&mut self, other: &Self, op: F) -> HeResult<()>
    where
        F: Fn(&mut Polynomial, &Polynomial) -> HeResult<()> + Send + Sync,
    {
        self.check_base(other)?;
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            self.components
                .par_iter_mut()
                .zip(other.components.par_iter())
                .try_for_each(|(a, b)| op(a, b))
        }
        #[cfg(not(feature = "parallel"))]
        {
            self.components
                .iter_mut()
                .zip(other.components.iter())
                .try_for_each(|(a, b)| op(a, b))
        }
    }
}

// ─── Arithmetic ───────────────────────────────────────────────────────────────

impl RnsPoly {
    pub fn add_inplace(&mut self, other: &Self) -> HeResult<()> {
        self.zip_apply(other, |a, b| a.add_inplace(b))
    }

    pub fn sub_inplace(&mut self, other: &Self) -> HeResult<()> {
        self.zip_apply(other, |a, b| a.sub_inplace(b))
    }

    pub fn mul_inplace(&mut self, other: &Self) -> HeResult<()> {
        self.zip_apply(other, |a, b| a.mul_inplace(b))
    }

    pub fn neg_inplace(&mut self) {
        for c in self.components.iter_mut() {
            c.neg_inplace();
        }
    }

    pub fn mul_scalar_inplace(&mut self, scalar: i64) {
        for c in self.components.iter_mut() {
            c.mul_scalar_inplace(scalar);
        }
    }

    /// Multiplies component `i` by `residues[i]`. Lets a scalar known only
    /// through its residues (e.g. `1/6 mod p_i`) act on the whole element.
    pub fn mul_residues_inplace(&mut self, residues: &[u64]) -> HeResult<()> {
        if residues.len() != self.components.len() {
            return Err(HeError::SizeMismatch {
                lhs: self.components.len(),
                rhs: residues.len(),
            });
        }
        for (c, &r) in self.components.iter_mut().zip(residues) {
            c.mul_scalar_inplace(centered_reduce(r as i128, c.modulus()));
        }
        Ok(())
    }

    /// Replaces the residues with the RNS decomposition of `poly`, a single
    /// polynomial whose coefficients may exceed every base prime.
    pub fn eval_rns(&mut self, poly: &Polynomial) -> HeResult<()> {
        *self = self.decompose(poly)?;
        Ok(())
    }

    pub fn add_poly_inplace(&mut self, poly: &Polynomial) -> HeResult<()> {
        let rhs = self.lift_plain(poly)?;
        self.add_inplace(&rhs)
    }

    pub fn sub_poly_inplace(&mut self, poly: &Polynomial) -> HeResult<()> {
        let rhs = self.lift_plain(poly)?;
        self.sub_inplace(&rhs)
    }

    pub fn mul_poly_inplace(&mut self, poly: &Polynomial) -> HeResult<()> {
        let rhs = self.lift_plain(poly)?;
        self.mul_inplace(&rhs)
    }

    // Decomposes a COEFF plaintext and brings it to this element's form.
    fn lift_plain(&self, poly: &Polynomial) -> HeResult<Self> {
        let mut rhs = self.decompose(poly)?;
        if self.is_ntt_form() {
            rhs.transform_to_ntt_form()?;
        }
        Ok(rhs)
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

// ─── Form transitions & comparison ───────────────────────────────────────────

impl RnsPoly {
    pub fn transform_to_ntt_form(&mut self) -> HeResult<()> {
        self.for_each_component(Polynomial::transform_to_ntt_form)
    }

    pub fn transform_from_ntt_form(&mut self) -> HeResult<()> {
        self.for_each_component(Polynomial::transform_from_ntt_form)
    }

    /// Value equality independent of the form each side is held in.
    pub fn equal(&self, other: &Self) -> HeResult<bool> {
        self.check_base(other)?;
        if self.form() == other.form() {
            return Ok(self == other);
        }
        let mut aligned = other.clone();
        match self.form() {
            Form::Ntt => aligned.transform_to_ntt_form()?,
            Form::Coeff => aligned.transform_from_ntt_form()?,
        }
        Ok(*self == aligned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: [u64; 2] = [97, 193];
    const N: usize = 16;

    fn engines() -> Vec<Arc<NttEngine>> {
        BASE.iter()
            .map(|&p| Arc::new(NttEngine::new(N, p).unwrap()))
            .collect()
    }

    fn zero() -> RnsPoly {
        RnsPoly::zero(&BASE, N, Form::Coeff)
            .unwrap()
            .with_engines(&engines())
            .unwrap()
    }

    fn from_plain(coeffs: &[i64]) -> RnsPoly {
        let plain = Polynomial::new(65537, N, coeffs.to_vec(), Form::Coeff).unwrap();
        let mut r = zero();
        r.eval_rns(&plain).unwrap();
        r
    }

    #[test]
    fn eval_rns_centers_per_prime() {
        let r = from_plain(&[100, -300, 5]);
        assert_eq!(r.component(97).unwrap().coeffs(), &[3, -9, 5]);
        assert_eq!(r.component(193).unwrap().coeffs(), &[-93, 86, 5]);
        assert!(r.component(17).is_none());
    }

    #[test]
    fn zero_rejects_duplicate_or_empty_base() {
        assert!(RnsPoly::zero(&[97, 97], N, Form::Coeff).is_err());
        assert!(RnsPoly::zero(&[], N, Form::Coeff).is_err());
    }

    #[test]
    fn base_mismatch_is_reported() {
        let a = zero();
        let b = RnsPoly::zero(&[97, 257], N, Form::Coeff).unwrap();
        assert!(matches!(a.add(&b), Err(HeError::RnsBaseMismatch { .. })));
    }

    #[test]
    fn poly_ops_in_ntt_form_match_coeff_form() {
        let a = from_plain(&[1, 2, 3]);
        let plain = Polynomial::new(65537, N, vec![4, 0, -1], Form::Coeff).unwrap();

        let mut coeff = a.clone();
        coeff.mul_poly_inplace(&plain).unwrap();
        coeff.add_poly_inplace(&plain).unwrap();

        let mut ntt = a.clone();
        ntt.transform_to_ntt_form().unwrap();
        ntt.mul_poly_inplace(&plain).unwrap();
        ntt.add_poly_inplace(&plain).unwrap();
        assert!(ntt.is_ntt_form());
        assert!(ntt.equal(&coeff).unwrap());

        ntt.transform_from_ntt_form().unwrap();
        assert_eq!(ntt, coeff);
    }

    #[test]
    fn sub_poly_cancels() {
        let mut a = from_plain(&[7, -7, 1]);
        let plain = Polynomial::new(65537, N, vec![7, -7, 1], Form::Coeff).unwrap();
        a.sub_poly_inplace(&plain).unwrap();
        assert!(a.is_zero());
    }

    #[test]
    fn residue_scaling() {
        let mut a = from_plain(&[6]);
        let inv6: Vec<u64> = BASE
            .iter()
            .map(|&p| crate::math::mod_inverse(6, p).unwrap())
            .collect();
        a.mul_residues_inplace(&inv6).unwrap();
        assert_eq!(a, from_plain(&[1]));
        assert!(a.mul_residues_inplace(&[1]).is_err());
    }

    #[test]
    fn negation_and_scalar() {
        let a = from_plain(&[2, -3]);
        let mut b = a.neg();
        b.add_inplace(&a).unwrap();
        assert!(b.is_zero());
        let mut c = a.clone();
        c.mul_scalar_inplace(3);
        assert_eq!(c, from_plain(&[6, -9]));
    }
}
