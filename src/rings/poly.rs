use super::ntt::NttEngine;
use crate::errors::{HeError, HeResult};
use crate::math::modular::{centered_reduce, to_unsigned};
use std::sync::Arc;

/// Which representation a polynomial's coefficient vector holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Form {
    /// Coefficients of `X^0 .. X^{N-1}`, trailing zeros trimmed.
    Coeff,
    /// NTT evaluations in bit-reversed order, always exactly `N` long.
    Ntt,
}

/// An element of `Z_q[X] / (X^N + 1)` for a single modulus `q`.
///
/// # Invariants
/// - every coefficient lies in `(-q/2, q/2]`
/// - `Form::Coeff` vectors carry no trailing zeros and are at most `N` long
/// - `Form::Ntt` vectors are exactly `N` long
/// - an attached engine matches `(N, q)`
#[derive(Clone, Debug)]
pub struct Polynomial {
    modulus: u64,
    degree: usize,
    coeffs: Vec<i64>,
    form: Form,
    engine: Option<Arc<NttEngine>>,
}

// ─── Constructors ─────────────────────────────────────────────────────────────

impl Polynomial {
    /// Builds a polynomial from signed coefficients, reducing each one into
    /// centered form. Shorter NTT vectors are zero-padded to `N`.
    pub fn new(modulus: u64, degree: usize, coeffs: Vec<i64>, form: Form) -> HeResult<Self> {
        validate_ring(modulus, degree)?;
        if coeffs.len() > degree {
            return Err(HeError::RingMismatch(format!(
                "{} coefficients do not fit ring degree {degree}",
                coeffs.len()
            )));
        }
        let coeffs = coeffs
            .into_iter()
            .map(|c| centered_reduce(c as i128, modulus))
            .collect();
        Ok(Self::from_centered(modulus, degree, coeffs, form))
    }

    /// Builds a polynomial from non-negative residues (any size; reduced
    /// modulo `q`).
    pub fn from_residues(
        modulus: u64,
        degree: usize,
        residues: &[u64],
        form: Form,
    ) -> HeResult<Self> {
        validate_ring(modulus, degree)?;
        if residues.len() > degree {
            return Err(HeError::RingMismatch(format!(
                "{} residues do not fit ring degree {degree}",
                residues.len()
            )));
        }
        let coeffs = residues
            .iter()
            .map(|&r| centered_reduce(r as i128, modulus))
            .collect();
        Ok(Self::from_centered(modulus, degree, coeffs, form))
    }

    pub fn zero(modulus: u64, degree: usize, form: Form) -> HeResult<Self> {
        Self::new(modulus, degree, Vec::new(), form)
    }

    // Internal: coefficients already centered and at most `degree` long.
    pub(crate) fn from_centered(
        modulus: u64,
        degree: usize,
        coeffs: Vec<i64>,
        form: Form,
    ) -> Self {
        let mut poly = Self {
            modulus,
            degree,
            coeffs,
            form,
            engine: None,
        };
        poly.normalize_len();
        poly
    }

    /// Attaches the NTT engine for `(N, q)`.
    pub fn with_engine(mut self, engine: Arc<NttEngine>) -> HeResult<Self> {
        self.set_engine(engine)?;
        Ok(self)
    }

    pub fn set_engine(&mut self, engine: Arc<NttEngine>) -> HeResult<()> {
        if engine.modulus() != self.modulus || engine.degree() != self.degree {
            return Err(HeError::RingMismatch(format!(
                "engine for (N={}, q={}) attached to polynomial over (N={}, q={})",
                engine.degree(),
                engine.modulus(),
                self.degree,
                self.modulus
            )));
        }
        self.engine = Some(engine);
        Ok(())
    }
}

// ─── Accessors ───────────────────────────────────────────────────────────────

impl Polynomial {
    pub fn modulus(&self) -> u64 {
        self.modulus
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn form(&self) -> Form {
        self.form
    }

    pub fn is_ntt_form(&self) -> bool {
        self.form == Form::Ntt
    }

    pub fn engine(&self) -> Option<&Arc<NttEngine>> {
        self.engine.as_ref()
    }

    /// Stored coefficients (compressed in COEFF form).
    pub fn coeffs(&self) -> &[i64] {
        &self.coeffs
    }

    /// Coefficient `i`, zero past the stored length.
    pub fn coeff(&self, i: usize) -> i64 {
        self.coeffs.get(i).copied().unwrap_or(0)
    }

    /// All `N` values as residues in `[0, q)`.
    pub fn residues(&self) -> Vec<u64> {
        let mut out: Vec<u64> = self
            .coeffs
            .iter()
            .map(|&c| to_unsigned(c, self.modulus))
            .collect();
        out.resize(self.degree, 0);
        out
    }

    /// Infinity norm of the centered coefficients.
    pub fn norm(&self) -> u64 {
        self.coeffs
            .iter()
            .map(|c| c.unsigned_abs())
            .max()
            .unwrap_or(0)
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.iter().all(|&c| c == 0)
    }

    /// Trims trailing zero coefficients. No-op in NTT form.
    pub fn compress(&mut self) {
        if self.form == Form::Coeff {
            while self.coeffs.last() == Some(&0) {
                self.coeffs.pop();
            }
        }
    }

    fn normalize_len(&mut self) {
        match self.form {
            Form::Coeff => self.compress(),
            Form::Ntt => self.coeffs.resize(self.degree, 0),
        }
    }

    fn check_compatible(&self, other: &Self) -> HeResult<()> {
        if self.modulus != other.modulus || self.degree != other.degree || self.form != other.form {
            return Err(HeError::RingMismatch(format!(
                "(q={}, N={}, {:?}) vs (q={}, N={}, {:?})",
                self.modulus, self.degree, self.form, other.modulus, other.degree, other.form
            )));
        }
        Ok(())
    }

    fn engine_for_transform(&self) -> HeResult<Arc<NttEngine>> {
        self.engine.clone().ok_or_else(|| {
            HeError::FormState(format!(
                "no NTT engine attached for (N={}, q={})",
                self.degree, self.modulus
            ))
        })
    }
}

// ─── Arithmetic ───────────────────────────────────────────────────────────────

impl Polynomial {
    pub fn add_inplace(&mut self, other: &Self) -> HeResult<()> {
        self.check_compatible(other)?;
        self.zip_with(other, |a, b| a + b);
        Ok(())
    }

    pub fn sub_inplace(&mut self, other: &Self) -> HeResult<()> {
        self.check_compatible(other)?;
        self.zip_with(other, |a, b| a - b);
        Ok(())
    }

    pub fn neg_inplace(&mut self) {
        let q = self.modulus;
        for c in self.coeffs.iter_mut() {
            *c = centered_reduce(-(*c as i128), q);
        }
    }

    /// Ring product. Pointwise in NTT form, negacyclic schoolbook otherwise.
    pub fn mul_inplace(&mut self, other: &Self) -> HeResult<()> {
        self.check_compatible(other)?;
        let q = self.modulus;
        match self.form {
            Form::Ntt => {
                for (a, &b) in self.coeffs.iter_mut().zip(other.coeffs.iter()) {
                    *a = centered_reduce(*a as i128 * b as i128, q);
                }
            }
            Form::Coeff => {
                let n = self.degree;
                let modulus = q as i128;
                let mut acc = vec![0i128; n];
                for (i, &a) in self.coeffs.iter().enumerate() {
                    if a == 0 {
                        continue;
                    }
                    for (j, &b) in other.coeffs.iter().enumerate() {
                        let term = (a as i128 * b as i128) % modulus;
                        let k = i + j;
                        // X^N = -1
                        if k >= n {
                            acc[k - n] = (acc[k - n] - term) % modulus;
                        } else {
                            acc[k] = (acc[k] + term) % modulus;
                        }
                    }
                }
                self.coeffs = acc.into_iter().map(|c| centered_reduce(c, q)).collect();
                self.compress();
            }
        }
        Ok(())
    }

    /// Multiplies every coefficient by an integer scalar. Valid in either form.
    pub fn mul_scalar_inplace(&mut self, scalar: i64) {
        let q = self.modulus;
        let s = centered_reduce(scalar as i128, q) as i128;
        for c in self.coeffs.iter_mut() {
            *c = centered_reduce(*c as i128 * s, q);
        }
        self.compress();
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

    // Element-wise op over the zero-padded union of both vectors.
    fn zip_with(&mut self, other: &Self, op: impl Fn(i128, i128) -> i128) {
        let q = self.modulus;
        let len = self.coeffs.len().max(other.coeffs.len());
        self.coeffs.resize(len, 0);
        for (i, c) in self.coeffs.iter_mut().enumerate() {
            let b = other.coeffs.get(i).copied().unwrap_or(0);
            *c = centered_reduce(op(*c as i128, b as i128), q);
        }
        self.compress();
    }
}

// ─── Form transitions ────────────────────────────────────────────────────────

impl Polynomial {
    pub fn transform_to_ntt_form(&mut self) -> HeResult<()> {
        if self.form == Form::Ntt {
            return Err(HeError::FormState(
                "polynomial is already in NTT form".into(),
            ));
        }
        let engine = self.engine_for_transform()?;
        let mut values = self.residues();
        engine.forward(&mut values)?;
        self.coeffs = recenter(&values, self.modulus);
        self.form = Form::Ntt;
        Ok(())
    }

    pub fn transform_from_ntt_form(&mut self) -> HeResult<()> {
        if self.form == Form::Coeff {
            return Err(HeError::FormState(
                "polynomial is already in coefficient form".into(),
            ));
        }
        let engine = self.engine_for_transform()?;
        let mut values = self.residues();
        engine.inverse(&mut values)?;
        self.coeffs = recenter(&values, self.modulus);
        self.form = Form::Coeff;
        self.compress();
        Ok(())
    }
}

impl PartialEq for Polynomial {
    /// Structural equality; the attached engine is ignored.
    fn eq(&self, other: &Self) -> bool {
        self.modulus == other.modulus
            && self.degree == other.degree
            && self.form == other.form
            && self.coeffs == other.coeffs
    }
}

impl Eq for Polynomial {}

fn recenter(values: &[u64], modulus: u64) -> Vec<i64> {
    values
        .iter()
        .map(|&v| centered_reduce(v as i128, modulus))
        .collect()
}

fn validate_ring(modulus: u64, degree: usize) -> HeResult<()> {
    if modulus < 2 {
        return Err(HeError::invalid(format!("modulus must be >= 2, got {modulus}")));
    }
    if degree == 0 || !degree.is_power_of_two() {
        return Err(HeError::invalid(format!(
            "ring degree must be a power of two, got {degree}"
        )));
    }
    Ok(())
}
