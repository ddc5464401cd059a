//! Sum-check over one circuit layer, with hashed ciphertexts as values.
//!
//! For gate `g` let `a_g`, `m_g` be the ADD/MULT selectors and `l_g`, `r_g`
//! the hashes of its operands. The prover claims
//!
//! ```text
//! sum_g  a_g * (l_g + r_g) + m_g * l_g * r_g
//! ```
//!
//! Each round fixes one bit of the gate index: the prover sends the cubic
//! `g(t)` at `t = 0..3`, the verifier checks `g(0) + g(1)` against its
//! running claim, draws `r`, and moves the claim to `g(r)`; the prover folds
//! every table at `r`. After `log2(width)` rounds one entry of each table is
//! left and the verifier checks the relation on it directly.
//!
//! Values are RNS ring elements in NTT form. Challenges are integers acting
//! as scalars on every residue.

use super::circuit::{Gate, GateOp, Layer};
use super::hash::cipher_hash;
use crate::ciphertext::Ciphertext;
use crate::errors::HeError;
use crate::math::modular::{mod_inverse, mul_mod, reduce, sub_mod};
use crate::rings::{Form, Polynomial, RingElement, RnsPoly};
use rand::Rng;
use std::sync::Arc;
use thiserror::Error;
use tracing::trace;

/// Smallest admissible challenge; `0..=3` are the points `g` is sent at.
pub const MIN_CHALLENGE: u64 = 4;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SumCheckError {
    /// `g(0) + g(1)` disagreed with the running claim: the proof is rejected.
    #[error("sum-check round {round}: g(0) + g(1) does not match the claim")]
    Inconsistent { round: usize },

    #[error("invalid sum-check state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Algebra(#[from] HeError),
}

pub type SumCheckResult<T> = Result<T, SumCheckError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SumCheckOutcome {
    Accept,
    Reject,
}

/// The single surviving entry of each table after the last fold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinalValues {
    pub add: RnsPoly,
    pub mult: RnsPoly,
    pub left: RnsPoly,
    pub right: RnsPoly,
}

// ─── Prover ──────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct SumCheckProver {
    add: Vec<RnsPoly>,
    mult: Vec<RnsPoly>,
    left: Vec<RnsPoly>,
    right: Vec<RnsPoly>,
    outputs: Vec<RnsPoly>,
    live: usize,
}

impl SumCheckProver {
    /// Builds the tables for `layer` from the hashes of its inputs and
    /// outputs. `add_selector` is the value ADD gates are scaled by (the
    /// hash of the layer's "one"); MULT gates use `1`.
    pub fn new(
        layer: &Layer,
        input_hashes: &[RnsPoly],
        output_hashes: Vec<RnsPoly>,
        add_selector: &RnsPoly,
    ) -> SumCheckResult<Self> {
        if !add_selector.is_ntt_form() {
            return Err(SumCheckError::InvalidState(
                "sum-check values must be in NTT form".into(),
            ));
        }
        for h in input_hashes.iter().chain(&output_hashes) {
            if !h.is_ntt_form() || h.base() != add_selector.base() {
                return Err(SumCheckError::InvalidState(
                    "hashes must share the selector's base and NTT form".into(),
                ));
            }
        }
        if output_hashes.len() != layer.width() {
            return Err(SumCheckError::InvalidState(format!(
                "{} output hashes for a layer of width {}",
                output_hashes.len(),
                layer.width()
            )));
        }

        let zero = add_selector.zero_like()?;
        let unit = unit_like(add_selector)?;
        let width = layer.width();
        let mut add = Vec::with_capacity(width);
        let mut mult = Vec::with_capacity(width);
        let mut left = Vec::with_capacity(width);
        let mut right = Vec::with_capacity(width);
        for gate in layer.gates() {
            let (a, m) = match gate.op() {
                GateOp::Add => (add_selector.clone(), zero.clone()),
                GateOp::Mult => (zero.clone(), unit.clone()),
            };
            add.push(a);
            mult.push(m);
            left.push(Gate::operand(gate.left(), input_hashes, &zero)?.clone());
            right.push(Gate::operand(gate.right(), input_hashes, &zero)?.clone());
        }

        Ok(Self {
            add,
            mult,
            left,
            right,
            outputs: output_hashes,
            live: width,
        })
    }

    /// Evaluates `layer` on `inputs` (ADD gates scaled by `one` when given),
    /// hashes everything at `point` and builds the tables.
    pub fn from_ciphertexts(
        layer: &Layer,
        inputs: &[Ciphertext],
        one: Option<&Ciphertext>,
        point: &RnsPoly,
    ) -> SumCheckResult<Self> {
        let outputs = match one {
            Some(one) => layer.evaluate_scaled(inputs, one)?,
            None => layer.evaluate(inputs)?,
        };
        let input_hashes = hash_all(inputs, point)?;
        let output_hashes = hash_all(&outputs, point)?;
        let add_selector = match one {
            Some(one) => cipher_hash(one, point)?,
            None => unit_like(point)?,
        };
        Self::new(layer, &input_hashes, output_hashes, &add_selector)
    }

    /// Number of rounds the protocol runs for.
    pub fn rounds(&self) -> usize {
        self.add.len().trailing_zeros() as usize
    }

    /// Sum of the output hashes.
    pub fn initial_claim(&self) -> SumCheckResult<RnsPoly> {
        let mut outputs = self.outputs.iter();
        let first = outputs.next().ok_or_else(|| {
            SumCheckError::InvalidState("layer has no outputs".into())
        })?;
        let mut sum = first.clone();
        for o in outputs {
            sum.add_inplace(o)?;
        }
        Ok(sum)
    }

    /// `[g(0), g(1), g(2), g(3)]` for the current round.
    pub fn round_claim(&self) -> SumCheckResult<[RnsPoly; 4]> {
        if self.live < 2 {
            return Err(SumCheckError::InvalidState(
                "no sum-check rounds left".into(),
            ));
        }
        let mut evaluations = Vec::with_capacity(4);
        for t in 0..4i64 {
            let mut total: Option<RnsPoly> = None;
            for pair in 0..self.live / 2 {
                let (e, o) = (2 * pair, 2 * pair + 1);
                let a = line(&self.add[e], &self.add[o], t)?;
                let m = line(&self.mult[e], &self.mult[o], t)?;
                let l = line(&self.left[e], &self.left[o], t)?;
                let r = line(&self.right[e], &self.right[o], t)?;
                let term = gate_value(&a, &m, &l, &r)?;
                match total.as_mut() {
                    Some(sum) => sum.add_inplace(&term)?,
                    None => total = Some(term),
                }
            }
            let total = total.ok_or_else(|| {
                SumCheckError::InvalidState("empty round".into())
            })?;
            evaluations.push(total);
        }
        evaluations
            .try_into()
            .map_err(|_| SumCheckError::InvalidState("expected four evaluations".into()))
    }

    /// Fixes the current variable to `r`, halving every table.
    pub fn fold(&mut self, r: u64) -> SumCheckResult<()> {
        if self.live < 2 {
            return Err(SumCheckError::InvalidState(
                "nothing left to fold".into(),
            ));
        }
        let r = i64::try_from(r).map_err(|_| {
            SumCheckError::InvalidState(format!("challenge {r} out of range"))
        })?;
        let half = self.live / 2;
        for table in [&mut self.add, &mut self.mult, &mut self.left, &mut self.right] {
            for pair in 0..half {
                table[pair] = line(&table[2 * pair], &table[2 * pair + 1], r)?;
            }
            table.truncate(half);
        }
        self.live = half;
        Ok(())
    }

    pub fn final_values(&self) -> SumCheckResult<FinalValues> {
        if self.live != 1 {
            return Err(SumCheckError::InvalidState(format!(
                "{} rounds still pending",
                self.live.trailing_zeros()
            )));
        }
        Ok(FinalValues {
            add: self.add[0].clone(),
            mult: self.mult[0].clone(),
            left: self.left[0].clone(),
            right: self.right[0].clone(),
        })
    }
}

// ─── Verifier ────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct SumCheckVerifier {
    claim: RnsPoly,
    sub_modulus: u64,
    rounds: usize,
    challenges: Vec<u64>,
}

impl SumCheckVerifier {
    pub fn new(claim: RnsPoly, sub_modulus: u64, rounds: usize) -> SumCheckResult<Self> {
        if sub_modulus <= MIN_CHALLENGE {
            return Err(SumCheckError::InvalidState(format!(
                "challenge modulus {sub_modulus} leaves no room above {MIN_CHALLENGE}"
            )));
        }
        if claim.base().iter().any(|&p| p <= 3) {
            return Err(SumCheckError::InvalidState(
                "interpolation needs 2 and 3 invertible modulo every base prime".into(),
            ));
        }
        Ok(Self {
            claim,
            sub_modulus,
            rounds,
            challenges: Vec::with_capacity(rounds),
        })
    }

    pub fn claim(&self) -> &RnsPoly {
        &self.claim
    }

    pub fn challenges(&self) -> &[u64] {
        &self.challenges
    }

    /// Checks `g(0) + g(1)` against the claim, then draws the round's
    /// challenge `r` and moves the claim to `g(r)`.
    pub fn round_verify<R: Rng + ?Sized>(
        &mut self,
        g: &[RnsPoly; 4],
        rng: &mut R,
    ) -> SumCheckResult<u64> {
        let round = self.challenges.len();
        if round >= self.rounds {
            return Err(SumCheckError::InvalidState(format!(
                "all {} rounds already verified",
                self.rounds
            )));
        }
        let sum = g[0].add(&g[1])?;
        if !sum.equal(&self.claim)? {
            return Err(SumCheckError::Inconsistent { round });
        }

        let r = rng.random_range(MIN_CHALLENGE..self.sub_modulus);
        self.claim = interpolate_cubic(g, r)?;
        self.challenges.push(r);
        trace!(round, challenge = r, "sum-check round verified");
        Ok(r)
    }

    /// `claim == add * (left + right) + mult * left * right` after the last
    /// round.
    pub fn final_verify(
        &self,
        add: &RnsPoly,
        mult: &RnsPoly,
        left: &RnsPoly,
        right: &RnsPoly,
    ) -> SumCheckResult<bool> {
        if self.challenges.len() != self.rounds {
            return Err(SumCheckError::InvalidState(format!(
                "final check after {} of {} rounds",
                self.challenges.len(),
                self.rounds
            )));
        }
        let expected = gate_value(add, mult, left, right)?;
        Ok(expected.equal(&self.claim)?)
    }
}

/// Runs the whole protocol for `claim`. A failed round check or final check
/// is a `Reject`; only malformed state or algebra errors surface as `Err`.
pub fn run_sumcheck<R: Rng + ?Sized>(
    prover: &mut SumCheckProver,
    claim: RnsPoly,
    sub_modulus: u64,
    rng: &mut R,
) -> SumCheckResult<SumCheckOutcome> {
    let rounds = prover.rounds();
    let mut verifier = SumCheckVerifier::new(claim, sub_modulus, rounds)?;
    for _ in 0..rounds {
        let g = prover.round_claim()?;
        let r = match verifier.round_verify(&g, rng) {
            Ok(r) => r,
            Err(SumCheckError::Inconsistent { round }) => {
                trace!(round, "sum-check rejected");
                return Ok(SumCheckOutcome::Reject);
            }
            Err(e) => return Err(e),
        };
        prover.fold(r)?;
    }
    let last = prover.final_values()?;
    let accepted = verifier.final_verify(&last.add, &last.mult, &last.left, &last.right)?;
    trace!(accepted, rounds, "sum-check finished");
    Ok(if accepted {
        SumCheckOutcome::Accept
    } else {
        SumCheckOutcome::Reject
    })
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// `even * (1 - t) + odd * t`.
fn line(even: &RnsPoly, odd: &RnsPoly, t: i64) -> SumCheckResult<RnsPoly> {
    let mut slope = odd.sub(even)?;
    slope.mul_scalar_inplace(t);
    slope.add_inplace(even)?;
    Ok(slope)
}

/// `a * (l + r) + m * l * r`.
fn gate_value(a: &RnsPoly, m: &RnsPoly, l: &RnsPoly, r: &RnsPoly) -> SumCheckResult<RnsPoly> {
    let mut out = l.add(r)?;
    out.mul_inplace(a)?;
    let mut product = l.mul(r)?;
    product.mul_inplace(m)?;
    out.add_inplace(&product)?;
    Ok(out)
}

/// Lagrange interpolation of the cubic through `(k, g[k])`, `k = 0..3`,
/// evaluated at `r`, computed residue by residue.
fn interpolate_cubic(g: &[RnsPoly; 4], r: u64) -> SumCheckResult<RnsPoly> {
    let base = g[0].base().to_vec();
    let mut weights = [
        Vec::with_capacity(base.len()),
        Vec::with_capacity(base.len()),
        Vec::with_capacity(base.len()),
        Vec::with_capacity(base.len()),
    ];
    for &p in &base {
        let x = r % p;
        let x1 = sub_mod(x, 1 % p, p);
        let x2 = sub_mod(x, 2 % p, p);
        let x3 = sub_mod(x, 3 % p, p);
        let inv2 = mod_inverse(2, p)?;
        let inv6 = mod_inverse(6, p)?;
        let neg = |v: u64| reduce(-(v as i128), p);
        let prod = |a: u64, b: u64, c: u64, s: u64| mul_mod(mul_mod(mul_mod(a, b, p), c, p), s, p);

        weights[0].push(neg(prod(x1, x2, x3, inv6)));
        weights[1].push(prod(x, x2, x3, inv2));
        weights[2].push(neg(prod(x, x1, x3, inv2)));
        weights[3].push(prod(x, x1, x2, inv6));
    }

    let mut acc: Option<RnsPoly> = None;
    for (value, w) in g.iter().zip(&weights) {
        let mut term = value.clone();
        term.mul_residues_inplace(w)?;
        match acc.as_mut() {
            Some(sum) => sum.add_inplace(&term)?,
            None => acc = Some(term),
        }
    }
    acc.ok_or_else(|| SumCheckError::InvalidState("no evaluations".into()))
}

/// The constant `1` shaped like `template` (NTT form: every slot is 1).
fn unit_like(template: &RnsPoly) -> SumCheckResult<RnsPoly> {
    if !template.is_ntt_form() {
        return Err(SumCheckError::InvalidState(
            "unit element requires an NTT-form template".into(),
        ));
    }
    let degree = template.degree();
    let components = template
        .components()
        .iter()
        .map(|c| {
            let unit = Polynomial::new(c.modulus(), degree, vec![1; degree], Form::Ntt)?;
            match c.engine() {
                Some(engine) => unit.with_engine(Arc::clone(engine)),
                None => Ok(unit),
            }
        })
        .collect::<Result<Vec<_>, HeError>>()?;
    Ok(RnsPoly::from_components(components)?)
}

fn hash_all(ciphertexts: &[Ciphertext], point: &RnsPoly) -> SumCheckResult<Vec<RnsPoly>> {
    ciphertexts
        .iter()
        .map(|c| cipher_hash(c, point).map_err(SumCheckError::from))
        .collect()
}
