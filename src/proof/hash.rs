//! Homomorphic hash: a ciphertext is a polynomial in the secret key, and
//! hashing evaluates that polynomial at a random ring element `r` instead.
//!
//! `H(c) = c_0 + c_1*r + ... + c_{k-1}*r^{k-1}` respects addition and
//! multiplication of ciphertexts, so equal hashes at a random `r` witness
//! equal ciphertexts except with small probability.

use crate::ciphertext::Ciphertext;
use crate::errors::{HeError, HeResult};
use crate::math::sampling::uniform_coefficients;
use crate::params::HeContext;
use crate::rings::{Form, Polynomial, RnsPoly};
use rand::Rng;
use std::sync::Arc;

/// Random evaluation point plus the modulus verifier challenges are drawn
/// from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HashPoint {
    point: RnsPoly,
    sub_modulus: u64,
}

impl HashPoint {
    /// The point, in NTT form.
    pub fn point(&self) -> &RnsPoly {
        &self.point
    }

    /// Smallest prime of the RNS base.
    pub fn sub_modulus(&self) -> u64 {
        self.sub_modulus
    }
}

/// Samples `r` with coefficients uniform in `[0, p_min)`, where `p_min` is
/// the smallest base prime.
pub fn sample_hash_point<R: Rng + ?Sized>(context: &HeContext, rng: &mut R) -> HeResult<HashPoint> {
    let sub_modulus = context
        .rns_base()
        .iter()
        .copied()
        .min()
        .ok_or_else(|| HeError::invalid("empty RNS base"))?;
    let degree = context.degree();
    let coeffs = uniform_coefficients(degree, sub_modulus, rng);

    let components = context
        .rns_base()
        .iter()
        .zip(context.rns_engines())
        .map(|(&p, engine)| {
            Polynomial::from_residues(p, degree, &coeffs, Form::Coeff)?
                .with_engine(Arc::clone(engine))
        })
        .collect::<HeResult<Vec<_>>>()?;
    let mut point = RnsPoly::from_components(components)?;
    point.transform_to_ntt_form()?;
    Ok(HashPoint { point, sub_modulus })
}

/// Horner evaluation of the component list at `point` (NTT form). The
/// result is in NTT form whatever form the ciphertext is held in.
pub fn cipher_hash(ciphertext: &Ciphertext, point: &RnsPoly) -> HeResult<RnsPoly> {
    if !point.is_ntt_form() {
        return Err(HeError::FormState(
            "hash point must be in NTT form".into(),
        ));
    }
    let to_ntt = |c: &RnsPoly| -> HeResult<RnsPoly> {
        let mut c = c.clone();
        if !c.is_ntt_form() {
            c.transform_to_ntt_form()?;
        }
        Ok(c)
    };

    let mut components = ciphertext.components().iter().rev();
    let Some(last) = components.next() else {
        return Err(HeError::invalid("cannot hash an empty ciphertext"));
    };
    let mut acc = to_ntt(last)?;
    for c in components {
        acc.mul_inplace(point)?;
        acc.add_inplace(&to_ntt(c)?)?;
    }
    Ok(acc)
}
