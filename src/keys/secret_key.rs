//! Secret key `s`: a small polynomial, coefficients in `[-B, B]` for the
//! configured secret-key bound `B`, held in NTT form over the RNS base.
use crate::errors::{HeError, HeResult};
use crate::rings::RnsPoly;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecretKey {
    s: RnsPoly,
}

impl SecretKey {
    /// Wraps an NTT-form RNS polynomial.
    pub fn from_poly(s: RnsPoly) -> HeResult<Self> {
        if !s.is_ntt_form() {
            return Err(HeError::InvalidKey(
                "secret key must be in NTT form".into(),
            ));
        }
        Ok(Self { s })
    }

    pub fn poly(&self) -> &RnsPoly {
        &self.s
    }

    /// `[s, s^2, ..., s^count]`, all in NTT form.
    pub(crate) fn powers(&self, count: usize) -> HeResult<Vec<RnsPoly>> {
        let mut powers: Vec<RnsPoly> = Vec::with_capacity(count);
        for _ in 0..count {
            let next = match powers.last() {
                Some(prev) => prev.mul(&self.s)?,
                None => self.s.clone(),
            };
            powers.push(next);
        }
        Ok(powers)
    }
}
