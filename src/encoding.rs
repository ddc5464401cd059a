//! Integer vectors to plaintext polynomials over `Z_t[X] / (X^N + 1)`.
//!
//! Coefficient encoding places value `i` on `X^i`; products of plaintexts
//! are then negacyclic convolutions. Slot encoding places value `i` in NTT
//! slot `i` instead, so products act slot by slot.

use crate::errors::{HeError, HeResult};
use crate::params::{HeContext, HeParameters};
use crate::rings::{Form, Polynomial};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct Encoder {
    context: Arc<HeContext>,
}

impl Encoder {
    pub fn new(params: &HeParameters) -> HeResult<Self> {
        Ok(Self {
            context: Arc::clone(params.context()?),
        })
    }

    /// COEFF-form plaintext with `values` as coefficients.
    pub fn coeff_encode(&self, values: &[i64]) -> HeResult<Polynomial> {
        self.check_len(values.len())?;
        self.context.plain_poly(values.to_vec())
    }

    /// NTT-form plaintext whose slots hold `values` (zero-padded).
    /// Call `transform_from_ntt_form` before encrypting it.
    pub fn slot_encode(&self, values: &[i64]) -> HeResult<Polynomial> {
        self.check_len(values.len())?;
        Polynomial::new(
            self.context.plain_modulus(),
            self.context.degree(),
            values.to_vec(),
            Form::Ntt,
        )?
        .with_engine(Arc::clone(self.context.plain_engine()))
    }

    /// All `N` centered coefficients of a plaintext.
    pub fn coeff_decode(&self, plain: &Polynomial) -> HeResult<Vec<i64>> {
        self.check_plain(plain)?;
        let mut plain = plain.clone();
        if plain.is_ntt_form() {
            plain.transform_from_ntt_form()?;
        }
        Ok((0..plain.degree()).map(|i| plain.coeff(i)).collect())
    }

    /// All `N` centered slot values of a plaintext.
    pub fn slot_decode(&self, plain: &Polynomial) -> HeResult<Vec<i64>> {
        self.check_plain(plain)?;
        let mut plain = plain.clone();
        if !plain.is_ntt_form() {
            plain.set_engine(Arc::clone(self.context.plain_engine()))?;
            plain.transform_to_ntt_form()?;
        }
        Ok(plain.coeffs().to_vec())
    }

    fn check_len(&self, len: usize) -> HeResult<()> {
        let degree = self.context.degree();
        if len > degree {
            return Err(HeError::invalid(format!(
                "cannot encode {len} values into a degree {degree} ring"
            )));
        }
        Ok(())
    }

    fn check_plain(&self, plain: &Polynomial) -> HeResult<()> {
        if plain.modulus() != self.context.plain_modulus() || plain.degree() != self.context.degree() {
            return Err(HeError::RingMismatch(format!(
                "expected plaintext over (N={}, t={}), got (N={}, q={})",
                self.context.degree(),
                self.context.plain_modulus(),
                plain.degree(),
                plain.modulus()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Scheme;

    fn encoder() -> Encoder {
        let params = HeParameters::new(Scheme::Bfv)
            .set_poly_modulus(3)
            .unwrap()
            .set_coeff_primes(vec![17, 97])
            .unwrap()
            .set_plain_prime(113)
            .unwrap()
            .set_bound(1, 1)
            .generate_context()
            .unwrap();
        Encoder::new(&params).unwrap()
    }

    #[test]
    fn coeff_roundtrip() {
        let enc = encoder();
        let plain = enc.coeff_encode(&[1, -2, 3]).unwrap();
        assert_eq!(
            enc.coeff_decode(&plain).unwrap(),
            vec![1, -2, 3, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn slot_product_is_pointwise() {
        let enc = encoder();
        let a = enc.slot_encode(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        let b = enc.slot_encode(&[2, 2, 2, 2, -1, -1, -1, -1]).unwrap();
        let mut a_coeff = a.clone();
        a_coeff.transform_from_ntt_form().unwrap();
        let mut b_coeff = b.clone();
        b_coeff.transform_from_ntt_form().unwrap();
        let product = a_coeff.mul(&b_coeff).unwrap();
        assert_eq!(
            enc.slot_decode(&product).unwrap(),
            vec![2, 4, 6, 8, -5, -6, -7, -8]
        );
    }

    #[test]
    fn too_many_values() {
        let enc = encoder();
        assert!(enc.coeff_encode(&[0; 9]).is_err());
        assert!(enc.slot_encode(&[0; 9]).is_err());
    }
}
