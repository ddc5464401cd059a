use super::{PublicKey, SecretKey};
use crate::ciphertext::Ciphertext;
use crate::errors::{HeError, HeResult};
use crate::math::sampling::{bounded_coefficients, uniform_coefficients};
use crate::params::{HeContext, HeParameters};
use crate::rings::{Form, Polynomial, RnsPoly};
use rand::Rng;
use std::sync::Arc;
use tracing::debug;

/// Samples key material for one parameter context.
#[derive(Clone, Debug)]
pub struct KeyGenerator {
    context: Arc<HeContext>,
}

impl KeyGenerator {
    pub fn new(params: &HeParameters) -> HeResult<Self> {
        Ok(Self {
            context: Arc::clone(params.context()?),
        })
    }

    pub fn context(&self) -> &Arc<HeContext> {
        &self.context
    }

    /// A COEFF-form RNS polynomial with coefficients uniform in
    /// `[-bound, bound]`, built over the plaintext modulus and decomposed.
    pub fn generate_bound_rns_poly<R: Rng + ?Sized>(
        &self,
        bound: u64,
        rng: &mut R,
    ) -> HeResult<RnsPoly> {
        let coeffs = bounded_coefficients(self.context.degree(), bound, rng);
        let plain = self.context.plain_poly(coeffs)?;
        self.context.eval_rns(&plain)
    }

    /// An NTT-form RNS polynomial with every residue uniform in `[0, p_i)`.
    pub fn generate_uniform_rns_poly<R: Rng + ?Sized>(&self, rng: &mut R) -> HeResult<RnsPoly> {
        let degree = self.context.degree();
        let components = self
            .context
            .rns_base()
            .iter()
            .map(|&p| {
                let residues = uniform_coefficients(degree, p, rng);
                Polynomial::from_residues(p, degree, &residues, Form::Ntt)
            })
            .collect::<HeResult<Vec<_>>>()?;
        RnsPoly::from_components(components)?.with_engines(self.context.rns_engines())
    }

    pub fn generate_secret_key<R: Rng + ?Sized>(&self, rng: &mut R) -> HeResult<SecretKey> {
        let mut s = self.generate_bound_rns_poly(self.context.secret_key_bound(), rng)?;
        s.transform_to_ntt_form()?;
        debug!(bound = self.context.secret_key_bound(), "generated secret key");
        SecretKey::from_poly(s)
    }

    /// Encryption of zero under `secret_key`.
    pub fn generate_public_key<R: Rng + ?Sized>(
        &self,
        secret_key: &SecretKey,
        rng: &mut R,
    ) -> HeResult<PublicKey> {
        let s = secret_key.poly();
        if !s.is_ntt_form() {
            return Err(HeError::InvalidKey(
                "secret key must be in NTT form".into(),
            ));
        }
        if s.base() != self.context.rns_base() {
            return Err(HeError::RnsBaseMismatch {
                expected: self.context.rns_base().to_vec(),
                actual: s.base().to_vec(),
            });
        }

        let c1 = self.generate_uniform_rns_poly(rng)?;
        let mut c0 = c1.mul(s)?;
        c0.neg_inplace();

        // t * e vanishes modulo the plaintext modulus at decryption
        let error_bound = self.context.first_error_bound();
        let mut e = self.generate_bound_rns_poly(error_bound, rng)?;
        e.mul_scalar_inplace(self.context.plain_modulus() as i64);
        e.transform_to_ntt_form()?;
        c0.add_inplace(&e)?;

        debug!(error_bound, "generated public key");
        let ciphertext = Ciphertext::new(&self.context, vec![c0, c1], error_bound as u128)?;
        PublicKey::from_ciphertext(ciphertext)
    }
}
