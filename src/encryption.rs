use crate::ciphertext::Ciphertext;
use crate::errors::{HeError, HeResult};
use crate::keys::{PublicKey, SecretKey};
use crate::params::{HeContext, HeParameters};
use crate::rings::{Form, Polynomial, RnsPoly};
use std::sync::Arc;
use tracing::{debug, warn};

/// Largest ciphertext size the decryptor precomputes key powers for.
pub const MAX_CIPHERTEXT_SIZE: usize = 40;

#[derive(Clone, Debug)]
pub struct Encryptor {
    context: Arc<HeContext>,
    public_key: PublicKey,
}

impl Encryptor {
    pub fn new(params: &HeParameters, public_key: &PublicKey) -> HeResult<Self> {
        let context = Arc::clone(params.context()?);
        let pk = public_key.ciphertext();
        if pk.size() != 2 || !pk.is_ntt_form() {
            return Err(HeError::InvalidKey(
                "public key must be a size-2 NTT-form ciphertext".into(),
            ));
        }
        if pk.components()[0].base() != context.rns_base() {
            return Err(HeError::InvalidKey(
                "public key was generated for a different RNS base".into(),
            ));
        }
        Ok(Self {
            context,
            public_key: public_key.clone(),
        })
    }

    pub fn context(&self) -> &Arc<HeContext> {
        &self.context
    }

    /// `pk + (m, 0)`; the noise bound is the public key's.
    pub fn encrypt(&self, plain: &Polynomial) -> HeResult<Ciphertext> {
        if plain.form() != Form::Coeff {
            return Err(HeError::FormState(
                "plaintext must be in coefficient form to encrypt".into(),
            ));
        }
        let mut ciphertext = self.public_key.ciphertext().clone();
        ciphertext.add_plain_inplace(plain)?;
        Ok(ciphertext)
    }
}

#[derive(Clone, Debug)]
pub struct Decryptor {
    context: Arc<HeContext>,
    // s^1 .. s^(MAX_CIPHERTEXT_SIZE - 1)
    key_powers: Vec<RnsPoly>,
}

impl Decryptor {
    pub fn new(params: &HeParameters, secret_key: &SecretKey) -> HeResult<Self> {
        let context = Arc::clone(params.context()?);
        if !secret_key.poly().is_ntt_form() {
            return Err(HeError::InvalidKey(
                "secret key must be in NTT form".into(),
            ));
        }
        if secret_key.poly().base() != context.rns_base() {
            return Err(HeError::InvalidKey(
                "secret key was generated for a different RNS base".into(),
            ));
        }
        let key_powers = secret_key.powers(MAX_CIPHERTEXT_SIZE - 1)?;
        Ok(Self {
            context,
            key_powers,
        })
    }

    /// `c_0 + c_1*s + ... + c_{k-1}*s^{k-1}`, CRT-reconstructed and reduced
    /// modulo the plaintext modulus.
    pub fn decrypt(&self, ciphertext: &Ciphertext) -> HeResult<Polynomial> {
        let size = ciphertext.size();
        if size > MAX_CIPHERTEXT_SIZE {
            return Err(HeError::CiphertextTooLarge {
                size,
                max: MAX_CIPHERTEXT_SIZE,
            });
        }
        if !ciphertext.within_noise_budget() {
            warn!(
                size,
                error_bound = %ciphertext.error_bound(),
                "decrypting a ciphertext whose noise bound exceeds Q/2"
            );
        }

        let mut ciphertext = ciphertext.clone();
        if !ciphertext.is_ntt_form() {
            ciphertext.transform_to_ntt_form()?;
        }
        let components = ciphertext.components();
        let mut acc = components[0].clone();
        for (c, power) in components[1..].iter().zip(&self.key_powers) {
            acc.add_inplace(&c.mul(power)?)?;
        }
        acc.transform_from_ntt_form()?;

        debug!(size, error_bound = %ciphertext.error_bound(), "decrypted ciphertext");
        self.context.recover_plain(&acc)
    }
}
