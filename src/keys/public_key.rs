use crate::ciphertext::Ciphertext;
use crate::errors::{HeError, HeResult};

/// Public key: an encryption of zero, `[c0, c1]` with
/// `c0 = -(c1 * s) + t * e` and `c1` uniform, both in NTT form.
#[derive(Clone, Debug, PartialEq)]
pub struct PublicKey {
    ciphertext: Ciphertext,
}

impl PublicKey {
    /// Wraps a size-2 NTT-form ciphertext.
    pub fn from_ciphertext(ciphertext: Ciphertext) -> HeResult<Self> {
        if ciphertext.size() != 2 {
            return Err(HeError::InvalidKey(format!(
                "public key must have 2 components, got {}",
                ciphertext.size()
            )));
        }
        if !ciphertext.is_ntt_form() {
            return Err(HeError::InvalidKey(
                "public key must be in NTT form".into(),
            ));
        }
        Ok(Self { ciphertext })
    }

    pub fn ciphertext(&self) -> &Ciphertext {
        &self.ciphertext
    }
}
