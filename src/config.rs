use crate::errors::HeResult;
use crate::params::{HeParameters, Scheme};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Serializable form of the parameter set.
///
/// ```json
/// {
///   "scheme": "bfv",
///   "poly_modulus_deg": 13,
///   "coeff_modulus_bits": [30, 30, 40],
///   "plain_modulus_bit": 18,
///   "secret_key_bound": 1,
///   "first_error_bound": 2
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeConfig {
    pub scheme: Scheme,
    /// `log2(N)`.
    pub poly_modulus_deg: u32,
    pub coeff_modulus_bits: Vec<u32>,
    pub plain_modulus_bit: u32,
    pub secret_key_bound: u64,
    pub first_error_bound: u64,
}

impl HeParameters {
    /// Runs the whole builder chain for `config`, drawing primes from `rng`.
    pub fn from_config<R: Rng + ?Sized>(config: &HeConfig, rng: &mut R) -> HeResult<Self> {
        HeParameters::new(config.scheme)
            .set_poly_modulus(config.poly_modulus_deg)?
            .set_coeff_modulus(&config.coeff_modulus_bits, rng)?
            .set_plain_modulus(config.plain_modulus_bit, rng)?
            .set_bound(config.secret_key_bound, config.first_error_bound)
            .generate_context()
    }
}
