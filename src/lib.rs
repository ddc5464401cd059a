pub mod ciphertext;
pub mod config;
pub mod encoding;
pub mod encryption;
pub mod errors;
pub mod keys;
pub mod math;
pub mod params;
pub mod proof;
pub mod rings;

pub use ciphertext::Ciphertext;
pub use config::HeConfig;
pub use encoding::Encoder;
pub use encryption::{Decryptor, Encryptor, MAX_CIPHERTEXT_SIZE};
pub use errors::{HeError, HeResult};
pub use keys::{KeyGenerator, PublicKey, SecretKey};
pub use params::{HeContext, HeParameters, Scheme};
pub use proof::{
    Circuit, SumCheckOutcome, SumCheckProver, SumCheckVerifier, cipher_hash, parse_circuit,
    run_sumcheck, sample_hash_point,
};
pub use rings::{Form, NttEngine, Polynomial, RingElement, RnsPoly};
