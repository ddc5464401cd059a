//! Verifiable evaluation: hashing ciphertexts to ring elements, layered
//! arithmetic circuits, and the sum-check protocol that ties them together.

pub mod circuit;
pub mod hash;
pub mod parser;
pub mod sumcheck;

pub use circuit::{Circuit, Gate, GateOp, Layer};
pub use hash::{HashPoint, cipher_hash, sample_hash_point};
pub use parser::parse_circuit;
pub use sumcheck::{
    FinalValues, SumCheckError, SumCheckOutcome, SumCheckProver, SumCheckResult,
    SumCheckVerifier, run_sumcheck,
};
