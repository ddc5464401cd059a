use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeError {
    #[error("ring mismatch: {0}")]
    RingMismatch(String),

    #[error("RNS base mismatch: expected {expected:?}, got {actual:?}")]
    RnsBaseMismatch { expected: Vec<u64>, actual: Vec<u64> },

    #[error("invalid form transition: {0}")]
    FormState(String),

    #[error("parameter context is not ready: {0}")]
    ContextNotReady(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("{value} has no inverse modulo {modulus}")]
    NoInverse { value: i128, modulus: i128 },

    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String },

    #[error("no NTT-friendly {bits}-bit prime exists for degree {degree}")]
    NoPrimeInRange { bits: u32, degree: usize },

    #[error("ciphertext size mismatch: {lhs} vs {rhs}")]
    SizeMismatch { lhs: usize, rhs: usize },

    #[error("ciphertext of size {size} exceeds the supported maximum {max}")]
    CiphertextTooLarge { size: usize, max: usize },

    #[error("gate operand {index} out of range for {len} inputs")]
    OperandOutOfRange { index: usize, len: usize },

    #[error("malformed circuit expression: {0}")]
    Parse(String),
}

impl HeError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }
}

pub type HeResult<T> = Result<T, HeError>;
