use super::{Polynomial, RnsPoly};
use crate::errors::HeResult;

/// The closed set of operations circuit evaluation needs from a value.
///
/// Implemented by plain polynomials, RNS polynomials and ciphertexts so the
/// same circuit can run in the clear or homomorphically.
pub trait RingElement: Clone {
    fn ring_add(&self, other: &Self) -> HeResult<Self>;
    fn ring_sub(&self, other: &Self) -> HeResult<Self>;
    fn ring_mul(&self, other: &Self) -> HeResult<Self>;

    /// The additive identity of the same shape as `self` (`x - x`).
    fn zero_like(&self) -> HeResult<Self> {
        self.ring_sub(self)
    }
}

impl RingElement for Polynomial {
    fn ring_add(&self, other: &Self) -> HeResult<Self> {
        self.add(other)
    }

    fn ring_sub(&self, other: &Self) -> HeResult<Self> {
        self.sub(other)
    }

    fn ring_mul(&self, other: &Self) -> HeResult<Self> {
        self.mul(other)
    }
}

impl RingElement for RnsPoly {
    fn ring_add(&self, other: &Self) -> HeResult<Self> {
        self.add(other)
    }

    fn ring_sub(&self, other: &Self) -> HeResult<Self> {
        self.sub(other)
    }

    fn ring_mul(&self, other: &Self) -> HeResult<Self> {
        self.mul(other)
    }
}
