pub mod modular;
pub mod primes;
pub mod sampling;

pub use modular::{centered_reduce, mod_inverse, reduce};
pub use primes::{generate_prime, generate_rns_bases, is_ntt_friendly_prime, is_prime};
pub use sampling::{bounded_coefficients, uniform_coefficients};
