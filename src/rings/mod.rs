pub mod display;
pub mod ntt;
pub mod poly;
pub mod rns_poly;
pub mod traits;

pub use ntt::NttEngine;
pub use poly::{Form, Polynomial};
pub use rns_poly::RnsPoly;
pub use traits::RingElement;
