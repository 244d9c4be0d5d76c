pub mod histogram;
pub mod ring;

pub use histogram::{scale, ScaledBar};
pub use ring::{layout, RingPoint};
