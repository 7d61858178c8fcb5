//! Playing clips and the bus that sums them.

mod bus;
mod clip;

pub use bus::MixingBus;
pub use clip::Clip;
