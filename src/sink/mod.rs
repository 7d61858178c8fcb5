//! Destinations for the mixed signal besides the caller's own buffer.

mod loopback;
#[cfg(feature = "cpal_sink")]
mod monitor;

pub use loopback::LoopbackRingBuffer;
#[cfg(feature = "cpal_sink")]
pub use monitor::MonitorSink;
