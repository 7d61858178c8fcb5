//! Soundboard audio engine: PCM WAVE decoding, format conversion, mixing and
//! loopback monitoring.
//!
//! Clips are opened through [`ProviderFactory`], which hands back a
//! [`SampleProvider`] already converted to the bus format. A [`Soundboard`]
//! sums every playing [`Clip`] into the host's outgoing buffer once per period
//! and keeps the last moments of the clip signal in a [`LoopbackRingBuffer`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use soundboard::{Clip, Soundboard, SoundboardConfig};
//!
//! let board = Soundboard::new(SoundboardConfig::default());
//! let airhorn = Arc::new(Clip::new("airhorn", "sounds/airhorn.wav"));
//! board.play(&airhorn).unwrap();
//!
//! // In the audio callback:
//! let mut period = vec![0.0f32; 480];
//! board.process(&mut period);
//! ```
//!
//! # Features
//!
//! - `cpal_sink`: output device discovery and [`MonitorSink`](sink::MonitorSink).
//! - `serde`: `Serialize`/`Deserialize` for [`AudioFormat`] and [`SoundboardConfig`].

pub mod config;
#[cfg(feature = "cpal_sink")]
pub mod device;
pub mod error;
pub mod factory;
pub mod format;
pub mod mix;
pub mod sink;
pub mod soundboard;
pub mod source;
pub mod wav;

pub use config::SoundboardConfig;
#[cfg(feature = "cpal_sink")]
pub use device::OutputDevice;
pub use error::{Error, Result};
pub use factory::{BoxedProvider, ProviderFactory};
pub use format::AudioFormat;
pub use mix::{Clip, MixingBus};
pub use sink::LoopbackRingBuffer;
pub use soundboard::Soundboard;
pub use source::{Resampler, SampleProvider};
pub use wav::{WaveReader, WaveWriter};
