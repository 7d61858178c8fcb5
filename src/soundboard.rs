//! The top-level handle a host audio callback drives.

use std::sync::{Arc, Mutex, PoisonError};

use crate::config::SoundboardConfig;
use crate::error::Result;
use crate::format::AudioFormat;
use crate::mix::{Clip, MixingBus};
use crate::sink::LoopbackRingBuffer;

/// Owns the mixing bus and loopback history for one output format
///
/// The host calls [`process`](Self::process) once per audio period with the
/// buffer it is about to send on (typically microphone frames). Clips are
/// added on top, and the clips alone are also recorded into the loopback so
/// they can be monitored locally without hearing the microphone.
///
/// ```
/// use std::sync::Arc;
/// use soundboard::{Soundboard, SoundboardConfig};
///
/// let board = Soundboard::new(SoundboardConfig::default());
/// let mut period = vec![0.0f32; 480];
/// board.process(&mut period);
/// assert_eq!(board.loopback().available(), 480);
/// ```
pub struct Soundboard {
    config: SoundboardConfig,
    bus: MixingBus,
    loopback: Arc<LoopbackRingBuffer>,
    scratch: Mutex<Vec<f32>>,
}

impl Soundboard {
    pub fn new(config: SoundboardConfig) -> Self {
        Self {
            bus: MixingBus::new(config.format),
            loopback: Arc::new(LoopbackRingBuffer::new(config.loopback_capacity())),
            scratch: Mutex::new(Vec::new()),
            config,
        }
    }

    pub fn config(&self) -> &SoundboardConfig {
        &self.config
    }

    pub fn format(&self) -> AudioFormat {
        self.config.format
    }

    pub fn bus(&self) -> &MixingBus {
        &self.bus
    }

    /// Shared handle to the loopback history, for a monitor or a recorder
    pub fn loopback(&self) -> Arc<LoopbackRingBuffer> {
        Arc::clone(&self.loopback)
    }

    /// Start `clip`, or restart it if it is already playing
    pub fn play(&self, clip: &Arc<Clip>) -> Result<()> {
        clip.play(&self.bus)
    }

    pub fn stop(&self, clip: &Arc<Clip>) {
        clip.stop(&self.bus);
    }

    pub fn stop_all(&self) {
        self.bus.stop_all();
    }

    /// Mix one period of every playing clip into `buffer`
    ///
    /// `buffer` holds interleaved samples in [`format`](Self::format). The same
    /// clip signal, without whatever `buffer` already held, is appended to the
    /// loopback.
    pub fn process(&self, buffer: &mut [f32]) {
        let mut scratch = self.scratch.lock().unwrap_or_else(PoisonError::into_inner);
        scratch.clear();
        scratch.resize(buffer.len(), 0.0);

        self.bus.mix(buffer, &mut scratch[..]);
        self.loopback.push(&scratch[..]);
    }

    /// Play the loopback on `device` at the configured monitor volume
    #[cfg(feature = "cpal_sink")]
    pub fn start_monitor(
        &self,
        device: &crate::device::OutputDevice,
    ) -> Result<crate::sink::MonitorSink> {
        device.create_monitor(self.loopback(), self.config.format, self.config.monitor_volume)
    }
}
