//! Output device discovery for the monitor.
//!
//! ```no_run
//! use soundboard::OutputDevice;
//!
//! for (i, device) in OutputDevice::list_outputs().iter().enumerate() {
//!     println!("[{}] {} ({} Hz, {} ch)", i, device.name(), device.sample_rate(), device.channels());
//! }
//! ```

use cpal::traits::{DeviceTrait, HostTrait};

use crate::error::Result;
use crate::format::AudioFormat;
use crate::sink::{LoopbackRingBuffer, MonitorSink};
use std::sync::Arc;

/// A discovered audio output device and its default configuration
pub struct OutputDevice {
    device: cpal::Device,
    config: cpal::SupportedStreamConfig,
    name: String,
    sample_rate: u32,
    channels: u16,
}

impl OutputDevice {
    fn from_device(device: cpal::Device) -> Option<Self> {
        let config = device.default_output_config().ok()?;
        let name = device.name().unwrap_or_else(|_| "Unknown".into());
        Some(Self {
            sample_rate: config.sample_rate().0,
            channels: config.channels(),
            name,
            device,
            config,
        })
    }

    /// The host's default output, if there is one
    pub fn default_output() -> Option<Self> {
        let host = cpal::default_host();
        Self::from_device(host.default_output_device()?)
    }

    /// Every output device that reports a default configuration
    pub fn list_outputs() -> Vec<Self> {
        let host = cpal::default_host();
        host.output_devices()
            .map(|devices| devices.filter_map(Self::from_device).collect())
            .unwrap_or_default()
    }

    /// Find an output whose name contains `needle`, ignoring case
    pub fn find(needle: &str) -> Option<Self> {
        let needle = needle.to_lowercase();
        Self::list_outputs()
            .into_iter()
            .find(|d| d.name.to_lowercase().contains(&needle))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub(crate) fn device(&self) -> &cpal::Device {
        &self.device
    }

    pub(crate) fn sample_format(&self) -> cpal::SampleFormat {
        self.config.sample_format()
    }

    /// Play `loopback`, holding samples in `format`, on this device
    pub fn create_monitor(
        &self,
        loopback: Arc<LoopbackRingBuffer>,
        format: AudioFormat,
        volume: f32,
    ) -> Result<MonitorSink> {
        MonitorSink::start(self, loopback, format, volume)
    }
}

impl core::fmt::Debug for OutputDevice {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OutputDevice")
            .field("name", &self.name)
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .finish()
    }
}
