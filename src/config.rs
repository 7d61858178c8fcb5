//! Pipeline configuration.

use crate::format::AudioFormat;

/// Settings shared by the mixing bus, the loopback buffer and the monitor output
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SoundboardConfig {
    /// Format every clip is converted to before mixing
    pub format: AudioFormat,
    /// Length of the loopback history, in seconds
    pub loopback_secs: f32,
    /// Gain applied to the loopback feed on the monitor device
    pub monitor_volume: f32,
}

impl Default for SoundboardConfig {
    fn default() -> Self {
        Self {
            format: AudioFormat::mono(48000),
            loopback_secs: 0.5,
            monitor_volume: 0.35,
        }
    }
}

impl SoundboardConfig {
    pub fn with_format(mut self, format: AudioFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_loopback_secs(mut self, secs: f32) -> Self {
        self.loopback_secs = secs.max(0.0);
        self
    }

    pub fn with_monitor_volume(mut self, volume: f32) -> Self {
        self.monitor_volume = volume.clamp(0.0, 2.0);
        self
    }

    /// Loopback ring capacity in interleaved samples (never zero)
    pub fn loopback_capacity(&self) -> usize {
        let samples = self.format.samples_per_second() as f64 * self.loopback_secs as f64;
        (samples as usize).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_half_a_second_of_48k_mono() {
        let config = SoundboardConfig::default();
        assert_eq!(config.format, AudioFormat::mono(48000));
        assert_eq!(config.loopback_capacity(), 24000);
    }

    #[test]
    fn capacity_scales_with_channels_and_never_hits_zero() {
        let config = SoundboardConfig::default().with_format(AudioFormat::stereo(44100));
        assert_eq!(config.loopback_capacity(), 44100);
        assert_eq!(config.with_loopback_secs(0.0).loopback_capacity(), 1);
    }
}
