//! Sample rate / channel count pair used to tag every provider.

use core::fmt;
use std::time::Duration;

/// The shape of an interleaved float stream.
///
/// Two formats are equal iff both the sample rate and the channel count match.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFormat {
    pub const fn new(sample_rate: u32, channels: u16) -> Self {
        Self { sample_rate, channels }
    }

    /// Mono at the given rate.
    pub const fn mono(sample_rate: u32) -> Self {
        Self::new(sample_rate, 1)
    }

    /// Stereo at the given rate.
    pub const fn stereo(sample_rate: u32) -> Self {
        Self::new(sample_rate, 2)
    }

    /// Interleaved samples per second of audio.
    #[inline]
    pub fn samples_per_second(&self) -> u64 {
        self.sample_rate as u64 * self.channels as u64
    }

    /// Duration covered by `samples` interleaved samples.
    pub fn samples_to_duration(&self, samples: usize) -> Duration {
        let per_sec = self.samples_per_second();
        if per_sec == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(samples as f64 / per_sec as f64)
    }

    /// Interleaved sample index reached after `time`, truncated.
    pub fn duration_to_samples(&self, time: Duration) -> usize {
        let exact = time.as_secs_f64() * self.samples_per_second() as f64;
        // Durations only hold nanoseconds, so a time built from a sample index
        // can land a hair below it.
        let nearest = exact.round();
        if (exact - nearest).abs() < 1e-3 {
            nearest as usize
        } else {
            exact as usize
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz / {} ch", self.sample_rate, self.channels)
    }
}
