//! The provider contract shared by decoders and resamplers.
//!
//! Everything downstream of [`ProviderFactory`](crate::ProviderFactory) only sees
//! a [`SampleProvider`]; whether samples come straight from a [`WaveReader`] or
//! through a [`Resampler`] is invisible to the mixing bus.
//!
//! [`WaveReader`]: crate::wav::WaveReader

mod resampler;

pub use resampler::Resampler;

use std::time::Duration;

use crate::error::Result;
use crate::format::AudioFormat;

/// A pull-based source of interleaved, normalized `f32` samples.
///
/// A provider keeps one logical position. It is stored as an interleaved sample
/// index; the time position is derived from it using [`format`](Self::format).
/// All setters clamp to `[0, total_samples]`.
///
/// # Implementing
///
/// Only the sample-index accessors are required; time accessors and
/// [`is_finished`](Self::is_finished) are derived from them.
///
/// ```
/// use std::time::Duration;
/// use soundboard::{AudioFormat, Result, SampleProvider};
///
/// /// Emits `len` copies of `value`.
/// struct Constant {
///     value: f32,
///     len: usize,
///     pos: usize,
/// }
///
/// impl SampleProvider for Constant {
///     fn read(&mut self, buffer: &mut [f32]) -> Result<usize> {
///         let n = buffer.len().min(self.len - self.pos);
///         buffer[..n].iter_mut().for_each(|s| *s = self.value);
///         self.pos += n;
///         Ok(n)
///     }
///
///     fn format(&self) -> AudioFormat { AudioFormat::mono(48000) }
///     fn total_samples(&self) -> usize { self.len }
///     fn sample_position(&self) -> usize { self.pos }
///
///     fn set_sample_position(&mut self, position: usize) -> Result<()> {
///         self.pos = position.min(self.len);
///         Ok(())
///     }
///
///     fn release(&mut self) {}
/// }
///
/// let mut c = Constant { value: 0.5, len: 48000, pos: 0 };
/// c.set_time_position(Duration::from_millis(500)).unwrap();
/// assert_eq!(c.sample_position(), 24000);
/// ```
pub trait SampleProvider: Send {
    /// Fill `buffer` with the next samples.
    ///
    /// Returns how many samples were written; `0` (or any short count) means
    /// the end of the stream was reached.
    fn read(&mut self, buffer: &mut [f32]) -> Result<usize>;

    /// Format of the samples produced by [`read`](Self::read).
    fn format(&self) -> AudioFormat;

    /// Total number of interleaved samples.
    fn total_samples(&self) -> usize;

    /// Current position as an interleaved sample index.
    fn sample_position(&self) -> usize;

    /// Move to `position`, clamped to `[0, total_samples]`.
    fn set_sample_position(&mut self, position: usize) -> Result<()>;

    /// Release owned resources. Idempotent; reads afterwards return `0`, even
    /// when the underlying stream is kept open for the caller.
    fn release(&mut self);

    /// Total playing time.
    fn duration(&self) -> Duration {
        self.format().samples_to_duration(self.total_samples())
    }

    /// Current position as playing time.
    fn time_position(&self) -> Duration {
        self.format().samples_to_duration(self.sample_position())
    }

    /// Move to `time`, clamped like [`set_sample_position`](Self::set_sample_position).
    fn set_time_position(&mut self, time: Duration) -> Result<()> {
        let position = self.format().duration_to_samples(time);
        self.set_sample_position(position)
    }

    /// Whether the position has reached the end.
    fn is_finished(&self) -> bool {
        self.sample_position() >= self.total_samples()
    }
}

impl<P: SampleProvider + ?Sized> SampleProvider for Box<P> {
    fn read(&mut self, buffer: &mut [f32]) -> Result<usize> {
        (**self).read(buffer)
    }

    fn format(&self) -> AudioFormat {
        (**self).format()
    }

    fn total_samples(&self) -> usize {
        (**self).total_samples()
    }

    fn sample_position(&self) -> usize {
        (**self).sample_position()
    }

    fn set_sample_position(&mut self, position: usize) -> Result<()> {
        (**self).set_sample_position(position)
    }

    fn release(&mut self) {
        (**self).release()
    }

    fn duration(&self) -> Duration {
        (**self).duration()
    }

    fn time_position(&self) -> Duration {
        (**self).time_position()
    }

    fn set_time_position(&mut self, time: Duration) -> Result<()> {
        (**self).set_time_position(time)
    }

    fn is_finished(&self) -> bool {
        (**self).is_finished()
    }
}
