//! Nearest-neighbour resampler and channel mapper
//!
//! Wraps any [`SampleProvider`] and presents it at a fixed output format.
//! Source audio is pulled in whole chunks and walked with a fractional cursor;
//! there is no interpolation, so aliasing is expected.

use tracing::debug;

use crate::error::Result;
use crate::format::AudioFormat;
use crate::source::SampleProvider;

/// Presents a source provider at a different sample rate and/or channel count
///
/// Output channel `c` is taken from source channel `min(c, source_channels - 1)`:
/// stereo to mono keeps the left channel and drops the right (no averaging),
/// mono to stereo duplicates the sample.
///
/// # Chunked refill
///
/// Output frame `n` is source frame `floor(n * source_rate / target_rate)`,
/// computed in integers from the absolute output frame so chunk boundaries and
/// seeks land on the same frames as uninterrupted playback. Each refill reads
/// up to one chunk of source frames and emits output frames until either the
/// output chunk is full or the mapping passes the last frame read. Whatever it
/// did not reach is handed back by moving the source position backwards.
pub struct Resampler<P> {
    source: P,
    format: AudioFormat,
    /// `source_rate / target_rate`
    ratio: f64,
    release_source: bool,
    released: bool,

    src_chunk: Vec<f32>,
    out_chunk: Vec<f32>,
    out_len: usize,
    out_read: usize,
    /// Output samples to drop after the next refill (sub-frame seeks)
    skip: usize,
    /// Output frame the next refill starts at
    next_frame: u64,

    total_samples: usize,
    sample_pos: usize,
}

impl<P: SampleProvider> Resampler<P> {
    /// Wrap `source`, producing samples in `format`
    ///
    /// When `release_source` is false, [`release`](SampleProvider::release)
    /// leaves the source untouched so the caller can keep using it through
    /// [`into_inner`](Self::into_inner).
    pub fn new(source: P, format: AudioFormat, release_source: bool) -> Self {
        let src_format = source.format();
        let src_ch = src_format.channels.max(1) as usize;
        let out_ch = format.channels.max(1) as usize;
        let ratio = src_format.sample_rate as f64 / format.sample_rate.max(1) as f64;

        // One second of output frames per chunk.
        let chunk_frames = (format.sample_rate as usize).max(1);

        let src_frames = (source.total_samples() / src_ch) as u128;
        let out_frames = src_frames * format.sample_rate as u128 / src_format.sample_rate.max(1) as u128;
        let total_samples = out_frames as usize * out_ch;

        debug!(from = %src_format, to = %format, ratio, "resampling");

        Self {
            source,
            format,
            ratio,
            release_source,
            released: false,
            src_chunk: vec![0.0; chunk_frames * src_ch],
            out_chunk: vec![0.0; chunk_frames * out_ch],
            out_len: 0,
            out_read: 0,
            skip: 0,
            next_frame: 0,
            total_samples,
            sample_pos: 0,
        }
    }

    /// The wrapped provider's format
    pub fn source_format(&self) -> AudioFormat {
        self.source.format()
    }

    /// `source_rate / target_rate`
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn source(&self) -> &P {
        &self.source
    }

    /// Unwrap the source provider
    pub fn into_inner(self) -> P {
        self.source
    }

    /// Decode and resample the next chunk. Returns `false` at end of source.
    fn refill(&mut self) -> Result<bool> {
        let src_ch = self.source.format().channels.max(1) as usize;
        let out_ch = self.format.channels.max(1) as usize;

        let read = self.source.read(&mut self.src_chunk)?;
        let frames = read / src_ch;
        self.out_len = 0;
        self.out_read = 0;
        if frames == 0 {
            return Ok(false);
        }

        let src_rate = self.source.format().sample_rate as u64;
        let tgt_rate = self.format.sample_rate.max(1) as u64;
        let start = self.next_frame * src_rate / tgt_rate;
        let max_out = self.out_chunk.len() / out_ch;
        let mut written = 0;
        let mut cursor = 0usize;
        while cursor < frames && written < max_out {
            let base = cursor * src_ch;
            let out = &mut self.out_chunk[written * out_ch..(written + 1) * out_ch];
            for (ch, slot) in out.iter_mut().enumerate() {
                *slot = self.src_chunk[base + ch.min(src_ch - 1)];
            }
            written += 1;
            cursor = ((self.next_frame + written as u64) * src_rate / tgt_rate - start) as usize;
        }
        self.out_len = written * out_ch;
        self.next_frame += written as u64;

        // Give back the source samples the cursor never reached.
        let consumed = cursor.min(frames) * src_ch;
        let unused = read - consumed;
        if unused > 0 {
            let pos = self.source.sample_position();
            self.source.set_sample_position(pos.saturating_sub(unused))?;
        }

        self.out_read = self.skip.min(self.out_len);
        self.skip = 0;
        Ok(self.out_read < self.out_len)
    }
}

impl<P: SampleProvider> SampleProvider for Resampler<P> {
    fn read(&mut self, buffer: &mut [f32]) -> Result<usize> {
        if self.released {
            return Ok(0);
        }

        let wanted = buffer.len().min(self.total_samples - self.sample_pos);
        let mut written = 0;
        while written < wanted {
            if self.out_read >= self.out_len && !self.refill()? {
                break;
            }
            let n = (self.out_len - self.out_read).min(wanted - written);
            buffer[written..written + n]
                .copy_from_slice(&self.out_chunk[self.out_read..self.out_read + n]);
            self.out_read += n;
            written += n;
        }

        self.sample_pos += written;
        Ok(written)
    }

    fn format(&self) -> AudioFormat {
        self.format
    }

    fn total_samples(&self) -> usize {
        self.total_samples
    }

    fn sample_position(&self) -> usize {
        self.sample_pos
    }

    /// Seek in output samples; the source lands on the frame the output frame
    /// maps to, and any buffered chunk is discarded.
    fn set_sample_position(&mut self, position: usize) -> Result<()> {
        let src_format = self.source.format();
        let src_ch = src_format.channels.max(1) as u128;
        let out_ch = self.format.channels.max(1) as usize;

        self.sample_pos = position.min(self.total_samples);
        let frame = (self.sample_pos / out_ch) as u128;
        let src_frame = frame * src_format.sample_rate as u128 / self.format.sample_rate.max(1) as u128;

        self.out_len = 0;
        self.out_read = 0;
        self.skip = self.sample_pos % out_ch;
        self.next_frame = frame as u64;
        self.source.set_sample_position((src_frame * src_ch) as usize)
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.src_chunk = Vec::new();
        self.out_chunk = Vec::new();
        self.out_len = 0;
        self.out_read = 0;
        if self.release_source {
            self.source.release();
        }
    }
}
