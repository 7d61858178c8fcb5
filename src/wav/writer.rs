//! 16-bit PCM WAVE writer.

use std::io::Write;

use crate::format::AudioFormat;
use crate::wav::{ChunkId, WaveInfo, WAVE_FORMAT_PCM};

const BITS_PER_SAMPLE: u16 = 16;

/// Accumulates float samples and writes them out as a 16-bit PCM WAVE file
///
/// Samples are quantized as they are added, `s * 32767` truncated toward zero
/// and saturated to the `i16` range.
#[derive(Default, Debug)]
pub struct WaveWriter {
    data: Vec<u8>,
}

impl WaveWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Quantize and append interleaved samples
    pub fn add_samples(&mut self, samples: &[f32]) {
        self.data.reserve(samples.len() * 2);
        for &s in samples {
            // `as` saturates out-of-range floats.
            let q = (s * i16::MAX as f32) as i16;
            self.data.extend_from_slice(&q.to_le_bytes());
        }
    }

    /// Number of samples added so far
    pub fn len(&self) -> usize {
        self.data.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Write a complete WAVE file tagged with `format`
    pub fn write_to<W: Write>(&self, w: &mut W, format: AudioFormat) -> std::io::Result<()> {
        let block_align = format.channels * (BITS_PER_SAMPLE / 8);
        let data_len = self.data.len() as u32;
        let riff_len = 4 + (8 + WaveInfo::PCM_LEN) + (8 + data_len);

        w.write_all(&ChunkId::RIFF.0)?;
        w.write_all(&riff_len.to_le_bytes())?;
        w.write_all(&ChunkId::WAVE.0)?;

        w.write_all(&ChunkId::FMT.0)?;
        w.write_all(&WaveInfo::PCM_LEN.to_le_bytes())?;
        w.write_all(&WAVE_FORMAT_PCM.to_le_bytes())?;
        w.write_all(&format.channels.to_le_bytes())?;
        w.write_all(&format.sample_rate.to_le_bytes())?;
        w.write_all(&(format.sample_rate * block_align as u32).to_le_bytes())?;
        w.write_all(&block_align.to_le_bytes())?;
        w.write_all(&BITS_PER_SAMPLE.to_le_bytes())?;

        w.write_all(&ChunkId::DATA.0)?;
        w.write_all(&data_len.to_le_bytes())?;
        w.write_all(&self.data)
    }

    /// Convenience wrapper around [`write_to`](Self::write_to) for in-memory use
    pub fn to_bytes(&self, format: AudioFormat) -> Vec<u8> {
        let mut out = Vec::with_capacity(44 + self.data.len());
        // Writing into a Vec cannot fail.
        let _ = self.write_to(&mut out, format);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SampleProvider;
    use crate::wav::WaveReader;
    use std::io::Cursor;

    #[test]
    fn header_is_canonical() {
        let mut writer = WaveWriter::new();
        writer.add_samples(&[0.0, 0.5, -0.5, 1.0]);
        let bytes = writer.to_bytes(AudioFormat::stereo(44100));

        assert_eq!(bytes.len(), 44 + 8);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 36 + 8);
        assert_eq!(&bytes[8..16], b"WAVEfmt ");
        assert_eq!(u16::from_le_bytes([bytes[22], bytes[23]]), 2);
        assert_eq!(u32::from_le_bytes(bytes[28..32].try_into().unwrap()), 44100 * 4);
        assert_eq!(&bytes[36..40], b"data");
    }

    #[test]
    fn quantizes_and_saturates() {
        let mut writer = WaveWriter::new();
        writer.add_samples(&[1.0, -1.0, 2.0, -2.0]);
        let bytes = writer.to_bytes(AudioFormat::mono(8000));
        let samples: Vec<i16> = bytes[44..]
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();
        assert_eq!(samples, vec![i16::MAX, -i16::MAX, i16::MAX, i16::MIN]);
    }

    #[test]
    fn reader_accepts_written_file() {
        let mut writer = WaveWriter::new();
        writer.add_samples(&[0.25; 10]);
        let bytes = writer.to_bytes(AudioFormat::mono(22050));

        let mut reader = WaveReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.format(), AudioFormat::mono(22050));
        assert_eq!(reader.total_samples(), 10);
        let mut out = [0.0f32; 10];
        assert_eq!(reader.read(&mut out).unwrap(), 10);
        assert!(out.iter().all(|s| (s - 0.25).abs() < 1.0 / 32767.0));
    }
}
