//! Streaming PCM WAVE decoder.

use std::io::{self, Read, Seek, SeekFrom};

use hashbrown::HashMap;
use tracing::debug;

use crate::error::{Error, Result};
use crate::format::AudioFormat;
use crate::source::SampleProvider;
use crate::wav::{Chunk, ChunkId, MappedChunk, WaveInfo, WAVE_FORMAT_PCM};

/// Decodes one little-endian signed sample from `bytes` into `[-1.0, 1.0]`.
type SampleDecoder = fn(&[u8]) -> f32;

// 8-bit is decoded as signed to match the files this reader has always played.
fn decode_i8(b: &[u8]) -> f32 {
    b[0] as i8 as f32 / i8::MAX as f32
}

fn decode_i16(b: &[u8]) -> f32 {
    i16::from_le_bytes([b[0], b[1]]) as f32 / i16::MAX as f32
}

fn decode_i24(b: &[u8]) -> f32 {
    // Place the 24 bits at the top of an i32 and shift back to sign-extend from bit 23.
    let v = i32::from_le_bytes([0, b[0], b[1], b[2]]) >> 8;
    v as f32 / 8_388_607.0
}

fn decode_i32(b: &[u8]) -> f32 {
    (i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64 / i32::MAX as f64) as f32
}

fn decoder_for(bits_per_sample: u16) -> Result<SampleDecoder> {
    match bits_per_sample {
        8 => Ok(decode_i8),
        16 => Ok(decode_i16),
        24 => Ok(decode_i24),
        32 => Ok(decode_i32),
        other => Err(Error::UnsupportedFormat(format!(
            "unsupported bits per sample: {}",
            other
        ))),
    }
}

/// Cursor into the virtual stream formed by concatenating all `data` chunks.
#[derive(Clone, Copy, Debug, Default)]
struct DataCursor {
    /// Index into the ordered list of `data` chunks.
    chunk: usize,
    /// Bytes already consumed from that chunk.
    offset: u32,
}

/// Decodes a PCM WAVE stream into normalized `f32` samples.
///
/// Opening the reader maps every chunk in the file and validates the `fmt `
/// chunk; any problem is reported from [`WaveReader::new`] and no reader is
/// returned. After that, [`read`](SampleProvider::read) never fails on bad
/// data: running out of bytes is simply the end of the stream.
///
/// Files may carry several `data` chunks. They are played back to back in
/// file order, and positions index into their concatenation.
///
/// # Ownership
///
/// The reader owns `R` and drops it on [`release`](SampleProvider::release).
/// To keep using the stream afterwards, either pass `&mut R` (which is also
/// `Read + Seek`), build with [`leave_open`](Self::leave_open) and reclaim it with
/// [`into_inner`](Self::into_inner).
pub struct WaveReader<R> {
    stream: Option<R>,
    leave_open: bool,
    released: bool,

    info: WaveInfo,
    format: AudioFormat,
    decode: SampleDecoder,

    chunks: HashMap<ChunkId, Vec<MappedChunk>>,
    total_bytes: u64,
    total_samples: usize,

    /// Canonical position; byte and time positions are derived from it.
    sample_pos: usize,
    cursor: DataCursor,
    scratch: [u8; 4],
}

impl<R: Read + Seek> WaveReader<R> {
    /// Parse the container and position the reader at the first sample.
    pub fn new(mut stream: R) -> Result<Self> {
        let chunks = map_chunks(&mut stream)?;

        let fmt = first_chunk(&chunks, ChunkId::FMT)?;
        let info = read_info(&mut stream, &fmt)?;
        let decode = decoder_for(info.bits_per_sample)?;

        let total_bytes: u64 = chunks
            .get(&ChunkId::DATA)
            .map(|data| data.iter().map(|c| c.length() as u64).sum())
            .unwrap_or(0);
        let total_samples = (total_bytes / info.bytes_per_sample() as u64) as usize;

        debug!(
            channels = info.channels,
            sample_rate = info.sample_rate,
            bits = info.bits_per_sample,
            data_chunks = chunks.get(&ChunkId::DATA).map_or(0, Vec::len),
            total_samples,
            "wave stream opened"
        );

        let mut reader = Self {
            stream: Some(stream),
            leave_open: false,
            released: false,
            format: AudioFormat::new(info.sample_rate, info.channels),
            info,
            decode,
            chunks,
            total_bytes,
            total_samples,
            sample_pos: 0,
            cursor: DataCursor::default(),
            scratch: [0; 4],
        };
        reader.seek_data(0)?;
        Ok(reader)
    }

    /// Keep the stream alive across [`release`](SampleProvider::release) so it
    /// can be reclaimed with [`into_inner`](Self::into_inner).
    pub fn leave_open(mut self, leave_open: bool) -> Self {
        self.leave_open = leave_open;
        self
    }

    /// Give back the underlying stream, if it has not been released.
    pub fn into_inner(self) -> Option<R> {
        self.stream
    }

    /// The decoded `fmt ` chunk.
    pub fn info(&self) -> &WaveInfo {
        &self.info
    }

    /// All chunks with the given id, in file order.
    pub fn chunks(&self, id: ChunkId) -> &[MappedChunk] {
        self.chunks.get(&id).map_or(&[][..], Vec::as_slice)
    }

    /// Total length of all `data` chunks.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Current position as a byte offset into the concatenated `data` chunks.
    pub fn byte_position(&self) -> u64 {
        (self.sample_pos * self.info.bytes_per_sample()) as u64
    }

    /// Move to a byte offset, clamped to `[0, total_bytes]`.
    ///
    /// The sample position becomes `offset / bytes_per_sample`; the stream is
    /// placed at that sample's first byte.
    pub fn set_byte_position(&mut self, offset: u64) -> Result<()> {
        let offset = offset.min(self.total_bytes);
        self.seek_sample((offset / self.info.bytes_per_sample() as u64) as usize)
    }

    /// Clamp `position` and place the stream at that sample's first byte.
    fn seek_sample(&mut self, position: usize) -> Result<()> {
        self.sample_pos = position.min(self.total_samples);
        let byte_pos = (self.sample_pos * self.info.bytes_per_sample()) as u64;
        self.seek_data(byte_pos)
    }

    fn data_chunks(&self) -> &[MappedChunk] {
        self.chunks(ChunkId::DATA)
    }

    /// Place the stream at `offset` bytes into the concatenated `data` chunks.
    ///
    /// Walks the chunk list accumulating lengths; files rarely carry more than
    /// a handful of `data` chunks.
    fn seek_data(&mut self, offset: u64) -> Result<()> {
        let mut remaining = offset;
        let mut target = None;
        for (i, chunk) in self.data_chunks().iter().enumerate() {
            let len = chunk.length() as u64;
            if remaining < len {
                target = Some((i, chunk.content_offset() + remaining));
                break;
            }
            remaining -= len;
        }

        match target {
            Some((chunk, abs)) => {
                if let Some(stream) = self.stream.as_mut() {
                    stream.seek(SeekFrom::Start(abs))?;
                }
                self.cursor = DataCursor { chunk, offset: remaining as u32 };
            }
            None => {
                // At or past the end: nothing left to read.
                self.cursor = DataCursor { chunk: self.data_chunks().len(), offset: 0 };
            }
        }
        Ok(())
    }

    /// Read exactly `len` bytes of sample data into the scratch buffer,
    /// crossing `data` chunk boundaries as needed.
    ///
    /// Returns `false` once the data is exhausted or the stream comes up short.
    fn fill_scratch(&mut self, len: usize) -> io::Result<bool> {
        let mut filled = 0;
        while filled < len {
            let data = self.chunks.get(&ChunkId::DATA).map_or(&[][..], Vec::as_slice);
            let Some(current) = data.get(self.cursor.chunk).copied() else {
                return Ok(false);
            };

            let left_in_chunk = (current.length() - self.cursor.offset) as usize;
            if left_in_chunk == 0 {
                self.cursor.chunk += 1;
                self.cursor.offset = 0;
                if let Some(next) = data.get(self.cursor.chunk) {
                    let content = next.content_offset();
                    if let Some(stream) = self.stream.as_mut() {
                        stream.seek(SeekFrom::Start(content))?;
                    }
                }
                continue;
            }

            let Some(stream) = self.stream.as_mut() else {
                return Ok(false);
            };
            let want = (len - filled).min(left_in_chunk);
            let got = read_up_to(stream, &mut self.scratch[filled..filled + want])?;
            self.cursor.offset += got as u32;
            filled += got;
            if got < want {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl<R: Read + Seek + Send> SampleProvider for WaveReader<R> {
    fn read(&mut self, buffer: &mut [f32]) -> Result<usize> {
        if self.released {
            return Ok(0);
        }
        let width = self.info.bytes_per_sample();
        let mut written = 0;
        for slot in buffer.iter_mut() {
            if !self.fill_scratch(width)? {
                break;
            }
            *slot = (self.decode)(&self.scratch[..width]);
            written += 1;
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

    fn set_sample_position(&mut self, position: usize) -> Result<()> {
        self.seek_sample(position)
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if !self.leave_open {
            self.stream = None;
        }
        debug!(leave_open = self.leave_open, "wave stream released");
    }
}

/// Like `read_exact`, but reports how much was read instead of failing on EOF.
fn read_up_to<R: Read>(stream: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut read = 0;
    while read < buf.len() {
        match stream.read(&mut buf[read..]) {
            Ok(0) => break,
            Ok(n) => read += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(read)
}

fn read_array<const N: usize, R: Read>(stream: &mut R) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    let got = read_up_to(stream, &mut buf)?;
    if got < N {
        return Err(Error::Truncated { needed: N, got });
    }
    Ok(buf)
}

fn read_u16<R: Read>(stream: &mut R) -> Result<u16> {
    Ok(u16::from_le_bytes(read_array(stream)?))
}

fn read_u32<R: Read>(stream: &mut R) -> Result<u32> {
    Ok(u32::from_le_bytes(read_array(stream)?))
}

fn read_chunk<R: Read>(stream: &mut R) -> Result<Chunk> {
    let id = ChunkId(read_array(stream)?);
    let length = read_u32(stream)?;
    Ok(Chunk { id, length })
}

/// Check the `RIFF`/`WAVE` preamble and record every following chunk.
fn map_chunks<R: Read + Seek>(stream: &mut R) -> Result<HashMap<ChunkId, Vec<MappedChunk>>> {
    let stream_len = stream.seek(SeekFrom::End(0))?;
    stream.seek(SeekFrom::Start(0))?;

    // The RIFF length is redundant with the stream length and is not trusted.
    let riff = read_chunk(stream)?;
    if riff.id != ChunkId::RIFF {
        return Err(Error::MalformedContainer(format!(
            "expected RIFF signature, found \"{}\"",
            riff.id
        )));
    }
    let form = ChunkId(read_array(stream)?);
    if form != ChunkId::WAVE {
        return Err(Error::MalformedContainer(format!(
            "expected WAVE form, found \"{}\"",
            form
        )));
    }

    let mut chunks: HashMap<ChunkId, Vec<MappedChunk>> = HashMap::new();
    chunks.insert(ChunkId::RIFF, vec![MappedChunk { chunk: riff, offset: 0 }]);
    let mut offset = stream.stream_position()?;
    while offset < stream_len {
        let chunk = read_chunk(stream)?;
        let seen = chunks.entry(chunk.id).or_default();
        if !seen.is_empty() && (chunk.id == ChunkId::RIFF || chunk.id == ChunkId::FMT) {
            return Err(Error::MalformedContainer(format!(
                "repeated \"{}\" chunk",
                chunk.id
            )));
        }
        seen.push(MappedChunk { chunk, offset });
        debug!(id = %chunk.id, length = chunk.length, offset, "chunk mapped");

        offset += Chunk::HEADER_LEN + chunk.length as u64;
        stream.seek(SeekFrom::Start(offset))?;
    }

    Ok(chunks)
}

fn first_chunk(chunks: &HashMap<ChunkId, Vec<MappedChunk>>, id: ChunkId) -> Result<MappedChunk> {
    chunks
        .get(&id)
        .and_then(|list| list.first())
        .copied()
        .ok_or(Error::MissingChunk(id))
}

fn read_info<R: Read + Seek>(stream: &mut R, fmt: &MappedChunk) -> Result<WaveInfo> {
    if fmt.length() != WaveInfo::PCM_LEN {
        return Err(Error::MalformedContainer(format!(
            "format chunk has length {}, expected {}",
            fmt.length(),
            WaveInfo::PCM_LEN
        )));
    }

    stream.seek(SeekFrom::Start(fmt.content_offset()))?;
    let info = WaveInfo {
        codec: read_u16(stream)?,
        channels: read_u16(stream)?,
        sample_rate: read_u32(stream)?,
        byte_rate: read_u32(stream)?,
        block_align: read_u16(stream)?,
        bits_per_sample: read_u16(stream)?,
    };

    if info.codec != WAVE_FORMAT_PCM {
        return Err(Error::UnsupportedFormat(format!(
            "expected PCM codec, found tag {:#06x}",
            info.codec
        )));
    }
    if info.channels == 0 || info.sample_rate == 0 {
        return Err(Error::UnsupportedFormat(format!(
            "{} channels at {} Hz",
            info.channels, info.sample_rate
        )));
    }
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Builds a WAVE file from raw chunks.
    fn wave(fmt: &[u8], chunks: &[(&[u8; 4], Vec<u8>)]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(b"WAVE");
        body.extend_from_slice(b"fmt ");
        body.extend_from_slice(&(fmt.len() as u32).to_le_bytes());
        body.extend_from_slice(fmt);
        for (id, payload) in chunks {
            body.extend_from_slice(*id);
            body.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            body.extend_from_slice(payload.as_slice());
        }
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(&body);
        out
    }

    fn pcm_fmt(channels: u16, rate: u32, bits: u16) -> Vec<u8> {
        let align = channels * bits / 8;
        let mut v = Vec::new();
        v.extend_from_slice(&WAVE_FORMAT_PCM.to_le_bytes());
        v.extend_from_slice(&channels.to_le_bytes());
        v.extend_from_slice(&rate.to_le_bytes());
        v.extend_from_slice(&(rate * align as u32).to_le_bytes());
        v.extend_from_slice(&align.to_le_bytes());
        v.extend_from_slice(&bits.to_le_bytes());
        v
    }

    fn i16_bytes(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    fn open(bytes: Vec<u8>) -> Result<WaveReader<Cursor<Vec<u8>>>> {
        WaveReader::new(Cursor::new(bytes))
    }

    #[test]
    fn decodes_16_bit() {
        let data = i16_bytes(&[0, i16::MAX, -i16::MAX, 16384]);
        let mut reader = open(wave(&pcm_fmt(1, 8000, 16), &[(b"data", data)])).unwrap();
        assert_eq!(reader.format(), AudioFormat::mono(8000));
        assert_eq!(reader.total_samples(), 4);

        let mut out = [0.0f32; 8];
        assert_eq!(reader.read(&mut out).unwrap(), 4);
        assert_eq!(&out[..3], &[0.0, 1.0, -1.0]);
        assert!((out[3] - 0.5).abs() < 1e-4);
        assert_eq!(reader.read(&mut out).unwrap(), 0);
    }

    #[test]
    fn decodes_signed_8_bit() {
        let data = vec![0u8, 127, 0x81];
        let mut reader = open(wave(&pcm_fmt(1, 8000, 8), &[(b"data", data)])).unwrap();
        let mut out = [0.0f32; 3];
        reader.read(&mut out).unwrap();
        assert_eq!(out, [0.0, 1.0, -1.0]);
    }

    #[test]
    fn decodes_24_bit_with_sign_extension() {
        let data = vec![0xff, 0xff, 0x7f, 0x01, 0x00, 0x80, 0xff, 0xff, 0xff];
        let mut reader = open(wave(&pcm_fmt(1, 8000, 24), &[(b"data", data)])).unwrap();
        let mut out = [0.0f32; 3];
        assert_eq!(reader.read(&mut out).unwrap(), 3);
        assert_eq!(out[0], 1.0);
        assert_eq!(out[1], -1.0);
        assert!(out[2] < 0.0 && out[2] > -1e-6);
    }

    #[test]
    fn decodes_32_bit() {
        let data: Vec<u8> = [i32::MAX, -i32::MAX, 0].iter().flat_map(|s| s.to_le_bytes()).collect();
        let mut reader = open(wave(&pcm_fmt(1, 8000, 32), &[(b"data", data)])).unwrap();
        let mut out = [0.0f32; 3];
        reader.read(&mut out).unwrap();
        assert_eq!(out, [1.0, -1.0, 0.0]);
    }

    #[test]
    fn skips_unknown_chunks() {
        let data = i16_bytes(&[1, 2, 3]);
        let bytes = wave(&pcm_fmt(1, 8000, 16), &[(b"LIST", b"junk".to_vec()), (b"data", data)]);
        let reader = open(bytes).unwrap();
        assert_eq!(reader.total_samples(), 3);
        assert_eq!(reader.chunks(ChunkId(*b"LIST")).len(), 1);
    }

    #[test]
    fn reads_across_data_chunks() {
        let a = i16_bytes(&[1, 2, 3]);
        let b = i16_bytes(&[4, 5]);
        let bytes = wave(&pcm_fmt(1, 8000, 16), &[(b"data", a), (b"LIST", b"xx".to_vec()), (b"data", b)]);
        let mut reader = open(bytes).unwrap();
        assert_eq!(reader.total_samples(), 5);
        assert_eq!(reader.total_bytes(), 10);

        let mut out = [0.0f32; 5];
        assert_eq!(reader.read(&mut out).unwrap(), 5);
        let raw: Vec<i16> = out.iter().map(|s| (s * i16::MAX as f32).round() as i16).collect();
        assert_eq!(raw, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn seeks_into_second_data_chunk() {
        let a = i16_bytes(&[10, 20]);
        let b = i16_bytes(&[30, 40]);
        let bytes = wave(&pcm_fmt(1, 8000, 16), &[(b"data", a), (b"data", b)]);
        let mut reader = open(bytes).unwrap();

        reader.set_byte_position(6).unwrap();
        assert_eq!(reader.sample_position(), 3);
        let mut out = [0.0f32; 4];
        assert_eq!(reader.read(&mut out).unwrap(), 1);
        assert_eq!((out[0] * i16::MAX as f32).round() as i16, 40);
        assert_eq!(reader.sample_position(), 4);
    }

    #[test]
    fn positions_clamp_to_end() {
        let data = i16_bytes(&[1, 2, 3, 4]);
        let mut reader = open(wave(&pcm_fmt(2, 8000, 16), &[(b"data", data)])).unwrap();
        reader.set_sample_position(100).unwrap();
        assert_eq!(reader.sample_position(), 4);
        assert_eq!(reader.byte_position(), 8);
        assert!(reader.is_finished());

        let mut out = [0.0f32; 2];
        assert_eq!(reader.read(&mut out).unwrap(), 0);
    }

    #[test]
    fn truncated_sample_is_end_of_stream() {
        // Declared data length runs past the end of the file.
        let mut bytes = wave(&pcm_fmt(1, 8000, 16), &[(b"data", i16_bytes(&[7, 8]))]);
        bytes.truncate(bytes.len() - 1);
        let mut reader = open(bytes).unwrap();
        let mut out = [0.0f32; 2];
        assert_eq!(reader.read(&mut out).unwrap(), 1);
    }

    #[test]
    fn rejects_bad_signatures() {
        let mut bytes = wave(&pcm_fmt(1, 8000, 16), &[(b"data", vec![])]);
        bytes[0..4].copy_from_slice(b"RIFX");
        assert!(matches!(open(bytes), Err(Error::MalformedContainer(_))));

        let mut bytes = wave(&pcm_fmt(1, 8000, 16), &[(b"data", vec![])]);
        bytes[8..12].copy_from_slice(b"AVI ");
        assert!(matches!(open(bytes), Err(Error::MalformedContainer(_))));
    }

    #[test]
    fn rejects_repeated_fmt() {
        let fmt = pcm_fmt(1, 8000, 16);
        let bytes = wave(&fmt, &[(b"fmt ", fmt.clone()), (b"data", vec![])]);
        assert!(matches!(open(bytes), Err(Error::MalformedContainer(_))));
    }

    #[test]
    fn rejects_second_riff() {
        let bytes = wave(&pcm_fmt(1, 8000, 16), &[(b"RIFF", b"WAVE".to_vec()), (b"data", vec![])]);
        assert!(matches!(open(bytes), Err(Error::MalformedContainer(_))));
    }

    #[test]
    fn rejects_wrong_fmt_length() {
        let mut fmt = pcm_fmt(1, 8000, 16);
        fmt.extend_from_slice(&[0, 0]);
        assert!(matches!(
            open(wave(&fmt, &[(b"data", vec![])])),
            Err(Error::MalformedContainer(_))
        ));
    }

    #[test]
    fn rejects_non_pcm_and_odd_depths() {
        let mut fmt = pcm_fmt(1, 8000, 32);
        fmt[0] = 3; // IEEE float
        assert!(matches!(open(wave(&fmt, &[(b"data", vec![])])), Err(Error::UnsupportedFormat(_))));

        let fmt = pcm_fmt(1, 8000, 12);
        assert!(matches!(open(wave(&fmt, &[(b"data", vec![])])), Err(Error::UnsupportedFormat(_))));
    }

    #[test]
    fn short_header_is_truncated() {
        let bytes = b"RIFF\x04\x00".to_vec();
        assert!(matches!(open(bytes), Err(Error::Truncated { needed: 4, got: 2 })));
    }

    #[test]
    fn missing_fmt_is_reported() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&12u32.to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&0u32.to_le_bytes());
        assert!(matches!(open(bytes), Err(Error::MissingChunk(ChunkId::FMT))));
    }

    #[test]
    fn release_is_idempotent_and_honours_leave_open() {
        let data = i16_bytes(&[1, 2]);
        let bytes = wave(&pcm_fmt(1, 8000, 16), &[(b"data", data)]);

        let mut reader = open(bytes.clone()).unwrap();
        reader.release();
        reader.release();
        let mut out = [0.0f32; 2];
        assert_eq!(reader.read(&mut out).unwrap(), 0);
        assert!(reader.into_inner().is_none());

        let mut reader = open(bytes).unwrap().leave_open(true);
        reader.release();
        assert_eq!(reader.read(&mut out).unwrap(), 0);
        assert!(reader.into_inner().is_some());
    }

    #[test]
    fn byte_seek_works_on_streams_that_stay_on_one_thread() {
        use std::rc::Rc;

        let data = i16_bytes(&[1, 2, 3, 4]);
        let bytes: Rc<[u8]> = wave(&pcm_fmt(1, 8000, 16), &[(b"data", data)]).into();
        let mut reader = WaveReader::new(Cursor::new(bytes)).unwrap();

        reader.set_byte_position(5).unwrap();
        assert_eq!(reader.byte_position(), 4);
        reader.set_byte_position(100).unwrap();
        assert_eq!(reader.byte_position(), reader.total_bytes());
    }
}
