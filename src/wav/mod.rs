//! Uncompressed PCM WAVE container support.
//!
//! A WAVE file is a `RIFF` chunk tagged `WAVE`, followed by a sequence of
//! `{id, length, payload}` chunks. [`WaveReader`] maps every chunk up front and
//! streams samples out of the (possibly several) `data` chunks as if they were
//! one contiguous byte stream. [`WaveWriter`] emits plain 16-bit files.

mod reader;
mod writer;

pub use reader::WaveReader;
pub use writer::WaveWriter;

use core::fmt;

/// Four-character chunk identifier, stored in file byte order.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkId(pub [u8; 4]);

impl ChunkId {
    pub const RIFF: ChunkId = ChunkId(*b"RIFF");
    pub const FMT: ChunkId = ChunkId(*b"fmt ");
    pub const DATA: ChunkId = ChunkId(*b"data");

    /// Form type that must follow the `RIFF` header.
    pub const WAVE: ChunkId = ChunkId(*b"WAVE");
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{:02x}", b)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkId(\"{}\")", self)
    }
}

/// A chunk header as read from the stream.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Chunk {
    pub id: ChunkId,
    /// Payload length in bytes, excluding the 8-byte header.
    pub length: u32,
}

impl Chunk {
    /// Size of `{id, length}` on disk.
    pub const HEADER_LEN: u64 = 8;
}

/// A chunk header plus the absolute stream offset it was found at.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MappedChunk {
    pub chunk: Chunk,
    /// Offset of the chunk header (not the payload).
    pub offset: u64,
}

impl MappedChunk {
    /// Absolute offset of the first payload byte.
    #[inline]
    pub fn content_offset(&self) -> u64 {
        self.offset + Chunk::HEADER_LEN
    }

    #[inline]
    pub fn length(&self) -> u32 {
        self.chunk.length
    }
}

/// Codec tag of the `fmt ` chunk. Only PCM is decoded.
pub const WAVE_FORMAT_PCM: u16 = 0x0001;

/// Decoded `fmt ` chunk payload.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct WaveInfo {
    pub codec: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
}

impl WaveInfo {
    /// Size of a PCM `fmt ` payload.
    pub const PCM_LEN: u32 = 16;

    #[inline]
    pub fn bytes_per_sample(&self) -> usize {
        self.bits_per_sample as usize / 8
    }

    /// Bits per second, as some tools report it.
    #[inline]
    pub fn bit_rate(&self) -> u64 {
        self.byte_rate as u64 * 8
    }
}
