//! Errors raised while opening and decoding clips.

use thiserror::Error;

use crate::wav::ChunkId;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong between a file handle and a playing provider.
///
/// Parsing and format errors are raised while a provider is constructed, so a
/// provider is never handed out half-initialized. Once a provider exists, a
/// short read is the normal end-of-stream signal; only genuine I/O failures
/// surface as [`Error::Io`].
#[derive(Error, Debug)]
pub enum Error {
    /// Bad RIFF/WAVE signature, a repeated `RIFF`/`fmt ` chunk or a `fmt `
    /// payload of the wrong size.
    #[error("Malformed container: {0}")]
    MalformedContainer(String),

    /// Non-PCM codec tag or a bit depth outside {8, 16, 24, 32}.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// No decoder is registered for this file extension.
    #[error("Unsupported container: {0}")]
    UnsupportedContainer(String),

    /// Lookup of a chunk id that never occurred in the file.
    #[error("Missing chunk: {0}")]
    MissingChunk(ChunkId),

    /// A fixed-size header field ran past the end of the stream.
    #[error("Truncated header: needed {needed} bytes, got {got}")]
    Truncated { needed: usize, got: usize },

    /// The audio output device could not be opened or started.
    #[error("Audio device error: {0}")]
    Device(String),

    /// I/O error from the underlying stream.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
