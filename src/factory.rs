//! Opening clip files as providers in a desired format.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};
use crate::format::AudioFormat;
use crate::source::{Resampler, SampleProvider};
use crate::wav::WaveReader;

/// A provider as handed out by the factory
pub type BoxedProvider = Box<dyn SampleProvider>;

/// Picks a decoder by file extension and adapts it to the requested format
///
/// This is the only place formats are converted: whatever comes out of
/// [`open`](Self::open) already produces samples in the requested format.
pub struct ProviderFactory;

impl ProviderFactory {
    /// Open `path` and return a provider producing `format`
    ///
    /// Only `.wav` files are supported. The decoder is wrapped in a
    /// [`Resampler`] when its native format differs from `format`.
    pub fn open(path: impl AsRef<Path>, format: AudioFormat) -> Result<BoxedProvider> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "wav" | "wave" => {
                let file = File::open(path)?;
                let reader = WaveReader::new(BufReader::new(file))?;
                Ok(Self::adapt(reader, format))
            }
            _ => Err(Error::UnsupportedContainer(format!(
                "no decoder for \"{}\"",
                path.display()
            ))),
        }
    }

    /// Wrap `provider` in a resampler unless it already produces `format`
    pub fn adapt<P: SampleProvider + 'static>(provider: P, format: AudioFormat) -> BoxedProvider {
        if provider.format() == format {
            return Box::new(provider);
        }
        debug!(from = %provider.format(), to = %format, "wrapping provider in resampler");
        Box::new(Resampler::new(provider, format, true))
    }
}
