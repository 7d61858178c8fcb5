//! A playable clip and the provider it owns while playing.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::factory::{BoxedProvider, ProviderFactory};
use crate::mix::MixingBus;

/// A named sound that can be started, restarted and stopped
///
/// While playing, the clip owns its provider and the [`MixingBus`] holds a
/// reference to the clip. Every access to the provider goes through the
/// clip's lock, so a [`stop`](Self::stop) can never release a provider the bus
/// is in the middle of reading.
///
/// Locks are only ever taken bus first, then clip. Clip methods never call
/// into the bus while holding their own lock.
pub struct Clip {
    name: String,
    path: Option<PathBuf>,
    provider: Mutex<Option<BoxedProvider>>,
}

impl Clip {
    /// A clip that opens `path` each time it starts playing
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: Some(path.into()),
            provider: Mutex::new(None),
        }
    }

    /// A clip playing an already opened provider
    ///
    /// Once stopped it cannot be played again, since there is no file to reopen.
    pub fn from_provider(name: impl Into<String>, provider: BoxedProvider) -> Self {
        Self {
            name: name.into(),
            path: None,
            provider: Mutex::new(Some(provider)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, Option<BoxedProvider>> {
        self.provider.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start playing on `bus`, or restart from the beginning if already playing
    ///
    /// Failing to open the file is logged and returned; other clips on the bus
    /// are unaffected.
    pub fn play(self: &Arc<Self>, bus: &MixingBus) -> Result<()> {
        {
            let mut slot = self.lock();
            match slot.as_mut() {
                Some(provider) => {
                    provider.set_time_position(Duration::ZERO)?;
                    debug!(clip = %self.name, "restarted");
                }
                None => {
                    let path = self.path.as_ref().ok_or_else(|| {
                        Error::Io(io::Error::new(io::ErrorKind::NotFound, "clip has no source file"))
                    })?;
                    info!(clip = %self.name, path = %path.display(), "opening clip");
                    let provider = ProviderFactory::open(path, bus.format()).map_err(|e| {
                        warn!(clip = %self.name, error = %e, "could not play clip");
                        e
                    })?;
                    *slot = Some(provider);
                }
            }
        }
        bus.register(Arc::clone(self));
        Ok(())
    }

    /// Remove from `bus` and release the provider. Idempotent.
    pub fn stop(self: &Arc<Self>, bus: &MixingBus) {
        bus.unregister(self);
        self.release();
    }

    /// Seek back to the start without touching bus membership
    pub fn restart(&self) -> Result<()> {
        match self.lock().as_mut() {
            Some(provider) => provider.set_time_position(Duration::ZERO),
            None => Ok(()),
        }
    }

    /// Drop the provider, releasing its stream
    pub(crate) fn release(&self) {
        if let Some(mut provider) = self.lock().take() {
            provider.release();
            debug!(clip = %self.name, "stopped");
        }
    }

    /// Pull the next samples, or `0` if not playing
    ///
    /// A read error stops the clip on the spot: the provider is released and
    /// the error is logged rather than passed on to the caller.
    pub fn read(&self, buffer: &mut [f32]) -> usize {
        let mut slot = self.lock();
        let Some(provider) = slot.as_mut() else {
            return 0;
        };
        match provider.read(buffer) {
            Ok(n) => n,
            Err(e) => {
                warn!(clip = %self.name, error = %e, "read failed, stopping clip");
                provider.release();
                *slot = None;
                0
            }
        }
    }

    /// Whether a provider is currently open
    pub fn is_playing(&self) -> bool {
        self.lock().is_some()
    }

    /// True when not playing, or when the provider has reached its end
    pub fn is_finished(&self) -> bool {
        self.lock().as_ref().map_or(true, |p| p.is_finished())
    }

    /// Current playing time, if playing
    pub fn position(&self) -> Option<Duration> {
        self.lock().as_ref().map(|p| p.time_position())
    }

    /// Total length of the open provider, if playing
    pub fn duration(&self) -> Option<Duration> {
        self.lock().as_ref().map(|p| p.duration())
    }
}

impl core::fmt::Debug for Clip {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Clip")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("playing", &self.is_playing())
            .finish()
    }
}
