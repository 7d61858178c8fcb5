//! Additive mixing of every playing clip.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use itertools::izip;
use tracing::debug;

use crate::format::AudioFormat;
use crate::mix::Clip;

struct BusState {
    active: Vec<Arc<Clip>>,
    scratch: Vec<f32>,
}

/// Registry of playing clips, summed into the output once per period
///
/// Registration, removal and mixing all share one lock. Mixing does not clip
/// or limit: overlapping loud clips can exceed full scale.
pub struct MixingBus {
    format: AudioFormat,
    state: Mutex<BusState>,
}

impl MixingBus {
    /// A bus whose clips are all converted to `format`
    pub fn new(format: AudioFormat) -> Self {
        Self {
            format,
            state: Mutex::new(BusState {
                active: Vec::new(),
                scratch: Vec::new(),
            }),
        }
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    fn lock(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add `clip` to the active set. Registering twice has no effect.
    pub fn register(&self, clip: Arc<Clip>) {
        let mut state = self.lock();
        if !state.active.iter().any(|c| Arc::ptr_eq(c, &clip)) {
            debug!(clip = clip.name(), active = state.active.len() + 1, "clip registered");
            state.active.push(clip);
        }
    }

    /// Remove `clip` from the active set. Returns whether it was present.
    pub fn unregister(&self, clip: &Arc<Clip>) -> bool {
        let mut state = self.lock();
        match state.active.iter().position(|c| Arc::ptr_eq(c, clip)) {
            Some(i) => {
                state.active.remove(i);
                debug!(clip = clip.name(), "clip unregistered");
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self, clip: &Arc<Clip>) -> bool {
        self.lock().active.iter().any(|c| Arc::ptr_eq(c, clip))
    }

    /// Number of clips currently registered
    pub fn len(&self) -> usize {
        self.lock().active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unregister and release every clip
    pub fn stop_all(&self) {
        let mut state = self.lock();
        for clip in state.active.drain(..) {
            clip.release();
        }
    }

    /// Add one period of every active clip into `output` and `loopback`
    ///
    /// Both buffers are accumulated into, never cleared; the caller decides
    /// what they start from. Clips are visited newest first, so removing a
    /// finished clip does not shift the ones still to be visited. A clip is
    /// stopped when it is already at its end, or when it yields nothing for a
    /// non-empty period.
    pub fn mix(&self, output: &mut [f32], loopback: &mut [f32]) {
        debug_assert_eq!(output.len(), loopback.len());
        let len = output.len().min(loopback.len());

        let mut state = self.lock();
        let BusState { active, scratch } = &mut *state;
        if scratch.len() < len {
            scratch.resize(len, 0.0);
        }
        let scratch = &mut scratch[..len];

        for i in (0..active.len()).rev() {
            if active[i].is_finished() {
                let clip = active.remove(i);
                debug!(clip = clip.name(), "clip finished");
                clip.release();
                continue;
            }

            let n = active[i].read(scratch);
            if n == 0 {
                if len > 0 {
                    let clip = active.remove(i);
                    debug!(clip = clip.name(), "clip ran dry");
                    clip.release();
                }
                continue;
            }

            for (out, lb, &s) in izip!(output.iter_mut(), loopback.iter_mut(), &scratch[..n]) {
                *out += s;
                *lb += s;
            }
        }
    }
}
