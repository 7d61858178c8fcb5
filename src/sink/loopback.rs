//! Fixed-capacity loopback history.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::format::AudioFormat;

struct Ring {
    samples: Box<[f32]>,
    read: usize,
    write: usize,
    available: usize,
}

/// Circular buffer holding the most recent `capacity` samples of the mix
///
/// Producers [`push`](Self::push) and the monitor callback [`pull`](Self::pull)s,
/// possibly from different threads. Both share a single lock and never wait
/// on each other for data:
/// - pushing into a full buffer overwrites the oldest samples,
/// - pulling more than is available fills the remainder with silence.
///
/// This is "the last N seconds", not a queue with backpressure.
pub struct LoopbackRingBuffer {
    ring: Mutex<Ring>,
}

impl LoopbackRingBuffer {
    /// Create a buffer holding `capacity` samples (at least one)
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: Mutex::new(Ring {
                samples: vec![0.0; capacity.max(1)].into_boxed_slice(),
                read: 0,
                write: 0,
                available: 0,
            }),
        }
    }

    /// Create a buffer holding `secs` seconds of `format`
    pub fn for_format(format: AudioFormat, secs: f32) -> Self {
        Self::new((format.samples_per_second() as f64 * secs as f64) as usize)
    }

    fn lock(&self) -> MutexGuard<'_, Ring> {
        // A panicking producer leaves the cursors consistent; keep going.
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.lock().samples.len()
    }

    /// Samples waiting to be pulled
    pub fn available(&self) -> usize {
        self.lock().available
    }

    /// Append `buffer`, discarding the oldest samples once full
    pub fn push(&self, buffer: &[f32]) {
        let mut ring = self.lock();
        let cap = ring.samples.len();
        for &sample in buffer {
            let write = ring.write;
            ring.samples[write] = sample;
            ring.write = (write + 1) % cap;

            if ring.available < cap {
                ring.available += 1;
            } else {
                ring.read = (ring.read + 1) % cap;
            }
        }
    }

    /// Fill `buffer` with the oldest available samples
    ///
    /// `buffer` is cleared first, so whatever is not covered by available
    /// samples is silence. Returns how many samples were copied.
    pub fn pull(&self, buffer: &mut [f32]) -> usize {
        buffer.iter_mut().for_each(|s| *s = 0.0);

        let mut ring = self.lock();
        let cap = ring.samples.len();
        let count = buffer.len().min(ring.available);
        for slot in buffer[..count].iter_mut() {
            *slot = ring.samples[ring.read];
            ring.read = (ring.read + 1) % cap;
        }
        ring.available -= count;
        count
    }

    /// Drop all pending samples
    pub fn clear(&self) {
        let mut ring = self.lock();
        ring.read = ring.write;
        ring.available = 0;
    }
}
