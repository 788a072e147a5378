//! Realtime synthesis graph core.
//!
//! This module defines the minimal `Generator` trait and a lightweight `Engine<G>`
//! wrapper that owns a generator (the voice bank), tracks sample rate and the
//! number of frames produced, and yields one **mono** sample at a time with
//! zero heap work per sample.
//!
//! The frame count is published through a [`FrameClock`] so the control thread
//! can read "now" on the same timeline the audio thread renders on.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Anything that can generate one sample at a time.
pub trait Generator {
    /// Called when the engine is (re)initialized or when the sample rate changes.
    fn reset(&mut self, sr: f32);

    /// Generate the next mono sample. Implementations should assume the sample
    /// rate has been communicated via `reset`.
    fn next(&mut self) -> f32;
}

/// Shared, monotonically increasing count of rendered frames.
#[derive(Clone, Debug, Default)]
pub struct FrameClock(Arc<AtomicU64>);

impl FrameClock {
    #[inline] pub fn new() -> Self { Self::default() }
    #[inline] pub fn frames(&self) -> u64 { self.0.load(Ordering::Acquire) }
    #[inline] fn store(&self, frames: u64) { self.0.store(frames, Ordering::Release) }

    /// Clock position in seconds at `sr`.
    #[inline]
    pub fn seconds(&self, sr: f32) -> f64 {
        self.frames() as f64 / f64::from(sr.max(1.0))
    }
}

/// Lightweight realtime engine that owns a generator.
///
/// The audio callback should call `next(sr)` for every output sample and
/// `publish()` once per callback. If the `sr` reported by the host changes,
/// the engine will call `reset(sr)` on the inner generator once and continue.
pub struct Engine<G: Generator> {
    sr: f32,
    frames: u64,
    clock: FrameClock,
    gen: G,
}

impl<G: Generator> Engine<G> {
    /// Construct with an already-configured generator. We immediately `reset`
    /// the generator to communicate the sample rate.
    #[inline]
    pub fn new(mut gen: G, sr: f32, clock: FrameClock) -> Self {
        let sr = sr.max(1.0);
        gen.reset(sr);
        Self { sr, frames: clock.frames(), clock, gen }
    }

    /// Produce **one** mono sample at the given sample rate.
    #[inline]
    pub fn next(&mut self, sr: f32) -> f32 {
        if sr != self.sr {
            self.sr = sr.max(1.0);
            self.gen.reset(self.sr);
        }
        self.frames += 1;
        self.gen.next()
    }

    /// Make the frames rendered so far visible to clock readers.
    #[inline]
    pub fn publish(&self) { self.clock.store(self.frames) }

    #[inline] pub fn sample_rate(&self) -> f32 { self.sr }
    #[inline] pub fn frames(&self) -> u64 { self.frames }

    /// Elapsed time (seconds) since this engine was created.
    #[inline]
    pub fn time(&self) -> f64 { self.frames as f64 / f64::from(self.sr) }

    #[inline]
    pub fn generator_mut(&mut self) -> &mut G { &mut self.gen }
}
