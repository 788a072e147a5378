//! Additive harmonic timbres.
//!
//! A `Timbre` is a fundamental sine plus attenuated integer harmonics. The sum
//! is divided by the total weight so a full-level tone peaks near 1.0 before
//! the envelope and volume are applied.

use crate::dsp::{fast_sin, TAU};
use crate::envelopes::Envelope;

/// Maximum number of partials a timbre may carry (fundamental included).
pub const MAX_PARTIALS: usize = 8;

/// Harmonic weights; `weights[k]` scales the sine at `(k + 1) * f0`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Timbre {
    weights: [f32; MAX_PARTIALS],
    len: usize,
    norm: f32,
}

impl Timbre {
    /// Build from a weight list. Extra partials beyond `MAX_PARTIALS` are
    /// ignored; negative weights are treated as zero.
    pub fn new(weights: &[f32]) -> Self {
        let mut w = [0.0; MAX_PARTIALS];
        let len = weights.len().min(MAX_PARTIALS);
        for (dst, &src) in w.iter_mut().zip(weights.iter()) {
            *dst = src.max(0.0);
        }
        let sum: f32 = w[..len].iter().sum();
        Self { weights: w, len, norm: if sum > 0.0 { 1.0 / sum } else { 0.0 } }
    }

    /// Five partials halving in weight: 1, 1/2, 1/4, 1/8, 1/16.
    pub fn grand() -> Self {
        Self::new(&[1.0, 0.5, 0.25, 0.125, 0.0625])
    }

    /// Fundamental plus a soft octave partial.
    pub fn upright() -> Self {
        Self::new(&[1.0, 0.3])
    }

    #[inline]
    pub fn weights(&self) -> &[f32] { &self.weights[..self.len] }

    /// Raw waveform (no envelope) at `t` seconds, normalized to peak ≤ 1.
    #[inline]
    pub fn wave(&self, freq: f32, t: f32) -> f32 {
        let w0 = TAU * freq * t;
        let mut acc = 0.0;
        for (k, &w) in self.weights().iter().enumerate() {
            if w != 0.0 {
                acc += w * fast_sin(w0 * (k + 1) as f32);
            }
        }
        acc * self.norm
    }

    /// Enveloped sample of a note: `env.gain(t, volume) * wave(t)`.
    #[inline]
    pub fn sample<E: Envelope>(&self, env: &E, freq: f32, t: f32, duration: f32, volume: f32) -> f32 {
        let gain = env.gain(t, duration, volume);
        if gain == 0.0 {
            return 0.0;
        }
        gain * self.wave(freq, t)
    }
}
