//! Single-tap feedback delay ("room" reverb) for whole buffers.
//!
//! Structure
//! - One delay line of `delay` samples fed back with `gain`:
//!   `y[i] = x[i] + gain * y[i - delay]`
//! - Processed in ascending index order, so each tap reads output that is
//!   already final (a causal IIR comb).
//!
//! This is a one-pass offline effect; there is no streaming state.

use waltz_core::dsp::kill_denormals;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FeedbackComb {
    delay: usize,
    gain: f32,
}

impl FeedbackComb {
    /// `gain` is clamped to [0, 0.99] to keep the loop stable.
    #[inline]
    pub fn new(delay_samples: usize, gain: f32) -> Self {
        Self { delay: delay_samples, gain: gain.clamp(0.0, 0.99) }
    }

    /// Delay given in seconds at `sample_rate`.
    #[inline]
    pub fn from_time(delay_s: f32, gain: f32, sample_rate: u32) -> Self {
        let delay = (f64::from(delay_s.max(0.0)) * f64::from(sample_rate)).round() as usize;
        Self::new(delay, gain)
    }

    #[inline] pub fn delay(&self) -> usize { self.delay }
    #[inline] pub fn gain(&self) -> f32 { self.gain }

    /// Apply in place. A zero delay or zero gain leaves `buf` untouched.
    pub fn process_in_place(&self, buf: &mut [f32]) {
        if self.delay == 0 || self.gain == 0.0 {
            return;
        }
        for i in self.delay..buf.len() {
            buf[i] = kill_denormals(buf[i] + buf[i - self.delay] * self.gain);
        }
    }
}
