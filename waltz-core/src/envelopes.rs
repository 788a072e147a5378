//! Amplitude envelopes for struck-string (piano-ish) tones.
//!
//! Provided envelopes:
//! - `PianoEnvelope` : linear attack/decay, exponential body decay, linear release tail
//! - `RampEnvelope`  : Web-Audio style gain automation (linear then exponential ramps)
//!
//! Unlike gate-driven ADSRs these are evaluated in closed form from the time
//! since note-on, so the offline renderer and the realtime voice bank compute
//! identical curves. Levels peak at 1.0; [`Envelope::gain`] scales them by
//! the note volume.
//!
//! Every envelope is zero for `t < 0` and for `t >= duration + tail()`.

use core::fmt::Debug;
use crate::dsp::{exp_decay, exp_ramp, EPS_SMALL};

/// A note-level amplitude curve.
pub trait Envelope: Copy + Debug {
    /// Level in [0,1] at `t` seconds after note-on for a note held `duration` seconds.
    fn level(&self, t: f32, duration: f32) -> f32;

    /// How long (seconds) the envelope keeps sounding after `duration`.
    fn tail(&self) -> f32;

    /// Total audible span of a note held `duration` seconds.
    #[inline]
    fn span(&self, duration: f32) -> f32 { duration.max(0.0) + self.tail() }

    /// Absolute gain of a note played at `volume`.
    #[inline]
    fn gain(&self, t: f32, duration: f32, volume: f32) -> f32 { volume * self.level(t, duration) }
}

// -------------------------------- Piano envelope ---------------------------------

/// Piano-like envelope used by the offline renderer.
///
/// - Attack:  0 → 1 linearly over `attack`
/// - Decay:   1 → `sustain` linearly over `decay`
/// - Body:    `sustain * e^(-rate * (t - attack - decay))` until `duration`
/// - Release: linear from the level reached at `duration` down to 0 over `release`
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PianoEnvelope {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub rate: f32,
    pub release: f32,
}

impl Default for PianoEnvelope {
    fn default() -> Self {
        Self { attack: 0.01, decay: 0.15, sustain: 0.4, rate: 2.0, release: 0.3 }
    }
}

impl PianoEnvelope {
    #[inline]
    pub fn new(attack: f32, decay: f32, sustain: f32, rate: f32, release: f32) -> Self {
        Self {
            attack: attack.max(0.0),
            decay: decay.max(0.0),
            sustain: sustain.clamp(0.0, 1.0),
            rate: rate.max(0.0),
            release: release.max(0.0),
        }
    }

    /// Held-note curve, ignoring the release.
    #[inline]
    fn body(&self, t: f32) -> f32 {
        let (a, d) = (self.attack.max(EPS_SMALL), self.decay.max(EPS_SMALL));
        if t < self.attack {
            t / a
        } else if t < self.attack + self.decay {
            1.0 - (1.0 - self.sustain) * ((t - self.attack) / d)
        } else {
            self.sustain * exp_decay(t - self.attack - self.decay, self.rate)
        }
    }
}

impl Envelope for PianoEnvelope {
    #[inline]
    fn level(&self, t: f32, duration: f32) -> f32 {
        if t < 0.0 || t >= self.span(duration) {
            return 0.0;
        }
        if t <= duration {
            return self.body(t);
        }
        let held = self.body(duration);
        held * (1.0 - (t - duration) / self.release.max(EPS_SMALL))
    }

    #[inline] fn tail(&self) -> f32 { self.release }
}

// -------------------------------- Ramp envelope ----------------------------------

/// Gain automation in the style of an audio-graph `GainNode`:
///
/// - linear 0 → 1 over `attack`
/// - exponential 1 → `knee_level` until `knee`
/// - exponential `knee_level` → `floor` until `duration + fade`
/// - hold `floor` until the voice is stopped at `duration + stop`
///
/// `floor` is an absolute gain: the tail settles on the same level whatever
/// the note volume, so [`Envelope::gain`] is the curve to play. `level` is
/// that curve at unit volume.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RampEnvelope {
    pub attack: f32,
    pub knee: f32,
    pub knee_level: f32,
    pub floor: f32,
    pub fade: f32,
    pub stop: f32,
}

impl Default for RampEnvelope {
    fn default() -> Self {
        Self { attack: 0.02, knee: 0.1, knee_level: 0.7, floor: 0.001, fade: 0.5, stop: 0.6 }
    }
}

impl Envelope for RampEnvelope {
    #[inline]
    fn level(&self, t: f32, duration: f32) -> f32 {
        self.gain(t, duration, 1.0)
    }

    #[inline] fn tail(&self) -> f32 { self.stop }

    fn gain(&self, t: f32, duration: f32, volume: f32) -> f32 {
        if t < 0.0 || t >= self.span(duration) || volume <= 0.0 {
            return 0.0;
        }
        if t < self.attack {
            return volume * t / self.attack.max(EPS_SMALL);
        }
        if t < self.knee {
            let span = (self.knee - self.attack).max(EPS_SMALL);
            return exp_ramp(volume, volume * self.knee_level, (t - self.attack) / span);
        }
        let end = duration + self.fade;
        if t < end {
            let span = (end - self.knee).max(EPS_SMALL);
            return exp_ramp(volume * self.knee_level, self.floor, (t - self.knee) / span);
        }
        self.floor
    }
}

/// Linear fade gain for sample `i` of `n`: ramps up over the first `fade_in`
/// samples and down over the last `fade_out`. Used for whole-buffer fades.
#[inline]
pub fn fade_gain(i: usize, n: usize, fade_in: usize, fade_out: usize) -> f32 {
    let mut g = 1.0;
    if fade_in > 0 && i < fade_in {
        g *= i as f32 / fade_in as f32;
    }
    if fade_out > 0 && i + fade_out > n {
        g *= (n - i) as f32 / fade_out as f32;
    }
    g
}

// ------------------------------------ Tests --------------------------------------
