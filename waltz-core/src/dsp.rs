//! Scalar DSP helpers shared by the envelopes and timbres.
//!
//! - math backend picked at compile time: `micromath`, `libm` (`no-std`) or std
//! - exponential ramps matching audio-graph gain automation
//! - `fast-math` swaps the harmonic sine for a polynomial
//!
//! Everything is `#[inline]` and free of side effects.

#![allow(clippy::excessive_precision)]

use core::f32::consts::PI;

use cfg_if::cfg_if;

// ----------------------------- Math backend selection -----------------------------

cfg_if! {
    // micromath preferred if explicitly requested (works in no_std)
    if #[cfg(feature = "micromath")] {
        use micromath::F32Ext as _;
        #[inline] pub(crate) fn m_sin(x: f32) -> f32 { x.sin() }
        #[inline] pub(crate) fn m_exp(x: f32) -> f32 { x.exp() }
        #[inline] pub(crate) fn m_ln(x: f32) -> f32 { x.ln() }
    // libm (C math) in no_std
    } else if #[cfg(feature = "no-std")] {
        #[inline] pub(crate) fn m_sin(x: f32) -> f32 { libm::sinf(x) }
        #[inline] pub(crate) fn m_exp(x: f32) -> f32 { libm::expf(x) }
        #[inline] pub(crate) fn m_ln(x: f32) -> f32 { libm::logf(x) }
    // std backend
    } else {
        #[inline] pub(crate) fn m_sin(x: f32) -> f32 { x.sin() }
        #[inline] pub(crate) fn m_exp(x: f32) -> f32 { x.exp() }
        #[inline] pub(crate) fn m_ln(x: f32) -> f32 { x.ln() }
    }
}

// --------------------------------- Constants -------------------------------------

/// 2π (commonly useful)
pub const TAU: f32 = 2.0 * PI;

/// A very small epsilon used in denormal handling and safe divisions.
pub const EPS_SMALL: f32 = 1.0e-20;

// --------------------------------- Utilities -------------------------------------

#[inline]
pub fn clamp(x: f32, lo: f32, hi: f32) -> f32 {
    if x < lo { lo } else if x > hi { hi } else { x }
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Kill denormal/subnormal values. Returns 0.0 if |x| < EPS_SMALL.
#[inline]
pub fn kill_denormals(x: f32) -> f32 {
    if x.abs() < EPS_SMALL { 0.0 } else { x }
}

/// Exponential interpolation from `from` to `to` at position `t` in [0,1].
///
/// Same curve as a Web-Audio style `exponentialRampToValueAtTime`:
/// `from * (to/from)^t`. Both endpoints must be > 0; otherwise this falls
/// back to a linear ramp.
#[inline]
pub fn exp_ramp(from: f32, to: f32, t: f32) -> f32 {
    let t = clamp(t, 0.0, 1.0);
    if from <= EPS_SMALL || to <= EPS_SMALL {
        return lerp(from, to, t);
    }
    from * m_exp(t * m_ln(to / from))
}

/// Exponential decay `e^(-rate * t)`.
#[inline]
pub fn exp_decay(t: f32, rate: f32) -> f32 {
    m_exp(-rate * t)
}

// --------------------------------- dB / linear -----------------------------------

/// Convert linear gain to dB: db = 20*log10(lin).
#[inline]
pub fn lin_to_db(lin: f32) -> f32 {
    if lin <= EPS_SMALL { -120.0 }
    else { 8.685889638065036553_f32 * m_ln(lin) } // 20/ln(10)
}

// --------------------------------- Fast trig -------------------------------------

/// Sine with range reduction into [-π, π] and 7th-order odd poly under `fast-math`.
/// Max abs error ~1e-3 over the reduced range; falls back to exact otherwise.
#[inline]
pub fn fast_sin(x: f32) -> f32 {
    cfg_if! {
        if #[cfg(feature = "fast-math")] {
            let k = (x / TAU).round();
            let xr = x - k * TAU;
            let x2 = xr * xr;
            xr * (1.0 + x2 * (-1.0 / 6.0 + x2 * (1.0 / 120.0 + x2 * (-1.0 / 5040.0))))
        } else {
            m_sin(x)
        }
    }
}

// --------------------------------- Block helpers ---------------------------------

/// Largest absolute sample value in `buf` (0.0 for an empty slice).
#[inline]
pub fn peak_abs(buf: &[f32]) -> f32 {
    buf.iter().fold(0.0_f32, |m, &s| m.max(s.abs()))
}

// --------------------------------- Tests (std only) ------------------------------
