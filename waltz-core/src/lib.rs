#![cfg_attr(not(feature = "std"), no_std)]
//! Waltz Core — no_std-ready primitives for a small piano-ish synthesizer.
//!
//! Features
//! - `std`      : (default) use the Rust standard library
//! - `no-std`   : build with `#![no_std]` and use `libm`/`micromath` math backends
//! - `fast-math`: enable a polynomial sine for the harmonic oscillators
//!
//! Modules
//! - [`dsp`]       : math backend, utils (lerp, exp ramps, dB, peak)
//! - [`notes`]     : note-name parsing and the fixed pitch table
//! - [`envelopes`] : closed-form piano and ramp envelopes, buffer fades
//! - [`timbre`]    : additive harmonic timbres
//!
//! Design
//! - No heap allocations; everything is plain data evaluated per sample
//! - Closed-form envelopes so offline and realtime paths share one curve

pub mod dsp;
pub mod envelopes;
pub mod notes;
pub mod timbre;

/// Commonly used types/functions for convenience:
pub mod prelude {
    pub use crate::dsp::{clamp, exp_ramp, kill_denormals, lerp, lin_to_db, peak_abs, TAU};
    pub use crate::envelopes::{fade_gain, Envelope, PianoEnvelope, RampEnvelope};
    pub use crate::notes::{frequency, NoteName, NOTE_TABLE};
    pub use crate::timbre::Timbre;
}
