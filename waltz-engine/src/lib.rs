//! Waltz Engine — scores, tone synthesis, loop scheduling and offline rendering.
//!
//! Crate layout:
//! - [`score`]     : score events and the two bundled waltz presets
//! - [`tone`]      : resolved notes and additive rendering into buffers
//! - [`graph`]     : `Generator` trait, `Engine<G>` wrapper and the frame clock
//! - [`voices`]    : realtime voice bank fed over a lock-free channel
//! - [`scheduler`] : double-buffered loop scheduler over an `AudioBackend`
//! - [`reverb`]    : feedback comb for the offline mix
//! - [`render`]    : offline renderer (float buffer → i16 → WAV)
//! - [`wav`]       : canonical 44-byte-header PCM container
//! - `realtime`    : cpal backend (feature `realtime`)
//!
//! The audio thread never allocates: voices live in a preallocated bank and
//! tones reach it through a bounded channel.

pub mod error;
pub mod graph;
pub mod render;
pub mod reverb;
pub mod scheduler;
pub mod score;
pub mod tone;
pub mod voices;
pub mod wav;

cfg_if::cfg_if! {
    if #[cfg(feature = "realtime")] {
        pub mod realtime;
        pub use realtime::{list_output_devices, CpalBackend, CpalContext};
    }
}

// Re-export some commonly used items to make downstream imports ergonomic.
pub use error::{Error, Result};
pub use graph::{Engine, FrameClock, Generator};
pub use render::{render, render_pcm, render_waltz_file, RenderConfig, RenderSummary};
pub use scheduler::{AudioBackend, AudioContext, LoopScheduler, PlaybackState, PlayerConfig};
pub use score::{Score, ScoreEvent, Track, TrackLevels};
pub use tone::Tone;
pub use wav::PcmFormat;
