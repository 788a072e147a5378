//! Voice bank: the realtime side of the tone synthesizer.
//!
//! Tones arrive over a channel with start times in seconds on the shared
//! [`FrameClock`](crate::graph::FrameClock) timeline; the bank converts them to
//! frame positions and sums every active voice per sample.
//!
//! Realtime rules: the voice list is preallocated; when it is full, new tones
//! are dropped and counted instead of growing the list.

use crate::graph::Generator;
use crate::tone::Tone;
use crossbeam_channel::Receiver;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use waltz_core::envelopes::Envelope;
use waltz_core::timbre::Timbre;

/// Upper bound on simultaneously queued + sounding voices.
pub const MAX_VOICES: usize = 512;

#[derive(Copy, Clone, Debug)]
struct Voice {
    start: u64,
    end: u64,
    tone: Tone,
}

pub struct VoiceBank<E: Envelope> {
    sr: f32,
    frame: u64,
    timbre: Timbre,
    env: E,
    voices: Vec<Voice>,
    rx: Receiver<Tone>,
    dropped: Arc<AtomicU64>,
}

impl<E: Envelope> VoiceBank<E> {
    pub fn new(timbre: Timbre, env: E, rx: Receiver<Tone>) -> Self {
        Self {
            sr: 48_000.0,
            frame: 0,
            timbre,
            env,
            voices: Vec::with_capacity(MAX_VOICES),
            rx,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Counter of tones discarded because the bank was full.
    pub fn dropped_counter(&self) -> Arc<AtomicU64> { Arc::clone(&self.dropped) }

    /// Queued or sounding voices.
    #[inline] pub fn active(&self) -> usize { self.voices.len() }

    fn admit(&mut self) {
        while let Ok(tone) = self.rx.try_recv() {
            if !tone.is_valid() {
                continue;
            }
            if self.voices.len() >= MAX_VOICES {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                continue;
            }
            let sr = f64::from(self.sr);
            let start = (tone.start.max(0.0) * sr).round() as u64;
            let end = ((tone.start + f64::from(self.env.span(tone.duration))) * sr).ceil().max(0.0) as u64;
            if end > self.frame {
                self.voices.push(Voice { start, end, tone });
            }
        }
    }
}

impl<E: Envelope> Generator for VoiceBank<E> {
    fn reset(&mut self, sr: f32) {
        self.sr = sr.max(1.0);
    }

    #[inline]
    fn next(&mut self) -> f32 {
        self.admit();
        let now = self.frame;
        let sr = f64::from(self.sr);
        let mut acc = 0.0;
        for v in &self.voices {
            if now >= v.start && now < v.end {
                let t = (now as f64 / sr - v.tone.start) as f32;
                acc += self.timbre.sample(&self.env, v.tone.freq, t, v.tone.duration, v.tone.volume);
            }
        }
        self.voices.retain(|v| v.end > now + 1);
        self.frame += 1;
        acc
    }
}
