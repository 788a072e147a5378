//! Tone synthesis into sample buffers.
//!
//! A [`Tone`] is a resolved note: frequency, start time, held duration and
//! volume. [`render_tone`] adds its enveloped waveform into a preallocated
//! buffer; it never allocates and never touches I/O.

use waltz_core::envelopes::Envelope;
use waltz_core::timbre::Timbre;

/// One note ready to sound. `start` is seconds on whatever clock the
/// consumer uses (buffer time offline, context time realtime).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Tone {
    pub freq: f32,
    pub start: f64,
    pub duration: f32,
    pub volume: f32,
}

impl Tone {
    /// Playable: positive frequency and duration, volume in [0,1].
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.freq > 0.0 && self.duration > 0.0 && (0.0..=1.0).contains(&self.volume)
    }

    /// Sample range `[first, end)` this tone touches at `sample_rate`,
    /// release tail included.
    #[inline]
    pub fn sample_span<E: Envelope>(&self, env: &E, sample_rate: u32) -> (usize, usize) {
        let sr = f64::from(sample_rate);
        let first = (self.start.max(0.0) * sr).floor() as usize;
        let end = ((self.start + f64::from(env.span(self.duration))) * sr).ceil().max(0.0) as usize;
        (first, end.max(first))
    }
}

/// Sum `tone` into `buf` (sample 0 = time 0.0). Samples outside the buffer
/// are dropped. Returns the number of samples written.
pub fn render_tone<E: Envelope>(
    buf: &mut [f32],
    sample_rate: u32,
    tone: &Tone,
    timbre: &Timbre,
    env: &E,
) -> usize {
    if !tone.is_valid() {
        return 0;
    }
    let (first, end) = tone.sample_span(env, sample_rate);
    let end = end.min(buf.len());
    if first >= end {
        return 0;
    }
    let sr = f64::from(sample_rate);
    for (i, s) in buf[first..end].iter_mut().enumerate() {
        let t = ((first + i) as f64 / sr - tone.start) as f32;
        *s += timbre.sample(env, tone.freq, t, tone.duration, tone.volume);
    }
    end - first
}

#[cfg(test)]
mod tests {
    use super::*;
    use waltz_core::envelopes::{PianoEnvelope, RampEnvelope};

    const SR: u32 = 8_000;

    fn c4(start: f64) -> Tone {
        Tone { freq: 261.63, start, duration: 0.5, volume: 0.3 }
    }

    #[test]
    fn writes_only_inside_span() {
        let mut buf = vec![0.0; SR as usize * 2];
        let env = PianoEnvelope::default();
        let n = render_tone(&mut buf, SR, &c4(0.25), &Timbre::grand(), &env);
        assert!(n > 0);
        let first = (0.25 * SR as f64) as usize;
        let last = ((0.25 + 0.5 + 0.3) * SR as f64).ceil() as usize;
        assert!(buf[..first].iter().all(|&s| s == 0.0));
        assert!(buf[last + 1..].iter().all(|&s| s == 0.0));
        assert!(buf[first..last].iter().any(|&s| s.abs() > 0.01));
    }

    #[test]
    fn respects_volume_ceiling() {
        let mut buf = vec![0.0; SR as usize * 2];
        render_tone(&mut buf, SR, &c4(0.0), &Timbre::grand(), &PianoEnvelope::default());
        let peak = buf.iter().fold(0.0_f32, |m, s| m.max(s.abs()));
        assert!(peak <= 0.3 + 1e-4, "peak={peak}");
    }

    #[test]
    fn tones_superpose() {
        let env = RampEnvelope::default();
        let timbre = Timbre::upright();
        let mut one = vec![0.0; SR as usize];
        let mut two = vec![0.0; SR as usize];
        render_tone(&mut one, SR, &c4(0.0), &timbre, &env);
        render_tone(&mut two, SR, &c4(0.0), &timbre, &env);
        render_tone(&mut two, SR, &c4(0.0), &timbre, &env);
        for (a, b) in one.iter().zip(two.iter()) {
            assert!((2.0 * a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn clipped_at_buffer_end_and_invalid_tones_ignored() {
        let env = PianoEnvelope::default();
        let mut buf = vec![0.0; 100];
        assert_eq!(render_tone(&mut buf, SR, &c4(10.0), &Timbre::grand(), &env), 0);
        let silent = Tone { volume: 0.0, ..c4(0.0) };
        assert_eq!(render_tone(&mut buf, SR, &Tone { freq: 0.0, ..c4(0.0) }, &Timbre::grand(), &env), 0);
        assert_eq!(render_tone(&mut buf, SR, &silent, &Timbre::grand(), &env), 100);
        assert!(buf.iter().all(|&s| s == 0.0));
    }
}
