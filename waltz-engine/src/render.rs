//! Offline renderer: score → float buffer → 16-bit PCM → WAV file.
//!
//! Pipeline (one pass, deterministic):
//! 1. zeroed buffer of `sample_rate × duration` samples
//! 2. every resolvable event summed in (order does not matter)
//! 3. feedback comb for a little room
//! 4. peak scan
//! 5. normalize to `headroom`, fade in/out, round and clamp to i16
//! 6. serialize through [`crate::wav`]

use crate::error::{Error, Result};
use crate::reverb::FeedbackComb;
use crate::score::Score;
use crate::tone::render_tone;
use crate::wav::{self, PcmFormat};
use log::{debug, info};
use std::path::Path;
use waltz_core::dsp::{lin_to_db, peak_abs};
use waltz_core::envelopes::{fade_gain, Envelope, PianoEnvelope};
use waltz_core::timbre::Timbre;

/// Largest buffer we agree to allocate; keeps the WAV data chunk under 4 GiB.
const MAX_SAMPLES: usize = (u32::MAX as usize - 36) / 2;

/// Offline render settings. Defaults produce one minute at 44.1 kHz.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Output length in seconds
    pub duration_s: f32,
    /// Peak level after normalization, fraction of full scale
    pub headroom: f32,
    /// Comb delay in seconds
    pub reverb_delay_s: f32,
    /// Comb feedback gain
    pub reverb_gain: f32,
    /// Linear fade-in length in seconds
    pub fade_in_s: f32,
    /// Linear fade-out length in seconds
    pub fade_out_s: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            duration_s: 60.0,
            headroom: 0.8,
            reverb_delay_s: 0.08,
            reverb_gain: 0.15,
            fade_in_s: 2.0,
            fade_out_s: 3.0,
        }
    }
}

impl RenderConfig {
    #[inline]
    fn seconds_to_samples(&self, s: f32) -> usize {
        (f64::from(s.max(0.0)) * f64::from(self.sample_rate)).round() as usize
    }

    #[inline] pub fn num_samples(&self) -> usize { self.seconds_to_samples(self.duration_s) }
    #[inline] pub fn fade_in_samples(&self) -> usize { self.seconds_to_samples(self.fade_in_s) }
    #[inline] pub fn fade_out_samples(&self) -> usize { self.seconds_to_samples(self.fade_out_s) }

    #[inline]
    pub fn format(&self) -> PcmFormat {
        PcmFormat::mono16(self.sample_rate)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::InvalidConfig("sample rate must be positive".into()));
        }
        if !self.duration_s.is_finite() || self.duration_s <= 0.0 {
            return Err(Error::InvalidConfig(format!("duration must be positive, got {}", self.duration_s)));
        }
        if !(self.headroom > 0.0 && self.headroom <= 1.0) {
            return Err(Error::InvalidConfig(format!("headroom must be in (0, 1], got {}", self.headroom)));
        }
        if self.num_samples() > MAX_SAMPLES {
            return Err(Error::InvalidConfig(format!(
                "{} samples do not fit a WAV data chunk",
                self.num_samples()
            )));
        }
        Ok(())
    }
}

/// Mix `score` into a float buffer and apply the comb. No normalization yet.
pub fn render<E: Envelope>(score: &Score, timbre: &Timbre, env: &E, config: &RenderConfig) -> Result<Vec<f32>> {
    config.validate()?;
    let mut buf = vec![0.0_f32; config.num_samples()];

    let mut rendered = 0usize;
    for tone in score.tones(0.0) {
        if render_tone(&mut buf, config.sample_rate, &tone, timbre, env) > 0 {
            rendered += 1;
        }
    }
    debug!(
        "{}: {} of {} events rendered into {} samples",
        score.name(),
        rendered,
        score.events().len(),
        buf.len()
    );

    FeedbackComb::from_time(config.reverb_delay_s, config.reverb_gain, config.sample_rate)
        .process_in_place(&mut buf);
    Ok(buf)
}

/// Normalize, fade and convert to 16-bit samples.
///
/// The buffer is scaled so its peak lands on the largest whole step at or
/// under `headroom` (a silent buffer stays silent), then faded and rounded
/// to the nearest step. No sample exceeds `headroom` of full scale.
pub fn quantize(buf: &[f32], config: &RenderConfig) -> Vec<i16> {
    let peak = peak_abs(buf);
    let target = (config.headroom * 32767.0).floor() / 32767.0;
    let scale = target / if peak > 0.0 { peak } else { 1.0 };
    debug!("peak {:.4} ({:.1} dBFS), scale {:.4}", peak, lin_to_db(peak), scale);

    let n = buf.len();
    let (fi, fo) = (config.fade_in_samples(), config.fade_out_samples());
    buf.iter()
        .enumerate()
        .map(|(i, &s)| {
            let v = s * scale * fade_gain(i, n, fi, fo);
            (v * 32767.0).round().clamp(-32768.0, 32767.0) as i16
        })
        .collect()
}

/// `render` followed by `quantize`.
pub fn render_pcm<E: Envelope>(score: &Score, timbre: &Timbre, env: &E, config: &RenderConfig) -> Result<Vec<i16>> {
    let buf = render(score, timbre, env, config)?;
    Ok(quantize(&buf, config))
}

/// What a file render produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSummary {
    pub duration_s: f32,
    pub samples: usize,
    pub bytes: usize,
}

/// Render the bundled romantic waltz with the grand-piano voicing and write
/// it to `path`, creating parent directories as needed.
pub fn render_waltz_file(path: &Path, config: &RenderConfig) -> Result<RenderSummary> {
    config.validate()?;
    let score = Score::romantic_waltz(config.duration_s);
    let pcm = render_pcm(&score, &Timbre::grand(), &PianoEnvelope::default(), config)?;
    let bytes = wav::write_wav(path, &pcm, config.format())?;
    info!("wrote {} ({} samples, {} bytes)", path.display(), pcm.len(), bytes);
    Ok(RenderSummary { duration_s: config.duration_s, samples: pcm.len(), bytes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::{ScoreEvent, Track, TrackLevels};

    fn short_config() -> RenderConfig {
        RenderConfig { sample_rate: 8_000, duration_s: 4.0, fade_in_s: 0.5, fade_out_s: 0.5, ..RenderConfig::default() }
    }

    fn single_c4() -> Score {
        Score::new(
            "single",
            vec![ScoreEvent::new(Track::Melody, "C4", 1.0, 0.0)],
            1.0,
            0.55,
            TrackLevels { melody: 0.3, bass: 0.2 },
        )
    }

    #[test]
    fn rendering_is_deterministic() {
        let cfg = short_config();
        let score = Score::romantic_waltz(cfg.duration_s);
        let a = render_pcm(&score, &Timbre::grand(), &PianoEnvelope::default(), &cfg).unwrap();
        let b = render_pcm(&score, &Timbre::grand(), &PianoEnvelope::default(), &cfg).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), cfg.num_samples());
    }

    #[test]
    fn peak_stays_under_headroom() {
        let cfg = RenderConfig { fade_in_s: 0.0, fade_out_s: 0.0, ..short_config() };
        let score = Score::romantic_waltz(cfg.duration_s);
        let pcm = render_pcm(&score, &Timbre::grand(), &PianoEnvelope::default(), &cfg).unwrap();
        let peak = pcm.iter().map(|s| i32::from(*s).abs()).max().unwrap();
        let limit = cfg.headroom * 32767.0;
        assert!(peak as f32 <= limit, "peak={peak} limit={limit}");
        assert!(peak as f32 > limit / 2.0, "peak={peak}");
    }

    #[test]
    fn fades_start_and_end_near_zero() {
        let cfg = short_config();
        let score = Score::romantic_waltz(cfg.duration_s);
        let pcm = render_pcm(&score, &Timbre::grand(), &PianoEnvelope::default(), &cfg).unwrap();
        assert_eq!(pcm[0], 0);
        let last = *pcm.last().unwrap();
        // last sample carries 1/fade_out of its value at most
        assert!(i32::from(last).abs() <= (32767 / cfg.fade_out_samples() as i32) + 1, "last={last}");
    }

    /// Dry path: no comb, no fades.
    #[test]
    fn single_note_stays_inside_its_span() {
        let cfg = RenderConfig {
            sample_rate: 44_100,
            duration_s: 3.0,
            reverb_gain: 0.0,
            fade_in_s: 0.0,
            fade_out_s: 0.0,
            ..RenderConfig::default()
        };
        let pcm = render_pcm(&single_c4(), &Timbre::grand(), &PianoEnvelope::default(), &cfg).unwrap();
        let tail = PianoEnvelope::default().tail();
        let end = ((0.55 + tail) * 44_100.0_f32).ceil() as usize + 1;
        assert!(pcm[..end].iter().any(|&s| s != 0));
        assert!(pcm[end..].iter().all(|&s| s == 0));
    }

    #[test]
    fn quantized_peak_never_rounds_past_headroom() {
        let cfg = RenderConfig { fade_in_s: 0.0, fade_out_s: 0.0, ..RenderConfig::default() };
        let pcm = quantize(&[0.0, 0.5, -0.2], &cfg);
        assert_eq!(pcm, vec![0, 26213, -10485]);
        let neg = quantize(&[0.1, -0.5], &cfg);
        assert_eq!(neg[1], -26213);
        assert!(pcm.iter().chain(neg.iter()).all(|&s| f32::from(s).abs() <= cfg.headroom * 32767.0));
    }

    #[test]
    fn single_note_echoes_die_out_with_default_comb() {
        let cfg = RenderConfig { duration_s: 3.0, fade_in_s: 0.0, fade_out_s: 0.0, ..RenderConfig::default() };
        let pcm = render_pcm(&single_c4(), &Timbre::grand(), &PianoEnvelope::default(), &cfg).unwrap();
        let tail = PianoEnvelope::default().tail();
        let end = ((0.55 + tail) * 44_100.0_f32).ceil() as usize + 1;
        let delay = FeedbackComb::from_time(cfg.reverb_delay_s, cfg.reverb_gain, cfg.sample_rate).delay();
        // each echo is 0.15 of the one before; six of them fall under half a step
        assert!(pcm[end..end + delay].iter().any(|&s| s != 0));
        assert!(pcm[end + 6 * delay..].iter().all(|&s| s == 0));
    }

    #[test]
    fn silent_score_quantizes_to_silence() {
        let cfg = short_config();
        let score = Score::new("empty", vec![ScoreEvent::new(Track::Bass, "Z9", 1.0, 0.0)], 1.0, 0.5, TrackLevels {
            melody: 0.1,
            bass: 0.1,
        });
        let pcm = render_pcm(&score, &Timbre::grand(), &PianoEnvelope::default(), &cfg).unwrap();
        assert!(pcm.iter().all(|&s| s == 0));
    }

    #[test]
    fn reverb_adds_delayed_energy() {
        let dry_cfg = RenderConfig { reverb_gain: 0.0, ..short_config() };
        let wet_cfg = short_config();
        let dry = render(&single_c4(), &Timbre::grand(), &PianoEnvelope::default(), &dry_cfg).unwrap();
        let wet = render(&single_c4(), &Timbre::grand(), &PianoEnvelope::default(), &wet_cfg).unwrap();
        let delay = FeedbackComb::from_time(wet_cfg.reverb_delay_s, 0.15, wet_cfg.sample_rate).delay();
        assert_eq!(&dry[..delay], &wet[..delay]);
        assert_ne!(&dry[delay..], &wet[delay..]);
    }

    #[test]
    fn invalid_configs_are_rejected() {
        for cfg in [
            RenderConfig { sample_rate: 0, ..RenderConfig::default() },
            RenderConfig { duration_s: 0.0, ..RenderConfig::default() },
            RenderConfig { duration_s: f32::NAN, ..RenderConfig::default() },
            RenderConfig { headroom: 1.5, ..RenderConfig::default() },
            RenderConfig { duration_s: 1.0e9, ..RenderConfig::default() },
        ] {
            assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))), "{cfg:?}");
        }
    }

    #[test]
    fn writes_a_readable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audio").join("waltz.wav");
        let cfg = short_config();
        let summary = render_waltz_file(&path, &cfg).unwrap();
        assert_eq!(summary.samples, cfg.num_samples());
        assert_eq!(summary.bytes, 44 + 2 * cfg.num_samples());

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 8_000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(reader.len() as usize, cfg.num_samples());
    }
}
