//! Authored scores: a melody and an oom-pah-pah bass as one tagged event list.
//!
//! Offsets and durations are in beats; the score's tempo (seconds per beat)
//! turns them into [`Tone`]s. Two presets ship with the engine:
//!
//! - [`Score::realtime_waltz`] : 16-beat loop for the live player
//! - [`Score::romantic_waltz`] : 8-measure 3/4 phrase repeated to fill a file
//!
//! They are independent arrangements with their own tempo and note sets.

use crate::tone::Tone;
use log::trace;
use waltz_core::notes::frequency;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Track { Melody, Bass }

/// One authored note. `volume: None` means "use the track level".
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ScoreEvent {
    pub track: Track,
    pub note: &'static str,
    pub duration: f32,
    pub offset: f32,
    pub volume: Option<f32>,
}

impl ScoreEvent {
    #[inline]
    pub const fn new(track: Track, note: &'static str, duration: f32, offset: f32) -> Self {
        Self { track, note, duration, offset, volume: None }
    }

    #[inline]
    pub const fn with_volume(mut self, volume: f32) -> Self {
        self.volume = Some(volume);
        self
    }
}

/// Default per-track volumes.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TrackLevels {
    pub melody: f32,
    pub bass: f32,
}

impl TrackLevels {
    #[inline]
    pub fn get(&self, track: Track) -> f32 {
        match track {
            Track::Melody => self.melody,
            Track::Bass => self.bass,
        }
    }
}

/// An immutable, offset-ordered score.
#[derive(Clone, Debug)]
pub struct Score {
    name: &'static str,
    events: Vec<ScoreEvent>,
    total_beats: f32,
    seconds_per_beat: f32,
    levels: TrackLevels,
}

impl Score {
    /// Events are stably sorted by offset, so equal offsets keep authoring order.
    pub fn new(
        name: &'static str,
        mut events: Vec<ScoreEvent>,
        total_beats: f32,
        seconds_per_beat: f32,
        levels: TrackLevels,
    ) -> Self {
        events.sort_by(|a, b| a.offset.total_cmp(&b.offset));
        Self {
            name,
            events,
            total_beats: total_beats.max(0.0),
            seconds_per_beat: seconds_per_beat.max(1e-3),
            levels,
        }
    }

    /// Same score at another tempo.
    pub fn with_tempo(mut self, seconds_per_beat: f32) -> Self {
        self.seconds_per_beat = seconds_per_beat.max(1e-3);
        self
    }

    #[inline] pub fn name(&self) -> &'static str { self.name }
    #[inline] pub fn events(&self) -> &[ScoreEvent] { &self.events }
    #[inline] pub fn total_beats(&self) -> f32 { self.total_beats }
    #[inline] pub fn seconds_per_beat(&self) -> f32 { self.seconds_per_beat }
    #[inline] pub fn levels(&self) -> TrackLevels { self.levels }

    /// Length of one pass through the score in seconds.
    #[inline]
    pub fn loop_duration(&self) -> f64 {
        f64::from(self.total_beats) * f64::from(self.seconds_per_beat)
    }

    #[inline]
    pub fn volume_of(&self, ev: &ScoreEvent) -> f32 {
        ev.volume.unwrap_or_else(|| self.levels.get(ev.track)).clamp(0.0, 1.0)
    }

    /// Events whose note name is not in the pitch table.
    pub fn unresolved(&self) -> impl Iterator<Item = &ScoreEvent> {
        self.events.iter().filter(|ev| frequency(ev.note).is_none())
    }

    /// Resolve the score into tones, in offset order, with beat 0 at `origin`
    /// seconds. Unknown notes are skipped.
    pub fn tones(&self, origin: f64) -> impl Iterator<Item = Tone> + '_ {
        let spb = self.seconds_per_beat;
        self.events.iter().filter_map(move |ev| {
            let Some(freq) = frequency(ev.note) else {
                trace!("skipping unknown note {:?} at beat {}", ev.note, ev.offset);
                return None;
            };
            Some(Tone {
                freq,
                start: origin + f64::from(ev.offset) * f64::from(spb),
                duration: ev.duration * spb,
                volume: self.volume_of(ev),
            })
        })
    }

    /// The live player's loop: 16 beats at 0.55 s/beat, melody at 0.15 and
    /// bass at 0.08.
    pub fn realtime_waltz() -> Self {
        let events = REALTIME_MELODY
            .iter()
            .map(|&(n, d, t)| ScoreEvent::new(Track::Melody, n, d, t))
            .chain(REALTIME_BASS.iter().map(|&(n, d, t)| ScoreEvent::new(Track::Bass, n, d, t)))
            .collect();
        Self::new(
            "realtime-waltz",
            events,
            16.0,
            0.55,
            TrackLevels { melody: 0.15, bass: 0.08 },
        )
    }

    /// The rendered waltz at 100 BPM in 3/4: one 8-measure phrase repeated
    /// until at least `duration_s` seconds are covered.
    pub fn romantic_waltz(duration_s: f32) -> Self {
        let spb = 60.0 / ROMANTIC_BPM;
        let measure = spb * 3.0;
        let measures = (duration_s.max(0.0) / measure).ceil() as usize;
        let sections = measures.div_ceil(8).max(1);

        let mut events = Vec::with_capacity(sections * (ROMANTIC_MELODY.len() + ROMANTIC_BASS.len()));
        for s in 0..sections {
            let base = (s * PHRASE_BEATS) as f32;
            for &(beat, note, dur, vol) in ROMANTIC_MELODY {
                events.push(ScoreEvent::new(Track::Melody, note, dur, base + beat).with_volume(vol));
            }
            for &(beat, note, dur, vol) in ROMANTIC_BASS {
                events.push(ScoreEvent::new(Track::Bass, note, dur, base + beat).with_volume(vol));
            }
        }
        Self::new(
            "romantic-waltz",
            events,
            (sections * PHRASE_BEATS) as f32,
            spb,
            TrackLevels { melody: 0.3, bass: 0.15 },
        )
    }
}

// ----------------------------- Realtime loop data --------------------------------

/// (note, duration, offset) in beats.
const REALTIME_MELODY: &[(&str, f32, f32)] = &[
    // C
    ("C4", 0.5, 0.0), ("E4", 0.25, 0.5), ("G4", 0.25, 0.75),
    ("E4", 0.5, 1.0), ("C4", 0.25, 1.5), ("E4", 0.25, 1.75),
    // F
    ("F4", 0.5, 2.0), ("A4", 0.25, 2.5), ("C5", 0.25, 2.75),
    ("A4", 0.5, 3.0), ("F4", 0.25, 3.5), ("A4", 0.25, 3.75),
    // G
    ("G4", 0.5, 4.0), ("B4", 0.25, 4.5), ("D5", 0.25, 4.75),
    ("B4", 0.5, 5.0), ("G4", 0.25, 5.5), ("B4", 0.25, 5.75),
    // C
    ("C5", 0.75, 6.0), ("G4", 0.25, 6.75),
    ("E4", 0.75, 7.0), ("C4", 0.25, 7.75),
    // Am
    ("A4", 0.5, 8.0), ("C5", 0.25, 8.5), ("E5", 0.25, 8.75),
    ("C5", 0.5, 9.0), ("A4", 0.25, 9.5), ("C5", 0.25, 9.75),
    // Dm
    ("D4", 0.5, 10.0), ("F4", 0.25, 10.5), ("A4", 0.25, 10.75),
    ("F4", 0.5, 11.0), ("D4", 0.25, 11.5), ("F4", 0.25, 11.75),
    // G7
    ("G4", 0.5, 12.0), ("B4", 0.25, 12.5), ("F5", 0.25, 12.75),
    ("D5", 0.5, 13.0), ("B4", 0.25, 13.5), ("G4", 0.25, 13.75),
    // C
    ("C5", 0.75, 14.0), ("E5", 0.25, 14.75),
    ("C5", 1.0, 15.0),
];

const REALTIME_BASS: &[(&str, f32, f32)] = &[
    // C
    ("C3", 0.4, 0.0), ("E3", 0.2, 0.5), ("G3", 0.2, 0.75),
    ("C3", 0.4, 1.0), ("E3", 0.2, 1.5), ("G3", 0.2, 1.75),
    // F
    ("F2", 0.4, 2.0), ("A3", 0.2, 2.5), ("C3", 0.2, 2.75),
    ("F2", 0.4, 3.0), ("A3", 0.2, 3.5), ("C3", 0.2, 3.75),
    // G
    ("G2", 0.4, 4.0), ("B3", 0.2, 4.5), ("D3", 0.2, 4.75),
    ("G2", 0.4, 5.0), ("B3", 0.2, 5.5), ("D3", 0.2, 5.75),
    // C
    ("C3", 0.6, 6.0), ("E3", 0.2, 6.75),
    ("C3", 0.6, 7.0), ("G2", 0.2, 7.75),
    // Am
    ("A2", 0.4, 8.0), ("C3", 0.2, 8.5), ("E3", 0.2, 8.75),
    ("A2", 0.4, 9.0), ("C3", 0.2, 9.5), ("E3", 0.2, 9.75),
    // Dm
    ("D2", 0.4, 10.0), ("F3", 0.2, 10.5), ("A3", 0.2, 10.75),
    ("D2", 0.4, 11.0), ("F3", 0.2, 11.5), ("A3", 0.2, 11.75),
    // G7
    ("G2", 0.4, 12.0), ("B3", 0.2, 12.5), ("D3", 0.2, 12.75),
    ("G2", 0.4, 13.0), ("B3", 0.2, 13.5), ("D3", 0.2, 13.75),
    // C
    ("C3", 0.6, 14.0), ("E3", 0.2, 14.75),
    ("C3", 1.0, 15.0),
];

// ------------------------------ Rendered phrase ----------------------------------

const ROMANTIC_BPM: f32 = 100.0;
const PHRASE_BEATS: usize = 24;

/// (beat, note, duration, volume); beats are relative to the phrase start.
const ROMANTIC_MELODY: &[(f32, &str, f32, f32)] = &[
    (0.0, "E5", 2.0, 0.35), (2.0, "D5", 1.0, 0.3),
    (3.0, "C5", 3.0, 0.35),
    (6.0, "D5", 2.0, 0.3), (8.0, "E5", 1.0, 0.3),
    (9.0, "G5", 3.0, 0.35),
    (12.0, "F5", 2.0, 0.3), (14.0, "E5", 1.0, 0.3),
    (15.0, "D5", 2.0, 0.3), (17.0, "C5", 1.0, 0.3),
    (18.0, "E5", 2.0, 0.35), (20.0, "D5", 1.0, 0.3),
    (21.0, "C5", 3.0, 0.35),
];

/// Root on the downbeat, two chord tones after it.
const ROMANTIC_BASS: &[(f32, &str, f32, f32)] = &[
    (0.0, "C3", 1.0, 0.25), (1.0, "E4", 0.8, 0.15), (2.0, "G4", 0.8, 0.15),
    (3.0, "A3", 1.0, 0.25), (4.0, "C4", 0.8, 0.15), (5.0, "E4", 0.8, 0.15),
    (6.0, "F3", 1.0, 0.25), (7.0, "A4", 0.8, 0.15), (8.0, "C5", 0.8, 0.15),
    (9.0, "G3", 1.0, 0.25), (10.0, "B4", 0.8, 0.15), (11.0, "D5", 0.8, 0.15),
    (12.0, "F3", 1.0, 0.25), (13.0, "A4", 0.8, 0.15), (14.0, "C5", 0.8, 0.15),
    (15.0, "G3", 1.0, 0.25), (16.0, "B4", 0.8, 0.15), (17.0, "D5", 0.8, 0.15),
    (18.0, "A3", 1.0, 0.25), (19.0, "C4", 0.8, 0.15), (20.0, "E4", 0.8, 0.15),
    (21.0, "G3", 1.0, 0.25), (22.0, "B4", 0.8, 0.15), (23.0, "D4", 0.8, 0.15),
];
