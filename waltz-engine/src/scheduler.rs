//! Realtime loop scheduler.
//!
//! Plays a [`Score`] as an endless loop on an [`AudioContext`]. Each loop is
//! scheduled ahead of time on the context clock: on start, loops 0 and 1 go out
//! immediately, then a repeating timer (period = one loop) schedules the loop
//! after next every time it fires. Loop `k` starts at `anchor + k * period`
//! exactly, so consecutive loops never overlap and never leave a gap.
//!
//! The scheduler is poll-driven: the host calls [`LoopScheduler::poll`] from
//! its event loop (sleeping [`LoopScheduler::until_next_tick`] in between).
//! Nothing here blocks.

use crate::error::{Error, Result};
use crate::score::Score;
use crate::tone::Tone;
use log::{debug, info};
use std::time::Duration;

/// A running synthesis context with its own clock.
pub trait AudioContext {
    /// Seconds on the context clock.
    fn current_time(&self) -> f64;

    /// Queue `tone` to sound at `tone.start` (context clock). Must not block.
    fn schedule(&mut self, tone: Tone);

    /// Release the context. Tones still queued are discarded.
    fn close(self);
}

/// Something that can open audio contexts.
pub trait AudioBackend {
    type Context: AudioContext;

    fn open(&mut self) -> Result<Self::Context>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerConfig {
    /// Delay between `start()` and the first note, seconds.
    pub lead_in_s: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self { lead_in_s: 0.1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
}

/// Repeating timer on the context clock.
#[derive(Debug, Clone, Copy)]
struct LoopTimer {
    period: f64,
    next: f64,
}

impl LoopTimer {
    fn armed(now: f64, period: f64) -> Self {
        Self { period, next: now + period }
    }

    /// Consume one firing if it is due at `now`.
    #[inline]
    fn fire(&mut self, now: f64) -> bool {
        if now < self.next {
            return false;
        }
        self.next += self.period;
        true
    }
}

struct Session<C> {
    ctx: C,
    anchor: f64,
    next_loop: u64,
    timer: LoopTimer,
}

pub struct LoopScheduler<B: AudioBackend> {
    backend: B,
    score: Score,
    config: PlayerConfig,
    session: Option<Session<B::Context>>,
}

impl<B: AudioBackend> LoopScheduler<B> {
    pub fn new(backend: B, score: Score, config: PlayerConfig) -> Self {
        Self { backend, score, config, session: None }
    }

    #[inline]
    pub fn state(&self) -> PlaybackState {
        if self.session.is_some() { PlaybackState::Playing } else { PlaybackState::Idle }
    }

    #[inline] pub fn is_playing(&self) -> bool { self.session.is_some() }
    #[inline] pub fn score(&self) -> &Score { &self.score }

    /// Loops handed to the context in the current session (0 when idle).
    #[inline]
    pub fn loops_scheduled(&self) -> u64 {
        self.session.as_ref().map_or(0, |s| s.next_loop)
    }

    /// Begin playback. No-op when already playing. If the backend refuses to
    /// open a context the error is returned and the scheduler stays idle.
    pub fn start(&mut self) -> Result<()> {
        if self.session.is_some() {
            return Ok(());
        }
        let period = self.score.loop_duration();
        if !(period.is_finite() && period > 0.0) {
            return Err(Error::InvalidConfig(format!("loop duration must be positive, got {period}")));
        }

        let ctx = self.backend.open()?;
        let now = ctx.current_time();
        let mut session = Session {
            ctx,
            anchor: now + self.config.lead_in_s.max(0.0),
            next_loop: 0,
            timer: LoopTimer::armed(now, period),
        };
        schedule_next_loop(&mut session, &self.score);
        schedule_next_loop(&mut session, &self.score);
        info!("playing {} ({:.2}s per loop)", self.score.name(), period);
        self.session = Some(session);
        Ok(())
    }

    /// Run every timer firing that is due. Returns how many fired.
    pub fn poll(&mut self) -> usize {
        let Some(session) = self.session.as_mut() else {
            return 0;
        };
        let now = session.ctx.current_time();
        let mut fired = 0;
        while session.timer.fire(now) {
            schedule_next_loop(session, &self.score);
            fired += 1;
        }
        fired
    }

    /// Context time of the next timer firing.
    pub fn next_deadline(&self) -> Option<f64> {
        self.session.as_ref().map(|s| s.timer.next)
    }

    /// Time left until the next firing, zero if overdue.
    pub fn until_next_tick(&self) -> Option<Duration> {
        let s = self.session.as_ref()?;
        let left = (s.timer.next - s.ctx.current_time()).max(0.0);
        Some(Duration::from_secs_f64(left))
    }

    /// Disarm the timer and close the context. Idempotent.
    pub fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            info!("stopped after {} loops", session.next_loop);
            session.ctx.close();
        }
    }

    /// Play/pause. Returns the state after the toggle.
    pub fn toggle(&mut self) -> Result<PlaybackState> {
        if self.is_playing() {
            self.stop();
        } else {
            self.start()?;
        }
        Ok(self.state())
    }
}

impl<B: AudioBackend> Drop for LoopScheduler<B> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn schedule_next_loop<C: AudioContext>(session: &mut Session<C>, score: &Score) {
    let k = session.next_loop;
    let origin = session.anchor + k as f64 * score.loop_duration();
    let mut n = 0usize;
    for tone in score.tones(origin) {
        session.ctx.schedule(tone);
        n += 1;
    }
    debug!("loop {k} at {origin:.3}s: {n} tones");
    session.next_loop += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::{ScoreEvent, Track, TrackLevels};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Shared {
        now: f64,
        opened: usize,
        closed: usize,
        tones: Vec<Tone>,
    }

    struct MockContext(Rc<RefCell<Shared>>);

    impl AudioContext for MockContext {
        fn current_time(&self) -> f64 { self.0.borrow().now }
        fn schedule(&mut self, tone: Tone) { self.0.borrow_mut().tones.push(tone) }
        fn close(self) { self.0.borrow_mut().closed += 1 }
    }

    #[derive(Default)]
    struct MockBackend {
        shared: Rc<RefCell<Shared>>,
        refuse: bool,
    }

    impl AudioBackend for MockBackend {
        type Context = MockContext;

        fn open(&mut self) -> Result<MockContext> {
            if self.refuse {
                return Err(Error::NoDevice);
            }
            self.shared.borrow_mut().opened += 1;
            Ok(MockContext(Rc::clone(&self.shared)))
        }
    }

    /// Four beats at 0.5 s: a 2 s loop with three notes.
    fn short_score() -> Score {
        Score::new(
            "test",
            vec![
                ScoreEvent::new(Track::Bass, "C3", 1.0, 0.0),
                ScoreEvent::new(Track::Melody, "E4", 2.0, 1.0),
                ScoreEvent::new(Track::Melody, "G4", 1.0, 3.0),
            ],
            4.0,
            0.5,
            TrackLevels { melody: 0.2, bass: 0.1 },
        )
    }

    fn scheduler() -> (LoopScheduler<MockBackend>, Rc<RefCell<Shared>>) {
        let backend = MockBackend::default();
        let shared = Rc::clone(&backend.shared);
        (LoopScheduler::new(backend, short_score(), PlayerConfig::default()), shared)
    }

    fn advance(shared: &Rc<RefCell<Shared>>, to: f64) {
        shared.borrow_mut().now = to;
    }

    #[test]
    fn start_and_stop_transition_state() {
        let (mut s, shared) = scheduler();
        assert_eq!(s.state(), PlaybackState::Idle);
        s.start().unwrap();
        assert_eq!(s.state(), PlaybackState::Playing);
        assert!(s.next_deadline().is_some());
        s.stop();
        assert_eq!(s.state(), PlaybackState::Idle);
        assert_eq!(s.next_deadline(), None);
        assert_eq!(shared.borrow().closed, 1);
    }

    #[test]
    fn stop_when_idle_is_a_noop() {
        let (mut s, shared) = scheduler();
        s.stop();
        s.stop();
        assert_eq!(shared.borrow().closed, 0);
        assert_eq!(s.poll(), 0);
        assert_eq!(s.until_next_tick(), None);
    }

    #[test]
    fn double_start_opens_one_context() {
        let (mut s, shared) = scheduler();
        s.start().unwrap();
        s.start().unwrap();
        assert_eq!(shared.borrow().opened, 1);
        assert_eq!(s.loops_scheduled(), 2);
        assert_eq!(shared.borrow().tones.len(), 6);
    }

    #[test]
    fn refused_open_stays_idle() {
        let backend = MockBackend { refuse: true, ..MockBackend::default() };
        let mut s = LoopScheduler::new(backend, short_score(), PlayerConfig::default());
        assert!(matches!(s.start(), Err(Error::NoDevice)));
        assert!(!s.is_playing());
        assert!(s.toggle().is_err());
        assert!(!s.is_playing());
    }

    #[test]
    fn start_schedules_two_loops_from_the_anchor() {
        let (mut s, shared) = scheduler();
        advance(&shared, 5.0);
        s.start().unwrap();
        let starts: Vec<f64> = shared.borrow().tones.iter().map(|t| t.start).collect();
        let expected = [5.1, 5.6, 6.6, 7.1, 7.6, 8.6];
        for (a, b) in starts.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-9, "{starts:?}");
        }
        assert_eq!(starts.len(), expected.len());
    }

    #[test]
    fn poll_fires_once_per_elapsed_period() {
        let (mut s, shared) = scheduler();
        s.start().unwrap();
        assert_eq!(s.next_deadline(), Some(2.0));

        advance(&shared, 1.9);
        assert_eq!(s.poll(), 0);
        advance(&shared, 2.0);
        assert_eq!(s.poll(), 1);
        assert_eq!(s.loops_scheduled(), 3);
        assert_eq!(s.next_deadline(), Some(4.0));

        // a late wakeup catches up on every missed firing
        advance(&shared, 8.5);
        assert_eq!(s.poll(), 3);
        assert_eq!(s.loops_scheduled(), 6);
        assert_eq!(s.until_next_tick(), Some(Duration::from_secs_f64(1.5)));
    }

    #[test]
    fn loops_tile_without_gap_or_overlap() {
        let (mut s, shared) = scheduler();
        s.start().unwrap();
        for step in 1..=10 {
            advance(&shared, f64::from(step) * 2.0);
            s.poll();
        }
        let tones = shared.borrow().tones.clone();
        assert_eq!(tones.len(), 3 * 12);
        for (k, chunk) in tones.chunks(3).enumerate() {
            let origin = 0.1 + k as f64 * 2.0;
            assert!((chunk[0].start - origin).abs() < 1e-9);
            // score offset order inside each loop
            assert!(chunk.windows(2).all(|w| w[0].start <= w[1].start));
            // last note ends by the next loop's first note
            let end = chunk[2].start + f64::from(chunk[2].duration);
            assert!(end <= origin + 2.0 + 1e-9);
        }
    }

    #[test]
    fn each_firing_keeps_one_loop_of_lookahead() {
        let (mut s, shared) = scheduler();
        s.start().unwrap();
        for step in 1..=5 {
            let now = f64::from(step) * 2.0;
            advance(&shared, now);
            s.poll();
            let last = shared.borrow().tones.last().map(|t| t.start).unwrap();
            assert!(last > now + 2.0, "now={now} last={last}");
        }
    }

    #[test]
    fn toggle_flips_and_restarts_fresh() {
        let (mut s, shared) = scheduler();
        assert_eq!(s.toggle().unwrap(), PlaybackState::Playing);
        assert_eq!(s.toggle().unwrap(), PlaybackState::Idle);
        advance(&shared, 30.0);
        assert_eq!(s.toggle().unwrap(), PlaybackState::Playing);
        assert_eq!(shared.borrow().opened, 2);
        assert_eq!(s.loops_scheduled(), 2);
        assert_eq!(s.next_deadline(), Some(32.0));
    }

    #[test]
    fn drop_closes_the_session() {
        let (mut s, shared) = scheduler();
        s.start().unwrap();
        drop(s);
        assert_eq!(shared.borrow().closed, 1);
    }

    #[test]
    fn zero_length_score_is_rejected() {
        let backend = MockBackend::default();
        let shared = Rc::clone(&backend.shared);
        let score = Score::new("empty", Vec::new(), 0.0, 0.5, TrackLevels { melody: 0.2, bass: 0.1 });
        let mut s = LoopScheduler::new(backend, score, PlayerConfig::default());
        assert!(matches!(s.start(), Err(Error::InvalidConfig(_))));
        assert_eq!(shared.borrow().opened, 0);
    }

    #[test]
    fn realtime_preset_schedules_every_resolvable_event() {
        let backend = MockBackend::default();
        let shared = Rc::clone(&backend.shared);
        let score = Score::realtime_waltz();
        let per_loop = score.tones(0.0).count();
        let period = score.loop_duration();
        let mut s = LoopScheduler::new(backend, score, PlayerConfig::default());
        s.start().unwrap();
        assert_eq!(shared.borrow().tones.len(), 2 * per_loop);
        assert_eq!(s.next_deadline(), Some(period));
        assert!((period - 8.8).abs() < 1e-6);
    }
}
