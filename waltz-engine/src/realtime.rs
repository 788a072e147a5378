//! cpal output backend.
//!
//! `CpalBackend::open` picks a device, builds an output stream in the device's
//! native sample format and runs a [`VoiceBank`] inside it. The control side
//! keeps a channel sender and the frame clock; the audio callback owns the
//! engine outright.

use crate::error::{Error, Result};
use crate::graph::{Engine, FrameClock};
use crate::scheduler::{AudioBackend, AudioContext};
use crate::tone::Tone;
use crate::voices::VoiceBank;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Sender, TrySendError};
use log::{info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use waltz_core::envelopes::RampEnvelope;
use waltz_core::timbre::Timbre;

/// Tones in flight between the scheduler and the audio thread.
const CHANNEL_CAPACITY: usize = 1024;

/// Names of every output device on the default host.
pub fn list_output_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let mut names = Vec::new();
    for dev in host.output_devices()? {
        names.push(dev.name()?);
    }
    Ok(names)
}

fn pick_device(name: Option<&str>) -> Result<cpal::Device> {
    let host = cpal::default_host();
    if let Some(name) = name {
        for d in host.output_devices()? {
            if d.name()? == name {
                return Ok(d);
            }
        }
        return Err(Error::DeviceNotFound(name.to_string()));
    }
    host.default_output_device().ok_or(Error::NoDevice)
}

type LiveEngine = Engine<VoiceBank<RampEnvelope>>;

fn build_stream<T>(
    device: &cpal::Device,
    cfg: &cpal::StreamConfig,
    mut engine: LiveEngine,
    gain: f32,
) -> Result<cpal::Stream>
where
    T: cpal::Sample + cpal::FromSample<f32> + cpal::SizedSample + Send + 'static,
{
    let sr = cfg.sample_rate.0 as f32;
    let channels = usize::from(cfg.channels.max(1));

    let stream = device.build_output_stream(
        cfg,
        move |output: &mut [T], _| {
            for frame in output.chunks_mut(channels) {
                let s = (engine.next(sr) * gain).clamp(-1.0, 1.0);
                let v: T = T::from_sample(s);
                for ch in frame.iter_mut() { *ch = v; }
            }
            engine.publish();
        },
        |e| warn!("stream error: {e}"),
        None,
    )?;
    Ok(stream)
}

/// Opens the named (or default) output device.
#[derive(Debug, Clone)]
pub struct CpalBackend {
    device_name: Option<String>,
    timbre: Timbre,
    env: RampEnvelope,
    gain: f32,
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self { device_name: None, timbre: Timbre::upright(), env: RampEnvelope::default(), gain: 1.0 }
    }
}

impl CpalBackend {
    pub fn new(device_name: Option<String>) -> Self {
        Self { device_name, ..Self::default() }
    }

    /// Output gain applied after mixing, before the hard clip.
    pub fn with_gain(mut self, gain: f32) -> Self {
        self.gain = gain.max(0.0);
        self
    }
}

impl AudioBackend for CpalBackend {
    type Context = CpalContext;

    fn open(&mut self) -> Result<CpalContext> {
        let device = pick_device(self.device_name.as_deref())?;
        let sup_cfg = device.default_output_config()?;
        let sample_format = sup_cfg.sample_format();
        let cfg = sup_cfg.config();
        let sample_rate = cfg.sample_rate.0 as f32;

        let (tx, rx) = crossbeam_channel::bounded(CHANNEL_CAPACITY);
        let bank = VoiceBank::new(self.timbre, self.env, rx);
        let dropped = bank.dropped_counter();
        let clock = FrameClock::new();
        let engine = Engine::new(bank, sample_rate, clock.clone());

        let stream = match sample_format {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &cfg, engine, self.gain)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &cfg, engine, self.gain)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &cfg, engine, self.gain)?,
            other => return Err(Error::UnsupportedFormat(format!("{other:?}"))),
        };
        stream.play()?;

        info!(
            "opened {} at {} Hz, {} ch ({:?})",
            device.name().unwrap_or_else(|_| "<unnamed>".into()),
            cfg.sample_rate.0,
            cfg.channels,
            sample_format
        );
        Ok(CpalContext { stream, tx, clock, sample_rate, dropped, reported: 0 })
    }
}

/// A playing cpal stream. Its clock is the number of frames rendered.
pub struct CpalContext {
    stream: cpal::Stream,
    tx: Sender<Tone>,
    clock: FrameClock,
    sample_rate: f32,
    dropped: Arc<AtomicU64>,
    reported: u64,
}

impl AudioContext for CpalContext {
    fn current_time(&self) -> f64 {
        self.clock.seconds(self.sample_rate)
    }

    fn schedule(&mut self, tone: Tone) {
        match self.tx.try_send(tone) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!("tone queue full, dropping note at {:.3}s", tone.start),
            Err(TrySendError::Disconnected(_)) => warn!("audio thread is gone"),
        }
        let dropped = self.dropped.load(Ordering::Relaxed);
        if dropped > self.reported {
            warn!("voice bank full, {} notes dropped so far", dropped);
            self.reported = dropped;
        }
    }

    fn close(self) {
        if let Err(e) = self.stream.pause() {
            warn!("pausing stream on close: {e}");
        }
    }
}
