//! Waltz CLI — renders the invitation waltz to WAV or plays it live.

use clap::{Parser, Subcommand};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{info, warn};
use std::error::Error;
use std::fs::File;
use std::io::{BufRead, Read};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use waltz_engine::wav::{Header, HEADER_LEN};
use waltz_engine::{
    list_output_devices, render_waltz_file, CpalBackend, LoopScheduler, PlaybackState, PlayerConfig,
    RenderConfig, Score,
};

const DEFAULT_OUTPUT: &str = "public/audio/waltz.wav";

/// How long to sleep when nothing is scheduled.
const IDLE_WAIT: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(name = "waltz")]
#[command(about = "Procedural waltz: WAV renderer and loop player", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the romantic waltz to a WAV file (default)
    Render {
        /// Output WAV file path
        #[arg(short, long, default_value = DEFAULT_OUTPUT)]
        output: PathBuf,

        /// Sample rate in Hz
        #[arg(short, long, default_value = "44100")]
        sample_rate: u32,

        /// Duration in seconds
        #[arg(short, long, default_value = "60")]
        duration: f32,

        /// Peak level after normalization, 0.0-1.0
        #[arg(long, default_value = "0.8")]
        headroom: f32,
    },

    /// Play the waltz loop on an output device
    Play {
        /// Start immediately instead of waiting for Enter
        #[arg(long)]
        no_prompt: bool,

        /// Stop after this many seconds
        #[arg(short, long)]
        duration: Option<f32>,

        /// List output devices and exit
        #[arg(long)]
        list_devices: bool,

        /// Output device name (default device if omitted)
        #[arg(long)]
        device: Option<String>,

        /// Tempo in beats per minute (default: the score's own)
        #[arg(short, long)]
        tempo: Option<f32>,

        /// Output gain
        #[arg(short, long, default_value = "1.0")]
        gain: f32,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Render {
            output: PathBuf::from(DEFAULT_OUTPUT),
            sample_rate: 44_100,
            duration: 60.0,
            headroom: 0.8,
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command.unwrap_or_default() {
        Commands::Render { output, sample_rate, duration, headroom } => {
            let config = RenderConfig { sample_rate, duration_s: duration, headroom, ..RenderConfig::default() };
            run_render(&output, &config)
        }
        Commands::Play { no_prompt, duration, list_devices, device, tempo, gain } => {
            if list_devices {
                println!("Available output devices:");
                for name in list_output_devices()? {
                    println!("- {name}");
                }
                return Ok(());
            }
            run_play(no_prompt, duration, device, tempo, gain)
        }
    }
}

fn run_render(output: &Path, config: &RenderConfig) -> Result<(), Box<dyn Error>> {
    let summary = render_waltz_file(output, config)?;

    let mut head = [0u8; HEADER_LEN];
    File::open(output)?.read_exact(&mut head)?;
    match Header::parse(&head) {
        Some(h) => info!(
            "{} ch, {} Hz, {}-bit, {} data bytes",
            h.format.channels, h.format.sample_rate, h.format.bits_per_sample, h.data_len
        ),
        None => warn!("{} does not carry a canonical header", output.display()),
    }

    println!("Waltz WAV file generated successfully!");
    println!("Duration: {}s, Size: {} bytes", summary.duration_s, summary.bytes);
    Ok(())
}

/// Parse `--duration` seconds into a `Duration`.
fn auto_stop_after(seconds: f32) -> Result<Duration, String> {
    Duration::try_from_secs_f32(seconds)
        .map_err(|e| format!("duration must be a non-negative number of seconds, got {seconds}: {e}"))
}

enum Key {
    Toggle,
    Quit,
}

/// Forward stdin lines as key presses. The thread ends on EOF.
fn spawn_stdin_reader() -> Receiver<Key> {
    let (tx, rx) = crossbeam_channel::unbounded();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let key = if line.trim().eq_ignore_ascii_case("q") { Key::Quit } else { Key::Toggle };
            if tx.send(key).is_err() {
                break;
            }
        }
    });
    rx
}

fn run_play(
    no_prompt: bool,
    duration: Option<f32>,
    device: Option<String>,
    tempo: Option<f32>,
    gain: f32,
) -> Result<(), Box<dyn Error>> {
    let mut score = Score::realtime_waltz();
    if let Some(bpm) = tempo {
        if !(bpm.is_finite() && bpm > 0.0) {
            return Err(format!("tempo must be positive, got {bpm}").into());
        }
        score = score.with_tempo(60.0 / bpm);
    }
    let auto_stop = duration.map(auto_stop_after).transpose()?;
    let backend = CpalBackend::new(device).with_gain(gain);
    let mut player = LoopScheduler::new(backend, score, PlayerConfig::default());

    let keys = spawn_stdin_reader();
    let mut stdin_open = true;
    if !no_prompt {
        println!("Press Enter to start the music…");
        match keys.recv() {
            Ok(Key::Toggle) => {}
            Ok(Key::Quit) => return Ok(()),
            Err(_) => stdin_open = false,
        }
    }

    player.start()?;
    println!("Playing {}. Enter toggles play/pause, q quits.", player.score().name());
    let now = Instant::now();
    let stop_at = match auto_stop {
        Some(d) => Some(now.checked_add(d).ok_or("duration is too long")?),
        None => None,
    };

    loop {
        player.poll();

        let mut wait = player.until_next_tick().unwrap_or(IDLE_WAIT);
        if let Some(at) = stop_at {
            let left = at.saturating_duration_since(Instant::now());
            if left.is_zero() {
                break;
            }
            wait = wait.min(left);
        }

        if !stdin_open {
            std::thread::sleep(wait);
            continue;
        }
        match keys.recv_timeout(wait) {
            Ok(Key::Toggle) => match player.toggle()? {
                PlaybackState::Playing => println!("▶ playing"),
                PlaybackState::Idle => println!("⏸ paused"),
            },
            Ok(Key::Quit) => break,
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => stdin_open = false,
        }
    }

    player.stop();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_stop_accepts_plain_seconds() {
        assert_eq!(auto_stop_after(2.5), Ok(Duration::from_millis(2_500)));
        assert_eq!(auto_stop_after(0.0), Ok(Duration::ZERO));
    }

    #[test]
    fn auto_stop_rejects_unusable_durations() {
        for bad in [-1.0, f32::NAN, f32::INFINITY, 1.0e20] {
            assert!(auto_stop_after(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn huge_duration_does_not_overflow_the_deadline() {
        let d = auto_stop_after(1.0e19).unwrap();
        let _ = Instant::now().checked_add(d);
    }
}
