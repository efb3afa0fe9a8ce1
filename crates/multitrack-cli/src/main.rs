//! Multitrack - command line front end for the multitrack engine
//!
//! ## Commands
//!
//! - `multitrack devices`: list output devices
//! - `multitrack play drums=drums.wav bass=bass.wav@1500`: play tracks live
//! - `multitrack mixdown -o mix.wav drums.wav bass.wav`: render a mix offline
//!
//! Tracks are given as `[ID=]PATH[@START_MS]`. Without an id the file stem
//! is used.
//!
//! Set RUST_LOG=debug for verbose output.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use multitrack_core::audio::DeviceId;
use multitrack_core::audio_file::FileFormat;
use multitrack_core::config::{default_config_path, EngineConfig};
use multitrack_core::export::ExtractionConfig;
use multitrack_core::AudioEngine;

/// How often `play` prints the playhead
const STATUS_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[command(name = "multitrack")]
#[command(about = "Multi-track playback and mixdown", long_about = None)]
struct Cli {
    /// Engine config file (default: <config dir>/multitrack/engine.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available audio output devices
    Devices,

    /// Play tracks through the output device
    Play {
        #[command(flatten)]
        mix: MixArgs,

        /// Output device name (optional, uses default)
        #[arg(short, long)]
        device: Option<String>,

        /// Start playback at this position (milliseconds)
        #[arg(short = 's', long, default_value_t = 0)]
        start_ms: i64,

        /// Stop after this many seconds (0 = play to the end)
        #[arg(short = 't', long, default_value_t = 0)]
        seconds: u64,
    },

    /// Render the mix of all tracks to a WAV file
    ///
    /// Only WAV output is supported. MP3, AAC, M4A and FLAC can be played
    /// and mixed but not written.
    Mixdown {
        #[command(flatten)]
        mix: MixArgs,

        /// Output file, must end in .wav (compressed formats cannot be written)
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Output bit depth: 16, 24 or 32
        #[arg(long)]
        bits: Option<u16>,

        /// Ignore pitch and speed settings
        #[arg(long, default_value_t = false)]
        no_effects: bool,
    },
}

/// Track list and mix controls shared by `play` and `mixdown`
#[derive(Args)]
struct MixArgs {
    /// Tracks as `[ID=]PATH[@START_MS]`
    #[arg(value_name = "TRACK", required = true)]
    tracks: Vec<TrackSpec>,

    /// Master volume (0.0-2.0)
    #[arg(long, default_value_t = 1.0)]
    master_volume: f32,

    /// Pitch shift for every track in semitones (-12..12)
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pitch: f32,

    /// Speed factor for every track (0.5-2.0)
    #[arg(long, default_value_t = 1.0)]
    speed: f32,

    /// Solo these track ids
    #[arg(long, value_delimiter = ',')]
    solo: Vec<String>,

    /// Mute these track ids
    #[arg(long, value_delimiter = ',')]
    mute: Vec<String>,
}

/// A track given on the command line
#[derive(Debug, Clone, PartialEq)]
struct TrackSpec {
    id: String,
    path: PathBuf,
    start_ms: i64,
}

impl FromStr for TrackSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, rest) = match s.split_once('=') {
            Some((id, rest)) => (Some(id.trim()), rest),
            None => (None, s),
        };
        let (path, start_ms) = match rest.rsplit_once('@') {
            Some((path, start)) => {
                let start_ms = start
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| format!("invalid start '{}': {}", start, e))?;
                (path, start_ms)
            }
            None => (rest, 0),
        };
        if path.is_empty() {
            return Err(format!("missing path in '{}'", s));
        }
        let path = PathBuf::from(path);
        let id = match id {
            Some(id) if !id.is_empty() => id.to_string(),
            Some(_) => return Err(format!("empty track id in '{}'", s)),
            None => path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .ok_or_else(|| format!("cannot derive a track id from '{}'", s))?
                .to_string(),
        };
        Ok(Self { id, path, start_ms })
    }
}

fn main() -> Result<()> {
    // Initialize logger - set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| default_config_path(EngineConfig::FILE_NAME));
    let config = EngineConfig::load(&config_path);

    match cli.command {
        Commands::Devices => list_devices(),
        Commands::Play {
            mix,
            device,
            start_ms,
            seconds,
        } => play(config, &mix, device, start_ms, seconds),
        Commands::Mixdown {
            mix,
            output,
            bits,
            no_effects,
        } => mixdown(config, &mix, output, bits, no_effects),
    }
}

fn list_devices() -> Result<()> {
    let devices = multitrack_core::audio::list_output_devices()?;
    println!("Output devices:");
    for device in devices {
        let marker = if device.is_default { "*" } else { " " };
        println!("{} {} ({} ch)", marker, device, device.max_channels);
    }
    Ok(())
}

/// Load every track and apply the mix controls
fn load_tracks(engine: &AudioEngine, mix: &MixArgs) -> Result<()> {
    for spec in &mix.tracks {
        engine
            .load_track_at(&spec.id, &spec.path, spec.start_ms)
            .with_context(|| format!("Failed to load track '{}' from {:?}", spec.id, spec.path))?;
    }
    for id in &mix.solo {
        engine.set_track_solo(id, true)?;
    }
    for id in &mix.mute {
        engine.set_track_muted(id, true)?;
    }
    engine.set_master_volume(mix.master_volume);
    engine.set_pitch(mix.pitch);
    engine.set_speed(mix.speed);
    log::info!(
        "Loaded {} tracks, duration {} ms",
        engine.track_count(),
        engine.duration_ms()
    );
    Ok(())
}

fn play(
    mut config: EngineConfig,
    mix: &MixArgs,
    device: Option<String>,
    start_ms: i64,
    seconds: u64,
) -> Result<()> {
    if let Some(name) = device {
        config.audio = config.audio.with_device(DeviceId::new(name));
    }
    let mut engine = AudioEngine::new(config);
    engine.initialize().context("Failed to start audio engine")?;
    load_tracks(&engine, mix)?;

    if let Some(info) = engine.stream_info() {
        println!(
            "Output: {} Hz, {} ch, latency {}",
            info.sample_rate,
            info.channels,
            info.latency_ms()
                .map(|ms| format!("{:.1} ms", ms))
                .unwrap_or_else(|| "unknown".to_string())
        );
    }

    engine.seek(start_ms)?;
    engine.play()?;

    let limit = (seconds > 0).then(|| Duration::from_secs(seconds));
    let started = Instant::now();
    let duration_ms = engine.duration_ms();
    loop {
        thread::sleep(STATUS_INTERVAL);
        let position = engine.position_ms();
        print!("\r{:>8} / {} ms", position, duration_ms);
        std::io::stdout().flush().ok();

        if !engine.is_stream_healthy() {
            println!();
            bail!("Audio stream failed: {}", engine.last_error_message());
        }
        if position >= duration_ms || limit.is_some_and(|l| started.elapsed() >= l) {
            break;
        }
    }
    println!();

    engine.stop()?;
    engine.release();
    Ok(())
}

/// Output format from the file extension; only encodable formats pass
fn output_format(output: &Path) -> Result<FileFormat> {
    let format = FileFormat::from_path(output)
        .with_context(|| format!("Unknown output format for {:?}", output))?;
    if !format.can_encode() {
        bail!(
            "Cannot write {} output: only WAV is supported for mixdown",
            format.extension()
        );
    }
    Ok(format)
}

fn mixdown(
    config: EngineConfig,
    mix: &MixArgs,
    output: PathBuf,
    bits: Option<u16>,
    no_effects: bool,
) -> Result<()> {
    let mut extraction = ExtractionConfig {
        format: output_format(&output)?,
        include_effects: !no_effects,
        ..config.extraction.clone()
    };
    if let Some(bits) = bits {
        if !matches!(bits, 16 | 24 | 32) {
            bail!("Unsupported bit depth {} (use 16, 24 or 32)", bits);
        }
        extraction.bits_per_sample = bits;
    }

    let mut engine = AudioEngine::headless(config);
    engine.initialize()?;
    load_tracks(&engine, mix)?;

    let mut shown = -1i32;
    let summary = engine.extract_mix(&output, &extraction, &mut |fraction: f32| {
        let percent = (fraction * 100.0) as i32;
        if percent != shown {
            shown = percent;
            print!("\rRendering {:>3}%", percent);
            std::io::stdout().flush().ok();
        }
    })?;
    println!();
    println!(
        "Wrote {:?}: {} frames ({} ms), {} Hz, {} ch, {} bytes",
        summary.output_path,
        summary.frames_written,
        summary.duration_ms(),
        summary.sample_rate,
        summary.channels,
        summary.file_size_bytes
    );

    engine.release();
    Ok(())
}
