//! Immersive Playback - headless host
//!
//! Loads a video, ticks the engine at the clip's frame pacing, then runs any
//! requested seeks and prints decode statistics.
//!
//! Usage: immersive-playback <video_file> [--frames N] [--seek SECS]...

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;

use immersive_playback::telemetry::{init_logging, LogConfig};
use immersive_playback::{EngineSettings, SeekMode, VideoEngine};

#[derive(Parser, Debug)]
#[command(author, version, about = "Decode and play a video file headless", long_about = None)]
struct Args {
    /// Video file to play
    file: PathBuf,

    /// Stop after this many ticks (0 plays to the end)
    #[arg(long, default_value_t = 0)]
    frames: u64,

    /// Seek to this time in seconds after playback; may be repeated
    #[arg(long = "seek", value_name = "SECONDS", allow_negative_numbers = true)]
    seeks: Vec<f64>,

    /// Override the tick rate instead of using the clip's frame rate
    #[arg(long)]
    fps: Option<f64>,

    /// Engine settings XML (defaults to the user config directory)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Decode forward to the exact seek target instead of the keyframe
    #[arg(long)]
    exact_seek: bool,

    /// Load the video paused
    #[arg(long)]
    no_autoplay: bool,

    /// Default log filter when PLAYBACK_LOG/RUST_LOG are unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Emit JSON log lines
    #[arg(long)]
    json_logs: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_config = LogConfig {
        console_enabled: true,
        file_enabled: args.log_file.is_some(),
        file_path: args.log_file.clone(),
        json_format: args.json_logs,
        default_level: args.log_level.clone(),
    };
    // Keep the guard alive so file logs flush on exit
    let _log_guard = init_logging(&log_config).context("Failed to initialize logging")?;

    let mut settings = match &args.settings {
        Some(path) => EngineSettings::load_from_file(path)
            .with_context(|| format!("Failed to read settings {}", path.display()))?,
        None => EngineSettings::load_default(),
    };
    if args.exact_seek {
        settings.seek_mode = SeekMode::Exact;
    }

    let mut engine: VideoEngine = VideoEngine::new(settings);
    engine
        .open(&args.file)
        .with_context(|| format!("Failed to load {}", args.file.display()))?;

    if let Some(info) = engine.info() {
        println!("\n=== Video Information ===");
        println!("Resolution: {}x{}", info.width, info.height);
        println!("Frame rate: {:.2} fps", info.frame_rate);
        println!("Duration: {:.2} seconds", info.duration);
        println!("Codec: {}", info.codec_name);
        println!("Estimated frames: {}\n", info.estimated_frame_count());
    }

    if !args.no_autoplay {
        engine.play();
    }

    let interval = args
        .fps
        .filter(|fps| *fps > 0.0)
        .map(|fps| 1.0 / fps)
        .unwrap_or_else(|| engine.frame_interval());
    let pacing = Duration::from_secs_f64(interval.max(0.0));

    let mut ticks = 0u64;
    while engine.is_playing() && (args.frames == 0 || ticks < args.frames) {
        let tick_start = Instant::now();
        let position = engine.update();
        ticks += 1;

        if let Some(frame) = engine.display_frame() {
            tracing::trace!(
                tick = ticks,
                time = position.current_time,
                bytes = frame.data().len(),
                stride = frame.stride(),
                "Presented frame"
            );
        }

        let spent = tick_start.elapsed();
        if spent < pacing {
            std::thread::sleep(pacing - spent);
        }
    }
    println!(
        "Played {} ticks, stopped at {:.3}s ({})",
        ticks,
        engine.current_time(),
        engine.state()
    );

    for target in &args.seeks {
        let position = engine.seek_to(*target);
        println!("Seek {:.3}s -> {:.3}s", target, position.current_time);
    }

    let stats = engine.stats();
    let timing = stats.stats();
    println!("\n=== Decode Statistics ===");
    println!("Frames decoded: {}", stats.frames_decoded());
    println!("Packets skipped: {}", stats.packets_skipped());
    println!("Seeks: {}", stats.seeks());
    println!(
        "Decode time: avg {:.2}ms, p95 {:.2}ms, max {:.2}ms",
        timing.avg_ms, timing.p95_ms, timing.max_ms
    );

    engine.close();
    Ok(())
}
