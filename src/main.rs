//! Face capture gate: waits for a well-lit, centered, still face and captures a photo.

use anyhow::{Context, Result};
use clap::Parser;
use face_capture_gate::app::{AppConfig, CaptureApp, RunOutcome, VideoSource};
use face_capture_gate::config::{Config, EXAMPLE_CONFIG};
use log::{info, warn};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Camera index to use
    #[arg(long, default_value = "0")]
    cam: i32,

    /// Directory of still images to replay instead of a camera
    #[arg(short, long)]
    images: Option<PathBuf>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Directory receiving captured stills
    #[arg(short, long, default_value = "captures")]
    output: PathBuf,

    /// Sampling interval in milliseconds (overrides the config file)
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Do not mirror the captured still
    #[arg(long)]
    no_mirror: bool,

    /// Capture immediately without waiting for the checks
    #[arg(long)]
    manual: bool,

    /// Give up after this many seconds without a capture
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Print an example configuration file and exit
    #[arg(long)]
    print_config: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if args.print_config {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    info!("Face Capture Gate");

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Config::from_file(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => Config::default(),
    };
    if let Some(interval) = args.interval_ms {
        config.camera.sample_interval_ms = interval;
    }
    if args.no_mirror {
        config.camera.mirror_preview = false;
    }
    config.camera.index = args.cam;

    let app_config = AppConfig {
        video_source: match args.images {
            Some(dir) => VideoSource::Images(dir),
            None => VideoSource::Camera(args.cam),
        },
        output_dir: args.output,
        manual: args.manual,
        timeout: args.timeout_secs.map(Duration::from_secs),
        config,
    };

    let mut app = CaptureApp::new(app_config).context("invalid configuration")?;
    match app.run()? {
        RunOutcome::Captured(path) => info!("Capture stored at {}", path.display()),
        RunOutcome::TimedOut => warn!("Timed out before a capture"),
    }

    Ok(())
}
