//! Replays recorded gesture traces through the engine and reports dispatch statistics.

use anyhow::{Context, Result};
use clap::Parser;
use face_gesture_control::{
    config::{Config, DispatchMode, EXAMPLE_CONFIG},
    engine::GestureEngine,
    landmarks::RawSample,
};
use log::info;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML list of recorded samples to replay
    #[arg(short, long, required_unless_present = "print_config")]
    trace: Option<PathBuf>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Input backend to use, in fallback order (xdotool, x11, log); repeatable
    #[arg(short, long)]
    backend: Vec<String>,

    /// Dispatch on a worker thread instead of inline
    #[arg(long)]
    worker: bool,

    /// Print an example configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn load_trace(path: &Path) -> Result<Vec<RawSample>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read trace {}", path.display()))?;
    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse trace {}", path.display()))
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if args.print_config {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    info!("Face Gesture Control");

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Config::from_file(path).with_context(|| format!("Failed to load config {}", path.display()))?
        }
        None => Config::default(),
    };
    if !args.backend.is_empty() {
        config.dispatch.backends = args.backend.clone();
    }
    if args.worker {
        config.dispatch.mode = DispatchMode::Worker;
    }
    config.validate().context("Invalid configuration")?;

    let Some(trace_path) = &args.trace else {
        return Ok(());
    };
    let samples = load_trace(trace_path)?;
    info!("Replaying {} samples from {}", samples.len(), trace_path.display());

    let mut engine = GestureEngine::from_config(&config)?;
    let mut accepted = 0;
    for sample in &samples {
        accepted += engine.process_sample(sample).events.len();
    }
    engine.flush();

    info!("{accepted} gestures accepted");
    print!("{}", serde_yaml::to_string(&engine.statistics())?);

    Ok(())
}
