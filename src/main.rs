//! AlphabetDetector - Motion-gated letter recognition over a video feed
//!
//! Watches a frame source, runs OCR only when the picture changes and draws a
//! labelled box over every single letter it finds.

mod capture;
mod config;
mod detector;
mod error;
mod overlay;
mod shared;
mod storage;
mod vision;

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::{select, unbounded, Receiver};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::capture::ImageSequenceSource;
use crate::config::AppConfig;
use crate::detector::{Detector, DetectorConfig};
use crate::overlay::RasterSurface;
use crate::shared::DetectorEvent;
use crate::vision::TesseractEngine;

/// AlphabetDetector - find and label single letters in a video feed
#[derive(Parser, Debug)]
#[command(name = "alphabet-detector")]
#[command(about = "Motion-gated OCR that highlights single letters in a video feed")]
struct Args {
    /// Directory of frames to play back as the video source
    #[arg(short, long)]
    frames: Option<PathBuf>,

    /// Configuration file (defaults to the per-user config)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write overlay PNGs to DIR (or the default data directory)
    #[arg(long, value_name = "DIR")]
    snapshots: Option<Option<PathBuf>>,

    /// Stop after this many seconds
    #[arg(short, long)]
    duration: Option<u64>,

    /// Read commands from stdin: Enter toggles, "step", "reload", "status", "quit"
    #[arg(short, long)]
    interactive: bool,

    /// Print detections as JSON lines
    #[arg(long)]
    json: bool,

    /// Write the effective configuration to FILE and exit
    #[arg(long, value_name = "FILE")]
    write_config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = match &args.config {
        Some(path) => Some(path.clone()),
        None => storage::default_config_path().ok(),
    };
    let mut config = load_or_create_config(config_path.as_deref());
    apply_args(&mut config, &args)?;

    if let Some(path) = &args.write_config {
        config::save_config(&config, path)
            .with_context(|| format!("Failed to write configuration to {:?}", path))?;
        info!("Configuration written to {:?}", path);
        return Ok(());
    }

    info!("AlphabetDetector starting...");

    let frames_dir = config
        .source
        .frames_dir
        .clone()
        .context("No frame source configured; pass --frames <DIR> or set source.frames_dir")?;
    let source = ImageSequenceSource::open(&frames_dir, config.source.fps, config.source.looping)?;
    if source.is_empty() {
        warn!("No frames found in {:?}; waiting for video", frames_dir);
    } else {
        info!("Playing {} frames from {:?}", source.len(), frames_dir);
    }

    let surface = build_surface(&config)?;
    let engine = Arc::new(TesseractEngine::new(
        config.recognition.tesseract_path.clone(),
        config.recognition.language.clone(),
    ));

    let detector = match Detector::initialize(&config, Box::new(source), engine, Box::new(surface))
        .await
    {
        Ok(detector) => detector,
        Err(e) => {
            error!("Detection disabled: {}", e);
            return Err(e.into());
        }
    };

    let (done_tx, done_rx) = unbounded::<()>();
    let printer = spawn_event_printer(detector.events(), done_rx, config.output.json);

    detector.start();

    if args.interactive {
        run_interactive(&detector, config_path.as_deref(), &args).await?;
    } else {
        wait_for_exit(args.duration).await;
    }

    detector.shutdown().await;
    drop(done_tx);
    if printer.join().is_err() {
        warn!("Event printer panicked");
    }

    info!("AlphabetDetector shutdown complete");
    Ok(())
}

/// Load configuration from file or fall back to defaults
fn load_or_create_config(path: Option<&Path>) -> AppConfig {
    if let Some(path) = path {
        if path.exists() {
            match config::load_config(path) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", path);
                    return config;
                }
                Err(e) => warn!("Ignoring unreadable configuration {:?}: {:#}", path, e),
            }
        }
    }
    info!("Using default configuration");
    AppConfig::default()
}

/// Command-line flags take precedence over the file
fn apply_args(config: &mut AppConfig, args: &Args) -> Result<()> {
    if let Some(frames) = &args.frames {
        config.source.frames_dir = Some(frames.clone());
    }
    match &args.snapshots {
        Some(Some(dir)) => config.output.snapshot_dir = Some(dir.clone()),
        Some(None) => config.output.snapshot_dir = Some(storage::default_snapshot_dir()?),
        None => {}
    }
    if args.json {
        config.output.json = true;
    }
    Ok(())
}

fn build_surface(config: &AppConfig) -> Result<RasterSurface> {
    let mut surface = RasterSurface::new(1, 1);
    if let Some(font) = &config.overlay.font_path {
        surface = surface.with_font_file(font)?;
    }
    if let Some(dir) = &config.output.snapshot_dir {
        surface = surface.with_snapshot_dir(dir)?;
        info!("Writing overlay snapshots to {:?}", dir);
    }
    Ok(surface)
}

/// Log (or print) detector events until `done` closes
fn spawn_event_printer(
    events: Receiver<DetectorEvent>,
    done: Receiver<()>,
    json: bool,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || loop {
        select! {
            recv(events) -> event => match event {
                Ok(event) => report(&event, json),
                Err(_) => break,
            },
            recv(done) -> _ => {
                for event in events.try_iter() {
                    report(&event, json);
                }
                break;
            }
        }
    })
}

fn report(event: &DetectorEvent, json: bool) {
    match event {
        DetectorEvent::Detected(candidates) if json => {
            let letters: Vec<char> = candidates.iter().filter_map(|c| c.letter()).collect();
            let line = serde_json::json!({
                "letters": letters,
                "candidates": candidates,
            });
            println!("{}", line);
        }
        DetectorEvent::Detected(_) => {}
        DetectorEvent::Status(status) if !json => println!("{}", status),
        DetectorEvent::Status(status) => info!("Status: {}", status),
        DetectorEvent::Started => info!("Detection running"),
        DetectorEvent::Stopped => info!("Detection paused"),
    }
}

async fn wait_for_exit(duration: Option<u64>) {
    match duration {
        Some(secs) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {
                    info!("Run time of {}s elapsed", secs);
                }
                _ = tokio::signal::ctrl_c() => info!("Interrupted"),
            }
        }
        None => {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", e);
            }
        }
    }
}

/// A line typed in interactive mode
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Toggle,
    Step,
    Reload,
    Status,
    Quit,
    Unknown(String),
}

impl Command {
    fn parse(line: &str) -> Self {
        match line.trim() {
            "" => Self::Toggle,
            "step" => Self::Step,
            "reload" => Self::Reload,
            "status" => Self::Status,
            "quit" | "exit" => Self::Quit,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Read lines on a plain thread so a pending read never holds up runtime shutdown
fn spawn_line_reader<R>(reader: R) -> mpsc::UnboundedReceiver<String>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in reader.lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to read command: {}", e);
                    break;
                }
            }
        }
    });
    rx
}

/// Stdin stands in for the start/stop button
async fn run_interactive(detector: &Detector, config_path: Option<&Path>, args: &Args) -> Result<()> {
    info!("Interactive mode: Enter toggles detection, \"step\" runs one cycle, \"reload\" rereads config, \"quit\" exits");
    let mut lines = spawn_line_reader(std::io::BufReader::new(std::io::stdin()));

    loop {
        let line = tokio::select! {
            line = lines.recv() => line,
            _ = tokio::signal::ctrl_c() => break,
        };
        let Some(line) = line else { break };

        match Command::parse(&line) {
            Command::Toggle => {
                let running = detector.toggle();
                info!("Detection {}", if running { "resumed" } else { "paused" });
            }
            Command::Step => {
                let outcome = detector.tick().await;
                info!("Cycle finished: {:?}", outcome);
            }
            Command::Reload => {
                let mut config = load_or_create_config(config_path);
                apply_args(&mut config, args)?;
                let next = DetectorConfig::from_app(&config);
                if next == detector.config() {
                    info!("Configuration unchanged");
                } else {
                    detector.configure(next);
                }
            }
            Command::Status => println!("{:?}: {}", detector.phase(), detector.status()),
            Command::Quit => break,
            Command::Unknown(other) => warn!("Unknown command: {}", other),
        }
    }
    Ok(())
}
