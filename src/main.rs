//! ad-muter 命令行入口

use ad_muter::api::Monitor;
use ad_muter::config::Config;
use ad_muter::core::capture::{list_cameras, FfmpegCamera, FrameSource, StillImageSource};
use ad_muter::core::mute::WebhookActuator;
use ad_muter::core::ocr::{ParallelDetector, TesseractExtractor, TextExtractor};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn, LevelFilter};
use std::path::{Path, PathBuf};

/// Mutes the TV while an ad is on screen
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the JSON5 configuration file
    #[arg(short, long, env = "CONFIG_FILE", default_value = "config.json5")]
    config: PathBuf,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Poll the camera and mute/unmute until the device goes away
    Run,

    /// Run every OCR variant once on an image and print the verdict
    Detect {
        /// Image file to analyse
        image: PathBuf,
    },

    /// List capture devices
    Cameras,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    ad_muter::init_logging(level);

    match cli.command {
        Commands::Run => run(&cli.config),
        Commands::Detect { image } => detect(&cli.config, &image),
        Commands::Cameras => {
            print_cameras();
            Ok(())
        }
    }
}

fn run(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let cameras = list_cameras();
    if cameras.is_empty() {
        warn!("⚠️ No capture devices found");
    }

    let detector = build_detector(&config)?;

    // validate() guarantees mute_url is set
    let mute_url = config
        .actuator
        .mute_url
        .as_deref()
        .context("actuator.mute_url is not set")?;
    let actuator = WebhookActuator::new(
        mute_url,
        config.actuator.unmute_url.as_deref(),
        config.actuator_timeout(),
    )
    .context("Failed to build webhook client")?;

    if config.camera.enabled {
        let camera = FfmpegCamera::new(
            config.camera.index,
            config.camera.image_path.clone(),
            config.camera.ffmpeg_path.clone(),
        );
        poll(camera, detector, actuator, &config)
    } else {
        info!("📷 Camera disabled, reading {:?}", config.camera.image_path);
        let still = StillImageSource::new(config.camera.image_path.clone());
        poll(still, detector, actuator, &config)
    }
}

fn poll<S: FrameSource>(
    source: S,
    detector: ParallelDetector,
    actuator: WebhookActuator,
    config: &Config,
) -> Result<()> {
    let mut monitor = Monitor::new(source, detector, actuator, config.poll_interval());
    monitor.run().context("Capture device unavailable")
}

fn detect(config_path: &Path, image: &Path) -> Result<()> {
    let mut config = Config::from_file(config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    config.apply_env_overrides();
    config.validate_detection().context("Invalid detection config")?;

    let detector = build_detector(&config)?;
    let outcome = detector
        .detect_path(image)
        .with_context(|| format!("Failed to read {}", image.display()))?;

    for result in &outcome.results {
        let elapsed = result.elapsed.as_secs_f64();
        match &result.text {
            Ok(text) => println!("{:<16} {:>7.3}s  {:?}", result.variant, elapsed, text.trim()),
            Err(e) => println!("{:<16} {:>7.3}s  error: {}", result.variant, elapsed, e),
        }
    }
    match (&outcome.keyword, outcome.variant) {
        (Some(keyword), Some(variant)) => {
            println!("detected: true (keyword {:?} via {})", keyword, variant)
        }
        _ => println!("detected: false"),
    }
    Ok(())
}

fn print_cameras() {
    let cameras = list_cameras();
    if cameras.is_empty() {
        println!("No capture devices found");
        return;
    }
    for camera in cameras {
        println!(
            "{:>3}  {:<14} {}",
            camera.index,
            camera.device,
            camera.name.as_deref().unwrap_or("unknown")
        );
    }
}

fn build_detector(config: &Config) -> Result<ParallelDetector> {
    let extractor: Box<dyn TextExtractor> = match &config.ocr.tesseract_path {
        Some(path) => Box::new(TesseractExtractor::with_binary(path.clone(), &config.ocr.language)),
        None => Box::new(
            TesseractExtractor::new(&config.ocr.language).context("OCR engine unavailable")?,
        ),
    };

    ParallelDetector::new(
        config.variants()?,
        config.keywords(),
        config.threshold_params(),
        extractor,
        config.detection.workers,
    )
    .context("Failed to start OCR worker pool")
}
