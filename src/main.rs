//! Gaze orientation tool: annotate a frame with head and iris direction.

use anyhow::{Context, Result};
use clap::Parser;
use gaze_orientation::{config::Config, gaze::GazeEstimator, landmarks::LandmarkSet};
use log::info;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input frame (PNG or JPEG)
    #[arg(short, long)]
    image: PathBuf,

    /// Landmark file, one normalized "x y [z]" line per landmark
    #[arg(short, long)]
    landmarks: PathBuf,

    /// Where to write the annotated frame
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Do not draw overlays
    #[arg(long)]
    no_overlay: bool,

    /// Head angle threshold in degrees
    #[arg(long)]
    angle_threshold: Option<f64>,

    /// Iris offset threshold in pixels
    #[arg(long)]
    distance_threshold: Option<f64>,

    /// Mirror the frame horizontally before processing
    #[arg(long)]
    flip: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
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

    // Load configuration if provided
    let mut config = match &args.config {
        Some(path) => Config::from_file(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };

    // Command line overrides
    if let Some(threshold) = args.angle_threshold {
        config.head_pose.angle_threshold = threshold;
    }
    if let Some(threshold) = args.distance_threshold {
        config.iris_pose.distance_threshold = threshold;
    }
    if args.no_overlay {
        config.head_pose.draw_overlay = false;
        config.iris_pose.draw_overlay = false;
    }
    config.input.flip_horizontal |= args.flip;
    config.validate()?;

    let estimator = GazeEstimator::from_config(&config);

    let mut frame = image::open(&args.image)
        .with_context(|| format!("reading {}", args.image.display()))?
        .to_rgb8();
    estimator.prepare_frame(&mut frame);

    let landmarks = LandmarkSet::from_file(&args.landmarks)?;
    let report = estimator.process(&mut frame, Some(&landmarks))?;

    println!("Head pose: {}", report.head_label());
    println!("Iris gaze direction: {}", report.iris_label());

    if let Some(output) = &args.output {
        frame
            .save(output)
            .with_context(|| format!("writing {}", output.display()))?;
        info!("Annotated frame written to {}", output.display());
    }

    Ok(())
}
