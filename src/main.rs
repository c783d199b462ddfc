use anyhow::{Context, Result};
use clap::Parser;
use layerreel::{OnnxModelLoader, TemplateConfig, TemplateController};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Photos in order; the first one opens the video untouched
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Path to segmentation model (ONNX file)
    #[arg(long)]
    model: PathBuf,

    /// Audio track to mux under the video
    #[arg(long)]
    audio: Option<PathBuf>,

    /// Directory for the intermediate and final videos
    /// Defaults to the system temp directory
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let mut config = TemplateConfig::default();
    if let Some(work_dir) = args.work_dir {
        config = config.with_work_dir(work_dir);
    }

    tracing::info!("layerreel starting");
    tracing::info!("Images: {}", args.images.len());
    tracing::info!("Output: {} fps, {}s per image", config.fps, config.image_duration);
    tracing::info!("Work dir: {}", config.work_dir().display());
    match &args.audio {
        Some(audio) => tracing::info!("Audio: {}", audio.display()),
        None => tracing::info!("No audio track, output stays silent"),
    }

    let loader = OnnxModelLoader::new(&args.model, config.model_input_size);
    let controller = TemplateController::new(loader, config, args.audio);

    let video = controller
        .apply_template(&args.images)
        .context("Failed to apply template")?;

    println!("{}", video.display());
    Ok(())
}
