//! Mouse Chaser - Landmark annotation for rodent behaviour videos
//!
//! Entry point: the headless annotator and the clip splitter.

mod console;
mod viewer;

use anyhow::{bail, Context, Result};
use chaser_engine::{EngineConfig, EngineWorker};
use chaser_media::{discover_videos, FfmpegOpener, SplitJob, SyntheticOpener, VideoOpener};
use clap::{Parser, Subcommand};
use console::Console;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chaser")]
#[command(about = "Frame-by-frame landmark annotation for behaviour videos")]
#[command(version)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Annotate the videos in a folder from the console
    Annotate {
        /// Folder holding the videos
        dir: PathBuf,

        /// Engine configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Use N generated test frames instead of decoding with ffmpeg
        #[arg(long, value_name = "N")]
        synthetic: Option<usize>,
    },

    /// Split a recording into clips of a fixed number of frames
    Split {
        /// Recording to split
        video: PathBuf,

        /// Frames per clip
        #[arg(short, long)]
        frames: usize,

        /// Output folder (defaults to the recording's folder)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Output frame rate
        #[arg(long, default_value_t = chaser_media::splitter::DEFAULT_SPLIT_FPS)]
        fps: u32,
    },

    /// List the annotatable videos in a folder
    List {
        /// Folder to scan
        dir: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Annotate {
            dir,
            config,
            synthetic,
        } => cmd_annotate(&dir, config.as_deref(), synthetic),
        Commands::Split {
            video,
            frames,
            out,
            fps,
        } => cmd_split(video, frames, out, fps),
        Commands::List { dir } => cmd_list(&dir),
    }
}

fn cmd_annotate(dir: &Path, config: Option<&Path>, synthetic: Option<usize>) -> Result<()> {
    let config = match config {
        Some(path) => EngineConfig::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let (opener, videos): (Box<dyn VideoOpener>, Vec<PathBuf>) = match synthetic {
        Some(frames) => {
            let mut videos = discover_videos(dir).unwrap_or_default();
            if videos.is_empty() {
                videos.push(dir.join("synthetic.mp4"));
            }
            (Box::new(SyntheticOpener::new(frames, 320, 240)), videos)
        }
        None => {
            let videos = discover_videos(dir)?;
            if videos.is_empty() {
                bail!("no supported videos in {}", dir.display());
            }
            (Box::new(FfmpegOpener), videos)
        }
    };
    info!(dir = %dir.display(), videos = videos.len(), "Starting annotator");

    let (worker, handle) = EngineWorker::new(opener, config);
    let engine = worker.spawn().context("spawning engine thread")?;
    let viewer = viewer::spawn(
        handle.render.clone(),
        handle.status.clone(),
        handle.termination.clone(),
    )
    .context("spawning viewer thread")?;

    let termination = handle.termination.clone();
    println!("{}", console::HELP);
    let console = Console::new(videos, dir.to_path_buf(), handle);
    let console_result = console.run(std::io::stdin().lock());

    let engine_result = engine
        .join()
        .map_err(|_| anyhow::anyhow!("engine thread panicked"))?;
    termination.trigger();
    if viewer.join().is_err() {
        error!("Viewer thread panicked");
    }

    engine_result.context("engine stopped on a fatal error")?;
    console_result
}

fn cmd_split(video: PathBuf, frames: usize, out: Option<PathBuf>, fps: u32) -> Result<()> {
    let out = out.unwrap_or_else(|| {
        video
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
    });
    let job = SplitJob::new(video, frames).with_output_dir(out).with_fps(fps);

    let clips = job.run(&FfmpegOpener, |progress| {
        info!(
            frames = progress.frames_written,
            clips = progress.chunks_written,
            "Splitting"
        );
    })?;
    println!("wrote {} clips to {}", clips, job.output_dir.display());
    Ok(())
}

fn cmd_list(dir: &Path) -> Result<()> {
    let videos = discover_videos(dir)?;
    if videos.is_empty() {
        println!("no supported videos in {}", dir.display());
    }
    for (i, video) in videos.iter().enumerate() {
        println!("{:>3}  {}", i, video.display());
    }
    Ok(())
}
