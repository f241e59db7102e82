mod normalize;
mod rank;
mod scan;
mod score;
mod sink;
mod source;

use std::path::{Path, PathBuf};

use clap::Parser;
use frame_finder_common::config::Config;
use frame_finder_common::probe::{self, ProbeError, VideoInfo};
use frame_finder_common::walk;
use image::RgbImage;
use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use normalize::Normalizer;
use scan::{Sample, ScanError, ScanParams};
use score::Ssim;
use sink::{ConsoleSink, PngExportSink, ResultSink, SinkError};
use source::{FfmpegFrameSource, SourceError};

#[derive(Parser, Debug)]
#[command(name = "frame-finder")]
#[command(about = "Find the frames of a video most similar to a query image")]
#[command(version)]
struct Args {
    /// Query image to search for
    #[arg(short = 's', long)]
    search_frame: PathBuf,

    /// Video file to search
    #[arg(short, long)]
    video: Option<PathBuf>,

    /// Directory of candidate videos (searched recursively, restricted to
    /// videos whose resolution matches the query)
    #[arg(short = 'D', long, conflicts_with = "video")]
    directory: Option<PathBuf>,

    /// Number of best matches to report
    #[arg(short = 'n', long)]
    num_found: Option<usize>,

    /// Also export matched frames as PNGs to this directory
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Log every scored frame and skip adjustment
    #[arg(short, long, default_value_t = false)]
    debug: bool,

    /// Optional TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
enum FinderError {
    #[error("failed to load query image {0}: {1}")]
    QueryImage(String, image::ImageError),
    #[error(transparent)]
    Probe(#[from] ProbeError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

fn main() {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load config from {}: {e}", path.display());
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };

    if let Some(n) = args.num_found {
        config.results.count = n;
    }
    if let Some(dir) = &args.out_dir {
        config.results.out_dir = dir.display().to_string();
    }
    if args.debug {
        config.logging.level = "debug".into();
    }

    if let Err(e) = config.validate() {
        eprintln!("{e}");
        std::process::exit(1);
    }
    if args.video.is_none() && args.directory.is_none() {
        eprintln!("one of --video or --directory is required");
        std::process::exit(1);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    info!(
        search_frame = args.search_frame.display().to_string(),
        downsample = config.scan.downsample,
        skip_start = config.scan.start,
        skip_floor = config.scan.floor,
        skip_ceil = config.scan.ceil,
        skip_step = config.scan.step,
        results = config.results.count,
        "starting frame-finder"
    );

    probe::check_ffmpeg_available();

    let normalizer = Normalizer::new(config.scan.downsample);
    let needle = match load_needle(&args.search_frame, &normalizer) {
        Ok(needle) => needle,
        Err(e) => {
            error!(error = %e, "failed to prepare query image");
            std::process::exit(1);
        }
    };
    info!(
        width = needle.width(),
        height = needle.height(),
        "query image normalized"
    );

    let params = ScanParams {
        start: config.scan.start,
        floor: config.scan.floor,
        ceil: config.scan.ceil,
        step: config.scan.step,
    };

    let outcome = match (&args.video, &args.directory) {
        (Some(video), _) => {
            search_single(video, &needle, &normalizer, &params, &config, args.out_dir.is_some())
        }
        (None, Some(dir)) => search_directory(dir, &needle, &normalizer, &params, &config),
        (None, None) => unreachable!("validated above"),
    };

    if let Err(e) = outcome {
        error!(error = %e, "search failed");
        std::process::exit(1);
    }
}

/// Load and normalize the query image once, before any scanning.
fn load_needle(path: &Path, normalizer: &Normalizer) -> Result<RgbImage, FinderError> {
    let image = image::open(path)
        .map_err(|e| FinderError::QueryImage(path.display().to_string(), e))?
        .to_rgb8();
    Ok(normalizer.normalize(&image))
}

/// Scan one video and return its ranked matches.
fn search_video(
    path: &Path,
    info: &VideoInfo,
    needle: &RgbImage,
    normalizer: &Normalizer,
    params: &ScanParams,
    count: usize,
) -> Result<Vec<Sample>, FinderError> {
    info!(
        video = path.display().to_string(),
        frames = info.frame_count,
        width = info.width,
        height = info.height,
        "searching video"
    );

    let mut source = FfmpegFrameSource::open(path, info)?;
    let samples = scan::scan(needle, &mut source, normalizer, &Ssim::default(), params)?;
    drop(source);

    info!(
        video = path.display().to_string(),
        sampled = samples.len(),
        "scan complete"
    );
    Ok(rank::select_top(&samples, count))
}

fn search_single(
    video: &Path,
    needle: &RgbImage,
    normalizer: &Normalizer,
    params: &ScanParams,
    config: &Config,
    export: bool,
) -> Result<(), FinderError> {
    let info = probe::probe(video)?;
    let ranked = search_video(video, &info, needle, normalizer, params, config.results.count)?;

    ConsoleSink.emit(video, &info, &ranked)?;
    if export {
        PngExportSink::new(&config.results.out_dir).emit(video, &info, &ranked)?;
    }
    Ok(())
}

fn search_directory(
    dir: &Path,
    needle: &RgbImage,
    normalizer: &Normalizer,
    params: &ScanParams,
    config: &Config,
) -> Result<(), FinderError> {
    let videos = walk::find_videos(dir);
    info!(
        directory = dir.display().to_string(),
        candidates = videos.len(),
        "collected candidate videos"
    );

    // Only videos whose normalized resolution matches the query can be
    // compared at all; everything else is filtered out up front.
    let matching: Vec<(PathBuf, VideoInfo)> = videos
        .into_iter()
        .filter_map(|path| match probe::probe(&path) {
            Ok(info) => {
                if normalizer.normalized_dimensions(info.width, info.height)
                    == needle.dimensions()
                {
                    Some((path, info))
                } else {
                    debug!(
                        video = path.display().to_string(),
                        width = info.width,
                        height = info.height,
                        "resolution does not match query, skipping"
                    );
                    None
                }
            }
            Err(e) => {
                warn!(video = path.display().to_string(), error = %e, "probe failed, skipping");
                None
            }
        })
        .collect();
    info!(matching = matching.len(), "resolution-matched candidates");

    // Each scan owns its decoder and state, so candidates search in parallel.
    matching.par_iter().for_each(|(path, info)| {
        let result = search_video(path, info, needle, normalizer, params, config.results.count)
            .and_then(|ranked| {
                ConsoleSink.emit(path, info, &ranked)?;
                PngExportSink::new(&config.results.out_dir).emit(path, info, &ranked)?;
                Ok(())
            });
        if let Err(e) = result {
            error!(video = path.display().to_string(), error = %e, "search failed");
        }
    });

    Ok(())
}
