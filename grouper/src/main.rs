use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Parser;
use frame_finder_common::probe;
use frame_finder_common::walk;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "resolution-grouper")]
#[command(about = "Group the videos in a directory by resolution")]
#[command(version)]
struct Args {
    /// Directory to scan recursively
    #[arg(short, long)]
    path: PathBuf,
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".parse().unwrap_or_default()),
        )
        .init();

    probe::check_ffmpeg_available();

    let videos = walk::find_videos(&args.path);
    info!(
        directory = args.path.display().to_string(),
        candidates = videos.len(),
        "probing videos"
    );

    let mut resolutions: BTreeMap<(u32, u32), Vec<PathBuf>> = BTreeMap::new();
    for path in videos {
        match probe::probe(&path) {
            Ok(info) => {
                resolutions
                    .entry((info.width, info.height))
                    .or_default()
                    .push(path);
            }
            Err(e) => {
                warn!(video = path.display().to_string(), error = %e, "probe failed, skipping");
            }
        }
    }

    for ((width, height), paths) in &resolutions {
        println!("({width}, {height})");
        for path in paths {
            println!("{}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_preserve_insertion_within_resolution() {
        let mut resolutions: BTreeMap<(u32, u32), Vec<PathBuf>> = BTreeMap::new();
        for (w, h, name) in [
            (1920, 1080, "a.mp4"),
            (640, 480, "b.mp4"),
            (1920, 1080, "c.mp4"),
        ] {
            resolutions
                .entry((w, h))
                .or_default()
                .push(PathBuf::from(name));
        }

        assert_eq!(resolutions.len(), 2);
        assert_eq!(
            resolutions[&(1920, 1080)],
            vec![PathBuf::from("a.mp4"), PathBuf::from("c.mp4")]
        );
        // BTreeMap iterates resolutions in ascending order
        let keys: Vec<_> = resolutions.keys().copied().collect();
        assert_eq!(keys, vec![(640, 480), (1920, 1080)]);
    }
}
