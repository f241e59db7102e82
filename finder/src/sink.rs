use std::path::{Path, PathBuf};

use frame_finder_common::probe::VideoInfo;
use tracing::info;

use crate::scan::Sample;
use crate::source::{self, SourceError};

/// Consumes a ranked result list. The scan/rank pipeline is the same for
/// every mode; only the sink differs (report to the log, or export files).
pub trait ResultSink {
    fn emit(
        &mut self,
        video: &Path,
        info: &VideoInfo,
        ranked: &[Sample],
    ) -> Result<(), SinkError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to re-extract frame {frame_index}: {source}")]
    Extract {
        frame_index: u64,
        #[source]
        source: SourceError,
    },
    #[error("failed to create output directory {0}: {1}")]
    CreateDir(String, std::io::Error),
    #[error("failed to write {0}: {1}")]
    Write(String, image::ImageError),
}

/// Logs each match with its frame index, timestamp and score.
pub struct ConsoleSink;

impl ResultSink for ConsoleSink {
    fn emit(
        &mut self,
        _video: &Path,
        info: &VideoInfo,
        ranked: &[Sample],
    ) -> Result<(), SinkError> {
        for (rank, sample) in ranked.iter().enumerate() {
            info!(
                rank = rank + 1,
                frame = sample.frame_index,
                timestamp = format!("{:.3}s", info.timestamp_secs(sample.frame_index)),
                score = format!("{:.4}", sample.score),
                "match"
            );
        }
        Ok(())
    }
}

/// Re-extracts each ranked frame at full resolution and writes it as a PNG
/// under the output directory.
pub struct PngExportSink {
    out_dir: PathBuf,
}

impl PngExportSink {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    fn file_name(stem: &str, frame_index: u64, score: f64) -> String {
        format!("o_{stem}_{frame_index}_{score:.4}.png")
    }
}

impl ResultSink for PngExportSink {
    fn emit(
        &mut self,
        video: &Path,
        info: &VideoInfo,
        ranked: &[Sample],
    ) -> Result<(), SinkError> {
        std::fs::create_dir_all(&self.out_dir)
            .map_err(|e| SinkError::CreateDir(self.out_dir.display().to_string(), e))?;

        for sample in ranked {
            let frame =
                source::extract_frame(video, sample.frame_index, info).map_err(|e| {
                    SinkError::Extract {
                        frame_index: sample.frame_index,
                        source: e,
                    }
                })?;
            let path = self
                .out_dir
                .join(Self::file_name(&info.file_stem, sample.frame_index, sample.score));
            frame
                .save(&path)
                .map_err(|e| SinkError::Write(path.display().to_string(), e))?;
            info!(
                path = path.display().to_string(),
                frame = sample.frame_index,
                "exported match"
            );
        }
        Ok(())
    }
}
