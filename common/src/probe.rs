use serde::Deserialize;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// Video stream metadata, as reported by `ffprobe`.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub frame_count: u64,
    pub fps: f64,
    /// File name without extension, used when naming exported results.
    pub file_stem: String,
}

impl VideoInfo {
    /// Presentation time of a frame index, in seconds.
    pub fn timestamp_secs(&self, frame_index: u64) -> f64 {
        if self.fps > 0.0 {
            frame_index as f64 / self.fps
        } else {
            0.0
        }
    }

    /// Parse the JSON document produced by
    /// `ffprobe -select_streams v:0 -show_entries stream=... -of json`.
    pub fn from_probe_json(file_stem: &str, json: &str) -> Result<Self, ProbeError> {
        let output: ProbeOutput = serde_json::from_str(json).map_err(ProbeError::Parse)?;
        let stream = output
            .streams
            .into_iter()
            .next()
            .ok_or(ProbeError::NoVideoStream)?;

        let width = stream.width.ok_or(ProbeError::MissingField("width"))?;
        let height = stream.height.ok_or(ProbeError::MissingField("height"))?;
        let fps = stream
            .r_frame_rate
            .as_deref()
            .and_then(parse_rational)
            .unwrap_or(0.0);

        // Some containers omit nb_frames; estimate from duration instead.
        let frame_count = match stream.nb_frames.as_deref().and_then(|s| s.parse().ok()) {
            Some(n) => n,
            None => {
                let duration: f64 = stream
                    .duration
                    .as_deref()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0.0);
                let estimated = (duration * fps).round() as u64;
                debug!(file_stem, estimated, "nb_frames missing, estimated from duration");
                estimated
            }
        };

        Ok(Self {
            width,
            height,
            frame_count,
            fps,
            file_stem: file_stem.to_string(),
        })
    }
}

/// Run `ffprobe` against a video file and parse its stream metadata.
pub fn probe(path: &Path) -> Result<VideoInfo, ProbeError> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,nb_frames,r_frame_rate,duration",
            "-of",
            "json",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| ProbeError::Spawn(path.display().to_string(), e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        return Err(ProbeError::Failed(path.display().to_string(), stderr));
    }

    let json = String::from_utf8_lossy(&output.stdout);
    let file_stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    VideoInfo::from_probe_json(&file_stem, &json)
}

/// Check whether ffmpeg and ffprobe are on PATH. Logs a warning if not;
/// decoding and probing will fail without them.
pub fn check_ffmpeg_available() {
    for tool in ["ffmpeg", "ffprobe"] {
        match Command::new(tool)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
        {
            Ok(out) if out.status.success() => {
                debug!(tool, "available");
            }
            Ok(_) => {
                warn!(tool, "returned non-zero for -version; decoding may fail");
            }
            Err(e) => {
                warn!(tool, error = %e, "not found on PATH; install ffmpeg");
            }
        }
    }
}

/// Parse ffprobe rationals like "30000/1001" or plain "25".
fn parse_rational(value: &str) -> Option<f64> {
    match value.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                None
            } else {
                Some(num / den)
            }
        }
        None => value.parse().ok(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("failed to run ffprobe on {0}: {1}")]
    Spawn(String, std::io::Error),
    #[error("ffprobe failed on {0}: {1}")]
    Failed(String, String),
    #[error("failed to parse ffprobe output: {0}")]
    Parse(serde_json::Error),
    #[error("no video stream found")]
    NoVideoStream,
    #[error("ffprobe output missing field {0}")]
    MissingField(&'static str),
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    nb_frames: Option<String>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_stream_entry() {
        let json = r#"{
            "streams": [{
                "width": 1920,
                "height": 1080,
                "r_frame_rate": "30000/1001",
                "duration": "12.512500",
                "nb_frames": "375"
            }]
        }"#;
        let info = VideoInfo::from_probe_json("clip", json).unwrap();
        assert_eq!(info.width, 1920);
        assert_eq!(info.height, 1080);
        assert_eq!(info.frame_count, 375);
        assert!((info.fps - 29.97).abs() < 0.01);
        assert_eq!(info.file_stem, "clip");
    }

    #[test]
    fn estimates_frame_count_from_duration() {
        let json = r#"{
            "streams": [{
                "width": 640,
                "height": 480,
                "r_frame_rate": "25/1",
                "duration": "10.0"
            }]
        }"#;
        let info = VideoInfo::from_probe_json("clip", json).unwrap();
        assert_eq!(info.frame_count, 250);
    }

    #[test]
    fn rejects_missing_stream() {
        let result = VideoInfo::from_probe_json("clip", r#"{"streams": []}"#);
        assert!(matches!(result, Err(ProbeError::NoVideoStream)));
    }

    #[test]
    fn rejects_missing_dimensions() {
        let json = r#"{"streams": [{"r_frame_rate": "25/1"}]}"#;
        assert!(matches!(
            VideoInfo::from_probe_json("clip", json),
            Err(ProbeError::MissingField("width"))
        ));
    }

    #[test]
    fn parses_rational_frame_rates() {
        assert_eq!(parse_rational("25/1"), Some(25.0));
        assert_eq!(parse_rational("24"), Some(24.0));
        assert_eq!(parse_rational("0/0"), None);
        assert_eq!(parse_rational("garbage"), None);
    }

    #[test]
    fn timestamp_from_frame_index() {
        let info = VideoInfo {
            width: 640,
            height: 480,
            frame_count: 100,
            fps: 25.0,
            file_stem: "clip".into(),
        };
        assert_eq!(info.timestamp_secs(50), 2.0);
        assert_eq!(info.timestamp_secs(0), 0.0);
    }
}
