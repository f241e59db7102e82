use std::io::Read;
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use frame_finder_common::probe::VideoInfo;
use image::RgbImage;
use tracing::debug;

/// A forward-only sequence of decoded frames.
///
/// One frame is consumed per `next_frame` call; there is no random access.
/// `None` means the stream is exhausted (or a frame failed to decode, which
/// is treated the same way, never retried).
pub trait FrameSource {
    fn total_frames(&self) -> u64;
    fn next_frame(&mut self) -> Option<RgbImage>;
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to spawn ffmpeg for {0}: {1}")]
    Spawn(String, std::io::Error),
    #[error("ffmpeg did not expose a stdout pipe")]
    NoStdout,
    #[error("could not extract frame {0}")]
    NoFrame(u64),
}

/// Sequential decoder backed by an `ffmpeg` subprocess writing raw RGB24
/// frames to its stdout, one `width * height * 3` byte block per frame.
pub struct FfmpegFrameSource {
    child: Child,
    stdout: ChildStdout,
    width: u32,
    height: u32,
    total_frames: u64,
    frames_read: u64,
}

impl FfmpegFrameSource {
    pub fn open(path: &Path, info: &VideoInfo) -> Result<Self, SourceError> {
        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| SourceError::Spawn(path.display().to_string(), e))?;

        let stdout = child.stdout.take().ok_or(SourceError::NoStdout)?;

        debug!(
            path = path.display().to_string(),
            width = info.width,
            height = info.height,
            total_frames = info.frame_count,
            "ffmpeg decoder started"
        );

        Ok(Self {
            child,
            stdout,
            width: info.width,
            height: info.height,
            total_frames: info.frame_count,
            frames_read: 0,
        })
    }
}

impl FrameSource for FfmpegFrameSource {
    fn total_frames(&self) -> u64 {
        self.total_frames
    }

    fn next_frame(&mut self) -> Option<RgbImage> {
        let len = self.width as usize * self.height as usize * 3;
        let mut buffer = vec![0u8; len];
        if let Err(e) = self.stdout.read_exact(&mut buffer) {
            debug!(frames_read = self.frames_read, error = %e, "video stream ended");
            return None;
        }
        self.frames_read += 1;
        RgbImage::from_raw(self.width, self.height, buffer)
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        // The child may still be mid-stream if the scan ended early.
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Re-extract a single frame by seeking, for result export. This runs a
/// fresh ffmpeg per frame and is independent of the sequential scan path.
pub fn extract_frame(
    path: &Path,
    frame_index: u64,
    info: &VideoInfo,
) -> Result<RgbImage, SourceError> {
    let timestamp = info.timestamp_secs(frame_index);
    let output = Command::new("ffmpeg")
        .args(["-v", "error", "-ss", &format!("{timestamp:.6}"), "-i"])
        .arg(path)
        .args(["-frames:v", "1", "-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
        .stdin(Stdio::null())
        .output()
        .map_err(|e| SourceError::Spawn(path.display().to_string(), e))?;

    let len = info.width as usize * info.height as usize * 3;
    if !output.status.success() || output.stdout.len() < len {
        return Err(SourceError::NoFrame(frame_index));
    }

    RgbImage::from_raw(info.width, info.height, output.stdout[..len].to_vec())
        .ok_or(SourceError::NoFrame(frame_index))
}
