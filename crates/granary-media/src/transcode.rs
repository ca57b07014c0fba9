//! External transcoder invocations (ffprobe / ffmpeg)
//!
//! Segment cutting is invoked sequentially by the video pipeline; concurrent
//! invocations against a single input file contend on reads.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{ProcessingError, ProcessingResult};

/// Trait for probing and cutting media files
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Media duration in seconds
    async fn probe_duration(&self, media_path: &Path) -> ProcessingResult<f64>;

    /// Copy the window `[start_sec, start_sec + len_sec)` into `output`
    async fn cut_segment(
        &self,
        input: &Path,
        start_sec: f64,
        len_sec: f64,
        output: &Path,
    ) -> ProcessingResult<()>;
}

/// Transcoder shelling out to ffprobe/ffmpeg
#[derive(Debug, Default, Clone)]
pub struct FfmpegTranscoder;

impl FfmpegTranscoder {
    /// Create a new transcoder
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn probe_duration(&self, media_path: &Path) -> ProcessingResult<f64> {
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(media_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ProcessingError::Transcode(format!("ffprobe spawn failed: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProcessingError::Transcode(format!(
                "ffprobe exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .trim()
            .parse::<f64>()
            .map_err(|e| ProcessingError::Transcode(format!("unparseable duration: {e}")))
    }

    async fn cut_segment(
        &self,
        input: &Path,
        start_sec: f64,
        len_sec: f64,
        output: &Path,
    ) -> ProcessingResult<()> {
        let result = Command::new("ffmpeg")
            .arg("-y")
            .args(["-ss", &format!("{start_sec:.3}")])
            .arg("-i")
            .arg(input)
            .args(["-t", &format!("{len_sec:.3}")])
            .args(["-c", "copy"])
            .arg(output)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ProcessingError::Transcode(format!("ffmpeg spawn failed: {e}")))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(ProcessingError::Transcode(format!(
                "ffmpeg exited with {}: {}",
                result.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

/// Mock transcoder for tests: fixed duration, segments are tiny stub files
#[derive(Debug)]
pub struct MockTranscoder {
    duration_sec: f64,
}

impl MockTranscoder {
    /// Mock transcoder reporting the given duration for every probe
    pub const fn with_duration(duration_sec: f64) -> Self {
        Self { duration_sec }
    }
}

#[async_trait]
impl Transcoder for MockTranscoder {
    async fn probe_duration(&self, _media_path: &Path) -> ProcessingResult<f64> {
        Ok(self.duration_sec)
    }

    async fn cut_segment(
        &self,
        input: &Path,
        start_sec: f64,
        len_sec: f64,
        output: &Path,
    ) -> ProcessingResult<()> {
        let stub = format!(
            "segment of {} [{start_sec:.1}s +{len_sec:.1}s]",
            input.display()
        );
        tokio::fs::write(output, stub).await?;
        Ok(())
    }
}
