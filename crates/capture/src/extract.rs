//! Key-frame extraction from a captured video clip.
//!
//! [`FrameExtractor`] is the seam the controller drives; the shipped
//! implementation shells out to `ffprobe`/`ffmpeg`, seeking to evenly
//! spaced interior timestamps and rasterizing one JPEG per seek.  All
//! transient decode resources (the temp working directory) are released
//! on success and failure alike.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use crate::blob::{ImageBlob, VideoBlob};

/// Default number of key frames extracted from one clip.
pub const DEFAULT_FRAME_COUNT: usize = 3;

/// Error type for key-frame extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("ffprobe/ffmpeg binary not found: {0}")]
    BinaryNotFound(std::io::Error),

    #[error("ffprobe/ffmpeg execution failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("failed to parse ffprobe output: {0}")]
    ParseError(String),

    #[error("video could not be decoded: {0}")]
    Undecodable(String),

    #[error("video has zero duration")]
    ZeroDuration,

    #[error("no usable frames could be extracted")]
    NoFrames,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Produces a bounded, ordered set of key frames from a video clip.
///
/// Implementations are pure apart from transient decode resources and
/// must return frames ordered by increasing timestamp, since labels
/// are later assigned positionally.
#[async_trait]
pub trait FrameExtractor: Send + Sync {
    /// Extract up to `target_count` frames.  Returns at least one frame
    /// or fails; callers never see a partial submission.
    async fn extract_frames(
        &self,
        source: &VideoBlob,
        target_count: usize,
    ) -> Result<Vec<ImageBlob>, ExtractionError>;
}

/// Plan `count` evenly spaced interior timestamps across a duration.
///
/// Midpoint sampling (`(i + 0.5) * duration / count`) avoids the first
/// and last frames, which for a drill clip are setup and walk-away
/// rather than landing/plant/push-off.  Empty when either input is zero.
pub fn plan_timestamps(duration_secs: f64, count: usize) -> Vec<f64> {
    if duration_secs <= 0.0 || count == 0 {
        return Vec::new();
    }
    (0..count)
        .map(|i| (i as f64 + 0.5) * duration_secs / count as f64)
        .collect()
}

// ---------------------------------------------------------------------------
// ffprobe JSON output structures
// ---------------------------------------------------------------------------

/// Top-level ffprobe JSON output (`-print_format json -show_format -show_streams`).
#[derive(Debug, Deserialize)]
pub struct FfprobeOutput {
    #[serde(default)]
    pub streams: Vec<FfprobeStream>,
    pub format: FfprobeFormat,
}

/// A single stream from ffprobe output.
#[derive(Debug, Deserialize)]
pub struct FfprobeStream {
    pub codec_type: Option<String>,
    pub duration: Option<String>,
}

/// Format-level metadata from ffprobe.
#[derive(Debug, Deserialize)]
pub struct FfprobeFormat {
    pub duration: Option<String>,
}

/// Parse the video duration in seconds from ffprobe output.
pub fn parse_duration(probe: &FfprobeOutput) -> f64 {
    // Try format-level duration first.
    if let Some(d) = &probe.format.duration {
        if let Ok(secs) = d.parse::<f64>() {
            return secs;
        }
    }
    // Fall back to the first video stream's duration.
    if let Some(d) = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .and_then(|s| s.duration.as_ref())
    {
        if let Ok(secs) = d.parse::<f64>() {
            return secs;
        }
    }
    0.0
}

// ---------------------------------------------------------------------------
// ffmpeg subprocess implementation
// ---------------------------------------------------------------------------

/// Frame extractor backed by the `ffprobe` and `ffmpeg` binaries.
#[derive(Debug, Clone, Default)]
pub struct FfmpegFrameExtractor;

impl FfmpegFrameExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Run `ffprobe` on a clip file and return the parsed JSON output.
    async fn probe(path: &Path) -> Result<FfprobeOutput, ExtractionError> {
        let output = tokio::process::Command::new("ffprobe")
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .await
            .map_err(ExtractionError::BinaryNotFound)?;

        if !output.status.success() {
            return Err(ExtractionError::Undecodable(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        serde_json::from_str::<FfprobeOutput>(&stdout)
            .map_err(|e| ExtractionError::ParseError(format!("{e}: {stdout}")))
    }

    /// Extract a single frame as a JPEG at the given timestamp.
    async fn extract_one(
        video_path: &Path,
        output_path: &Path,
        timestamp_secs: f64,
    ) -> Result<(), ExtractionError> {
        let output = tokio::process::Command::new("ffmpeg")
            .args(["-y", "-ss", &format!("{timestamp_secs:.3}"), "-i"])
            .arg(video_path)
            .args(["-vframes", "1", "-q:v", "2"])
            .arg(output_path)
            .output()
            .await
            .map_err(ExtractionError::BinaryNotFound)?;

        if !output.status.success() {
            return Err(ExtractionError::ExecutionFailed {
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        Ok(())
    }

    /// The whole extraction against an on-disk working directory.
    async fn run(
        work_dir: &Path,
        source: &VideoBlob,
        target_count: usize,
    ) -> Result<Vec<ImageBlob>, ExtractionError> {
        let clip_path = work_dir.join("clip");
        tokio::fs::write(&clip_path, &source.bytes).await?;

        let probe = Self::probe(&clip_path).await?;
        let duration = parse_duration(&probe);
        if duration <= 0.0 {
            return Err(ExtractionError::ZeroDuration);
        }

        let mut frames = Vec::new();
        for (index, &timestamp) in plan_timestamps(duration, target_count).iter().enumerate() {
            let frame_path = work_dir.join(format!("frame_{index:03}.jpg"));
            match Self::extract_one(&clip_path, &frame_path, timestamp).await {
                Ok(()) => {
                    let bytes = tokio::fs::read(&frame_path).await?;
                    if !bytes.is_empty() {
                        frames.push(ImageBlob::new(bytes, "image/jpeg"));
                    }
                }
                Err(e) => {
                    // A seek past the last decodable frame can fail on
                    // short clips; keep whatever already extracted.
                    tracing::warn!(index, timestamp, error = %e, "Frame seek failed");
                }
            }
        }

        if frames.is_empty() {
            return Err(ExtractionError::NoFrames);
        }
        Ok(frames)
    }
}

#[async_trait]
impl FrameExtractor for FfmpegFrameExtractor {
    async fn extract_frames(
        &self,
        source: &VideoBlob,
        target_count: usize,
    ) -> Result<Vec<ImageBlob>, ExtractionError> {
        if source.is_empty() {
            return Err(ExtractionError::Undecodable("empty video blob".to_string()));
        }

        let work_dir =
            std::env::temp_dir().join(format!("formcheck-extract-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&work_dir).await?;

        let result = Self::run(&work_dir, source, target_count).await;

        // Release transient decode resources on success and failure alike.
        if let Err(e) = tokio::fs::remove_dir_all(&work_dir).await {
            tracing::warn!(dir = %work_dir.display(), error = %e, "Failed to clean extraction dir");
        }

        if let Ok(frames) = &result {
            tracing::debug!(
                requested = target_count,
                extracted = frames.len(),
                "Key frames extracted",
            );
        }
        result
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- plan_timestamps ------------------------------------------------------

    #[test]
    fn three_frames_hit_clip_midpoints() {
        let ts = plan_timestamps(6.0, 3);
        assert_eq!(ts, vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn single_frame_lands_mid_clip() {
        assert_eq!(plan_timestamps(4.0, 1), vec![2.0]);
    }

    #[test]
    fn timestamps_are_strictly_increasing() {
        let ts = plan_timestamps(2.5, 5);
        assert!(ts.windows(2).all(|w| w[0] < w[1]));
        assert!(*ts.last().unwrap() < 2.5);
    }

    #[test]
    fn zero_duration_plans_nothing() {
        assert!(plan_timestamps(0.0, 3).is_empty());
        assert!(plan_timestamps(-1.0, 3).is_empty());
    }

    #[test]
    fn zero_count_plans_nothing() {
        assert!(plan_timestamps(10.0, 0).is_empty());
    }

    // -- ffprobe parsing ------------------------------------------------------

    fn probe_from_json(json: serde_json::Value) -> FfprobeOutput {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn duration_prefers_format_level_value() {
        let probe = probe_from_json(serde_json::json!({
            "streams": [{ "codec_type": "video", "duration": "3.0" }],
            "format": { "duration": "4.2" },
        }));
        assert_eq!(parse_duration(&probe), 4.2);
    }

    #[test]
    fn duration_falls_back_to_video_stream() {
        let probe = probe_from_json(serde_json::json!({
            "streams": [
                { "codec_type": "audio", "duration": "9.9" },
                { "codec_type": "video", "duration": "3.5" },
            ],
            "format": {},
        }));
        assert_eq!(parse_duration(&probe), 3.5);
    }

    #[test]
    fn missing_duration_yields_zero() {
        let probe = probe_from_json(serde_json::json!({ "streams": [], "format": {} }));
        assert_eq!(parse_duration(&probe), 0.0);
    }
}
