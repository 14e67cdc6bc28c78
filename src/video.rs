use anyhow::{anyhow, Result};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::ModerationError;

/// Container formats accepted for moderation.
pub const SUPPORTED_EXTENSIONS: [&str; 7] = ["mp4", "mov", "avi", "wmv", "mkv", "flv", "webm"];

/// Audio sample rate requested from ffmpeg for the mono analysis track.
const AUDIO_SAMPLE_RATE: u32 = 22050;

/// Video information extracted from a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    pub path: PathBuf,
    pub filename: String,
    pub duration: Duration,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: u64,
    pub format: String,
    pub file_size: u64,
    pub file_hash: String,
    pub audio_streams: Vec<AudioStreamInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioStreamInfo {
    pub index: usize,
    pub codec: String,
    pub sample_rate: u32,
    pub channels: u32,
}

impl VideoInfo {
    pub fn has_audio(&self) -> bool {
        !self.audio_streams.is_empty()
    }
}

/// A single decoded frame with its position in the source.
#[derive(Debug, Clone)]
pub struct SampledFrame {
    pub index: u64,
    pub timestamp: f64,
    pub image: RgbImage,
}

/// Decoded mono audio track.
#[derive(Debug, Clone)]
pub struct AudioTrack {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioTrack {
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }
}

/// Frame and audio sampler over one opened video source.
///
/// Opening probes the container once; each sampling call decodes only the
/// requested evenly spaced subset, so per-extractor cost stays bounded by
/// the sample count regardless of video length.
pub struct FrameSampler {
    info: VideoInfo,
}

impl FrameSampler {
    /// Probe a video file and prepare it for sampling.
    ///
    /// Fails with `SourceUnreadable` when the container is unsupported or
    /// ffprobe cannot open it.
    pub async fn open(path: &Path) -> Result<FrameSampler, ModerationError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ModerationError::source_unreadable(
                path,
                format!("unsupported container format '{}'", extension),
            ));
        }

        let info = Self::probe(path).await?;

        info!(
            "📹 Opened video: {} ({}x{}, {:.1}fps, {:.1}s, {} frames)",
            info.filename,
            info.width,
            info.height,
            info.fps,
            info.duration.as_secs_f64(),
            info.total_frames
        );

        Ok(FrameSampler { info })
    }

    pub fn info(&self) -> &VideoInfo {
        &self.info
    }

    /// Extract video information using ffprobe.
    async fn probe(path: &Path) -> Result<VideoInfo, ModerationError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| ModerationError::source_unreadable(path, "non-UTF8 path"))?;

        let output = tokio::process::Command::new("ffprobe")
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
                path_str,
            ])
            .output()
            .await
            .map_err(|e| ModerationError::source_unreadable(path, e.to_string()))?;

        if !output.status.success() {
            return Err(ModerationError::source_unreadable(path, "ffprobe failed"));
        }

        let ffprobe_data: serde_json::Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| ModerationError::source_unreadable(path, e.to_string()))?;

        let format = &ffprobe_data["format"];
        let streams = ffprobe_data["streams"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        let video_stream = streams
            .iter()
            .find(|s| s["codec_type"] == "video")
            .ok_or_else(|| ModerationError::source_unreadable(path, "no video stream found"))?;

        let audio_streams: Vec<AudioStreamInfo> = streams
            .iter()
            .filter(|s| s["codec_type"] == "audio")
            .enumerate()
            .map(|(index, stream)| AudioStreamInfo {
                index,
                codec: stream["codec_name"].as_str().unwrap_or("unknown").to_string(),
                sample_rate: stream["sample_rate"]
                    .as_str()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(44100),
                channels: stream["channels"].as_u64().unwrap_or(2) as u32,
            })
            .collect();

        let duration_seconds: f64 = format["duration"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.0);

        let fps = video_stream["r_frame_rate"]
            .as_str()
            .and_then(|s| {
                let parts: Vec<&str> = s.split('/').collect();
                if parts.len() == 2 {
                    let num: f64 = parts[0].parse().ok()?;
                    let den: f64 = parts[1].parse().ok()?;
                    if den > 0.0 {
                        Some(num / den)
                    } else {
                        None
                    }
                } else {
                    s.parse().ok()
                }
            })
            .unwrap_or(0.0);

        let total_frames = video_stream["nb_frames"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| (duration_seconds * fps).round().max(0.0) as u64);

        let file_size = tokio::fs::metadata(path)
            .await
            .map_err(|e| ModerationError::source_unreadable(path, e.to_string()))?
            .len();

        // Content hash for duplicate detection in the external store
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ModerationError::source_unreadable(path, e.to_string()))?;
        let file_hash = format!("{:x}", md5::compute(&bytes));

        Ok(VideoInfo {
            path: path.to_path_buf(),
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            duration: Duration::from_secs_f64(duration_seconds),
            width: video_stream["width"].as_u64().unwrap_or(0) as u32,
            height: video_stream["height"].as_u64().unwrap_or(0) as u32,
            fps,
            total_frames,
            format: format["format_name"].as_str().unwrap_or("unknown").to_string(),
            file_size,
            file_hash,
            audio_streams,
        })
    }

    /// Evenly spaced frame indices for a target sample count.
    pub fn sample_indices(total_frames: u64, target: usize) -> Vec<u64> {
        if total_frames == 0 || target == 0 {
            return Vec::new();
        }
        let interval = (total_frames / target as u64).max(1);
        (0..total_frames).step_by(interval as usize).collect()
    }

    /// Decode an evenly spaced subset of frames.
    ///
    /// One ffmpeg pass selects every interval-th frame into a scratch
    /// directory; frames that fail to decode individually are skipped.
    pub async fn sample_frames(&self, target: usize) -> Result<Vec<SampledFrame>> {
        let indices = Self::sample_indices(self.info.total_frames, target);
        if indices.is_empty() {
            return Ok(Vec::new());
        }
        let interval = (self.info.total_frames / target as u64).max(1);

        let scratch = tempfile::tempdir()?;
        let pattern = scratch.path().join("frame_%05d.png");

        let path_str = self
            .info
            .path
            .to_str()
            .ok_or_else(|| anyhow!("non-UTF8 path"))?;

        let status = tokio::process::Command::new("ffmpeg")
            .args([
                "-v",
                "error",
                "-i",
                path_str,
                "-vf",
                &format!("select=not(mod(n\\,{}))", interval),
                "-vsync",
                "vfr",
                "-frames:v",
                &indices.len().to_string(),
                pattern.to_str().ok_or_else(|| anyhow!("non-UTF8 scratch path"))?,
            ])
            .status()
            .await?;

        if !status.success() {
            return Err(anyhow!(
                "frame extraction failed for {}",
                self.info.path.display()
            ));
        }

        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(scratch.path()).await?;
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.path());
        }
        names.sort();

        let mut frames = Vec::with_capacity(names.len());
        for (position, file) in names.iter().enumerate() {
            let Some(&index) = indices.get(position) else {
                break;
            };
            match image::open(file) {
                Ok(decoded) => frames.push(SampledFrame {
                    index,
                    timestamp: if self.info.fps > 0.0 {
                        index as f64 / self.info.fps
                    } else {
                        0.0
                    },
                    image: decoded.to_rgb8(),
                }),
                Err(e) => {
                    warn!("Skipping undecodable frame {}: {}", file.display(), e);
                }
            }
        }

        debug!(
            "Sampled {}/{} frames from {}",
            frames.len(),
            indices.len(),
            self.info.filename
        );

        Ok(frames)
    }

    /// Decode the audio track as mono samples, averaging stereo channels.
    ///
    /// `None` is a valid state: the container simply has no audio stream.
    pub async fn extract_audio(&self) -> Result<Option<AudioTrack>> {
        if !self.info.has_audio() {
            return Ok(None);
        }

        let path_str = self
            .info
            .path
            .to_str()
            .ok_or_else(|| anyhow!("non-UTF8 path"))?;

        let output = tokio::process::Command::new("ffmpeg")
            .args([
                "-v",
                "error",
                "-i",
                path_str,
                "-vn",
                "-acodec",
                "pcm_s16le",
                "-ac",
                "1",
                "-ar",
                &AUDIO_SAMPLE_RATE.to_string(),
                "-f",
                "s16le",
                "pipe:1",
            ])
            .output()
            .await?;

        if !output.status.success() {
            return Err(anyhow!(
                "audio extraction failed for {}",
                self.info.path.display()
            ));
        }

        let samples: Vec<f32> = output
            .stdout
            .chunks_exact(2)
            .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / 32768.0)
            .collect();

        debug!(
            "🎵 Extracted {:.1}s of mono audio from {}",
            samples.len() as f64 / f64::from(AUDIO_SAMPLE_RATE),
            self.info.filename
        );

        Ok(Some(AudioTrack {
            samples,
            sample_rate: AUDIO_SAMPLE_RATE,
        }))
    }
}

/// Discover all video files in a directory recursively.
pub async fn discover_videos(dir: &Path) -> Result<Vec<PathBuf>> {
    use std::future::Future;
    use std::pin::Pin;

    fn discover_recursive(
        dir: &Path,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<PathBuf>>> + Send + '_>> {
        Box::pin(async move {
            let mut videos = Vec::new();

            let mut entries = tokio::fs::read_dir(dir).await?;

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();

                if path.is_dir() {
                    let mut sub_videos = discover_recursive(&path).await?;
                    videos.append(&mut sub_videos);
                } else if let Some(extension) = path.extension() {
                    if let Some(ext_str) = extension.to_str() {
                        if SUPPORTED_EXTENSIONS.contains(&ext_str.to_lowercase().as_str()) {
                            videos.push(path);
                        }
                    }
                }
            }

            videos.sort();
            Ok(videos)
        })
    }

    discover_recursive(dir).await
}
