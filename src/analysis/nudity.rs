use anyhow::Result;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::analysis::imageops::{connected_regions, is_skin_tone, Mask};
use crate::score::Score;
use crate::video::{FrameSampler, SampledFrame};

/// Skin regions larger than this pixel area count as exposure indicators.
const LARGE_REGION_AREA: u32 = 1000;

/// Frames scoring above this are recorded as timestamped detections.
const DETECTION_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NudityCategory {
    None,
    Suggestive,
    Partial,
    Explicit,
}

impl fmt::Display for NudityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NudityCategory::None => "none",
            NudityCategory::Suggestive => "suggestive",
            NudityCategory::Partial => "partial",
            NudityCategory::Explicit => "explicit",
        };
        f.write_str(name)
    }
}

/// A sampled frame whose skin score crossed the detection threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameDetection {
    pub timestamp: f64,
    pub score: Score,
    pub frame_index: u64,
}

/// Nudity signal over the sampled frames.
///
/// The overall score is the worst observed frame, not the average: one
/// explicit frame is enough to flag a video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NudityAnalysis {
    pub overall_score: Score,
    pub category: NudityCategory,
    pub detections: Vec<FrameDetection>,
    pub frames_analyzed: usize,
}

/// Skin-area heuristic standing in for a real nudity classifier.
#[derive(Debug, Clone, Default)]
pub struct NudityDetector;

impl NudityDetector {
    pub const SAMPLE_TARGET: usize = 30;

    pub fn new() -> Self {
        Self
    }

    pub async fn analyze(&self, sampler: &FrameSampler) -> Result<NudityAnalysis> {
        let frames = sampler.sample_frames(Self::SAMPLE_TARGET).await?;
        Ok(Self::score_frames(&frames))
    }

    /// Score already-decoded frames; split out so tests can drive it with
    /// synthetic images.
    pub fn score_frames(frames: &[SampledFrame]) -> NudityAnalysis {
        let mut max_score = Score::ZERO;
        let mut detections = Vec::new();

        for frame in frames {
            let score = Self::frame_score(&frame.image);

            if score.value() > DETECTION_THRESHOLD {
                detections.push(FrameDetection {
                    timestamp: frame.timestamp,
                    score,
                    frame_index: frame.index,
                });
            }

            max_score = max_score.max(score);
        }

        NudityAnalysis {
            overall_score: max_score,
            category: Self::categorize(max_score),
            detections,
            frames_analyzed: frames.len(),
        }
    }

    /// Per-frame skin score: scaled skin-pixel fraction plus a bonus for
    /// large connected skin regions.
    fn frame_score(image: &RgbImage) -> Score {
        let mask = Mask::from_hsv(image, is_skin_tone);
        let skin_fraction = mask.coverage();

        let large_regions = connected_regions(&mask)
            .iter()
            .filter(|region| region.area > LARGE_REGION_AREA)
            .count();

        let base = (skin_fraction * 2.0).min(1.0);
        let region_bonus = (large_regions as f64 * 0.1).min(0.3);

        Score::clamped(base + region_bonus)
    }

    fn categorize(score: Score) -> NudityCategory {
        let value = score.value();
        if value < 0.3 {
            NudityCategory::None
        } else if value < 0.5 {
            NudityCategory::Suggestive
        } else if value < 0.7 {
            NudityCategory::Partial
        } else {
            NudityCategory::Explicit
        }
    }
}
