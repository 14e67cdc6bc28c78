use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::analysis::imageops::{laplacian_variance, mean_brightness};
use crate::video::{FrameSampler, SampledFrame};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityRating {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl fmt::Display for QualityRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QualityRating::Poor => "poor",
            QualityRating::Fair => "fair",
            QualityRating::Good => "good",
            QualityRating::Excellent => "excellent",
        };
        f.write_str(name)
    }
}

/// Technical quality signal: focus sharpness and exposure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicalAnalysis {
    /// Average Laplacian variance across sampled frames
    pub sharpness: f64,
    /// Average grayscale brightness in [0, 255]
    pub brightness: f64,
    pub quality_rating: QualityRating,
    pub is_blurry: bool,
    pub is_too_dark: bool,
    pub is_too_bright: bool,
    pub frames_analyzed: usize,
}

/// Blur/brightness metrics over a small frame sample.
#[derive(Debug, Clone, Default)]
pub struct TechnicalQualityDetector;

impl TechnicalQualityDetector {
    pub const SAMPLE_TARGET: usize = 10;

    const BLUR_THRESHOLD: f64 = 100.0;
    const DARK_THRESHOLD: f64 = 50.0;
    const BRIGHT_THRESHOLD: f64 = 200.0;

    pub fn new() -> Self {
        Self
    }

    pub async fn analyze(&self, sampler: &FrameSampler) -> Result<TechnicalAnalysis> {
        let frames = sampler.sample_frames(Self::SAMPLE_TARGET).await?;
        Ok(Self::score_frames(&frames))
    }

    /// Average metrics over decoded frames; split out for synthetic tests.
    pub fn score_frames(frames: &[SampledFrame]) -> TechnicalAnalysis {
        let mut sharpness_total = 0.0;
        let mut brightness_total = 0.0;

        for frame in frames {
            let luma = image::imageops::grayscale(&frame.image);
            sharpness_total += laplacian_variance(&luma);
            brightness_total += mean_brightness(&luma);
        }

        let count = frames.len().max(1) as f64;
        let sharpness = sharpness_total / count;
        let brightness = brightness_total / count;

        TechnicalAnalysis {
            sharpness,
            brightness,
            quality_rating: Self::rate(sharpness),
            is_blurry: sharpness < Self::BLUR_THRESHOLD,
            is_too_dark: brightness < Self::DARK_THRESHOLD,
            is_too_bright: brightness > Self::BRIGHT_THRESHOLD,
            frames_analyzed: frames.len(),
        }
    }

    fn rate(sharpness: f64) -> QualityRating {
        if sharpness < 50.0 {
            QualityRating::Poor
        } else if sharpness < 150.0 {
            QualityRating::Fair
        } else if sharpness < 300.0 {
            QualityRating::Good
        } else {
            QualityRating::Excellent
        }
    }
}
