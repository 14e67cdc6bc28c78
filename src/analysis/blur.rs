use anyhow::Result;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::analysis::imageops::{connected_regions, is_skin_tone, Mask};
use crate::score::Score;
use crate::video::{FrameSampler, SampledFrame};

/// Axis-aligned detection box in frame coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Face-detection capability: given a frame, return face bounding boxes.
///
/// The default heuristic satisfies the contract; a trained detector can be
/// swapped in without changing the pipeline.
pub trait FaceDetector: Send + Sync {
    fn detect(&self, image: &RgbImage) -> Vec<BoundingBox>;
}

/// Face proxy built from face-sized, roughly square skin regions.
#[derive(Debug, Clone, Default)]
pub struct HeuristicFaceDetector;

impl FaceDetector for HeuristicFaceDetector {
    fn detect(&self, image: &RgbImage) -> Vec<BoundingBox> {
        let (width, height) = image.dimensions();
        let frame_area = (width * height).max(1);

        let mask = Mask::from_hsv(image, is_skin_tone);
        connected_regions(&mask)
            .into_iter()
            .filter(|region| {
                let share = f64::from(region.area) / f64::from(frame_area);
                let aspect = region.aspect_ratio();
                share > 0.005 && share < 0.25 && aspect > 0.6 && aspect < 1.8
            })
            .map(|region| BoundingBox {
                x: region.min_x,
                y: region.min_y,
                width: region.width(),
                height: region.height(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
}

/// What triggered a redaction region.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum BlurTrigger {
    /// Personal identifiable information: visible faces.
    Faces { regions: Vec<BoundingBox> },
    /// Violent content proxy from the red-dominant color band.
    Violence { score: Score },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlurRegion {
    pub timestamp: f64,
    pub severity: Severity,
    #[serde(flatten)]
    pub trigger: BlurTrigger,
}

/// Redaction evidence for a downstream blur step.
///
/// Never consulted by the decision aggregator; the `blur_faces` and
/// `blur_violence` config flags are reserved for that downstream step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlurAnalysis {
    pub requires_blur: bool,
    pub regions: Vec<BlurRegion>,
    pub total_regions: usize,
}

pub struct BlurRequirementDetector {
    face_detector: Arc<dyn FaceDetector>,
}

impl BlurRequirementDetector {
    pub const SAMPLE_TARGET: usize = 20;

    /// Violence scores above this emit a high-severity region.
    const VIOLENCE_THRESHOLD: f64 = 0.5;

    pub fn new(face_detector: Arc<dyn FaceDetector>) -> Self {
        Self { face_detector }
    }

    pub async fn analyze(&self, sampler: &FrameSampler) -> Result<BlurAnalysis> {
        let frames = sampler.sample_frames(Self::SAMPLE_TARGET).await?;
        Ok(self.score_frames(&frames))
    }

    /// Collect redaction regions; split out for synthetic-input tests.
    pub fn score_frames(&self, frames: &[SampledFrame]) -> BlurAnalysis {
        let mut regions = Vec::new();

        for frame in frames {
            let faces = self.face_detector.detect(&frame.image);
            if !faces.is_empty() {
                regions.push(BlurRegion {
                    timestamp: frame.timestamp,
                    severity: Severity::Medium,
                    trigger: BlurTrigger::Faces { regions: faces },
                });
            }

            let violence = Self::violence_score(&frame.image);
            if violence.value() > Self::VIOLENCE_THRESHOLD {
                regions.push(BlurRegion {
                    timestamp: frame.timestamp,
                    severity: Severity::High,
                    trigger: BlurTrigger::Violence { score: violence },
                });
            }
        }

        BlurAnalysis {
            requires_blur: !regions.is_empty(),
            total_regions: regions.len(),
            regions,
        }
    }

    /// Red-dominant pixel fraction scaled into a violence proxy. The red
    /// hue band wraps around 0°/360°.
    pub fn violence_score(image: &RgbImage) -> Score {
        let mask = Mask::from_hsv(image, |h, s, v| {
            (h < 20.0 || h >= 340.0) && s >= 50.0 / 255.0 && v >= 50.0 / 255.0
        });
        Score::clamped(mask.coverage() * 5.0)
    }
}
