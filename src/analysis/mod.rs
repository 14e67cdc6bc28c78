//! Signal extraction: five independent heuristic analyzers over sampled
//! frames and audio, orchestrated into one analysis report.

pub mod blur;
pub mod copyright;
pub mod fraud;
pub mod imageops;
pub mod nudity;
pub mod quality;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::ModerationError;
use crate::video::{FrameSampler, VideoInfo};

pub use blur::{
    BlurAnalysis, BlurRegion, BlurRequirementDetector, BlurTrigger, BoundingBox, FaceDetector,
    HeuristicFaceDetector, Severity,
};
pub use copyright::{AudioSignal, CopyrightAnalysis, CopyrightDetector, VisualSignal};
pub use fraud::{FraudAnalysis, FraudDetector, FraudType, NoopTextRecognizer, TextRecognizer};
pub use nudity::{FrameDetection, NudityAnalysis, NudityCategory, NudityDetector};
pub use quality::{QualityRating, TechnicalAnalysis, TechnicalQualityDetector};

/// Outcome of one signal extractor: a populated analysis or an explicit
/// failure. A failure never aborts the pipeline; the aggregator treats it
/// as a zero-impact signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalOutcome<T> {
    Ok(T),
    Failed { error: String },
}

impl<T> SignalOutcome<T> {
    fn from_result(result: anyhow::Result<T>, signal: &str) -> Self {
        match result {
            Ok(analysis) => SignalOutcome::Ok(analysis),
            Err(e) => {
                warn!("{} analysis failed: {:#}", signal, e);
                SignalOutcome::Failed {
                    error: format!("{} analysis failed: {:#}", signal, e),
                }
            }
        }
    }

    pub fn as_ok(&self) -> Option<&T> {
        match self {
            SignalOutcome::Ok(analysis) => Some(analysis),
            SignalOutcome::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SignalOutcome::Failed { .. })
    }
}

/// Raw per-extractor results for one analyzed video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub file_info: VideoInfo,
    pub nudity: SignalOutcome<NudityAnalysis>,
    pub copyright: SignalOutcome<CopyrightAnalysis>,
    pub fraud: SignalOutcome<FraudAnalysis>,
    pub blur: SignalOutcome<BlurAnalysis>,
    pub technical: SignalOutcome<TechnicalAnalysis>,
    pub analyzed_at: DateTime<Utc>,
}

/// Runs every signal extractor against one video source.
///
/// The extractors are independent and read-only over the same source, so
/// they run concurrently within one analysis call.
pub struct VideoAnalyzer {
    nudity: NudityDetector,
    copyright: CopyrightDetector,
    fraud: FraudDetector,
    blur: BlurRequirementDetector,
    technical: TechnicalQualityDetector,
}

impl VideoAnalyzer {
    /// Analyzer with the default capabilities: a no-op text recognizer and
    /// the heuristic face detector.
    pub fn new() -> Self {
        Self::with_capabilities(
            Arc::new(NoopTextRecognizer),
            Arc::new(HeuristicFaceDetector),
        )
    }

    /// Analyzer with caller-supplied recognition capabilities.
    pub fn with_capabilities(
        text_recognizer: Arc<dyn TextRecognizer>,
        face_detector: Arc<dyn FaceDetector>,
    ) -> Self {
        Self {
            nudity: NudityDetector::new(),
            copyright: CopyrightDetector::new(),
            fraud: FraudDetector::new(text_recognizer),
            blur: BlurRequirementDetector::new(face_detector),
            technical: TechnicalQualityDetector::new(),
        }
    }

    /// Analyze one video end-to-end.
    ///
    /// Only an unreadable source fails the call; individual extractor
    /// errors are recorded in the report and the analysis degrades
    /// gracefully.
    pub async fn analyze(&self, path: &Path) -> Result<AnalysisReport, ModerationError> {
        let sampler = FrameSampler::open(path).await?;

        // Audio is pulled once per analysis; a track we cannot decode
        // degrades to the no-audio path.
        let audio = sampler.extract_audio().await.unwrap_or_else(|e| {
            warn!("audio extraction failed: {:#}", e);
            None
        });

        let (nudity, copyright, fraud, blur, technical) = tokio::join!(
            self.nudity.analyze(&sampler),
            self.copyright.analyze(&sampler, audio.as_ref()),
            self.fraud.analyze(&sampler),
            self.blur.analyze(&sampler),
            self.technical.analyze(&sampler),
        );

        let report = AnalysisReport {
            file_info: sampler.info().clone(),
            nudity: SignalOutcome::from_result(nudity, "nudity"),
            copyright: SignalOutcome::from_result(copyright, "copyright"),
            fraud: SignalOutcome::from_result(fraud, "fraud"),
            blur: SignalOutcome::from_result(blur, "blur"),
            technical: SignalOutcome::from_result(technical, "technical"),
            analyzed_at: Utc::now(),
        };

        info!("🔍 Analysis complete for {}", report.file_info.filename);

        Ok(report)
    }
}

impl Default for VideoAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::Score;

    #[test]
    fn test_signal_outcome_serializes_like_its_payload() {
        let outcome: SignalOutcome<FraudAnalysis> =
            SignalOutcome::Ok(FraudDetector::score_text("free money"));
        let json = serde_json::to_value(&outcome).unwrap();
        assert!(json.get("score").is_some());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_failed_outcome_serializes_error_key() {
        let outcome: SignalOutcome<FraudAnalysis> = SignalOutcome::Failed {
            error: "fraud analysis failed: boom".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json.get("error").and_then(|v| v.as_str()),
            Some("fraud analysis failed: boom")
        );
    }

    #[test]
    fn test_failed_outcome_round_trips() {
        let json = r#"{"error": "nudity analysis failed"}"#;
        let outcome: SignalOutcome<NudityAnalysis> = serde_json::from_str(json).unwrap();
        assert!(outcome.is_failed());
        assert!(outcome.as_ok().is_none());
    }

    #[test]
    fn test_ok_outcome_accessors() {
        let analysis = NudityAnalysis {
            overall_score: Score::clamped(0.2),
            category: NudityCategory::None,
            detections: Vec::new(),
            frames_analyzed: 5,
        };
        let outcome = SignalOutcome::Ok(analysis);
        assert!(!outcome.is_failed());
        assert_eq!(outcome.as_ok().unwrap().frames_analyzed, 5);
    }
}
