//! End-to-end pipeline checks over synthetic frames: extractor output fed
//! through the decision aggregator, using only the public API.

use chrono::Utc;
use image::{Rgb, RgbImage};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use video_moderator::analysis::{
    BlurRequirementDetector, CopyrightDetector, FraudDetector, HeuristicFaceDetector,
    NudityCategory, NudityDetector, QualityRating, SignalOutcome, TechnicalQualityDetector,
};
use video_moderator::{
    AnalysisReport, ConfigBuilder, DecisionAggregator, ModerationConfig, ModerationEngine,
    SampledFrame, Sensitivity, Verdict, VideoInfo, ViolationKind,
};

fn skin_frame(index: u64, timestamp: f64) -> SampledFrame {
    // well above 60% of pixels inside the skin-tone band
    let mut image = RgbImage::from_pixel(80, 80, Rgb([30, 30, 30]));
    for y in 0..80 {
        for x in 0..64 {
            image.put_pixel(x, y, Rgb([200, 120, 90]));
        }
    }
    SampledFrame {
        index,
        timestamp,
        image,
    }
}

fn neutral_frame(index: u64, timestamp: f64) -> SampledFrame {
    let image = RgbImage::from_fn(80, 80, |x, y| {
        if (x + y) % 2 == 0 {
            Rgb([77, 77, 77])
        } else {
            Rgb([177, 177, 177])
        }
    });
    SampledFrame {
        index,
        timestamp,
        image,
    }
}

fn file_info() -> VideoInfo {
    VideoInfo {
        path: PathBuf::from("/uploads/upload.mp4"),
        filename: "upload.mp4".to_string(),
        duration: Duration::from_secs(10),
        width: 80,
        height: 80,
        fps: 30.0,
        total_frames: 300,
        format: "mp4".to_string(),
        file_size: 4096,
        file_hash: "0123456789abcdef0123456789abcdef".to_string(),
        audio_streams: Vec::new(),
    }
}

fn report_from_frames(frames: &[SampledFrame]) -> AnalysisReport {
    let blur_detector = BlurRequirementDetector::new(Arc::new(HeuristicFaceDetector));
    AnalysisReport {
        file_info: file_info(),
        nudity: SignalOutcome::Ok(NudityDetector::score_frames(frames)),
        copyright: SignalOutcome::Ok(CopyrightDetector::score_signals(frames, None, "upload.mp4")),
        fraud: SignalOutcome::Ok(FraudDetector::score_text("")),
        blur: SignalOutcome::Ok(blur_detector.score_frames(frames)),
        technical: SignalOutcome::Ok(TechnicalQualityDetector::score_frames(frames)),
        analyzed_at: Utc::now(),
    }
}

#[test]
fn skin_heavy_video_rejected_under_strict_sensitivity() {
    let frames: Vec<SampledFrame> = (0..10).map(|i| skin_frame(i * 30, i as f64)).collect();
    let report = report_from_frames(&frames);

    // the extractor saw explicit skin coverage
    let nudity = report.nudity.as_ok().unwrap();
    assert!(nudity.overall_score.value() >= 0.4);
    assert_eq!(nudity.category, NudityCategory::Explicit);
    assert!(!nudity.detections.is_empty());

    let config = ConfigBuilder::new()
        .nudity_sensitivity(Sensitivity::Strict)
        .build()
        .unwrap();
    let decision = DecisionAggregator::decide(&report, &config);

    assert_eq!(decision.verdict, Verdict::Rejected);
    assert!(decision
        .violations
        .iter()
        .any(|v| v.kind == ViolationKind::Nudity));
    assert!(decision.reasoning.contains("Nudity detected"));
    assert!(decision.confidence.value() >= 0.7 && decision.confidence.value() <= 1.0);
}

#[test]
fn neutral_video_approved_with_full_confidence() {
    let frames: Vec<SampledFrame> = (0..10).map(|i| neutral_frame(i * 30, i as f64)).collect();
    let report = report_from_frames(&frames);

    let technical = report.technical.as_ok().unwrap();
    assert_eq!(technical.quality_rating, QualityRating::Excellent);
    assert!(!technical.is_blurry);

    let decision = DecisionAggregator::decide(&report, &ModerationConfig::default());
    assert_eq!(decision.verdict, Verdict::Approved);
    assert!(decision.violations.is_empty());
    assert_eq!(decision.confidence.value(), 1.0);
    assert_eq!(decision.overall_risk_score, 0.0);
}

#[tokio::test]
async fn statistics_reset_is_observable_through_public_api() {
    let engine = ModerationEngine::new();

    engine.clear_history().await;
    let stats = engine.statistics().await;

    assert_eq!(stats.total_processed, 0);
    assert_eq!(stats.approval_rate, 0.0);
    assert_eq!(stats.rejection_rate, 0.0);
    assert_eq!(stats.average_processing_time, 0.0);
    assert!(engine.recent_decisions(5).await.is_empty());
}
