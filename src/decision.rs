use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::analysis::{
    AnalysisReport, CopyrightAnalysis, FraudAnalysis, FraudType, NudityAnalysis, NudityCategory,
    QualityRating, SignalOutcome, TechnicalAnalysis,
};
use crate::config::ModerationConfig;
use crate::score::Score;

/// Final policy verdict for one video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Approved,
    Rejected,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Verdict::Approved => "approved",
            Verdict::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViolationKind {
    Nudity,
    Copyright,
    Fraud,
    Technical,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ViolationKind::Nudity => "nudity",
            ViolationKind::Copyright => "copyright",
            ViolationKind::Fraud => "fraud",
            ViolationKind::Technical => "technical",
        };
        f.write_str(name)
    }
}

/// Supporting evidence copied from the signal that crossed its threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ViolationEvidence {
    Nudity {
        score: Score,
        category: NudityCategory,
        timestamps: Vec<f64>,
    },
    Copyright {
        score: Score,
        audio_score: Score,
        visual_score: Score,
        potential_sources: Vec<String>,
    },
    Fraud {
        score: Score,
        indicators: Vec<String>,
        fraud_types: Vec<FraudType>,
    },
    Technical {
        quality_rating: QualityRating,
        issues: Vec<String>,
    },
}

/// A signal that crossed its sensitivity-derived threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    #[serde(rename = "type")]
    pub kind: ViolationKind,
    pub reason: String,
    pub severity_score: f64,
    #[serde(flatten)]
    pub evidence: ViolationEvidence,
}

/// The aggregated verdict with confidence and traceable reasoning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    #[serde(rename = "decision")]
    pub verdict: Verdict,
    pub confidence: Score,
    pub reasoning: String,
    pub violations: Vec<Violation>,
    pub overall_risk_score: f64,
    pub processing_time: Duration,
}

const APPROVED_REASONING: &str =
    "Video approved - all content checks passed within acceptable thresholds";

/// Maps signal scores to violations and combines them into one decision.
pub struct DecisionAggregator;

impl DecisionAggregator {
    /// Fixed severity for technical quality violations.
    const TECHNICAL_SEVERITY: f64 = 0.3;

    /// Run the aggregation once over a finished analysis report.
    ///
    /// `processing_time` covers the aggregation only; extractor time is the
    /// caller's to measure.
    pub fn decide(report: &AnalysisReport, config: &ModerationConfig) -> Decision {
        let start = Instant::now();

        let mut violations = Vec::new();

        if let Some(violation) = Self::check_nudity(&report.nudity, config) {
            violations.push(violation);
        }
        if let Some(violation) = Self::check_copyright(&report.copyright, config) {
            violations.push(violation);
        }
        if let Some(violation) = Self::check_fraud(&report.fraud, config) {
            violations.push(violation);
        }
        if let Some(violation) = Self::check_technical(&report.technical, config) {
            violations.push(violation);
        }

        let overall_risk_score: f64 = violations.iter().map(|v| v.severity_score).sum();
        let confidence = estimate_confidence(overall_risk_score, violations.len());

        let (verdict, reasoning) = if violations.is_empty() {
            (Verdict::Approved, APPROVED_REASONING.to_string())
        } else {
            let reasons: Vec<&str> = violations.iter().map(|v| v.reason.as_str()).collect();
            (
                Verdict::Rejected,
                format!("Video rejected due to: {}", reasons.join("; ")),
            )
        };

        Decision {
            verdict,
            confidence,
            reasoning,
            violations,
            overall_risk_score,
            processing_time: start.elapsed(),
        }
    }

    fn check_nudity(
        outcome: &SignalOutcome<NudityAnalysis>,
        config: &ModerationConfig,
    ) -> Option<Violation> {
        let analysis = Self::available(outcome, "nudity")?;

        let threshold = config.nudity_sensitivity.threshold();
        if !analysis.overall_score.breaches(threshold) {
            return None;
        }

        let mut reason = format!(
            "Nudity detected (score: {}, category: {})",
            analysis.overall_score, analysis.category
        );
        if !analysis.detections.is_empty() {
            let stamps: Vec<String> = analysis
                .detections
                .iter()
                .take(3)
                .map(|d| format!("{:.1}s", d.timestamp))
                .collect();
            reason.push_str(&format!(" at timestamps: {}", stamps.join(", ")));
        }

        Some(Violation {
            kind: ViolationKind::Nudity,
            reason,
            severity_score: (analysis.overall_score.value() * 1.5).min(1.0),
            evidence: ViolationEvidence::Nudity {
                score: analysis.overall_score,
                category: analysis.category,
                timestamps: analysis.detections.iter().map(|d| d.timestamp).collect(),
            },
        })
    }

    fn check_copyright(
        outcome: &SignalOutcome<CopyrightAnalysis>,
        config: &ModerationConfig,
    ) -> Option<Violation> {
        let analysis = Self::available(outcome, "copyright")?;

        if !analysis
            .overall_score
            .breaches(config.copyright_score_threshold())
        {
            return None;
        }

        let mut reason = format!(
            "Copyright infringement detected (score: {})",
            analysis.overall_score
        );
        if analysis.audio.score > analysis.visual.score {
            reason.push_str(&format!(
                " - primarily audio content (score: {})",
                analysis.audio.score
            ));
        } else {
            reason.push_str(&format!(
                " - primarily visual content (score: {})",
                analysis.visual.score
            ));
        }
        if !analysis.potential_sources.is_empty() {
            let sources: Vec<&str> = analysis
                .potential_sources
                .iter()
                .take(2)
                .map(String::as_str)
                .collect();
            reason.push_str(&format!(". Potential sources: {}", sources.join(", ")));
        }

        Some(Violation {
            kind: ViolationKind::Copyright,
            reason,
            severity_score: analysis.overall_score.value(),
            evidence: ViolationEvidence::Copyright {
                score: analysis.overall_score,
                audio_score: analysis.audio.score,
                visual_score: analysis.visual.score,
                potential_sources: analysis.potential_sources.clone(),
            },
        })
    }

    fn check_fraud(
        outcome: &SignalOutcome<FraudAnalysis>,
        config: &ModerationConfig,
    ) -> Option<Violation> {
        let analysis = Self::available(outcome, "fraud")?;

        let threshold = config.fraud_sensitivity.threshold();
        if !analysis.score.breaches(threshold) {
            return None;
        }

        let mut reason = format!("Fraudulent content detected (score: {})", analysis.score);
        if !analysis.fraud_types.is_empty() {
            let types: Vec<String> = analysis.fraud_types.iter().map(|t| t.to_string()).collect();
            reason.push_str(&format!(" - types: {}", types.join(", ")));
        }
        if !analysis.indicators.is_empty() {
            let indicators: Vec<&str> = analysis
                .indicators
                .iter()
                .take(3)
                .map(String::as_str)
                .collect();
            reason.push_str(&format!(". Indicators: {}", indicators.join(", ")));
        }

        Some(Violation {
            kind: ViolationKind::Fraud,
            reason,
            // fraud is weighted more severely than the raw signal
            severity_score: analysis.score.value() * 1.2,
            evidence: ViolationEvidence::Fraud {
                score: analysis.score,
                indicators: analysis.indicators.clone(),
                fraud_types: analysis.fraud_types.clone(),
            },
        })
    }

    fn check_technical(
        outcome: &SignalOutcome<TechnicalAnalysis>,
        config: &ModerationConfig,
    ) -> Option<Violation> {
        let analysis = Self::available(outcome, "technical")?;

        let mut issues = Vec::new();
        if analysis.is_blurry {
            issues.push("video is too blurry".to_string());
        }
        if analysis.is_too_dark {
            issues.push("video is too dark".to_string());
        }
        if analysis.is_too_bright {
            issues.push("video is overexposed".to_string());
        }
        if analysis.quality_rating == QualityRating::Poor && config.reject_poor_quality {
            issues.push("poor technical quality".to_string());
        }

        if issues.is_empty() {
            return None;
        }

        Some(Violation {
            kind: ViolationKind::Technical,
            reason: format!("Technical quality issues: {}", issues.join(", ")),
            severity_score: Self::TECHNICAL_SEVERITY,
            evidence: ViolationEvidence::Technical {
                quality_rating: analysis.quality_rating,
                issues,
            },
        })
    }

    /// A failed signal contributes nothing: no violation, zero risk.
    fn available<'a, T>(outcome: &'a SignalOutcome<T>, signal: &str) -> Option<&'a T> {
        match outcome {
            SignalOutcome::Ok(analysis) => Some(analysis),
            SignalOutcome::Failed { error } => {
                debug!("{} signal unavailable, skipping check: {}", signal, error);
                None
            }
        }
    }
}

/// Confidence in the verdict, derived from risk and violation count.
///
/// Approvals are always high-confidence, scaled slightly by residual risk;
/// rejections gain confidence with severity and with corroborating
/// violations. Both branches are monotone and bounded to [0, 1].
pub fn estimate_confidence(overall_risk_score: f64, violation_count: usize) -> Score {
    if violation_count == 0 {
        return Score::clamped(0.9 + (1.0 - overall_risk_score) * 0.1);
    }

    let severity_bonus = (overall_risk_score * 0.2).min(0.2);
    let violation_bonus = (violation_count as f64 * 0.05).min(0.1);
    Score::clamped(0.7 + severity_bonus + violation_bonus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AudioSignal, VisualSignal};
    use crate::config::{ConfigBuilder, Sensitivity};
    use crate::video::VideoInfo;
    use chrono::Utc;
    use std::path::PathBuf;
    use std::time::Duration;

    fn test_info() -> VideoInfo {
        VideoInfo {
            path: PathBuf::from("/uploads/test.mp4"),
            filename: "test.mp4".to_string(),
            duration: Duration::from_secs(60),
            width: 1280,
            height: 720,
            fps: 30.0,
            total_frames: 1800,
            format: "mp4".to_string(),
            file_size: 1024,
            file_hash: "d41d8cd98f00b204e9800998ecf8427e".to_string(),
            audio_streams: Vec::new(),
        }
    }

    fn nudity_signal(score: f64) -> SignalOutcome<NudityAnalysis> {
        SignalOutcome::Ok(NudityAnalysis {
            overall_score: Score::clamped(score),
            category: if score >= 0.7 {
                NudityCategory::Explicit
            } else {
                NudityCategory::None
            },
            detections: Vec::new(),
            frames_analyzed: 30,
        })
    }

    fn copyright_signal(audio: f64, visual: f64) -> SignalOutcome<CopyrightAnalysis> {
        let audio_score = Score::clamped(audio);
        let visual_score = Score::clamped(visual);
        SignalOutcome::Ok(CopyrightAnalysis {
            overall_score: audio_score.max(visual_score),
            confidence: Score::clamped(audio.max(visual) * 1.2),
            audio: AudioSignal {
                score: audio_score,
                duration_seconds: 60.0,
                has_music: audio > 0.5,
                reason: None,
            },
            visual: VisualSignal {
                score: visual_score,
                logo_frames: 0,
                frames_analyzed: 20,
            },
            potential_sources: Vec::new(),
        })
    }

    fn fraud_signal(score: f64) -> SignalOutcome<FraudAnalysis> {
        SignalOutcome::Ok(FraudAnalysis {
            score: Score::clamped(score),
            indicators: vec!["Suspicious keyword: free money".to_string()],
            extracted_text: "free money".to_string(),
            fraud_types: vec![FraudType::FinancialFraud],
        })
    }

    fn clean_technical() -> SignalOutcome<TechnicalAnalysis> {
        SignalOutcome::Ok(TechnicalAnalysis {
            sharpness: 400.0,
            brightness: 127.0,
            quality_rating: QualityRating::Excellent,
            is_blurry: false,
            is_too_dark: false,
            is_too_bright: false,
            frames_analyzed: 10,
        })
    }

    fn clean_blur() -> SignalOutcome<crate::analysis::BlurAnalysis> {
        SignalOutcome::Ok(crate::analysis::BlurAnalysis {
            requires_blur: false,
            regions: Vec::new(),
            total_regions: 0,
        })
    }

    fn report(
        nudity: SignalOutcome<NudityAnalysis>,
        copyright: SignalOutcome<CopyrightAnalysis>,
        fraud: SignalOutcome<FraudAnalysis>,
        technical: SignalOutcome<TechnicalAnalysis>,
    ) -> AnalysisReport {
        AnalysisReport {
            file_info: test_info(),
            nudity,
            copyright,
            fraud,
            blur: clean_blur(),
            technical,
            analyzed_at: Utc::now(),
        }
    }

    fn clean_report() -> AnalysisReport {
        report(
            nudity_signal(0.0),
            copyright_signal(0.0, 0.0),
            fraud_signal(0.0),
            clean_technical(),
        )
    }

    #[test]
    fn test_clean_report_approved() {
        let decision = DecisionAggregator::decide(&clean_report(), &ModerationConfig::default());
        assert_eq!(decision.verdict, Verdict::Approved);
        assert!(decision.violations.is_empty());
        assert_eq!(decision.overall_risk_score, 0.0);
        assert_eq!(decision.confidence.value(), 1.0);
        assert_eq!(decision.reasoning, APPROVED_REASONING);
    }

    #[test]
    fn test_rejected_iff_violations() {
        let config = ModerationConfig::default();
        let reports = [
            clean_report(),
            report(
                nudity_signal(0.9),
                copyright_signal(0.0, 0.0),
                fraud_signal(0.0),
                clean_technical(),
            ),
            report(
                nudity_signal(0.9),
                copyright_signal(0.9, 0.1),
                fraud_signal(0.9),
                clean_technical(),
            ),
            report(
                nudity_signal(0.1),
                copyright_signal(0.2, 0.1),
                fraud_signal(0.1),
                clean_technical(),
            ),
        ];

        for report in &reports {
            let decision = DecisionAggregator::decide(report, &config);
            assert_eq!(
                decision.verdict == Verdict::Rejected,
                !decision.violations.is_empty()
            );
        }
    }

    #[test]
    fn test_sensitivity_monotone_for_fixed_score() {
        let levels = [Sensitivity::Lenient, Sensitivity::Moderate, Sensitivity::Strict];
        let mut rejected = Vec::new();

        for level in levels {
            let config = ConfigBuilder::new().nudity_sensitivity(level).build().unwrap();
            let decision = DecisionAggregator::decide(
                &report(
                    nudity_signal(0.7),
                    copyright_signal(0.0, 0.0),
                    fraud_signal(0.0),
                    clean_technical(),
                ),
                &config,
            );
            rejected.push(decision.verdict == Verdict::Rejected);
        }

        // raising sensitivity never un-rejects: lenient < moderate < strict
        assert_eq!(rejected, vec![false, true, true]);
    }

    #[test]
    fn test_strict_nudity_rejection_reasoning() {
        let config = ConfigBuilder::new()
            .nudity_sensitivity(Sensitivity::Strict)
            .build()
            .unwrap();

        let nudity = SignalOutcome::Ok(NudityAnalysis {
            overall_score: Score::clamped(1.0),
            category: NudityCategory::Explicit,
            detections: vec![crate::analysis::FrameDetection {
                timestamp: 1.0,
                score: Score::MAX,
                frame_index: 30,
            }],
            frames_analyzed: 30,
        });

        let decision = DecisionAggregator::decide(
            &report(
                nudity,
                copyright_signal(0.0, 0.0),
                fraud_signal(0.0),
                clean_technical(),
            ),
            &config,
        );

        assert_eq!(decision.verdict, Verdict::Rejected);
        assert_eq!(decision.violations.len(), 1);
        assert_eq!(decision.violations[0].kind, ViolationKind::Nudity);
        assert!(decision.reasoning.contains("Nudity detected"));
        assert!(decision.reasoning.contains("1.0s"));
        assert_eq!(decision.violations[0].severity_score, 1.0);
    }

    #[test]
    fn test_copyright_threshold_from_config() {
        let at_default = DecisionAggregator::decide(
            &report(
                nudity_signal(0.0),
                copyright_signal(0.6, 0.1),
                fraud_signal(0.0),
                clean_technical(),
            ),
            &ModerationConfig::default(),
        );
        assert_eq!(at_default.verdict, Verdict::Rejected);
        assert!(at_default.reasoning.contains("primarily audio content"));

        let raised = ConfigBuilder::new().copyright_threshold(70).build().unwrap();
        let under_raised = DecisionAggregator::decide(
            &report(
                nudity_signal(0.0),
                copyright_signal(0.6, 0.1),
                fraud_signal(0.0),
                clean_technical(),
            ),
            &raised,
        );
        assert_eq!(under_raised.verdict, Verdict::Approved);
    }

    #[test]
    fn test_fraud_weighted_more_severely() {
        let config = ConfigBuilder::new()
            .fraud_sensitivity(Sensitivity::Strict)
            .build()
            .unwrap();
        let decision = DecisionAggregator::decide(
            &report(
                nudity_signal(0.0),
                copyright_signal(0.0, 0.0),
                fraud_signal(0.5),
                clean_technical(),
            ),
            &config,
        );
        assert_eq!(decision.violations.len(), 1);
        assert!((decision.violations[0].severity_score - 0.6).abs() < 1e-9);
        assert!(decision.reasoning.contains("financial fraud"));
    }

    #[test]
    fn test_technical_issues_single_violation() {
        let technical = SignalOutcome::Ok(TechnicalAnalysis {
            sharpness: 20.0,
            brightness: 30.0,
            quality_rating: QualityRating::Poor,
            is_blurry: true,
            is_too_dark: true,
            is_too_bright: false,
            frames_analyzed: 10,
        });
        let config = ConfigBuilder::new().reject_poor_quality(true).build().unwrap();

        let decision = DecisionAggregator::decide(
            &report(
                nudity_signal(0.0),
                copyright_signal(0.0, 0.0),
                fraud_signal(0.0),
                technical,
            ),
            &config,
        );

        assert_eq!(decision.violations.len(), 1);
        let violation = &decision.violations[0];
        assert_eq!(violation.kind, ViolationKind::Technical);
        assert_eq!(violation.severity_score, 0.3);
        assert!(violation.reason.contains("too blurry"));
        assert!(violation.reason.contains("too dark"));
        assert!(violation.reason.contains("poor technical quality"));
    }

    #[test]
    fn test_poor_rating_alone_needs_config_flag() {
        let technical = SignalOutcome::Ok(TechnicalAnalysis {
            sharpness: 120.0,
            brightness: 127.0,
            quality_rating: QualityRating::Poor,
            is_blurry: false,
            is_too_dark: false,
            is_too_bright: false,
            frames_analyzed: 10,
        });
        let decision = DecisionAggregator::decide(
            &report(
                nudity_signal(0.0),
                copyright_signal(0.0, 0.0),
                fraud_signal(0.0),
                technical,
            ),
            &ModerationConfig::default(),
        );
        assert_eq!(decision.verdict, Verdict::Approved);
    }

    #[test]
    fn test_failed_extractors_degrade_to_approval() {
        let report = AnalysisReport {
            file_info: test_info(),
            nudity: SignalOutcome::Failed {
                error: "nudity analysis failed: decode error".to_string(),
            },
            copyright: SignalOutcome::Failed {
                error: "copyright analysis failed: decode error".to_string(),
            },
            fraud: SignalOutcome::Failed {
                error: "fraud analysis failed: decode error".to_string(),
            },
            blur: SignalOutcome::Failed {
                error: "blur analysis failed: decode error".to_string(),
            },
            technical: SignalOutcome::Failed {
                error: "technical analysis failed: decode error".to_string(),
            },
            analyzed_at: Utc::now(),
        };

        let decision = DecisionAggregator::decide(&report, &ModerationConfig::default());
        assert_eq!(decision.verdict, Verdict::Approved);
        assert_eq!(decision.overall_risk_score, 0.0);
    }

    #[test]
    fn test_risk_is_sum_of_severities() {
        let config = ConfigBuilder::new()
            .nudity_sensitivity(Sensitivity::Strict)
            .fraud_sensitivity(Sensitivity::Strict)
            .build()
            .unwrap();
        let decision = DecisionAggregator::decide(
            &report(
                nudity_signal(1.0),
                copyright_signal(0.0, 0.0),
                fraud_signal(1.0),
                clean_technical(),
            ),
            &config,
        );
        // nudity min(1.5, 1.0) + fraud 1.2
        assert!((decision.overall_risk_score - 2.2).abs() < 1e-9);
        assert!(decision.reasoning.contains("; "));
    }

    #[test]
    fn test_confidence_bounded_for_all_inputs() {
        for risk_step in 0..50 {
            let risk = risk_step as f64 * 0.2;
            for count in 0..6 {
                let confidence = estimate_confidence(risk, count);
                assert!(confidence.value() >= 0.0 && confidence.value() <= 1.0);
            }
        }
    }

    #[test]
    fn test_confidence_monotone_in_risk_and_count() {
        let low = estimate_confidence(0.2, 1);
        let high = estimate_confidence(0.8, 1);
        assert!(high.value() >= low.value());

        let few = estimate_confidence(0.5, 1);
        let many = estimate_confidence(0.5, 3);
        assert!(many.value() >= few.value());
    }

    #[test]
    fn test_violation_serialization_shape() {
        let config = ConfigBuilder::new()
            .nudity_sensitivity(Sensitivity::Strict)
            .build()
            .unwrap();
        let decision = DecisionAggregator::decide(
            &report(
                nudity_signal(0.9),
                copyright_signal(0.0, 0.0),
                fraud_signal(0.0),
                clean_technical(),
            ),
            &config,
        );

        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["decision"], "rejected");
        assert_eq!(json["violations"][0]["type"], "nudity");
        assert!(json["violations"][0]["severity_score"].is_number());
        assert!(json["violations"][0]["category"].is_string());
        assert!(json["overall_risk_score"].is_number());
    }
}
