use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::score::Score;
use crate::video::{FrameSampler, SampledFrame};

/// Scam phrasing scanned for in on-screen text.
const FRAUD_KEYWORDS: [&str; 17] = [
    "free money",
    "get rich quick",
    "guaranteed income",
    "work from home",
    "click here",
    "limited time",
    "act now",
    "urgent",
    "congratulations",
    "you have won",
    "claim your prize",
    "no risk",
    "easy money",
    "investment opportunity",
    "double your money",
    "bitcoin",
    "cryptocurrency",
];

const FINANCIAL_MARKERS: [&str; 4] = ["money", "income", "rich", "investment"];
const PRIZE_MARKERS: [&str; 3] = ["prize", "won", "congratulations"];
const PHISHING_MARKERS: [&str; 3] = ["click", "link", "urgent"];

/// Maximum extracted text carried in the report.
const TEXT_PREVIEW_LIMIT: usize = 500;

/// On-screen text extraction capability.
///
/// Contract: given a frame, return zero or more text strings. The default
/// implementation is a stub so a real OCR engine can plug in without
/// touching score ranges or aggregation semantics.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, frame: &SampledFrame) -> Result<Vec<String>>;
}

/// Stub recognizer used when no text engine is wired in.
#[derive(Debug, Clone, Default)]
pub struct NoopTextRecognizer;

#[async_trait]
impl TextRecognizer for NoopTextRecognizer {
    async fn recognize(&self, _frame: &SampledFrame) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FraudType {
    FinancialFraud,
    PrizeScam,
    PhishingAttempt,
}

impl fmt::Display for FraudType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FraudType::FinancialFraud => "financial fraud",
            FraudType::PrizeScam => "prize scam",
            FraudType::PhishingAttempt => "phishing attempt",
        };
        f.write_str(name)
    }
}

/// Fraud signal over the text extracted from sampled frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudAnalysis {
    pub score: Score,
    pub indicators: Vec<String>,
    pub extracted_text: String,
    pub fraud_types: Vec<FraudType>,
}

/// Text-pattern keyword heuristic over extracted on-screen text.
pub struct FraudDetector {
    recognizer: Arc<dyn TextRecognizer>,
}

impl FraudDetector {
    pub const SAMPLE_TARGET: usize = 10;

    pub fn new(recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self { recognizer }
    }

    pub async fn analyze(&self, sampler: &FrameSampler) -> Result<FraudAnalysis> {
        let frames = sampler.sample_frames(Self::SAMPLE_TARGET).await?;

        let mut extracted = String::new();
        for frame in &frames {
            for piece in self.recognizer.recognize(frame).await? {
                if !extracted.is_empty() {
                    extracted.push(' ');
                }
                extracted.push_str(&piece);
            }
        }

        Ok(Self::score_text(&extracted))
    }

    /// Scan text for fraud indicators; split out for synthetic-input tests.
    pub fn score_text(text: &str) -> FraudAnalysis {
        let indicators = Self::detect_indicators(text);
        let fraud_types = Self::classify(&indicators);

        FraudAnalysis {
            score: Score::clamped(indicators.len() as f64 * 0.2),
            indicators,
            extracted_text: text.chars().take(TEXT_PREVIEW_LIMIT).collect(),
            fraud_types,
        }
    }

    fn detect_indicators(text: &str) -> Vec<String> {
        let mut indicators = Vec::new();
        let text_lower = text.to_lowercase();

        for keyword in FRAUD_KEYWORDS {
            if text_lower.contains(keyword) {
                indicators.push(format!("Suspicious keyword: {}", keyword));
            }
        }

        if !text.is_empty() {
            let caps = text.chars().filter(|c| c.is_uppercase()).count();
            let caps_ratio = caps as f64 / text.chars().count() as f64;
            if caps_ratio > 0.3 {
                indicators.push("Excessive use of capital letters".to_string());
            }
        }

        if text.matches('!').count() > 3 {
            indicators.push("Excessive exclamation marks".to_string());
        }

        indicators
    }

    /// Many-to-one mapping of indicators into fraud families; an indicator
    /// may match several families, duplicates are dropped.
    fn classify(indicators: &[String]) -> Vec<FraudType> {
        let mut fraud_types = Vec::new();

        for indicator in indicators {
            let lower = indicator.to_lowercase();
            let mut push = |fraud_type: FraudType| {
                if !fraud_types.contains(&fraud_type) {
                    fraud_types.push(fraud_type);
                }
            };

            if FINANCIAL_MARKERS.iter().any(|m| lower.contains(m)) {
                push(FraudType::FinancialFraud);
            }
            if PRIZE_MARKERS.iter().any(|m| lower.contains(m)) {
                push(FraudType::PrizeScam);
            }
            if PHISHING_MARKERS.iter().any(|m| lower.contains(m)) {
                push(FraudType::PhishingAttempt);
            }
        }

        fraud_types
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_scores_zero() {
        let analysis = FraudDetector::score_text("a quiet walk through the park");
        assert_eq!(analysis.score, Score::ZERO);
        assert!(analysis.indicators.is_empty());
        assert!(analysis.fraud_types.is_empty());
    }

    #[test]
    fn test_empty_text_scores_zero() {
        let analysis = FraudDetector::score_text("");
        assert_eq!(analysis.score, Score::ZERO);
        assert!(analysis.indicators.is_empty());
    }

    #[test]
    fn test_scam_text_accumulates_indicators() {
        let analysis = FraudDetector::score_text("FREE MONEY!!!! Act now and click here");
        // three keywords plus the exclamation marks
        assert!(analysis.indicators.len() >= 3);
        assert!(analysis.score.value() >= 0.6);
        assert!(analysis.fraud_types.contains(&FraudType::FinancialFraud));
        assert!(analysis.fraud_types.contains(&FraudType::PhishingAttempt));
    }

    #[test]
    fn test_caps_ratio_indicator() {
        let analysis = FraudDetector::score_text("CONGRATULATIONS WINNER");
        assert!(analysis
            .indicators
            .iter()
            .any(|i| i.contains("capital letters")));
        assert!(analysis.fraud_types.contains(&FraudType::PrizeScam));
    }

    #[test]
    fn test_fraud_types_deduplicated() {
        let analysis = FraudDetector::score_text("easy money and free money and double your money");
        let financial = analysis
            .fraud_types
            .iter()
            .filter(|t| **t == FraudType::FinancialFraud)
            .count();
        assert_eq!(financial, 1);
    }

    #[test]
    fn test_extracted_text_truncated() {
        let long_text = "x".repeat(2000);
        let analysis = FraudDetector::score_text(&long_text);
        assert_eq!(analysis.extracted_text.chars().count(), 500);
    }

    #[tokio::test]
    async fn test_noop_recognizer_returns_no_text() {
        let recognizer = NoopTextRecognizer;
        let frame = SampledFrame {
            index: 0,
            timestamp: 0.0,
            image: image::RgbImage::new(8, 8),
        };
        assert!(recognizer.recognize(&frame).await.unwrap().is_empty());
    }
}
