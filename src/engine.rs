use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::analysis::{AnalysisReport, VideoAnalyzer};
use crate::config::ModerationConfig;
use crate::decision::{DecisionAggregator, Decision, Verdict, ViolationKind};
use crate::error::ModerationError;

/// One completed moderation: the decision plus everything needed to audit
/// it. Serialized field names are the stable external contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationRecord {
    pub video_path: PathBuf,
    #[serde(flatten)]
    pub decision: Decision,
    pub analysis_details: AnalysisReport,
    pub config_used: ModerationConfig,
    pub processed_at: DateTime<Utc>,
}

/// Read-only summary over the engine's decision history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationStatistics {
    pub total_processed: usize,
    pub approved: usize,
    pub rejected: usize,
    pub approval_rate: f64,
    pub rejection_rate: f64,
    pub violation_breakdown: HashMap<ViolationKind, usize>,
    /// Mean aggregation time in seconds
    pub average_processing_time: f64,
    pub last_updated: DateTime<Utc>,
}

/// Orchestrates analysis and aggregation and keeps the decision history.
///
/// The history is the engine's only mutable state; it lives behind one
/// RwLock so concurrent `moderate` calls never interleave partial writes.
/// Nothing is evicted implicitly; `clear_history` is the only reset.
pub struct ModerationEngine {
    analyzer: VideoAnalyzer,
    history: RwLock<Vec<ModerationRecord>>,
}

impl ModerationEngine {
    pub fn new() -> Self {
        Self::with_analyzer(VideoAnalyzer::new())
    }

    pub fn with_analyzer(analyzer: VideoAnalyzer) -> Self {
        Self {
            analyzer,
            history: RwLock::new(Vec::new()),
        }
    }

    /// Shared engine handle for concurrent callers.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Moderate one video: analyze, decide, record.
    pub async fn moderate(
        &self,
        path: &Path,
        config: &ModerationConfig,
    ) -> Result<ModerationRecord, ModerationError> {
        config.validate()?;

        let report = self.analyzer.analyze(path).await?;
        let decision = DecisionAggregator::decide(&report, config);

        info!(
            "⚖️ {}: {} (confidence {}, {} violations)",
            report.file_info.filename,
            decision.verdict,
            decision.confidence,
            decision.violations.len()
        );

        let record = ModerationRecord {
            video_path: path.to_path_buf(),
            decision,
            analysis_details: report,
            config_used: config.clone(),
            processed_at: Utc::now(),
        };

        self.history.write().await.push(record.clone());

        Ok(record)
    }

    /// Summary statistics over all decisions since process start.
    pub async fn statistics(&self) -> ModerationStatistics {
        let history = self.history.read().await;

        if history.is_empty() {
            return ModerationStatistics {
                total_processed: 0,
                approved: 0,
                rejected: 0,
                approval_rate: 0.0,
                rejection_rate: 0.0,
                violation_breakdown: HashMap::new(),
                average_processing_time: 0.0,
                last_updated: Utc::now(),
            };
        }

        let total = history.len();
        let approved = history
            .iter()
            .filter(|r| r.decision.verdict == Verdict::Approved)
            .count();
        let rejected = total - approved;

        let mut violation_breakdown: HashMap<ViolationKind, usize> = HashMap::new();
        let mut processing_total = 0.0;

        for record in history.iter() {
            processing_total += record.decision.processing_time.as_secs_f64();
            for violation in &record.decision.violations {
                *violation_breakdown.entry(violation.kind).or_insert(0) += 1;
            }
        }

        ModerationStatistics {
            total_processed: total,
            approved,
            rejected,
            approval_rate: approved as f64 / total as f64,
            rejection_rate: rejected as f64 / total as f64,
            violation_breakdown,
            average_processing_time: processing_total / total as f64,
            last_updated: Utc::now(),
        }
    }

    /// Most recent decisions, newest last.
    pub async fn recent_decisions(&self, limit: usize) -> Vec<ModerationRecord> {
        let history = self.history.read().await;
        let start = history.len().saturating_sub(limit);
        history[start..].to_vec()
    }

    /// Export the full decision history as pretty JSON.
    pub async fn export_decisions_json(&self) -> serde_json::Result<String> {
        let history = self.history.read().await;
        serde_json::to_string_pretty(&*history)
    }

    /// Drop the decision history. Explicit only; there is no implicit
    /// eviction.
    pub async fn clear_history(&self) {
        self.history.write().await.clear();
        info!("🧹 Moderation history cleared");
    }
}

impl Default for ModerationEngine {
    fn default() -> Self {
        Self::new()
    }
}
