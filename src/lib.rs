//! Video content moderation pipeline.
//!
//! Turns an uploaded video file into an approve/reject decision with a
//! confidence score and human-readable reasoning, built from five
//! independent heuristic content signals: nudity, copyright, fraud text,
//! blur requirements and technical quality. The HTTP layer, result store
//! and dashboards are external collaborators; they call
//! [`ModerationEngine::moderate`] and read the returned record.

pub mod analysis;
pub mod batch;
pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod score;
pub mod video;

// Re-export main types for easy access
pub use crate::analysis::{AnalysisReport, SignalOutcome, VideoAnalyzer};
pub use crate::batch::{BatchModerator, BatchSummary};
pub use crate::config::{ConfigBuilder, ModerationConfig, ModerationOverrides, Sensitivity};
pub use crate::decision::{
    Decision, DecisionAggregator, Verdict, Violation, ViolationKind,
};
pub use crate::engine::{ModerationEngine, ModerationRecord, ModerationStatistics};
pub use crate::error::ModerationError;
pub use crate::score::Score;
pub use crate::video::{FrameSampler, SampledFrame, VideoInfo};
