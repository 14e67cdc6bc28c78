use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tracing::{error, info, warn};

use crate::config::ModerationConfig;
use crate::decision::Verdict;
use crate::engine::{ModerationEngine, ModerationRecord};
use crate::video::discover_videos;

/// A video the batch could not moderate at all (unreadable source).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFailure {
    pub video_path: PathBuf,
    pub error: String,
}

/// Results of one batch run over a directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub approved: usize,
    pub rejected: usize,
    pub failed: usize,
    pub total_time: Duration,
    pub records: Vec<ModerationRecord>,
    pub failures: Vec<BatchFailure>,
}

/// Moderates every video under a directory with a bounded worker pool.
pub struct BatchModerator {
    engine: Arc<ModerationEngine>,
    worker_semaphore: Arc<Semaphore>,
    max_concurrent: usize,
}

impl BatchModerator {
    pub fn new(engine: Arc<ModerationEngine>, max_workers: usize) -> Self {
        let workers = max_workers.max(1);
        info!("🔧 Initializing batch moderator with {} workers", workers);
        Self {
            engine,
            worker_semaphore: Arc::new(Semaphore::new(workers)),
            max_concurrent: workers,
        }
    }

    /// Discover and moderate all videos under `input_dir`.
    pub async fn moderate_directory(
        &self,
        input_dir: &Path,
        config: &ModerationConfig,
    ) -> Result<BatchSummary> {
        let start_time = Instant::now();

        info!("🚀 Starting batch moderation of {}", input_dir.display());

        let video_paths = discover_videos(input_dir).await?;

        if video_paths.is_empty() {
            warn!("No videos found in {}", input_dir.display());
            return Ok(BatchSummary {
                total: 0,
                approved: 0,
                rejected: 0,
                failed: 0,
                total_time: start_time.elapsed(),
                records: Vec::new(),
                failures: Vec::new(),
            });
        }

        info!("📹 Found {} videos to moderate", video_paths.len());

        let (tx, mut rx) = mpsc::channel(self.max_concurrent);
        let total_videos = video_paths.len();

        for (index, video_path) in video_paths.into_iter().enumerate() {
            let engine = Arc::clone(&self.engine);
            let config = config.clone();
            let tx = tx.clone();
            let semaphore = Arc::clone(&self.worker_semaphore);

            tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return;
                };

                info!(
                    "📹 Moderating video {}/{}: {}",
                    index + 1,
                    total_videos,
                    video_path.display()
                );

                let result = engine
                    .moderate(&video_path, &config)
                    .await
                    .map_err(|e| BatchFailure {
                        video_path: video_path.clone(),
                        error: e.to_string(),
                    });

                if tx.send(result).await.is_err() {
                    error!("Failed to send result for {}", video_path.display());
                }
            });
        }

        // close the channel once all workers hold their own sender
        drop(tx);

        let mut records = Vec::new();
        let mut failures = Vec::new();

        while let Some(result) = rx.recv().await {
            match result {
                Ok(record) => records.push(record),
                Err(failure) => {
                    warn!(
                        "❌ Could not moderate {}: {}",
                        failure.video_path.display(),
                        failure.error
                    );
                    failures.push(failure);
                }
            }
        }

        let approved = records
            .iter()
            .filter(|r| r.decision.verdict == Verdict::Approved)
            .count();
        let rejected = records.len() - approved;

        let summary = BatchSummary {
            total: total_videos,
            approved,
            rejected,
            failed: failures.len(),
            total_time: start_time.elapsed(),
            records,
            failures,
        };

        info!(
            "🎉 Batch finished: {} approved, {} rejected, {} failed in {:.2}s",
            summary.approved,
            summary.rejected,
            summary.failed,
            summary.total_time.as_secs_f64()
        );

        Ok(summary)
    }

    /// Save a batch summary as pretty JSON.
    pub async fn save_summary(summary: &BatchSummary, output_path: &Path) -> Result<()> {
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json_data = serde_json::to_string_pretty(summary)?;
        tokio::fs::write(output_path, json_data).await?;
        info!("💾 Results saved to: {}", output_path.display());
        Ok(())
    }
}
