use anyhow::Result;
use clap::{Arg, Command};
use std::path::PathBuf;
use tracing::{error, info, warn};

use video_moderator::batch::BatchModerator;
use video_moderator::config::{ModerationConfig, ModerationOverrides};
use video_moderator::engine::ModerationEngine;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("video_moderator=info,warn")
        .init();

    let matches = Command::new("Video Moderator")
        .version("0.1.0")
        .about("Heuristic video content moderation pipeline")
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("PATH")
                .help("Video file or directory of videos to moderate")
                .required(true),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Output file for batch results")
                .default_value("./moderation_results.json"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Moderation configuration file (TOML)"),
        )
        .arg(
            Arg::new("nudity-sensitivity")
                .long("nudity-sensitivity")
                .value_name("LEVEL")
                .help("Nudity sensitivity: lenient, moderate or strict"),
        )
        .arg(
            Arg::new("fraud-sensitivity")
                .long("fraud-sensitivity")
                .value_name("LEVEL")
                .help("Fraud sensitivity: lenient, moderate or strict"),
        )
        .arg(
            Arg::new("copyright-threshold")
                .long("copyright-threshold")
                .value_name("PERCENT")
                .help("Copyright rejection threshold (0-100)"),
        )
        .arg(
            Arg::new("reject-poor-quality")
                .long("reject-poor-quality")
                .help("Reject videos rated as poor technical quality")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("workers")
                .short('w')
                .long("workers")
                .value_name("NUM")
                .help("Number of parallel workers for directory mode (default: available cores, max 8)"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print the full moderation record as JSON")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let input = PathBuf::from(matches.get_one::<String>("input").unwrap());
    let output = PathBuf::from(matches.get_one::<String>("output").unwrap());
    let workers: usize = matches
        .get_one::<String>("workers")
        .map(|w| w.parse())
        .transpose()?
        .unwrap_or_else(|| num_cpus::get().min(8));
    let print_json = matches.get_flag("json");

    // Load configuration
    let base_config = if let Some(config_path) = matches.get_one::<String>("config") {
        ModerationConfig::from_file(std::path::Path::new(config_path))?
    } else {
        ModerationConfig::load().unwrap_or_else(|e| {
            warn!("Failed to load config, using defaults: {}", e);
            ModerationConfig::default()
        })
    };

    let overrides = ModerationOverrides {
        nudity_sensitivity: matches
            .get_one::<String>("nudity-sensitivity")
            .map(|s| s.parse())
            .transpose()?,
        fraud_sensitivity: matches
            .get_one::<String>("fraud-sensitivity")
            .map(|s| s.parse())
            .transpose()?,
        copyright_threshold: matches
            .get_one::<String>("copyright-threshold")
            .map(|s| s.parse())
            .transpose()?,
        reject_poor_quality: matches.get_flag("reject-poor-quality").then_some(true),
        ..Default::default()
    };

    let config = base_config.merged(&overrides);
    config.validate()?;

    if !input.exists() {
        error!("Input path does not exist: {}", input.display());
        return Err(anyhow::anyhow!("Input path not found"));
    }

    info!("🚀 Video Moderator starting...");
    info!(
        "🔧 Sensitivity: nudity={}, fraud={}, copyright threshold={}%",
        config.nudity_sensitivity, config.fraud_sensitivity, config.copyright_threshold
    );

    let engine = ModerationEngine::shared();
    let start_time = std::time::Instant::now();

    if input.is_dir() {
        let moderator = BatchModerator::new(engine.clone(), workers);
        let summary = moderator.moderate_directory(&input, &config).await?;
        BatchModerator::save_summary(&summary, &output).await?;

        info!(
            "🎉 Moderated {} videos in {:.2}s",
            summary.total,
            start_time.elapsed().as_secs_f64()
        );
        info!("✅ Approved: {}", summary.approved);
        info!("❌ Rejected: {}", summary.rejected);
        info!("💥 Failed: {}", summary.failed);

        let stats = engine.statistics().await;
        info!(
            "📊 Approval rate: {:.1}%, mean aggregation time: {:.3}s",
            stats.approval_rate * 100.0,
            stats.average_processing_time
        );
    } else {
        let record = engine.moderate(&input, &config).await?;

        if print_json {
            println!("{}", serde_json::to_string_pretty(&record)?);
        } else {
            println!("{}: {}", record.decision.verdict, record.decision.reasoning);
            println!("confidence: {}", record.decision.confidence);
        }

        info!(
            "🎉 Moderation completed in {:.2}s",
            start_time.elapsed().as_secs_f64()
        );
    }

    Ok(())
}
