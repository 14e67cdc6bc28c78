use crate::error::ModerationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Violation sensitivity level for the nudity and fraud signals.
///
/// Each level selects a fixed score threshold; stricter levels reject at
/// lower signal scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    Lenient,
    Moderate,
    Strict,
}

impl Sensitivity {
    /// Score threshold at which the signal becomes a violation.
    pub fn threshold(self) -> f64 {
        match self {
            Sensitivity::Lenient => 0.8,
            Sensitivity::Moderate => 0.6,
            Sensitivity::Strict => 0.4,
        }
    }
}

impl FromStr for Sensitivity {
    type Err = ModerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lenient" => Ok(Sensitivity::Lenient),
            "moderate" => Ok(Sensitivity::Moderate),
            "strict" => Ok(Sensitivity::Strict),
            other => Err(ModerationError::ConfigInvalid(format!(
                "unknown sensitivity '{}' (expected lenient, moderate or strict)",
                other
            ))),
        }
    }
}

impl fmt::Display for Sensitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Sensitivity::Lenient => "lenient",
            Sensitivity::Moderate => "moderate",
            Sensitivity::Strict => "strict",
        };
        f.write_str(name)
    }
}

/// Per-request moderation configuration.
///
/// Immutable once constructed; a fresh instance is built per request from
/// the defaults merged with caller overrides. Unknown keys in config files
/// are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationConfig {
    /// Threshold level for the nudity signal
    pub nudity_sensitivity: Sensitivity,

    /// Threshold level for the fraud signal
    pub fraud_sensitivity: Sensitivity,

    /// Copyright rejection threshold in percent (0-100)
    pub copyright_threshold: u8,

    /// Reject videos whose technical quality rating is "poor"
    pub reject_poor_quality: bool,

    /// Request face redaction regions (evidence-only, consumed downstream)
    pub blur_faces: bool,

    /// Request violence redaction regions (evidence-only, consumed downstream)
    pub blur_violence: bool,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            nudity_sensitivity: Sensitivity::Moderate,
            fraud_sensitivity: Sensitivity::Strict,
            copyright_threshold: 60,
            reject_poor_quality: false,
            blur_faces: true,
            blur_violence: true,
        }
    }
}

/// Partial configuration supplied by a caller; unset fields keep defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationOverrides {
    pub nudity_sensitivity: Option<Sensitivity>,
    pub fraud_sensitivity: Option<Sensitivity>,
    pub copyright_threshold: Option<u8>,
    pub reject_poor_quality: Option<bool>,
    pub blur_faces: Option<bool>,
    pub blur_violence: Option<bool>,
}

impl ModerationConfig {
    /// Load configuration from the first readable file in the usual spots.
    pub fn load() -> Result<Self, ModerationError> {
        let config_paths = [
            "video-moderator.toml",
            "config/video-moderator.toml",
            "/etc/video-moderator/config.toml",
        ];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str::<ModerationConfig>(&config_str) {
                    Ok(config) => {
                        config.validate()?;
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Self::from_env()
    }

    /// Load configuration from a specific TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ModerationError> {
        let config_str = std::fs::read_to_string(path)?;
        let config: ModerationConfig = toml::from_str(&config_str)
            .map_err(|e| ModerationError::ConfigInvalid(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from defaults overridden by environment variables.
    pub fn from_env() -> Result<Self, ModerationError> {
        let mut config = Self::default();

        if let Ok(level) = std::env::var("VIDEO_MODERATOR_NUDITY_SENSITIVITY") {
            config.nudity_sensitivity = level.parse()?;
        }
        if let Ok(level) = std::env::var("VIDEO_MODERATOR_FRAUD_SENSITIVITY") {
            config.fraud_sensitivity = level.parse()?;
        }
        if let Ok(threshold) = std::env::var("VIDEO_MODERATOR_COPYRIGHT_THRESHOLD") {
            config.copyright_threshold = threshold.parse().map_err(|_| {
                ModerationError::ConfigInvalid(format!("bad copyright threshold '{}'", threshold))
            })?;
        }
        if let Ok(flag) = std::env::var("VIDEO_MODERATOR_REJECT_POOR_QUALITY") {
            config.reject_poor_quality = flag == "1" || flag.eq_ignore_ascii_case("true");
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply caller overrides on top of this configuration.
    pub fn merged(&self, overrides: &ModerationOverrides) -> Self {
        Self {
            nudity_sensitivity: overrides.nudity_sensitivity.unwrap_or(self.nudity_sensitivity),
            fraud_sensitivity: overrides.fraud_sensitivity.unwrap_or(self.fraud_sensitivity),
            copyright_threshold: overrides
                .copyright_threshold
                .unwrap_or(self.copyright_threshold),
            reject_poor_quality: overrides
                .reject_poor_quality
                .unwrap_or(self.reject_poor_quality),
            blur_faces: overrides.blur_faces.unwrap_or(self.blur_faces),
            blur_violence: overrides.blur_violence.unwrap_or(self.blur_violence),
        }
    }

    /// Copyright threshold mapped into score space.
    pub fn copyright_score_threshold(&self) -> f64 {
        f64::from(self.copyright_threshold) / 100.0
    }

    /// Validate configuration ranges.
    pub fn validate(&self) -> Result<(), ModerationError> {
        if self.copyright_threshold > 100 {
            return Err(ModerationError::ConfigInvalid(format!(
                "copyright_threshold must be within 0-100, got {}",
                self.copyright_threshold
            )));
        }
        Ok(())
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), ModerationError> {
        let config_str = toml::to_string_pretty(self)
            .map_err(|e| ModerationError::ConfigInvalid(e.to_string()))?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }
}

/// Builder for programmatic config creation.
pub struct ConfigBuilder {
    config: ModerationConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ModerationConfig::default(),
        }
    }

    pub fn nudity_sensitivity(mut self, level: Sensitivity) -> Self {
        self.config.nudity_sensitivity = level;
        self
    }

    pub fn fraud_sensitivity(mut self, level: Sensitivity) -> Self {
        self.config.fraud_sensitivity = level;
        self
    }

    pub fn copyright_threshold(mut self, percent: u8) -> Self {
        self.config.copyright_threshold = percent;
        self
    }

    pub fn reject_poor_quality(mut self, reject: bool) -> Self {
        self.config.reject_poor_quality = reject;
        self
    }

    pub fn blur_faces(mut self, blur: bool) -> Self {
        self.config.blur_faces = blur;
        self
    }

    pub fn blur_violence(mut self, blur: bool) -> Self {
        self.config.blur_violence = blur;
        self
    }

    pub fn build(self) -> Result<ModerationConfig, ModerationError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
