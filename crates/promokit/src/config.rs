//! Orchestrator configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::AdPlatform;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
}

/// All orchestrator knobs. Every field has a default, so `{}` is a valid
/// config document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrchestratorConfig {
    /// Hard cap on concurrently active jobs; overflow is rejected, not
    /// queued.
    pub max_concurrent_jobs: usize,
    /// Reaper tick period; 0 disables the reaper.
    pub cleanup_interval_millis: u64,
    /// Age past which terminal jobs are evicted.
    pub job_ttl_millis: u64,
    pub timeouts: StageTimeouts,
    pub retry: RetryPolicy,
    /// Concurrent generations inside the packages / ads branches.
    pub intra_branch_concurrency: usize,
    /// Pause between generation chunks inside a branch.
    pub pacing_pause_millis: u64,
    /// Platform set substituted when a submission names none.
    pub default_ad_platforms: Vec<AdPlatform>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 5,
            cleanup_interval_millis: 600_000,
            job_ttl_millis: 3_600_000,
            timeouts: StageTimeouts::default(),
            retry: RetryPolicy::default(),
            intra_branch_concurrency: 2,
            pacing_pause_millis: 1_000,
            default_ad_platforms: AdPlatform::defaults(),
        }
    }
}

impl OrchestratorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_jobs == 0 {
            return Err(ConfigError::Validation {
                field: "concurrentJobs",
                message: "maxConcurrentJobs must be at least 1".to_string(),
            });
        }
        if self.intra_branch_concurrency == 0 {
            return Err(ConfigError::Validation {
                field: "intraBranchConcurrency",
                message: "intraBranchConcurrency must be at least 1".to_string(),
            });
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Validation {
                field: "retry",
                message: "retry.maxAttempts must be at least 1".to_string(),
            });
        }
        if self.retry.multiplier < 1.0 {
            return Err(ConfigError::Validation {
                field: "retry",
                message: "retry.multiplier must be at least 1.0".to_string(),
            });
        }
        Ok(())
    }

    /// Reaper period, or `None` when the reaper is disabled.
    pub fn cleanup_interval(&self) -> Option<Duration> {
        (self.cleanup_interval_millis > 0)
            .then(|| Duration::from_millis(self.cleanup_interval_millis))
    }

    pub fn job_ttl(&self) -> Duration {
        Duration::from_millis(self.job_ttl_millis)
    }

    pub fn pacing_pause(&self) -> Duration {
        Duration::from_millis(self.pacing_pause_millis)
    }
}

/// Per-stage deadlines for one external call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StageTimeouts {
    pub analysis_millis: u64,
    /// Deadline per synthesized image, not per branch.
    pub image_millis: u64,
    pub texts_millis: u64,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            analysis_millis: 30_000,
            image_millis: 60_000,
            texts_millis: 30_000,
        }
    }
}

impl StageTimeouts {
    pub fn analysis(&self) -> Duration {
        Duration::from_millis(self.analysis_millis)
    }

    pub fn image(&self) -> Duration {
        Duration::from_millis(self.image_millis)
    }

    pub fn texts(&self) -> Duration {
        Duration::from_millis(self.texts_millis)
    }
}

/// Exponential backoff policy for retryable capability failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
    /// Total attempts per external call, including the first.
    pub max_attempts: u32,
    pub initial_backoff_millis: u64,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_millis: 1_000,
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Backoff before the attempt following attempt number `attempt`
    /// (1-based): initial, initial×m, initial×m², …
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.saturating_sub(1) as i32);
        Duration::from_millis((self.initial_backoff_millis as f64 * factor) as u64)
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<OrchestratorConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<OrchestratorConfig, ConfigError> {
    let config: OrchestratorConfig = serde_json::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Provider credentials and model overrides, loaded from the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,
    #[serde(default = "default_openai_image_model")]
    pub openai_image_model: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            anthropic_api_key: None,
            openai_api_key: None,
            anthropic_model: default_anthropic_model(),
            openai_image_model: default_openai_image_model(),
        }
    }
}

fn default_anthropic_model() -> String {
    crate::capabilities::anthropic::DEFAULT_MODEL.to_string()
}

fn default_openai_image_model() -> String {
    crate::capabilities::openai::DEFAULT_MODEL.to_string()
}

impl ProviderSettings {
    /// Reads `ANTHROPIC_API_KEY`, `OPENAI_API_KEY`, and the model overrides
    /// from the environment (a `.env` file is honored when present).
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }
}
