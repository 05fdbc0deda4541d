// src/config.rs
//! Pipeline configuration: file (TOML or JSON) plus env overrides.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dedup::DEFAULT_NEAR_DUPLICATE_THRESHOLD;
use crate::ingest::adapters::AdapterSettings;
use crate::relevance::DEFAULT_MIN_SCORE;

pub const ENV_CONFIG_PATH: &str = "PIPELINE_CONFIG_PATH";
pub const ENV_MIN_SCORE: &str = "PIPELINE_MIN_SCORE";
pub const ENV_DEDUP_THRESHOLD: &str = "PIPELINE_DEDUP_THRESHOLD";
pub const ENV_MAX_ITEMS: &str = "PIPELINE_MAX_ITEMS";
pub const ENV_CONCURRENCY: &str = "PIPELINE_CONCURRENCY";

pub const DEFAULT_CONFIG_TOML: &str = "config/pipeline.toml";
pub const DEFAULT_CONFIG_JSON: &str = "config/pipeline.json";

pub const DEFAULT_USER_AGENT: &str =
    concat!("feed-sieve/", env!("CARGO_PKG_VERSION"), " (AI business news collector)");

fn default_max_items() -> usize {
    20
}
fn default_min_score() -> f32 {
    DEFAULT_MIN_SCORE
}
fn default_threshold() -> f32 {
    DEFAULT_NEAR_DUPLICATE_THRESHOLD
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_concurrency() -> usize {
    4
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

/// Repositories whose prereleases are reported anyway.
pub fn default_release_allowlist() -> Vec<String> {
    [
        "microsoft/semantic-kernel",
        "openai/openai-python",
        "langchain-ai/langchain",
        "google/generative-ai-python",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_max_items")]
    pub max_items_per_source: usize,
    #[serde(default = "default_min_score")]
    pub min_score: f32,
    #[serde(default = "default_threshold")]
    pub near_duplicate_threshold: f32,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Sources fetched at the same time.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_release_allowlist")]
    pub release_allowlist: Vec<String>,
    /// Empty means every known industry.
    #[serde(default)]
    pub target_industries: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_items_per_source: default_max_items(),
            min_score: default_min_score(),
            near_duplicate_threshold: default_threshold(),
            request_timeout_secs: default_timeout_secs(),
            concurrency: default_concurrency(),
            user_agent: default_user_agent(),
            release_allowlist: default_release_allowlist(),
            target_industries: Vec::new(),
        }
    }
}

impl PipelineConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn adapter_settings(&self) -> AdapterSettings {
        AdapterSettings {
            max_items: self.max_items_per_source,
            release_allowlist: self.release_allowlist.clone(),
        }
    }

    /// Load from an explicit path; format chosen by extension, TOML otherwise
    /// tried after JSON.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading pipeline config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg = parse_config(&content, &ext)
            .with_context(|| format!("parsing pipeline config {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// Resolution order:
    /// 1) $PIPELINE_CONFIG_PATH
    /// 2) config/pipeline.toml
    /// 3) config/pipeline.json
    /// 4) defaults
    ///
    /// Env overrides are applied on top in every case.
    pub fn load_default() -> Result<Self> {
        let base = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("PIPELINE_CONFIG_PATH points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else if Path::new(DEFAULT_CONFIG_TOML).exists() {
            Self::load_from(Path::new(DEFAULT_CONFIG_TOML))?
        } else if Path::new(DEFAULT_CONFIG_JSON).exists() {
            Self::load_from(Path::new(DEFAULT_CONFIG_JSON))?
        } else {
            Self::default()
        };
        Ok(base.with_env_overrides())
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = parse_unit_env(std::env::var(ENV_MIN_SCORE).ok()) {
            self.min_score = v;
        }
        if let Some(v) = parse_unit_env(std::env::var(ENV_DEDUP_THRESHOLD).ok()) {
            self.near_duplicate_threshold = v;
        }
        if let Some(v) = parse_positive_env(std::env::var(ENV_MAX_ITEMS).ok()) {
            self.max_items_per_source = v;
        }
        if let Some(v) = parse_positive_env(std::env::var(ENV_CONCURRENCY).ok()) {
            self.concurrency = v;
        }
        self
    }

    /// Clamp out-of-range values instead of rejecting the file.
    fn sanitized(mut self) -> Self {
        if !self.min_score.is_finite() {
            self.min_score = default_min_score();
        }
        self.min_score = self.min_score.clamp(0.0, 1.0);
        if !self.near_duplicate_threshold.is_finite() {
            self.near_duplicate_threshold = default_threshold();
        }
        self.near_duplicate_threshold = self.near_duplicate_threshold.clamp(0.0, 1.0);
        self.max_items_per_source = self.max_items_per_source.max(1);
        self.concurrency = self.concurrency.max(1);
        self.request_timeout_secs = self.request_timeout_secs.max(1);
        self
    }
}

fn parse_config(s: &str, hint_ext: &str) -> Result<PipelineConfig> {
    if hint_ext == "toml" {
        return Ok(toml::from_str(s)?);
    }
    if let Ok(v) = serde_json::from_str::<PipelineConfig>(s) {
        return Ok(v);
    }
    toml::from_str(s).map_err(|_| anyhow!("unsupported pipeline config format"))
}

/// A float in [0,1]; out-of-range values are clamped, garbage is ignored.
pub(crate) fn parse_unit_env(raw: Option<String>) -> Option<f32> {
    raw.and_then(|s| s.trim().parse::<f32>().ok())
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(0.0, 1.0))
}

pub(crate) fn parse_positive_env(raw: Option<String>) -> Option<usize> {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|v| *v > 0)
}
