//! Configuration resolution for candor
//!
//! Two-tier resolution with ENV -> TOML priority, warning when a value is
//! present in multiple sources. All analysis tuning constants live in one
//! named `AnalysisParams` record so tests and operators tune them in one
//! place instead of chasing scattered literals.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::models::InterviewScript;

/// Analysis tuning parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisParams {
    /// Minimum classifier confidence to adopt a section position
    pub section_threshold: f64,
    /// Minimum classifier confidence to adopt a subsection position
    pub subsection_threshold: f64,
    /// Minimum classifier confidence to latch a subsection complete
    pub completion_threshold: f64,
    /// Run profile extraction every Nth chunk (and always on chunk 1)
    pub extraction_cadence: u64,
    /// Bound on the rolling context window used by the local scan
    pub rolling_window_size: usize,
    /// Bound on the larger window used by profile extraction
    pub extraction_window_size: usize,
    /// Minimum confidence for a new scalar fact to displace an old one
    pub min_confidence: f64,
    /// Retain both values of a scalar conflict instead of discarding one
    pub keep_conflicts: bool,
    /// Truncation bound for chunk text sent to classifiers
    pub chunk_excerpt_len: usize,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            section_threshold: 0.4,
            subsection_threshold: 0.4,
            completion_threshold: 0.5,
            extraction_cadence: 6,
            rolling_window_size: 12,
            extraction_window_size: 30,
            min_confidence: 0.5,
            keep_conflicts: true,
            chunk_excerpt_len: 400,
        }
    }
}

/// TOML configuration file contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Listen address (default "127.0.0.1:5740")
    pub listen_addr: Option<String>,
    /// OpenAI API key (lower priority than ENV)
    pub openai_api_key: Option<String>,
    /// Chat model used for all three classifier instantiations
    pub openai_model: Option<String>,
    /// OpenAI-compatible API base URL override
    pub openai_base_url: Option<String>,
    pub analysis: AnalysisParams,
    /// Interview outline override; default screening script when absent
    pub script: Option<InterviewScript>,
}

impl TomlConfig {
    /// Load configuration from `CANDOR_CONFIG` path or the default
    /// location. A missing file is not an error; defaults apply.
    pub fn load() -> Result<Self> {
        let path = config_path();
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "No config file found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read config failed: {}", e)))?;
        let config: TomlConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse config failed: {}", e)))?;

        info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    pub fn listen_addr(&self) -> &str {
        self.listen_addr.as_deref().unwrap_or("127.0.0.1:5740")
    }

    pub fn openai_model(&self) -> &str {
        self.openai_model.as_deref().unwrap_or("gpt-4o-mini")
    }

    pub fn openai_base_url(&self) -> &str {
        self.openai_base_url
            .as_deref()
            .unwrap_or("https://api.openai.com/v1")
    }
}

/// Resolve the config file path: `CANDOR_CONFIG` env override, else
/// `~/.config/candor/candor.toml`
fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("CANDOR_CONFIG") {
        return PathBuf::from(path);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".config/candor/candor.toml")
}

/// Resolve the OpenAI API key from 2-tier configuration
///
/// Priority: ENV (`CANDOR_OPENAI_API_KEY`, then `OPENAI_API_KEY`) -> TOML.
/// Returns `None` when unconfigured; the service then degrades every
/// classifier call to a neutral contribution instead of refusing to start.
pub fn resolve_openai_api_key(toml_config: &TomlConfig) -> Option<String> {
    let env_key = std::env::var("CANDOR_OPENAI_API_KEY")
        .or_else(|_| std::env::var("OPENAI_API_KEY"))
        .ok()
        .filter(|k| is_valid_key(k));
    let toml_key = toml_config
        .openai_api_key
        .clone()
        .filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!("OpenAI API key found in both environment and TOML. Using environment (highest priority).");
    }

    match (env_key, toml_key) {
        (Some(key), _) => {
            info!("OpenAI API key loaded from environment variable");
            Some(key)
        }
        (None, Some(key)) => {
            info!("OpenAI API key loaded from TOML config");
            Some(key)
        }
        (None, None) => {
            warn!(
                "OpenAI API key not configured. Classifier calls will degrade to neutral results. \
                 Configure via CANDOR_OPENAI_API_KEY or openai_api_key in candor.toml."
            );
            None
        }
    }
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
