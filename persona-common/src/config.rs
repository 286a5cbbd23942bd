//! Configuration loading
//!
//! Resolution priority, highest first:
//! 1. Command-line arguments (applied by the binary after loading)
//! 2. Environment variables (`PERSONA_*`)
//! 3. TOML config file
//! 4. Compiled defaults
//!
//! A missing config file is not an error: a warning is logged and defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "PERSONA_CONFIG";

/// Full service configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub fetcher: FetcherConfig,
    pub analysis: AnalysisConfig,
    pub cache: CacheConfig,
    pub models: ModelsConfig,
    /// `trait name -> signal name -> weight`; empty means built-in weights
    pub trait_weights: BTreeMap<String, BTreeMap<String, f64>>,
    pub logging: LoggingConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Upstream profile source settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    pub base_url: String,
    /// Session cookie for authenticated access; enables private profiles the session can see
    pub session_id: Option<String>,
    pub requests_per_second: u32,
    pub download_images: bool,
    pub download_dir: PathBuf,
    /// Downloaded images older than this are deleted; 0 keeps them forever
    pub download_retention_days: u64,
    pub timeout_secs: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.instagram.com".to_string(),
            session_id: None,
            requests_per_second: 1,
            download_images: true,
            download_dir: default_download_dir(),
            download_retention_days: 7,
            timeout_secs: 30,
        }
    }
}

/// How posts without any text or image signal are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZeroSignalPolicy {
    /// Leave them out of the average
    #[default]
    Exclude,
    /// Average them in as a neutral contribution
    Neutral,
}

/// Scoring and aggregation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub default_max_posts: usize,
    pub max_posts_limit: usize,
    pub request_timeout_secs: u64,
    pub scoring_concurrency: usize,
    pub text_weight: f64,
    pub image_weight: f64,
    pub zero_signal_policy: ZeroSignalPolicy,
    /// Contributing posts needed before sample size stops lowering confidence
    pub full_confidence_posts: usize,
    /// Number of posts echoed back as `sample_data`
    pub sample_size: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            default_max_posts: 30,
            max_posts_limit: 100,
            request_timeout_secs: 120,
            scoring_concurrency: 8,
            text_weight: 0.6,
            image_weight: 0.4,
            zero_signal_policy: ZeroSignalPolicy::Exclude,
            full_confidence_posts: 5,
            sample_size: 10,
        }
    }
}

/// Result cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_secs: u64,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 3600,
            max_entries: 256,
        }
    }
}

/// Text and image model settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Hosted text-classification endpoint; lexicon scoring is used when unset
    pub text_endpoint: Option<String>,
    /// Hosted image-classification endpoint; image scoring is disabled when unset
    pub image_endpoint: Option<String>,
    pub api_token: Option<String>,
    /// TOML lexicon replacing the built-in one
    pub lexicon_path: Option<PathBuf>,
    /// Model label -> signal name
    pub label_map: BTreeMap<String, String>,
    pub timeout_secs: Option<u64>,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration: TOML file (if any) then environment overrides
    ///
    /// `explicit` comes from the command line; otherwise `PERSONA_CONFIG`, then
    /// the platform config directory is tried.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from))
            .or_else(default_config_path);

        let mut config = match path {
            Some(path) if path.exists() => {
                info!("Loading config from {}", path.display());
                Self::from_file(&path)?
            }
            Some(path) => {
                warn!("Config file {} not found, using defaults", path.display());
                Self::default()
            }
            None => {
                warn!("No config directory available, using defaults");
                Self::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Apply `PERSONA_*` environment variables
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup (environment in production, a map in tests)
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(bind) = non_empty("PERSONA_BIND") {
            self.server.bind = bind;
        }
        if let Some(port) = non_empty("PERSONA_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!("Ignoring invalid PERSONA_PORT: {}", port),
            }
        }
        if let Some(url) = non_empty("PERSONA_FETCHER_BASE_URL") {
            self.fetcher.base_url = url;
        }
        if let Some(session) = non_empty("PERSONA_SESSION_ID") {
            self.fetcher.session_id = Some(session);
        }
        if let Some(dir) = non_empty("PERSONA_DOWNLOAD_DIR") {
            self.fetcher.download_dir = PathBuf::from(dir);
        }
        if let Some(days) = non_empty("PERSONA_DOWNLOAD_RETENTION_DAYS") {
            match days.parse() {
                Ok(days) => self.fetcher.download_retention_days = days,
                Err(_) => warn!("Ignoring invalid PERSONA_DOWNLOAD_RETENTION_DAYS: {}", days),
            }
        }
        if let Some(endpoint) = non_empty("PERSONA_TEXT_ENDPOINT") {
            self.models.text_endpoint = Some(endpoint);
        }
        if let Some(endpoint) = non_empty("PERSONA_IMAGE_ENDPOINT") {
            self.models.image_endpoint = Some(endpoint);
        }
        if let Some(token) = non_empty("PERSONA_API_TOKEN") {
            self.models.api_token = Some(token);
        }
        if let Some(ttl) = non_empty("PERSONA_CACHE_TTL_SECS") {
            match ttl.parse() {
                Ok(ttl) => self.cache.ttl_secs = ttl,
                Err(_) => warn!("Ignoring invalid PERSONA_CACHE_TTL_SECS: {}", ttl),
            }
        }
        if let Some(level) = non_empty("PERSONA_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let a = &self.analysis;

        if a.text_weight < 0.0 || a.image_weight < 0.0 {
            return Err(Error::Config("text_weight and image_weight must be non-negative".to_string()));
        }
        if ((a.text_weight + a.image_weight) - 1.0).abs() > 1e-6 {
            return Err(Error::Config(format!(
                "text_weight + image_weight must equal 1.0 (got {} + {})",
                a.text_weight, a.image_weight
            )));
        }
        if a.max_posts_limit == 0 {
            return Err(Error::Config("max_posts_limit must be at least 1".to_string()));
        }
        if a.default_max_posts == 0 || a.default_max_posts > a.max_posts_limit {
            return Err(Error::Config(format!(
                "default_max_posts must be between 1 and max_posts_limit ({})",
                a.max_posts_limit
            )));
        }
        if a.scoring_concurrency == 0 {
            return Err(Error::Config("scoring_concurrency must be at least 1".to_string()));
        }
        if a.request_timeout_secs == 0 {
            return Err(Error::Config("request_timeout_secs must be at least 1".to_string()));
        }
        if self.fetcher.requests_per_second == 0 {
            return Err(Error::Config("requests_per_second must be at least 1".to_string()));
        }
        if self.cache.enabled && self.cache.max_entries == 0 {
            return Err(Error::Config("cache.max_entries must be at least 1".to_string()));
        }

        Ok(())
    }
}

/// Platform config file location: `<config dir>/persona/persona-analyzer.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("persona").join("persona-analyzer.toml"))
}

/// Platform data location for downloaded images
fn default_download_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("persona").join("downloads"))
        .unwrap_or_else(|| PathBuf::from("./downloads"))
}
