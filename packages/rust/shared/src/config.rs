//! Application configuration for TopicForge.
//!
//! User config lives at `~/.topicforge/topicforge.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TopicforgeError};
use crate::types::Query;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "topicforge.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".topicforge";

// ---------------------------------------------------------------------------
// Config structs (matching topicforge.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Topical queries processed each tick.
    #[serde(default = "default_queries")]
    pub queries: Vec<String>,

    /// Result resolution settings.
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Page fetch settings.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Recurring schedule settings.
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Classifier training settings.
    #[serde(default)]
    pub training: TrainingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            defaults: DefaultsConfig::default(),
            queries: default_queries(),
            resolver: ResolverConfig::default(),
            fetch: FetchConfig::default(),
            schedule: ScheduleConfig::default(),
            training: TrainingConfig::default(),
        }
    }
}

impl AppConfig {
    /// The configured queries as domain [`Query`] values.
    pub fn query_list(&self) -> Vec<Query> {
        self.queries.iter().map(|q| Query::new(q)).collect()
    }
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Root directory for all pipeline artifacts.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> String {
    "~/topicforge-data".into()
}

fn default_queries() -> Vec<String> {
    vec!["best food in ahmedabad".into(), "vayu app".into()]
}

/// `[resolver]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Search endpoint the query is sent to.
    #[serde(default = "default_provider_base")]
    pub provider_base: String,

    /// Number of results requested per query.
    #[serde(default = "default_result_count")]
    pub result_count: u32,

    /// Result URLs containing any of these domains are dropped
    /// (self-referential provider navigation).
    #[serde(default = "default_blocked_domains")]
    pub blocked_domains: Vec<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            provider_base: default_provider_base(),
            result_count: default_result_count(),
            blocked_domains: default_blocked_domains(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider_base() -> String {
    "https://www.google.com/search".into()
}
fn default_result_count() -> u32 {
    20
}
fn default_blocked_domains() -> Vec<String> {
    vec!["google.com".into(), "youtube.com".into()]
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Fixed delay in ms between consecutive page fetches within one run.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            delay_ms: default_delay_ms(),
        }
    }
}

fn default_delay_ms() -> u64 {
    5_000
}

/// `[schedule]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Days between full pipeline ticks.
    #[serde(default = "default_interval_days")]
    pub interval_days: u64,

    /// Seconds between pending-task checks while idle.
    #[serde(default = "default_poll_secs")]
    pub poll_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_days: default_interval_days(),
            poll_secs: default_poll_secs(),
        }
    }
}

fn default_interval_days() -> u64 {
    7
}
fn default_poll_secs() -> u64 {
    1
}

/// `[training]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Fraction of examples held out for evaluation.
    #[serde(default = "default_holdout")]
    pub holdout: f64,

    /// Seed for the holdout partition, fixed for reproducibility.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Laplace smoothing factor for the classifier.
    #[serde(default = "default_alpha")]
    pub alpha: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            holdout: default_holdout(),
            seed: default_seed(),
            alpha: default_alpha(),
        }
    }
}

fn default_holdout() -> f64 {
    0.2
}
fn default_seed() -> u64 {
    42
}
fn default_alpha() -> f64 {
    1.0
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.topicforge/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| TopicforgeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.topicforge/topicforge.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| TopicforgeError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        TopicforgeError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| TopicforgeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| TopicforgeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| TopicforgeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Expand a leading `~/` in the configured data dir.
pub fn resolve_data_dir(config: &AppConfig) -> Result<PathBuf> {
    let raw = &config.defaults.data_dir;
    if let Some(rest) = raw.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| TopicforgeError::config("could not determine home directory"))?;
        return Ok(home.join(rest));
    }
    Ok(PathBuf::from(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("data_dir"));
        assert!(toml_str.contains("interval_days"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.schedule.interval_days, 7);
        assert_eq!(parsed.resolver.result_count, 20);
        assert!((parsed.training.holdout - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn config_with_queries() {
        let toml_str = r#"
queries = ["street food in mumbai", "hiking trails"]

[defaults]
data_dir = "/var/lib/topicforge"

[schedule]
interval_days = 3
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.queries.len(), 2);
        assert_eq!(config.schedule.interval_days, 3);
        assert_eq!(config.defaults.data_dir, "/var/lib/topicforge");
        // Unspecified sections fall back to defaults.
        assert_eq!(config.fetch.delay_ms, 5_000);
    }

    #[test]
    fn query_list_conversion() {
        let config = AppConfig::default();
        let queries = config.query_list();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].ident(), "best_food_in_ahmedabad");
    }
}
