//! Configuration loading for trendwatch.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `TRENDWATCH_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Period;
use crate::scorer::ScoringWeights;

const ENV_PREFIX: &str = "TRENDWATCH_";
const REDACTED: &str = "[REDACTED]";

/// Application configuration derived from `TRENDWATCH_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub scorer: ScorerConfig,
}

/// GitHub endpoints, credentials and HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tokens: Vec<String>,
    #[serde(default = "default_github_api_base")]
    pub api_base: String,
    #[serde(default = "default_trending_url")]
    pub trending_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Longest rate-limit reset the metadata client will sleep through before
    /// its single retry.
    #[serde(default = "default_max_rate_limit_wait_secs")]
    pub max_rate_limit_wait_secs: u64,
    /// Minimum spacing between metadata API requests.
    #[serde(default = "default_api_min_interval_ms")]
    pub api_min_interval_ms: u64,
}

/// Listing scrape settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    #[serde(default)]
    pub since: Period,
    /// Empty means the all-languages listing.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,
    #[serde(default = "default_min_request_interval_ms")]
    pub min_request_interval_ms: u64,
    #[serde(default = "default_request_jitter_ms")]
    pub request_jitter_ms: u64,
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

/// Scoring weights and ranking size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorerConfig {
    #[serde(default)]
    pub weights: ScoringWeights,
    /// 0 ranks every scored entity.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Append a scored snapshot for each ranked entity.
    #[serde(default = "default_record_snapshots")]
    pub record_snapshots: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            data_dir: default_data_dir(),
            github: GitHubConfig::default(),
            scraper: ScraperConfig::default(),
            scorer: ScorerConfig::default(),
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            tokens: Vec::new(),
            api_base: default_github_api_base(),
            trending_url: default_trending_url(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout_secs(),
            max_rate_limit_wait_secs: default_max_rate_limit_wait_secs(),
            api_min_interval_ms: default_api_min_interval_ms(),
        }
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            since: Period::default(),
            languages: Vec::new(),
            min_request_interval_ms: default_min_request_interval_ms(),
            request_jitter_ms: default_request_jitter_ms(),
            max_concurrent_requests: default_max_concurrent_requests(),
        }
    }
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            top_n: default_top_n(),
            record_snapshots: default_record_snapshots(),
        }
    }
}

impl ScorerConfig {
    /// Weights must be finite and non-negative.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let weights = [
            ("daily_stars", self.weights.daily_stars),
            ("weekly_stars", self.weights.weekly_stars),
            ("forks", self.weights.forks),
            ("issues", self.weights.issues),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }
        Ok(())
    }
}

impl ScraperConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_requests == 0 {
            return Err(ConfigError::InvalidConcurrency {
                value: self.max_concurrent_requests,
            });
        }
        Ok(())
    }
}

impl AppConfig {
    /// Returns a redacted JSON representation (tokens are redacted).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        if !config.github.tokens.is_empty() {
            config.github.tokens = vec![REDACTED.to_string()];
        }
        serde_json::to_string_pretty(&config)
    }

    pub fn is_production(&self) -> bool {
        self.profile == "production"
    }

    /// Validates the configuration, returning an error for unusable settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.log_format.as_str(), "json" | "pretty") {
            return Err(ConfigError::InvalidLogFormat {
                value: self.log_format.clone(),
            });
        }

        if self.is_production() && self.github.tokens.is_empty() {
            return Err(ConfigError::MissingGitHubTokens);
        }

        self.scraper.validate()?;
        self.scorer.validate()?;

        Ok(())
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_github_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_trending_url() -> String {
    "https://github.com/trending".to_string()
}

fn default_user_agent() -> String {
    concat!("trendwatch/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_rate_limit_wait_secs() -> u64 {
    900 // 15 minutes
}

fn default_api_min_interval_ms() -> u64 {
    250
}

fn default_min_request_interval_ms() -> u64 {
    2000
}

fn default_request_jitter_ms() -> u64 {
    1000
}

fn default_max_concurrent_requests() -> usize {
    2
}

fn default_top_n() -> usize {
    100
}

fn default_record_snapshots() -> bool {
    true
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid value '{value}' for TRENDWATCH_{key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
    #[error("log format must be 'json' or 'pretty', got '{value}'")]
    InvalidLogFormat { value: String },
    #[error(
        "no GitHub tokens configured; set TRENDWATCH_GITHUB_TOKENS or GITHUB_TOKENS for the production profile"
    )]
    MissingGitHubTokens,
    #[error("scorer weight {name} must be a finite non-negative number, got {value}")]
    InvalidWeight { name: &'static str, value: f64 },
    #[error("scraper concurrency must be at least 1, got {value}")]
    InvalidConcurrency { value: usize },
}

/// Loads configuration using layered `.env` files and `TRENDWATCH_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Layers `.env`, `.env.local`, `.env.<profile>`, `.env.<profile>.local`
    /// and finally the process environment, then validates.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        // Overlay process environment last so it wins.
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layered.insert(stripped.to_string(), value);
            }
        }

        let profile = take_string(&mut layered, "PROFILE").unwrap_or(profile_hint);
        let log_level = take_string(&mut layered, "LOG_LEVEL").unwrap_or_else(default_log_level);
        let log_format = take_string(&mut layered, "LOG_FORMAT")
            .map(|v| v.to_lowercase())
            .unwrap_or_else(default_log_format);
        let data_dir = take_string(&mut layered, "DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        // Unprefixed GITHUB_TOKENS is accepted when the prefixed key is absent.
        let tokens = take_string(&mut layered, "GITHUB_TOKENS")
            .or_else(|| env::var("GITHUB_TOKENS").ok())
            .map(|raw| split_list(&raw))
            .unwrap_or_default();

        let github = GitHubConfig {
            tokens,
            api_base: take_string(&mut layered, "GITHUB_API_BASE")
                .unwrap_or_else(default_github_api_base),
            trending_url: take_string(&mut layered, "TRENDING_URL")
                .unwrap_or_else(default_trending_url),
            user_agent: take_string(&mut layered, "USER_AGENT").unwrap_or_else(default_user_agent),
            request_timeout_secs: take_parsed(&mut layered, "REQUEST_TIMEOUT_SECS")?
                .unwrap_or_else(default_request_timeout_secs),
            max_rate_limit_wait_secs: take_parsed(&mut layered, "MAX_RATE_LIMIT_WAIT_SECS")?
                .unwrap_or_else(default_max_rate_limit_wait_secs),
            api_min_interval_ms: take_parsed(&mut layered, "GITHUB_API_MIN_INTERVAL_MS")?
                .unwrap_or_else(default_api_min_interval_ms),
        };

        let scraper = ScraperConfig {
            since: take_parsed(&mut layered, "SCRAPER_SINCE")?.unwrap_or_default(),
            languages: take_string(&mut layered, "SCRAPER_LANGUAGES")
                .map(|raw| split_list(&raw))
                .unwrap_or_default(),
            min_request_interval_ms: take_parsed(&mut layered, "SCRAPER_MIN_INTERVAL_MS")?
                .unwrap_or_else(default_min_request_interval_ms),
            request_jitter_ms: take_parsed(&mut layered, "SCRAPER_JITTER_MS")?
                .unwrap_or_else(default_request_jitter_ms),
            max_concurrent_requests: take_parsed(&mut layered, "SCRAPER_MAX_CONCURRENCY")?
                .unwrap_or_else(default_max_concurrent_requests),
        };

        let default_weights = ScoringWeights::default();
        let scorer = ScorerConfig {
            weights: ScoringWeights {
                daily_stars: take_parsed(&mut layered, "SCORER_DAILY_STARS")?
                    .unwrap_or(default_weights.daily_stars),
                weekly_stars: take_parsed(&mut layered, "SCORER_WEEKLY_STARS")?
                    .unwrap_or(default_weights.weekly_stars),
                forks: take_parsed(&mut layered, "SCORER_FORKS")?
                    .unwrap_or(default_weights.forks),
                issues: take_parsed(&mut layered, "SCORER_ISSUES")?
                    .unwrap_or(default_weights.issues),
            },
            top_n: take_parsed(&mut layered, "SCORER_TOP_N")?.unwrap_or_else(default_top_n),
            record_snapshots: take_parsed(&mut layered, "SCORER_RECORD_SNAPSHOTS")?
                .unwrap_or_else(default_record_snapshots),
        };

        let config = AppConfig {
            profile,
            log_level,
            log_format,
            data_dir,
            github,
            scraper,
            scorer,
        };

        config.validate()?;
        Ok(config)
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var(format!("{ENV_PREFIX}PROFILE"))
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn take_string(values: &mut BTreeMap<String, String>, key: &str) -> Option<String> {
    values
        .remove(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn take_parsed<T>(values: &mut BTreeMap<String, String>, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match take_string(values, key) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|err: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw.clone(),
                reason: err.to_string(),
            }),
        None => Ok(None),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scorer.top_n, 100);
        assert_eq!(config.scorer.weights.daily_stars, 0.35);
        assert_eq!(config.scraper.since, Period::Daily);
    }

    #[test]
    fn rejects_negative_or_non_finite_weights() {
        let mut config = AppConfig::default();
        config.scorer.weights.forks = -0.1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWeight { name: "forks", .. })
        ));

        config.scorer.weights.forks = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn production_requires_tokens() {
        let mut config = AppConfig {
            profile: "production".into(),
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingGitHubTokens)
        ));

        config.github.tokens = vec!["ghp_x".into()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_unknown_log_format_and_zero_concurrency() {
        let mut config = AppConfig {
            log_format: "xml".into(),
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidLogFormat { .. })
        ));

        config.log_format = "pretty".into();
        config.scraper.max_concurrent_requests = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConcurrency { value: 0 })
        ));
    }

    #[test]
    fn redacted_json_hides_tokens() {
        let mut config = AppConfig::default();
        config.github.tokens = vec!["ghp_secret1".into(), "ghp_secret2".into()];

        let json = config.redacted_json().unwrap();
        assert!(!json.contains("ghp_secret"));
        assert!(json.contains(REDACTED));
    }

    #[test]
    fn split_list_drops_blanks() {
        assert_eq!(split_list(" a, ,b,"), vec!["a".to_string(), "b".to_string()]);
    }
}
