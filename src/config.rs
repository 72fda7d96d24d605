//! Settings from `~/.config/feeder/config.toml` and the environment.
//!
//! Every key is optional and a missing file means defaults. Top-level keys
//! this tool does not know are logged and skipped, which catches typos like
//! `[limit]` without failing the run.
//!
//! Policy values (page size, delays, safety ceiling) live here instead of in
//! module-level constants. [`Config::client_settings`] and
//! [`Config::fetch_limits`] turn them into the immutable values handed to the
//! HTTP client and the pagination driver.
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the Feedly developer access token.
pub const TOKEN_ENV_VAR: &str = "FEEDLY_ACCESS_TOKEN";

/// Production API base URL.
pub const DEFAULT_BASE_URL: &str = "https://cloud.feedly.com/v3";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error(
        "FEEDLY_ACCESS_TOKEN not found in environment variables.\n\
         Create a .env file with: FEEDLY_ACCESS_TOKEN=your_token_here\n\
         Get your token at: https://feedly.com/v3/auth/dev"
    )]
    MissingToken,
}

/// Parsed config file. Any subset of keys may be given.
///
/// `Debug` prints `[REDACTED]` in place of the access token.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Used when `FEEDLY_ACCESS_TOKEN` is unset.
    pub access_token: Option<String>,

    /// API base URL. Only overridden for testing.
    pub base_url: String,

    /// Directory that relative output prefixes are placed under.
    pub export_dir: PathBuf,

    /// Look-back window when neither `--days` nor `--start-date` is given.
    pub default_days_back: u32,

    pub api: ApiConfig,

    pub limits: LimitsConfig,
}

/// HTTP behavior of the API client.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    /// Base of the exponential retry backoff.
    pub retry_backoff_ms: u64,
    /// Wait before the single manual re-issue of a rate-limited request.
    pub rate_limit_delay_secs: u64,
    /// Items requested per stream page.
    pub page_size: u32,
}

/// Rate-limit avoidance policy for the pagination loop.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Base delay between page requests.
    pub api_delay_ms: u64,
    /// Stop paginating once this many articles have been collected.
    pub safe_article_limit: usize,
    /// Start stretching the delay after this many articles.
    pub progressive_delay_threshold: usize,
    /// Ceiling for the stretched delay.
    pub max_delay_ms: u64,
    /// Ranges wider than this print a warning.
    pub max_date_range_days: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            access_token: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            export_dir: PathBuf::from("data").join("exports"),
            default_days_back: 7,
            api: ApiConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 3,
            retry_backoff_ms: 300,
            rate_limit_delay_secs: 60,
            page_size: 250,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            api_delay_ms: 500,
            safe_article_limit: 5000,
            progressive_delay_threshold: 2000,
            max_delay_ms: 3000,
            max_date_range_days: 365,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("base_url", &self.base_url)
            .field("export_dir", &self.export_dir)
            .field("default_days_back", &self.default_days_back)
            .field("api", &self.api)
            .field("limits", &self.limits)
            .finish()
    }
}

/// Immutable settings for [`crate::api::FeedlyClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub rate_limit_delay: Duration,
}

/// Immutable pagination policy for [`crate::extractor`].
#[derive(Debug, Clone)]
pub struct FetchLimits {
    pub page_size: u32,
    pub safe_article_limit: usize,
    pub progressive_delay_threshold: usize,
    pub max_delay: Duration,
    pub max_date_range_days: u32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Config::default().client_settings()
    }
}

impl Default for FetchLimits {
    fn default() -> Self {
        Config::default().fetch_limits()
    }
}

impl Config {
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Read and parse the config file at `path`.
    ///
    /// Absent or blank files give `Config::default()`. Files over 1 MB are
    /// refused before reading. Parse errors carry the TOML line and column.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let size = match std::fs::metadata(path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        if size > Self::MAX_FILE_SIZE {
            return Err(ConfigError::TooLarge(format!(
                "{} is {size} bytes (limit {})",
                path.display(),
                Self::MAX_FILE_SIZE
            )));
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        Self::warn_unknown_keys(&content);
        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), base_url = %config.base_url, "Loaded configuration");
        Ok(config)
    }

    fn warn_unknown_keys(content: &str) {
        const KNOWN: [&str; 6] = [
            "access_token",
            "base_url",
            "export_dir",
            "default_days_back",
            "api",
            "limits",
        ];
        let Ok(table) = content.parse::<toml::Table>() else {
            return;
        };
        for key in table.keys().filter(|k| !KNOWN.contains(&k.as_str())) {
            tracing::warn!(key = %key, "Ignoring unknown config key");
        }
    }

    /// Default config file path: `~/.config/feeder/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        let home = std::env::var_os("HOME")?;
        Some(
            PathBuf::from(home)
                .join(".config")
                .join("feeder")
                .join("config.toml"),
        )
    }

    /// Resolve the access token. The environment wins over the config file.
    pub fn access_token(&self) -> Result<SecretString, ConfigError> {
        let from_env = std::env::var(TOKEN_ENV_VAR).ok();
        Self::pick_token(from_env, self.access_token.clone())
    }

    fn pick_token(
        from_env: Option<String>,
        from_file: Option<String>,
    ) -> Result<SecretString, ConfigError> {
        from_env
            .filter(|t| !t.trim().is_empty())
            .or(from_file.filter(|t| !t.trim().is_empty()))
            .map(|t| SecretString::from(t.trim().to_string()))
            .ok_or(ConfigError::MissingToken)
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.api.timeout_secs),
            max_retries: self.api.max_retries,
            retry_backoff: Duration::from_millis(self.api.retry_backoff_ms),
            rate_limit_delay: Duration::from_secs(self.api.rate_limit_delay_secs),
        }
    }

    pub fn fetch_limits(&self) -> FetchLimits {
        FetchLimits {
            page_size: self.api.page_size.max(1),
            safe_article_limit: self.limits.safe_article_limit,
            progressive_delay_threshold: self.limits.progressive_delay_threshold.max(1),
            max_delay: Duration::from_millis(self.limits.max_delay_ms),
            max_date_range_days: self.limits.max_date_range_days,
        }
    }

    /// Base delay between page requests.
    pub fn api_delay(&self) -> Duration {
        Duration::from_millis(self.limits.api_delay_ms)
    }
}

// ============================================================================
// Tests
// ============================================================================
