//! Application settings and configuration
//!
//! Settings are loaded from environment variables (and an optional `.env`
//! file) with defaults, then overridden by command line flags in `main`.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::time::Duration;

/// Default upstream aggregator endpoint
pub const DEFAULT_UPSTREAM_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Application environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    #[value(alias = "dev")]
    Development,
    #[value(alias = "stage")]
    Staging,
    #[value(alias = "prod")]
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" | "stage" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            _ => anyhow::bail!("Invalid environment: {}. Expected: development, staging, or production", s),
        }
    }
}

/// Upstream aggregator connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Base URL of the aggregator API (no trailing slash)
    pub base_url: String,
    /// Timeout for the model listing call
    pub list_timeout_seconds: u64,
    /// Timeout for a single chat completion call
    pub completion_timeout_seconds: u64,
    /// Value sent in the `HTTP-Referer` header
    pub referer: String,
    /// Value sent in the `X-Title` header
    pub title: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_UPSTREAM_BASE_URL.to_string(),
            list_timeout_seconds: 30,
            completion_timeout_seconds: 120,
            referer: "https://ask-em-all.local".to_string(),
            title: "Ask Em All".to_string(),
        }
    }
}

impl UpstreamConfig {
    pub fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.list_timeout_seconds)
    }

    pub fn completion_timeout(&self) -> Duration {
        Duration::from_secs(self.completion_timeout_seconds)
    }
}

/// Fan-out dispatch settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FanOutSettings {
    /// Maximum number of in-flight completion calls per dispatch
    pub max_concurrency: usize,
    /// Optional overall deadline for one dispatch, in seconds
    pub deadline_seconds: Option<u64>,
}

impl Default for FanOutSettings {
    fn default() -> Self {
        Self {
            max_concurrency: 10,
            deadline_seconds: None,
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    // App settings
    pub app_name: String,
    pub app_version: String,
    pub environment: Environment,
    pub log_level: String,

    // Server settings
    pub host: String,
    pub port: u16,
    pub cors_enabled: bool,

    // Upstream aggregator
    pub upstream: UpstreamConfig,

    // Fan-out
    pub fanout: FanOutSettings,
}

impl Settings {
    /// Load settings from environment variables with defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let defaults = UpstreamConfig::default();

        let settings = Self {
            app_name: env_or_default("APP_NAME", "ask-em-all"),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: env_or_default("ENVIRONMENT", "development")
                .parse()
                .unwrap_or_default(),
            log_level: env_or_default("LOG_LEVEL", "info"),

            host: env_or_default("HOST", "0.0.0.0"),
            port: env_or_default("PORT", "7860")
                .parse()
                .context("Invalid PORT value")?,
            cors_enabled: env_or_default("CORS_ENABLED", "true")
                .parse()
                .unwrap_or(true),

            upstream: UpstreamConfig {
                base_url: env_or_default("UPSTREAM_BASE_URL", &defaults.base_url)
                    .trim_end_matches('/')
                    .to_string(),
                list_timeout_seconds: env_or_default("LIST_TIMEOUT_SECS", "30")
                    .parse()
                    .context("Invalid LIST_TIMEOUT_SECS value")?,
                completion_timeout_seconds: env_or_default("COMPLETION_TIMEOUT_SECS", "120")
                    .parse()
                    .context("Invalid COMPLETION_TIMEOUT_SECS value")?,
                referer: env_or_default("UPSTREAM_REFERER", &defaults.referer),
                title: env_or_default("UPSTREAM_TITLE", &defaults.title),
            },

            fanout: FanOutSettings {
                max_concurrency: env_or_default("FANOUT_MAX_CONCURRENCY", "10")
                    .parse()
                    .context("Invalid FANOUT_MAX_CONCURRENCY value")?,
                deadline_seconds: match env::var("FANOUT_DEADLINE_SECS") {
                    Ok(raw) => Some(raw.parse().context("Invalid FANOUT_DEADLINE_SECS value")?),
                    Err(_) => None,
                },
            },
        };

        Ok(settings)
    }

    /// Validate settings
    ///
    /// Not called by `load`: CLI flags may still override values, and the
    /// warnings here need the tracing subscriber to be installed first.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("Port cannot be 0");
        }

        if self.upstream.list_timeout_seconds == 0 {
            anyhow::bail!("LIST_TIMEOUT_SECS must be > 0");
        }
        if self.upstream.completion_timeout_seconds == 0 {
            anyhow::bail!("COMPLETION_TIMEOUT_SECS must be > 0");
        }

        if self.fanout.max_concurrency == 0 {
            anyhow::bail!("FANOUT_MAX_CONCURRENCY must be > 0");
        }
        if self.fanout.deadline_seconds == Some(0) {
            anyhow::bail!("FANOUT_DEADLINE_SECS must be > 0 when set");
        }

        if !self.upstream.base_url.starts_with("https://") {
            tracing::warn!(
                base_url = %self.upstream.base_url,
                "Upstream base URL is not HTTPS; API keys will be sent in clear text"
            );
        }

        Ok(())
    }

    /// Get the server address string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "ask-em-all".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: Environment::Development,
            log_level: "info".to_string(),
            host: "0.0.0.0".to_string(),
            port: 7860,
            cors_enabled: true,
            upstream: UpstreamConfig::default(),
            fanout: FanOutSettings::default(),
        }
    }
}

/// Helper function to get environment variable with default
fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.app_name, "ask-em-all");
        assert_eq!(settings.port, 7860);
        assert_eq!(settings.fanout.max_concurrency, 10);
        assert_eq!(settings.fanout.deadline_seconds, None);
        assert_eq!(settings.upstream.base_url, DEFAULT_UPSTREAM_BASE_URL);
        assert_eq!(settings.upstream.list_timeout(), Duration::from_secs(30));
        assert_eq!(settings.upstream.completion_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!("development".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!("production".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
        assert!("qa".parse::<Environment>().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut settings = Settings::default();
        settings.fanout.max_concurrency = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_deadline() {
        let mut settings = Settings::default();
        settings.fanout.deadline_seconds = Some(0);
        assert!(settings.validate().is_err());

        settings.fanout.deadline_seconds = Some(30);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_leaves_validation_to_caller() {
        // Zero is parseable but invalid; load must not reject it before
        // CLI overrides and tracing are in place.
        env::set_var("FANOUT_MAX_CONCURRENCY", "0");
        let loaded = Settings::load();
        env::remove_var("FANOUT_MAX_CONCURRENCY");

        let settings = loaded.unwrap();
        assert_eq!(settings.fanout.max_concurrency, 0);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_allows_plain_http_upstream() {
        let mut settings = Settings::default();
        settings.upstream.base_url = "http://127.0.0.1:8080".to_string();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_server_addr() {
        let settings = Settings::default();
        assert_eq!(settings.server_addr(), "0.0.0.0:7860");
    }
}
