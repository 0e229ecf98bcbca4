use anyhow::{Context, Result};
use log::{LevelFilter, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::errors::AppError;
use crate::language_utils::LanguageMatch;
use crate::providers::ProviderKind;

/// Application configuration module
/// This module handles loading, validating and saving the gateway settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Upper bound for every single upstream call, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User agent sent to upstreams that do not require a specific one
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-provider credentials and endpoints
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// HTTP listener configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Origins allowed to call the gateway from a browser
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

/// Credentials and endpoint overrides for one provider
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ProviderConfig {
    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: API base URL, empty for the provider's public endpoint
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Base URL of download links (SubDL)
    #[serde(default = "String::new")]
    pub download_endpoint: String,
}

/// Settings of every supported provider
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub opensubtitles: ProviderConfig,
    #[serde(default)]
    pub subdl: ProviderConfig,
    #[serde(default)]
    pub subsource: ProviderConfig,
    #[serde(default)]
    pub bsplayer: ProviderConfig,
    #[serde(default)]
    pub addic7ed: ProviderConfig,

    /// How Addic7ed language names are matched against requested codes
    #[serde(default)]
    pub addic7ed_language_match: LanguageMatch,
}

impl ProvidersConfig {
    /// Settings of the given provider
    pub fn get(&self, kind: ProviderKind) -> &ProviderConfig {
        match kind {
            ProviderKind::OpenSubtitles => &self.opensubtitles,
            ProviderKind::SubDl => &self.subdl,
            ProviderKind::SubSource => &self.subsource,
            ProviderKind::BsPlayer => &self.bsplayer,
            ProviderKind::Addic7ed => &self.addic7ed,
        }
    }

    /// Mutable settings of the given provider
    pub fn get_mut(&mut self, kind: ProviderKind) -> &mut ProviderConfig {
        match kind {
            ProviderKind::OpenSubtitles => &mut self.opensubtitles,
            ProviderKind::SubDl => &mut self.subdl,
            ProviderKind::SubSource => &mut self.subsource,
            ProviderKind::BsPlayer => &mut self.bsplayer,
            ProviderKind::Addic7ed => &mut self.addic7ed,
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    // @returns: Matching `log` filter
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:5173".to_string()]
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    "SubtitlesAPI v1.0".to_string()
}

impl Config {
    /// Per-call upstream timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<(), AppError> {
        if self.timeout_secs == 0 {
            return Err(AppError::Config("timeout_secs must be greater than zero".to_string()));
        }

        if self.user_agent.trim().is_empty() {
            return Err(AppError::Config("user_agent must not be empty".to_string()));
        }

        for kind in ProviderKind::ALL {
            let provider = self.providers.get(kind);
            for endpoint in [&provider.endpoint, &provider.download_endpoint] {
                if !endpoint.is_empty() && Url::parse(endpoint).is_err() {
                    return Err(AppError::Config(format!(
                        "Invalid endpoint for {}: {}",
                        kind, endpoint
                    )));
                }
            }
        }

        Ok(())
    }

    /// Load the configuration file, writing the defaults when it does not exist yet
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            return Ok(config);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write default config to file: {}", path.display()))?;

        Ok(config)
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig::default(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            providers: ProvidersConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
