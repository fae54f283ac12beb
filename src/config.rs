use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Config file looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = ".review-radar.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing required setting: {0}")]
    Missing(&'static str),
}

/// Top-level configuration loaded from .review-radar.toml.
/// Every section is optional; `--mock` runs need none of it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bitbucket: BitbucketConfig,

    #[serde(default)]
    pub preferences: Preferences,

    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BitbucketConfig {
    /// Server root, e.g. https://bitbucket.example.com
    pub api_base_url: Option<String>,
    /// Slug of the user whose reviews are tracked
    pub user_slug: Option<String>,
    /// Personal access token. If None, falls back to BITBUCKET_TOKEN env var.
    pub token: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for BitbucketConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            user_slug: None,
            token: None,
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

/// Knobs that shape the overview itself.
#[derive(Debug, Clone, Deserialize)]
pub struct Preferences {
    /// Hide pull requests the user already approved from the to-review list
    #[serde(default)]
    pub omit_reviewed_and_approved: bool,
    #[serde(default = "default_title_abbreviation_length")]
    pub title_abbreviation_length: usize,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            omit_reviewed_and_approved: false,
            title_abbreviation_length: default_title_abbreviation_length(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
    /// Snapshot file. Defaults to the OS cache directory.
    pub path: Option<PathBuf>,
}

fn default_request_timeout() -> u64 {
    15
}

fn default_title_abbreviation_length() -> usize {
    40
}

/// Settings a live (non-mock) run cannot do without.
#[derive(Debug, Clone)]
pub struct LiveSettings {
    pub api_base_url: String,
    pub user_slug: String,
    pub token: String,
    pub request_timeout: Duration,
}

impl Config {
    /// Load configuration from `path`, or from .review-radar.toml in the
    /// current directory. Returns default config if that file doesn't exist.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::load_from(path)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }

    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Resolve the token: config file value takes precedence,
    /// falls back to BITBUCKET_TOKEN env var.
    pub fn bitbucket_token(&self) -> Option<String> {
        self.bitbucket
            .token
            .clone()
            .or_else(|| std::env::var("BITBUCKET_TOKEN").ok())
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// Check that everything needed to talk to the server is present.
    pub fn live_settings(&self) -> Result<LiveSettings, ConfigError> {
        let api_base_url = self
            .bitbucket
            .api_base_url
            .clone()
            .ok_or(ConfigError::Missing("bitbucket.api_base_url"))?;
        let user_slug = self
            .bitbucket
            .user_slug
            .clone()
            .ok_or(ConfigError::Missing("bitbucket.user_slug"))?;
        let token = self
            .bitbucket_token()
            .ok_or(ConfigError::Missing("bitbucket.token (or BITBUCKET_TOKEN)"))?;

        Ok(LiveSettings {
            api_base_url,
            user_slug,
            token,
            request_timeout: Duration::from_secs(self.bitbucket.request_timeout_seconds),
        })
    }
}
