//! Configuration management for ribbon.
//!
//! Configuration is read from `~/.config/ribbon/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is
//! created. Missing fields fall back to defaults, and a few values can be
//! overridden through the environment for deployment-specific setups.

use serde::Deserialize;
use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Main configuration struct.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub oauth: OAuthConfig,
    pub sync: SyncConfig,
}

/// Hosted backend project settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Project base URL, e.g. `https://myproject.supabase.co`
    pub url: String,

    /// Public (anon) API key for the project.
    pub anon_key: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
        }
    }
}

/// OAuth sign-in settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Identity provider name as the backend knows it (default: github).
    pub provider: String,

    /// Where the provider redirects after consent. Local runs use a
    /// loopback URL the client can listen on; hosted setups point this at
    /// their own callback endpoint.
    pub redirect_url: String,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            provider: "github".to_string(),
            redirect_url: "http://127.0.0.1:53682/callback".to_string(),
        }
    }
}

/// Change-feed settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Seconds between change-feed polls (default: 5).
    pub poll_interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with
    /// comments. Environment overrides are applied last.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
                path: config_path.clone(),
                source: e,
            })?;
            toml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: config_path,
                source: e,
            })?
        } else {
            Self::create_default_config(&config_path)?;
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path: `~/.config/ribbon/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("ribbon").join("config.toml"))
    }

    /// Deployment context decides the redirect target and backend, so all
    /// three are overridable without editing the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var("RIBBON_BACKEND_URL") {
            self.backend.url = url;
        }
        if let Ok(key) = env::var("RIBBON_ANON_KEY") {
            self.backend.anon_key = key;
        }
        if let Ok(redirect) = env::var("RIBBON_REDIRECT_URL") {
            self.oauth.redirect_url = redirect;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.url.is_empty() || self.backend.anon_key.is_empty() {
            return Err(ConfigError::MissingBackend);
        }
        Ok(())
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# Ribbon configuration
#
# Fill in the backend section with your project's URL and anon key before
# the first sign-in. Environment variables RIBBON_BACKEND_URL,
# RIBBON_ANON_KEY and RIBBON_REDIRECT_URL override the values below.

[backend]
# Project base URL, e.g. "https://myproject.supabase.co"
url = ""

# Public (anon) API key
anon_key = ""

[oauth]
# Identity provider to sign in with
provider = "github"

# Redirect target for the OAuth flow. For local use this must be a
# loopback URL; register the same URL with the backend project.
redirect_url = "http://127.0.0.1:53682/callback"

[sync]
# Seconds between change-feed polls
poll_interval_secs = 5
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("backend.url and backend.anon_key must be set (config file or RIBBON_* env)")]
    MissingBackend,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
