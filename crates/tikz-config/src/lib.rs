//! Configuration management for the TikZ block renderer.
//!
//! Parses `tikz.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `render.endpoint`
//! - `plugin.console_url`

mod expand;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use expand::expand_env;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the render service endpoint.
    pub endpoint: Option<String>,
    /// Override the HTTP timeout in seconds.
    pub timeout_secs: Option<u64>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "tikz.toml";

/// Default HTTP timeout for render requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Render service configuration.
    pub render: RenderConfig,
    /// Host plugin configuration lookup.
    pub plugin: PluginConfig,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Render service configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Pre-resolved render endpoint. Takes precedence over the plugin lookup.
    pub endpoint: Option<String>,
    /// HTTP timeout in seconds.
    pub timeout_secs: u64,
}

impl RenderConfig {
    /// HTTP timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Where to fetch the plugin JSON configuration holding the endpoint.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    /// Base URL of the host console API. Lookup is skipped when unset.
    pub console_url: Option<String>,
    /// Plugin identifier the configuration is keyed by.
    pub name: String,
    /// Configuration group containing the endpoint.
    pub group: String,
    /// Key of the endpoint within the group.
    pub key: String,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            console_url: None,
            name: "plugin-tikz".to_owned(),
            group: "basic".to_owned(),
            key: "tikzRenderApi".to_owned(),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`render.endpoint`").
        field: String,
        /// Error message (e.g., "${`TIKZ_ENDPOINT`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `tikz.toml` in current directory and parents,
    /// falling back to defaults when none is found.
    ///
    /// CLI settings are applied after loading, allowing CLI arguments to take
    /// precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(endpoint) = &settings.endpoint {
            self.render.endpoint = Some(endpoint.clone());
        }
        if let Some(timeout_secs) = settings.timeout_secs {
            self.render.timeout_secs = timeout_secs;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;
        config.config_path = Some(path.to_path_buf());
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` describing the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(endpoint) = &self.render.endpoint {
            require_non_empty(endpoint, "render.endpoint")?;
            require_http_url(endpoint, "render.endpoint")?;
        }
        if self.render.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "render.timeout_secs must be greater than 0".to_owned(),
            ));
        }
        if let Some(console_url) = &self.plugin.console_url {
            require_non_empty(console_url, "plugin.console_url")?;
            require_http_url(console_url, "plugin.console_url")?;
        }
        require_non_empty(&self.plugin.name, "plugin.name")?;
        require_non_empty(&self.plugin.group, "plugin.group")?;
        require_non_empty(&self.plugin.key, "plugin.key")?;
        Ok(())
    }

    /// Expand environment variables in string fields.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(endpoint) = &self.render.endpoint {
            self.render.endpoint = Some(expand_env(endpoint, "render.endpoint")?);
        }
        if let Some(console_url) = &self.plugin.console_url {
            self.plugin.console_url = Some(expand_env(console_url, "plugin.console_url")?);
        }
        Ok(())
    }
}
