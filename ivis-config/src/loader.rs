//! Configuration loading and environment variable handling

use crate::domains::IvisConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "IVIS".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<IvisConfig> {
        let path = path.as_ref();
        log::debug!("Loading configuration from {}", path.display());

        let content = std::fs::read_to_string(path)?;
        let mut config: IvisConfig = serde_yaml::from_str(&content)?;

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<IvisConfig> {
        let mut config = IvisConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load from a file when one is given, otherwise from the environment
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<IvisConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut IvisConfig) -> ConfigResult<()> {
        self.apply_channel_overrides(&mut config.channel)?;
        self.apply_search_overrides(&mut config.search)?;
        self.apply_logging_overrides(&mut config.logging)?;
        Ok(())
    }

    /// Apply channel config overrides
    fn apply_channel_overrides(
        &self,
        config: &mut crate::domains::channel::ChannelConfig,
    ) -> ConfigResult<()> {
        if let Ok(path) = self.get_env_var("REQUEST_PATH") {
            config.request_path = path;
        }

        // 0 switches the timeout off
        if let Some(seconds) = self.parse_env_var::<u64>("RESPONSE_TIMEOUT_SECONDS")? {
            config.response_timeout = (seconds > 0).then(|| Duration::from_secs(seconds));
        }

        if let Some(max_line_bytes) = self.parse_env_var("MAX_LINE_BYTES")? {
            config.max_line_bytes = max_line_bytes;
        }

        Ok(())
    }

    /// Apply search config overrides
    fn apply_search_overrides(
        &self,
        config: &mut crate::domains::search::SearchConfig,
    ) -> ConfigResult<()> {
        if let Ok(scheme) = self.get_env_var("SEARCH_SCHEME") {
            config.scheme = scheme;
        }

        if let Some(seconds) = self.parse_env_var("SEARCH_TIMEOUT_SECONDS")? {
            config.request_timeout = Duration::from_secs(seconds);
        }

        Ok(())
    }

    /// Apply logging config overrides
    fn apply_logging_overrides(
        &self,
        config: &mut crate::domains::logging::LoggingConfig,
    ) -> ConfigResult<()> {
        if let Some(level) = self.parse_env_var("LOG_LEVEL")? {
            config.level = level;
        }

        if let Some(format) = self.parse_env_var("LOG_FORMAT")? {
            config.format = format;
        }

        Ok(())
    }

    /// Read and parse a prefixed variable; unset yields `None`
    fn parse_env_var<T>(&self, name: &str) -> ConfigResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_env_var(name) {
            Ok(raw) => raw.trim().parse().map(Some).map_err(|e| {
                ConfigError::EnvError(format!("Invalid {}_{}: {}", self.prefix, name, e))
            }),
            Err(_) => Ok(None),
        }
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
