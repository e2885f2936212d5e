//! Domain-specific configuration modules

pub mod channel;
pub mod logging;
pub mod search;
pub mod utils;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Task process configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct IvisConfig {
    /// Host request channel configuration
    #[serde(default)]
    pub channel: channel::ChannelConfig,

    /// Search engine client configuration
    #[serde(default)]
    pub search: search::SearchConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,
}

impl IvisConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.channel.validate()?;
        self.search.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
