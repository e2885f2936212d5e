//! Configuration for IVIS task processes
//!
//! Settings are split by domain (request channel, search client, logging),
//! each with defaults and validation, loadable from YAML with `IVIS_*`
//! environment overrides.

pub mod domains;
pub mod error;
pub mod loader;
pub mod validation;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

// Re-export domain configurations
pub use domains::{
    channel::ChannelConfig,
    logging::{LogFormat, LogLevel, LoggingConfig},
    search::SearchConfig,
    IvisConfig,
};

// Re-export utilities
pub use domains::utils::{serde_duration, serde_duration_option};
