//! Search engine client configuration

use crate::error::ConfigResult;
use crate::validation::{validate_enum_choice, validate_positive, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for the search engine client handed to task code.
///
/// Host and port come from the bootstrap payload, not from here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// URL scheme used to reach the search engine
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Per-request timeout
    #[serde(
        with = "crate::domains::utils::serde_duration",
        default = "default_request_timeout"
    )]
    pub request_timeout: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl Validatable for SearchConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_enum_choice(&self.scheme, &["http", "https"], "scheme", self.domain_name())?;
        validate_positive(
            self.request_timeout.as_secs(),
            "request_timeout",
            self.domain_name(),
        )?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "search"
    }
}

fn default_scheme() -> String {
    "http".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}
