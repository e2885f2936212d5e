//! Host request channel configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_required_string, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default upper bound for one inbound protocol line, shared with the transport
pub use ivis_ipc::DEFAULT_MAX_LINE_BYTES;

/// How the task reaches its host
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Path opened for writing request lines.
    ///
    /// Hosts pass the request pipe as descriptor 3, hence `/dev/fd/3`.
    #[serde(default = "default_request_path")]
    pub request_path: String,

    /// Maximum wait for a single response.
    ///
    /// `None` (the default) blocks until the host answers, however long that
    /// takes. Once a timeout fires the channel refuses further requests,
    /// since a late response would be paired with the wrong request.
    #[serde(
        with = "crate::domains::utils::serde_duration_option",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub response_timeout: Option<Duration>,

    /// Longest accepted inbound line in bytes
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            request_path: default_request_path(),
            response_timeout: None,
            max_line_bytes: default_max_line_bytes(),
        }
    }
}

impl Validatable for ChannelConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.request_path, "request_path", self.domain_name())?;
        validate_positive(self.max_line_bytes, "max_line_bytes", self.domain_name())?;

        if let Some(timeout) = self.response_timeout {
            if timeout.is_zero() {
                return Err(self.validation_error(
                    "response_timeout must be greater than 0; omit it to wait indefinitely",
                ));
            }
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "channel"
    }
}

fn default_request_path() -> String {
    "/dev/fd/3".to_string()
}

fn default_max_line_bytes() -> usize {
    DEFAULT_MAX_LINE_BYTES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_timeout_rejected() {
        let config = ChannelConfig {
            response_timeout: Some(Duration::ZERO),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_yaml() {
        let config: ChannelConfig = serde_yaml::from_str("response_timeout: 30").unwrap();
        assert_eq!(config.response_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.request_path, "/dev/fd/3");
    }
}
