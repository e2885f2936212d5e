use anyhow::Result;
use ivis_config::{LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// Initialize logging from configuration
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(build_filter(&config.level.to_string()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    let installed = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Text => builder.try_init(),
    };

    // Use try_init to avoid panic if global subscriber already set
    if installed.is_err() {
        tracing::debug!("Global tracing subscriber already initialized, skipping");
    }

    Ok(())
}

/// Initialize plain text tracing at the given level
pub fn init_simple_tracing(log_level: &str) -> Result<()> {
    let config = LoggingConfig {
        level: log_level.parse().map_err(|e: String| anyhow::anyhow!(e))?,
        ..Default::default()
    };
    init_logging(&config)
}

fn build_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_new(log_level)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_filter_uses_configured_level() {
        assert_eq!(build_filter("debug").max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(build_filter("warn").max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn test_simple_tracing_rejects_unknown_level() {
        assert!(init_simple_tracing("chatty").is_err());
    }
}
