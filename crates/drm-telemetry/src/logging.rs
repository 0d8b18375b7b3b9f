//! Subscriber installation.
//!
//! Plain-text output is the default; JSON output carries the same fields
//! (`state`, `kind`, `session_id`, `refcount`, `error`) as structured keys.

use crate::{TelemetryConfig, TelemetryError};
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global `tracing` subscriber described by `config`.
///
/// Fails if the filter directive is malformed or a global subscriber is
/// already installed.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::Config(format!("{}: {}", config.log_level, e)))?;

    let builder = fmt().with_env_filter(filter).with_target(true);

    let result = match (config.json_logs, config.test_writer) {
        (true, true) => builder.json().with_test_writer().try_init(),
        (true, false) => builder.json().try_init(),
        (false, true) => builder.with_test_writer().try_init(),
        (false, false) => builder.try_init(),
    };
    result.map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;

    tracing::debug!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Logging initialized"
    );
    Ok(())
}

/// Install the test subscriber, ignoring a subscriber that another test in
/// the same binary already installed.
pub fn init_test_logging() {
    let _ = init_logging(&TelemetryConfig::for_tests());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_filter_rejected() {
        let config = TelemetryConfig {
            log_level: "drm_session=[".to_string(),
            ..TelemetryConfig::for_tests()
        };
        assert!(matches!(
            init_logging(&config),
            Err(TelemetryError::Config(_))
        ));
    }

    #[test]
    fn test_second_init_is_reported() {
        init_test_logging();
        let second = init_logging(&TelemetryConfig::for_tests());
        assert!(matches!(second, Err(TelemetryError::AlreadyInitialized(_))));
    }
}
