//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for log output.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error) or a full
    /// `EnvFilter` directive such as `drm_session=debug,info`
    pub log_level: String,

    /// Whether to emit JSON formatted logs
    pub json_logs: bool,

    /// Whether to route output through the libtest capture writer
    pub test_writer: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "drm-session".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            test_writer: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `DRM_SERVICE_NAME`: Service name (default: drm-session)
    /// - `DRM_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `DRM_LOG_JSON`: Enable JSON logs (default: false)
    pub fn from_env() -> Self {
        Self {
            service_name: env::var("DRM_SERVICE_NAME")
                .unwrap_or_else(|_| "drm-session".to_string()),

            log_level: env::var("DRM_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            json_logs: env::var("DRM_LOG_JSON")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),

            test_writer: false,
        }
    }

    /// Configuration for test binaries: captured output, `debug` unless
    /// overridden through the environment.
    pub fn for_tests() -> Self {
        Self {
            log_level: env::var("DRM_LOG_LEVEL").unwrap_or_else(|_| "debug".to_string()),
            test_writer: true,
            ..Self::default()
        }
    }
}
