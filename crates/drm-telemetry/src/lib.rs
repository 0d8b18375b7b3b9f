//! # DRM Telemetry
//!
//! Structured logging setup shared by the DRM session crates and their tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use drm_telemetry::{init_logging, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_logging(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `DRM_SERVICE_NAME` | `drm-session` | Service name in logs |
//! | `DRM_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `DRM_LOG_JSON` | `false` | Emit JSON formatted logs |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::{init_logging, init_test_logging};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Global subscriber already installed: {0}")]
    AlreadyInitialized(String),
}
