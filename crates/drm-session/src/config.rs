//! # Session Manager Configuration
//!
//! # Example
//!
//! ```ignore
//! use drm_session::config::{SessionManagerConfigBuilder, PLAYREADY_CUSTOM_DATA_KEY};
//! use drm_session::domain::PLAYREADY_UUID;
//!
//! let config = SessionManagerConfigBuilder::new()
//!     .scheme_id(PLAYREADY_UUID)
//!     .key_request_parameter(PLAYREADY_CUSTOM_DATA_KEY, "tenant=42")
//!     .build()?;
//! ```

use crate::domain::WIDEVINE_UUID;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Key under which PlayReady custom data travels in the optional key request
/// parameters.
pub const PLAYREADY_CUSTOM_DATA_KEY: &str = "PRCustomData";

/// Default name of the request worker thread.
pub const DEFAULT_WORKER_THREAD_NAME: &str = "drm-request-worker";

/// Session manager configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionManagerConfig {
    /// Protection scheme the manager opens sessions for.
    pub scheme_id: Uuid,

    /// Passed as-is to every key request. `None` sends no parameters.
    pub optional_key_request_parameters: Option<HashMap<String, String>>,

    /// Name given to each request worker thread.
    pub worker_thread_name: String,
}

impl Default for SessionManagerConfig {
    fn default() -> Self {
        Self {
            scheme_id: WIDEVINE_UUID,
            optional_key_request_parameters: None,
            worker_thread_name: DEFAULT_WORKER_THREAD_NAME.to_string(),
        }
    }
}

impl SessionManagerConfig {
    /// Default configuration for `scheme_id`.
    pub fn for_scheme(scheme_id: Uuid) -> Self {
        Self {
            scheme_id,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheme_id.is_nil() {
            return Err(ConfigError::NilSchemeId);
        }
        if self.worker_thread_name.trim().is_empty() {
            return Err(ConfigError::EmptyWorkerName);
        }
        if let Some(parameters) = &self.optional_key_request_parameters {
            if parameters.keys().any(|k| k.is_empty()) {
                return Err(ConfigError::EmptyParameterKey);
            }
        }
        Ok(())
    }

    /// Builder-style method to set the key request parameters
    pub fn with_key_request_parameters(mut self, parameters: HashMap<String, String>) -> Self {
        self.optional_key_request_parameters = Some(parameters);
        self
    }

    /// Builder-style method to set the worker thread name
    pub fn with_worker_thread_name(mut self, name: impl Into<String>) -> Self {
        self.worker_thread_name = name.into();
        self
    }
}

/// Builder for SessionManagerConfig with validation
#[derive(Default)]
pub struct SessionManagerConfigBuilder {
    scheme_id: Option<Uuid>,
    parameters: Option<HashMap<String, String>>,
    worker_thread_name: Option<String>,
}

impl SessionManagerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scheme_id(mut self, scheme_id: Uuid) -> Self {
        self.scheme_id = Some(scheme_id);
        self
    }

    /// Add one optional key request parameter
    pub fn key_request_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn worker_thread_name(mut self, name: impl Into<String>) -> Self {
        self.worker_thread_name = Some(name.into());
        self
    }

    /// Build the configuration, validating all parameters
    pub fn build(self) -> Result<SessionManagerConfig, ConfigError> {
        let defaults = SessionManagerConfig::default();

        let config = SessionManagerConfig {
            scheme_id: self.scheme_id.unwrap_or(defaults.scheme_id),
            optional_key_request_parameters: self.parameters,
            worker_thread_name: self
                .worker_thread_name
                .unwrap_or(defaults.worker_thread_name),
        };
        config.validate()?;
        Ok(config)
    }
}
