//! Error types for the DRM session manager
//!
//! `DrmError` is the taxonomy reported to consumers. `EngineError` and
//! `CallbackError` are what the collaborators return; both convert into
//! `DrmError` at the boundary.

use crate::domain::SessionState;
use thiserror::Error;
use uuid::Uuid;

/// Why the security engine could not be instantiated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitializationReason {
    /// The engine does not support the requested scheme.
    UnsupportedScheme,
    /// The engine supports the scheme but failed to instantiate.
    InstantiationError,
}

/// Failures reported by the session manager.
///
/// Cloned into the listener notification and kept as the last error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DrmError {
    /// Engine unsupported or failed to instantiate. Permanent.
    #[error("Security engine initialization failed ({reason:?}): {detail}")]
    Initialization {
        reason: InitializationReason,
        detail: String,
    },

    /// The init data carries no scheme data for the configured scheme.
    #[error("Media does not support scheme {scheme_id}")]
    Configuration { scheme_id: Uuid },

    /// The device must be provisioned before the operation can proceed.
    #[error("Device not provisioned")]
    NotProvisioned,

    /// A provisioning or key request failed, or the server denied it.
    #[error("Server request failed: {reason}")]
    Server { reason: String },

    /// The engine signalled that the session keys expired.
    #[error("Session keys expired")]
    KeysExpired,

    /// Any other failure opening or keying a session.
    #[error("Session failure: {reason}")]
    Session { reason: String },

    /// Operation called in a state that does not permit it.
    #[error("{operation} is not permitted in state {state:?}")]
    IllegalState {
        operation: &'static str,
        state: SessionState,
    },
}

impl DrmError {
    /// Whether this failure is recovered by provisioning the device.
    pub fn is_not_provisioned(&self) -> bool {
        matches!(self, DrmError::NotProvisioned)
    }
}

/// Result type for session manager operations
pub type DrmResult<T> = Result<T, DrmError>;

/// Errors returned by a [`SecurityEngine`](crate::ports::SecurityEngine).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("Device not provisioned")]
    NotProvisioned,

    #[error("Denied by server: {0}")]
    DeniedByServer(String),

    #[error("Unsupported scheme: {0}")]
    UnsupportedScheme(Uuid),

    #[error("Engine failure: {0}")]
    Failed(String),
}

impl From<EngineError> for DrmError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotProvisioned => DrmError::NotProvisioned,
            EngineError::DeniedByServer(reason) => DrmError::Server { reason },
            EngineError::UnsupportedScheme(scheme_id) => DrmError::Initialization {
                reason: InitializationReason::UnsupportedScheme,
                detail: scheme_id.to_string(),
            },
            EngineError::Failed(reason) => DrmError::Session { reason },
        }
    }
}

/// Errors returned by a [`DrmRequestCallback`](crate::ports::DrmRequestCallback).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CallbackError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("HTTP status {status}")]
    Status { status: u16 },

    #[error("Timeout")]
    Timeout,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<CallbackError> for DrmError {
    fn from(err: CallbackError) -> Self {
        DrmError::Server {
            reason: err.to_string(),
        }
    }
}

/// Invalid [`SessionManagerConfig`](crate::config::SessionManagerConfig).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Scheme id must not be nil")]
    NilSchemeId,

    #[error("Worker thread name must not be empty")]
    EmptyWorkerName,

    #[error("Optional key request parameter has an empty key")]
    EmptyParameterKey,
}
