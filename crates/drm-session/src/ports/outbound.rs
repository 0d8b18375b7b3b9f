//! Outbound Ports (Driven Ports)
//!
//! Collaborators the session manager depends on. None of them are
//! implemented in this crate.

use crate::adapters::EngineEventRelay;
use crate::domain::{KeyType, SchemeData, SessionId};
use crate::error::{CallbackError, DrmError, EngineError};
use crate::events::{KeyRequest, ProvisionRequest};
use std::collections::HashMap;
use uuid::Uuid;

/// Security engine (Driven Port)
///
/// Platform or vendor component owning native sessions and crypto. Called
/// only from the owning context, except for the event relay which the
/// engine may invoke from any thread.
pub trait SecurityEngine {
    /// Decryption context derived from an engine session
    type Crypto: DecryptionContext;

    /// Register the relay the engine raises asynchronous events through.
    fn set_event_relay(&self, relay: EngineEventRelay);

    /// Open a native session.
    ///
    /// Returns `EngineError::NotProvisioned` when the device needs
    /// provisioning first.
    fn open_session(&self) -> Result<SessionId, EngineError>;

    /// Close a native session.
    fn close_session(&self, session_id: &SessionId);

    /// Derive a provisioning request.
    fn provision_request(&self) -> ProvisionRequest;

    /// Consume a provisioning response.
    fn provide_provision_response(&self, response: &[u8]) -> Result<(), EngineError>;

    /// Derive a key request for `session_id`.
    fn key_request(
        &self,
        session_id: &SessionId,
        scheme_data: &SchemeData,
        key_type: KeyType,
        optional_parameters: Option<&HashMap<String, String>>,
    ) -> Result<KeyRequest, EngineError>;

    /// Consume a key response for `session_id`.
    fn provide_key_response(&self, session_id: &SessionId, response: &[u8])
        -> Result<(), EngineError>;

    /// Derive the decryption context bound to `session_id`.
    fn derive_decryption_context(&self, session_id: &SessionId)
        -> Result<Self::Crypto, EngineError>;

    fn property_string(&self, key: &str) -> Result<String, EngineError>;

    fn property_byte_array(&self, key: &str) -> Result<Vec<u8>, EngineError>;

    fn set_property_string(&self, key: &str, value: &str) -> Result<(), EngineError>;

    fn set_property_byte_array(&self, key: &str, value: &[u8]) -> Result<(), EngineError>;
}

/// Decryption context handed to the media pipeline.
pub trait DecryptionContext {
    /// Whether content of `mime_type` must use a secure decoder.
    fn requires_secure_decoder_component(&self, mime_type: &str) -> bool;
}

/// Creates the security engine for a scheme (Driven Port)
///
/// Implemented for any `Fn(Uuid) -> Result<E, EngineError>`.
pub trait SecurityEngineFactory {
    type Engine: SecurityEngine;

    /// Instantiate the engine.
    ///
    /// `EngineError::UnsupportedScheme` marks the scheme as unsupported; any
    /// other error is an instantiation failure.
    fn create(&self, scheme_id: Uuid) -> Result<Self::Engine, EngineError>;
}

impl<F, E> SecurityEngineFactory for F
where
    F: Fn(Uuid) -> Result<E, EngineError>,
    E: SecurityEngine,
{
    type Engine = E;

    fn create(&self, scheme_id: Uuid) -> Result<E, EngineError> {
        self(scheme_id)
    }
}

/// Executes provisioning and key requests against remote servers (Driven Port)
///
/// Both methods block for the whole exchange. They run on the request
/// worker thread, never on the owning context.
pub trait DrmRequestCallback: Send + Sync + 'static {
    fn execute_provision_request(
        &self,
        scheme_id: Uuid,
        request: &ProvisionRequest,
    ) -> Result<Vec<u8>, CallbackError>;

    fn execute_key_request(
        &self,
        scheme_id: Uuid,
        request: &KeyRequest,
    ) -> Result<Vec<u8>, CallbackError>;
}

/// Receives session manager notifications on the designated runtime.
pub trait DrmSessionListener: Send + Sync + 'static {
    /// Keys were loaded into the session.
    fn on_drm_keys_loaded(&self);

    /// A failure was reported. The session may still be usable if it
    /// already held keys.
    fn on_drm_session_manager_error(&self, error: &DrmError);
}
