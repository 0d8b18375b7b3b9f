//! Messages delivered to the owning context

use crate::domain::RequestKind;
use crate::error::DrmError;
use crate::events::DrmEvent;

/// Inbound message for the session manager.
///
/// Request failures travel as values; nothing crossing this channel is a
/// panic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionMessage {
    /// Outcome of a provisioning request
    ProvisionResponse(Result<Vec<u8>, DrmError>),
    /// Outcome of a key request
    KeyResponse(Result<Vec<u8>, DrmError>),
    /// Event relayed from the security engine
    Engine(DrmEvent),
}

impl SessionMessage {
    /// Wrap a worker result for the request `kind` it answers.
    pub fn response(kind: RequestKind, result: Result<Vec<u8>, DrmError>) -> Self {
        match kind {
            RequestKind::Provision => SessionMessage::ProvisionResponse(result),
            RequestKind::Keys => SessionMessage::KeyResponse(result),
        }
    }
}
