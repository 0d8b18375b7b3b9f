//! Requests posted to the background worker

use crate::domain::RequestKind;
use serde::{Deserialize, Serialize};

/// Provisioning request derived by the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionRequest {
    /// Opaque request body
    pub data: Vec<u8>,
    /// Provisioning server suggested by the engine
    pub default_url: String,
}

/// Key (license) request derived by the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRequest {
    /// Opaque request body
    pub data: Vec<u8>,
    /// License server suggested by the engine, may be empty
    pub default_url: String,
}

/// A request in flight between the owning context and the worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PendingRequest {
    Provision(ProvisionRequest),
    Keys(KeyRequest),
}

impl PendingRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            PendingRequest::Provision(_) => RequestKind::Provision,
            PendingRequest::Keys(_) => RequestKind::Keys,
        }
    }
}
