//! Asynchronous security engine events

use serde::{Deserialize, Serialize};

/// Event raised by the security engine on its own thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DrmEvent {
    /// The device must be provisioned again.
    ProvisioningRequired,
    /// The session needs a fresh key request.
    KeyRequired,
    /// The session keys expired.
    KeyExpired,
    /// Vendor-specific event; carries the raw code.
    Vendor(i32),
}

impl DrmEvent {
    /// Map a platform event code (1 = provisioning required, 2 = key
    /// required, 3 = key expired) to an event.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => DrmEvent::ProvisioningRequired,
            2 => DrmEvent::KeyRequired,
            3 => DrmEvent::KeyExpired,
            other => DrmEvent::Vendor(other),
        }
    }
}
