//! Session state machine
//!
//! State Machine:
//! ```text
//!                 open()                success
//! [CLOSED] ──────────────→ [OPENING] ───────────→ [OPENED] ──keys loaded──→ [OPENED_WITH_KEYS]
//!    ↑                         │                    ↑  ↑                           │
//!    │                         │ failure            │  └──── keys expired ─────────┤
//!    │                         ↓                    │                              │
//!    │                     [ERROR] ←── failure ─────┘      provisioning required ──┘
//!    │                         │                                 (→ OPENED)
//!    └──────── close() ────────┴──────────── (from any state) ─────────────────────
//! ```
//!
//! A failure while `OpenedWithKeys` leaves the state unchanged: the consumer
//! already holds usable keys.

use serde::{Deserialize, Serialize};

/// Status of the session manager.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// No consumer holds the session. Initial and terminal.
    #[default]
    Closed,
    /// An engine session is being created, possibly waiting on provisioning.
    Opening,
    /// Engine session and decryption context exist; no keys yet.
    Opened,
    /// Keys are loaded; the decryption context can decrypt.
    OpenedWithKeys,
    /// A fatal failure occurred. Only `close()` leaves this state.
    Error,
}

/// Inputs driving [`SessionState::transition`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionInput {
    /// First consumer opened the manager.
    Open,
    /// The engine created a session and its decryption context.
    SessionOpened,
    /// A key response was accepted by the engine.
    KeysLoaded,
    /// The engine reported that the session keys expired.
    KeysExpired,
    /// The engine requires the device to be provisioned again.
    ProvisioningRequired,
    /// Any reported failure other than key expiry.
    Failure,
    /// Last consumer closed the manager.
    Close,
}

/// Kind of request travelling through the worker pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    Provision,
    Keys,
}

impl SessionState {
    /// Calculate the next state for `input`.
    ///
    /// Pure and deterministic. Returns `None` when the input is not legal in
    /// the current state, in which case callers must leave the state as is.
    pub fn transition(self, input: SessionInput) -> Option<SessionState> {
        use SessionInput as I;
        use SessionState as S;

        match (self, input) {
            (_, I::Close) => Some(S::Closed),

            (S::Closed, I::Open) => Some(S::Opening),

            (S::Opening, I::SessionOpened) => Some(S::Opened),

            (S::Opened | S::OpenedWithKeys, I::KeysLoaded) => Some(S::OpenedWithKeys),

            (S::OpenedWithKeys, I::KeysExpired) => Some(S::Opened),

            (S::Opened | S::OpenedWithKeys, I::ProvisioningRequired) => Some(S::Opened),

            (S::OpenedWithKeys, I::Failure) => Some(S::OpenedWithKeys),
            (_, I::Failure) => Some(S::Error),

            _ => None,
        }
    }

    /// Whether an engine session and decryption context exist.
    pub fn has_session(self) -> bool {
        matches!(self, SessionState::Opened | SessionState::OpenedWithKeys)
    }

    /// Whether a response of `kind` may still be applied in this state.
    ///
    /// Provisioning can be in flight while opening or after the session
    /// exists; key requests are only issued once a session exists.
    pub fn accepts_response(self, kind: RequestKind) -> bool {
        match kind {
            RequestKind::Provision => matches!(
                self,
                SessionState::Opening | SessionState::Opened | SessionState::OpenedWithKeys
            ),
            RequestKind::Keys => self.has_session(),
        }
    }
}
