//! Engine event relay
//!
//! The security engine raises events on threads it owns. The relay forwards
//! each one as a single [`SessionMessage::Engine`] to the inbound queue of
//! the current open lifetime and performs no interpretation.

use crate::events::{DrmEvent, SessionMessage};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::trace;

/// Thread-safe handle given to the security engine once, at construction.
///
/// Between lifetimes the relay is detached and events are dropped.
#[derive(Clone, Default)]
pub struct EngineEventRelay {
    target: Arc<Mutex<Option<mpsc::UnboundedSender<SessionMessage>>>>,
}

impl EngineEventRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward `event` to the owning context.
    ///
    /// Returns `false` if no open lifetime is listening.
    pub fn relay(&self, event: DrmEvent) -> bool {
        let target = self.target.lock();
        match target.as_ref() {
            Some(sender) => {
                let delivered = sender.send(SessionMessage::Engine(event)).is_ok();
                trace!(?event, delivered, "Engine event relayed");
                delivered
            }
            None => {
                trace!(?event, "Engine event dropped (no open session)");
                false
            }
        }
    }

    /// Whether a lifetime is currently attached.
    pub fn is_attached(&self) -> bool {
        self.target.lock().is_some()
    }

    pub(crate) fn attach(&self, sender: mpsc::UnboundedSender<SessionMessage>) {
        *self.target.lock() = Some(sender);
    }

    pub(crate) fn detach(&self) {
        self.target.lock().take();
    }
}

impl std::fmt::Debug for EngineEventRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineEventRelay")
            .field("attached", &self.is_attached())
            .finish()
    }
}
