//! Listener notification delivery
//!
//! Notifications are queued to a single task on a runtime chosen by the
//! caller, so the listener never runs inside a session manager call and sees
//! notifications one at a time in the order they were posted.

use crate::error::DrmError;
use crate::ports::DrmSessionListener;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::trace;

/// Notification queued for the listener task.
#[derive(Debug)]
enum Notification {
    KeysLoaded,
    Error(DrmError),
}

/// Posts listener callbacks onto the designated runtime.
///
/// Clones share one delivery task. The task exits once every clone is
/// dropped and the queue is drained.
#[derive(Clone)]
pub struct ListenerDispatcher {
    notifications: mpsc::UnboundedSender<Notification>,
}

impl ListenerDispatcher {
    /// Spawn the delivery task for `listener` on `handle`.
    pub fn new(handle: Handle, listener: Arc<dyn DrmSessionListener>) -> Self {
        let (notifications, mut inbound) = mpsc::unbounded_channel();
        handle.spawn(async move {
            while let Some(notification) = inbound.recv().await {
                match notification {
                    Notification::KeysLoaded => listener.on_drm_keys_loaded(),
                    Notification::Error(error) => listener.on_drm_session_manager_error(&error),
                }
            }
            trace!("Listener delivery task exiting");
        });
        Self { notifications }
    }

    /// Dispatch onto the runtime the caller is currently running in.
    ///
    /// Returns `None` outside a tokio runtime.
    pub fn on_current_runtime(listener: Arc<dyn DrmSessionListener>) -> Option<Self> {
        Handle::try_current()
            .ok()
            .map(|handle| Self::new(handle, listener))
    }

    pub fn keys_loaded(&self) {
        trace!("Posting keys-loaded notification");
        self.post(Notification::KeysLoaded);
    }

    pub fn error(&self, error: &DrmError) {
        trace!(error = %error, "Posting error notification");
        self.post(Notification::Error(error.clone()));
    }

    fn post(&self, notification: Notification) {
        if self.notifications.send(notification).is_err() {
            trace!("Listener runtime gone, notification dropped");
        }
    }
}

impl std::fmt::Debug for ListenerDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerDispatcher").finish_non_exhaustive()
    }
}
