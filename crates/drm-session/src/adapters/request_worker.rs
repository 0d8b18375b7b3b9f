//! Background request worker
//!
//! One dedicated OS thread per open lifetime. It takes [`PendingRequest`]s
//! from its inbound queue, runs the blocking [`DrmRequestCallback`] call and
//! posts the outcome back to the owning context as a [`SessionMessage`].
//!
//! ```text
//! owning context ──PendingRequest──→ [worker thread] ──callback (blocking)──→ server
//!       ↑                                   │
//!       └────────── SessionMessage ─────────┘
//! ```
//!
//! The worker never touches session state. Callback errors and panics are
//! converted into `DrmError::Server` values.

use crate::error::{DrmError, DrmResult};
use crate::events::{PendingRequest, SessionMessage};
use crate::ports::DrmRequestCallback;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Handle to the worker thread of one open lifetime.
///
/// Dropping the handle cancels every queued request. A callback already
/// running cannot be interrupted; its response is discarded.
pub struct RequestWorker {
    requests: mpsc::UnboundedSender<PendingRequest>,
    cancelled: Arc<AtomicBool>,
}

impl RequestWorker {
    /// Spawn the worker thread.
    pub fn spawn<C>(
        thread_name: &str,
        scheme_id: Uuid,
        callback: Arc<C>,
        responses: mpsc::UnboundedSender<SessionMessage>,
    ) -> DrmResult<Self>
    where
        C: DrmRequestCallback,
    {
        let (requests, inbound) = mpsc::unbounded_channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let worker_cancelled = Arc::clone(&cancelled);

        // Detached: the thread ends when the request channel closes.
        thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || run(scheme_id, callback, inbound, responses, worker_cancelled))
            .map_err(|e| DrmError::Session {
                reason: format!("failed to spawn request worker: {}", e),
            })?;

        debug!(thread = thread_name, "Request worker started");

        Ok(Self {
            requests,
            cancelled,
        })
    }

    /// Queue a request. Fails only if the worker thread has exited.
    pub fn post(&self, request: PendingRequest) -> DrmResult<()> {
        let kind = request.kind();
        self.requests.send(request).map_err(|_| DrmError::Session {
            reason: format!("request worker stopped, {:?} request not sent", kind),
        })?;
        debug!(?kind, "Request posted to worker");
        Ok(())
    }

    /// Cancel queued requests and let the thread exit.
    ///
    /// Does not join: the thread may be blocked inside a callback.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for RequestWorker {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        debug!("Request worker shut down");
    }
}

fn run<C>(
    scheme_id: Uuid,
    callback: Arc<C>,
    mut requests: mpsc::UnboundedReceiver<PendingRequest>,
    responses: mpsc::UnboundedSender<SessionMessage>,
    cancelled: Arc<AtomicBool>,
) where
    C: DrmRequestCallback,
{
    while let Some(request) = requests.blocking_recv() {
        if cancelled.load(Ordering::Acquire) {
            break;
        }

        let kind = request.kind();
        let result = execute(callback.as_ref(), scheme_id, &request);
        if let Err(e) = &result {
            warn!(?kind, error = %e, "Request failed");
        }

        if cancelled.load(Ordering::Acquire) {
            debug!(?kind, "Response discarded, worker cancelled");
            break;
        }
        if responses.send(SessionMessage::response(kind, result)).is_err() {
            debug!(?kind, "Response discarded, owning context gone");
            break;
        }
    }
    debug!("Request worker exiting");
}

fn execute<C>(callback: &C, scheme_id: Uuid, request: &PendingRequest) -> Result<Vec<u8>, DrmError>
where
    C: DrmRequestCallback,
{
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| match request {
        PendingRequest::Provision(r) => callback.execute_provision_request(scheme_id, r),
        PendingRequest::Keys(r) => callback.execute_key_request(scheme_id, r),
    }));

    match outcome {
        Ok(result) => result.map_err(DrmError::from),
        Err(payload) => Err(DrmError::Server {
            reason: format!("request callback panicked: {}", panic_message(&*payload)),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallbackError;
    use crate::events::{KeyRequest, ProvisionRequest};
    use std::time::Duration;

    struct EchoCallback;

    impl DrmRequestCallback for EchoCallback {
        fn execute_provision_request(
            &self,
            _scheme_id: Uuid,
            request: &ProvisionRequest,
        ) -> Result<Vec<u8>, CallbackError> {
            Ok(request.data.clone())
        }

        fn execute_key_request(
            &self,
            _scheme_id: Uuid,
            request: &KeyRequest,
        ) -> Result<Vec<u8>, CallbackError> {
            if request.data.is_empty() {
                panic!("empty key request");
            }
            Err(CallbackError::Status { status: 403 })
        }
    }

    fn provision(data: &[u8]) -> PendingRequest {
        PendingRequest::Provision(ProvisionRequest {
            data: data.to_vec(),
            default_url: String::new(),
        })
    }

    fn keys(data: &[u8]) -> PendingRequest {
        PendingRequest::Keys(KeyRequest {
            data: data.to_vec(),
            default_url: String::new(),
        })
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<SessionMessage>) -> SessionMessage {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("worker response within timeout")
            .expect("channel open")
    }

    #[tokio::test]
    async fn test_responses_in_fifo_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let worker = RequestWorker::spawn("test-worker", Uuid::nil(), Arc::new(EchoCallback), tx)
            .unwrap();

        worker.post(provision(b"first")).unwrap();
        worker.post(keys(b"second")).unwrap();

        assert_eq!(
            next(&mut rx).await,
            SessionMessage::ProvisionResponse(Ok(b"first".to_vec()))
        );
        match next(&mut rx).await {
            SessionMessage::KeyResponse(Err(DrmError::Server { reason })) => {
                assert!(reason.contains("403"))
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_callback_panic_becomes_server_failure() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let worker = RequestWorker::spawn("test-worker", Uuid::nil(), Arc::new(EchoCallback), tx)
            .unwrap();

        worker.post(keys(b"")).unwrap();

        match next(&mut rx).await {
            SessionMessage::KeyResponse(Err(DrmError::Server { reason })) => {
                assert!(reason.contains("empty key request"))
            }
            other => panic!("unexpected message {:?}", other),
        }

        // The thread survives the panic.
        worker.post(provision(b"again")).unwrap();
        assert_eq!(
            next(&mut rx).await,
            SessionMessage::ProvisionResponse(Ok(b"again".to_vec()))
        );
    }

    #[tokio::test]
    async fn test_shutdown_closes_response_channel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let worker = RequestWorker::spawn("test-worker", Uuid::nil(), Arc::new(EchoCallback), tx)
            .unwrap();
        worker.shutdown();

        let closed = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("worker exits within timeout");
        assert!(closed.is_none());
    }
}
