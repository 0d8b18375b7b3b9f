//! Streaming DRM session manager service
//!
//! Owns every piece of mutable session state and is the only writer of
//! [`SessionState`]. Blocking network exchanges run on the [`RequestWorker`];
//! their results and engine events come back through one inbound queue per
//! open lifetime, drained on the owning context by
//! [`dispatch_pending`](DrmSessionManager::dispatch_pending) or
//! [`dispatch_next`](DrmSessionManager::dispatch_next).
//!
//! ```text
//! open() ──→ [OPENING] ──open_session──→ [OPENED] ──key request──→ worker
//!                │                          ↑                         │
//!         not provisioned                   │                    key response
//!                ↓                          │                         ↓
//!      provisioning request ──→ worker ──→ retry (once)      [OPENED_WITH_KEYS]
//! ```

use crate::adapters::{EngineEventRelay, ListenerDispatcher, RequestWorker};
use crate::config::SessionManagerConfig;
use crate::domain::{
    DrmInitData, ExecutionContext, KeyType, RequestKind, SchemeData, SessionId, SessionInput,
    SessionState,
};
use crate::error::{ConfigError, DrmError, DrmResult, EngineError, InitializationReason};
use crate::events::{DrmEvent, PendingRequest, SessionMessage};
use crate::metrics::SessionMetrics;
use crate::ports::{
    DecryptionContext, DrmRequestCallback, DrmSessionApi, SecurityEngine, SecurityEngineFactory,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Engine session plus the decryption context derived from it.
struct ActiveSession<X> {
    id: SessionId,
    crypto: X,
}

/// Channels and worker that exist for one open lifetime.
struct OpenLifetime {
    inbound: mpsc::UnboundedReceiver<SessionMessage>,
    worker: RequestWorker,
}

/// Reference-counted DRM session manager
///
/// Not `Sync`; every method except the property passthrough belongs to the
/// owning context bound by the first `open()`.
pub struct DrmSessionManager<E, C>
where
    E: SecurityEngine,
    C: DrmRequestCallback,
{
    config: SessionManagerConfig,
    engine: Option<E>,
    callback: Arc<C>,
    listener: Option<ListenerDispatcher>,
    relay: EngineEventRelay,
    metrics: Arc<SessionMetrics>,

    owner: Option<ExecutionContext>,
    open_count: u32,
    state: SessionState,
    provisioning_in_progress: bool,
    initialization_error: Option<DrmError>,
    last_error: Option<DrmError>,

    lifetime: Option<OpenLifetime>,
    scheme_data: Option<SchemeData>,
    session: Option<ActiveSession<E::Crypto>>,
}

impl<E, C> DrmSessionManager<E, C>
where
    E: SecurityEngine,
    C: DrmRequestCallback,
{
    /// Create a manager and instantiate its security engine.
    ///
    /// An engine that cannot be instantiated does not fail construction: the
    /// manager starts in `Error` with an `Initialization` failure and every
    /// `open()` returns that failure. Only an invalid configuration is
    /// rejected here.
    pub fn new<F>(
        config: SessionManagerConfig,
        factory: &F,
        callback: Arc<C>,
        listener: Option<ListenerDispatcher>,
    ) -> Result<Self, ConfigError>
    where
        F: SecurityEngineFactory<Engine = E>,
    {
        config.validate()?;

        let relay = EngineEventRelay::new();
        let (engine, state, initialization_error) = match factory.create(config.scheme_id) {
            Ok(engine) => {
                engine.set_event_relay(relay.clone());
                (Some(engine), SessionState::Closed, None)
            }
            Err(e) => {
                let reason = match e {
                    EngineError::UnsupportedScheme(_) => InitializationReason::UnsupportedScheme,
                    _ => InitializationReason::InstantiationError,
                };
                let error = DrmError::Initialization {
                    reason,
                    detail: e.to_string(),
                };
                warn!(scheme_id = %config.scheme_id, error = %error, "Security engine unavailable");
                (None, SessionState::Error, Some(error))
            }
        };

        Ok(Self {
            config,
            engine,
            callback,
            listener,
            relay,
            metrics: Arc::new(SessionMetrics::new()),
            owner: None,
            open_count: 0,
            state,
            provisioning_in_progress: false,
            last_error: initialization_error.clone(),
            initialization_error,
            lifetime: None,
            scheme_data: None,
            session: None,
        })
    }

    /// Number of consumers currently holding the session
    pub fn open_count(&self) -> u32 {
        self.open_count
    }

    /// Counters for this manager
    pub fn metrics(&self) -> Arc<SessionMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Relay handed to the security engine
    pub fn event_relay(&self) -> &EngineEventRelay {
        &self.relay
    }

    /// Handle every message already waiting in the inbound queue.
    ///
    /// Never blocks. Returns the number of messages handled.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Some(message) = self
            .lifetime
            .as_mut()
            .and_then(|lifetime| lifetime.inbound.try_recv().ok())
        {
            self.handle_message(message);
            handled += 1;
        }
        handled
    }

    /// Wait for the next inbound message and handle it.
    ///
    /// Returns `false` without waiting when no lifetime is open.
    pub async fn dispatch_next(&mut self) -> bool {
        let message = match self.lifetime.as_mut() {
            Some(lifetime) => lifetime.inbound.recv().await,
            None => return false,
        };
        match message {
            Some(message) => {
                self.handle_message(message);
                true
            }
            None => false,
        }
    }

    /// Read a string property from the security engine.
    ///
    /// Works in any session state, including `Closed`. Fails with the
    /// `Initialization` error when the engine could not be instantiated, and
    /// with the engine's own failure otherwise.
    pub fn property_string(&self, key: &str) -> DrmResult<String> {
        Ok(self.engine()?.property_string(key)?)
    }

    /// Read a byte array property. Same state rules as
    /// [`property_string`](Self::property_string).
    pub fn property_byte_array(&self, key: &str) -> DrmResult<Vec<u8>> {
        Ok(self.engine()?.property_byte_array(key)?)
    }

    /// Set a string property on the security engine.
    ///
    /// Works in any session state; `Initialization` when there is no engine.
    pub fn set_property_string(&self, key: &str, value: &str) -> DrmResult<()> {
        Ok(self.engine()?.set_property_string(key, value)?)
    }

    /// Set a byte array property. Same state rules as
    /// [`set_property_string`](Self::set_property_string).
    pub fn set_property_byte_array(&self, key: &str, value: &[u8]) -> DrmResult<()> {
        Ok(self.engine()?.set_property_byte_array(key, value)?)
    }

    fn engine(&self) -> DrmResult<&E> {
        self.engine.as_ref().ok_or_else(|| self.unavailable())
    }

    fn unavailable(&self) -> DrmError {
        self.initialization_error
            .clone()
            .unwrap_or_else(|| DrmError::Initialization {
                reason: InitializationReason::InstantiationError,
                detail: "security engine unavailable".to_string(),
            })
    }

    fn handle_message(&mut self, message: SessionMessage) {
        match message {
            SessionMessage::ProvisionResponse(result) => self.on_provision_response(result),
            SessionMessage::KeyResponse(result) => self.on_key_response(result),
            SessionMessage::Engine(event) => self.on_engine_event(event),
        }
    }

    fn apply(&mut self, input: SessionInput) -> bool {
        match self.state.transition(input) {
            Some(next) => {
                if next != self.state {
                    debug!(from = ?self.state, to = ?next, ?input, "State transition");
                }
                self.state = next;
                true
            }
            None => {
                debug!(state = ?self.state, ?input, "Transition rejected");
                false
            }
        }
    }

    fn open_internal(&mut self, allow_provisioning: bool) {
        let Some(engine) = self.engine.as_ref() else {
            return;
        };

        let opened = engine.open_session().and_then(|id| {
            match engine.derive_decryption_context(&id) {
                Ok(crypto) => Ok(ActiveSession { id, crypto }),
                Err(e) => {
                    engine.close_session(&id);
                    Err(e)
                }
            }
        });

        match opened {
            Ok(session) => {
                info!(session_id = %session.id, "Engine session opened");
                self.session = Some(session);
                self.metrics.record_session_opened();
                self.apply(SessionInput::SessionOpened);
                self.post_key_request();
            }
            Err(EngineError::NotProvisioned) if allow_provisioning => {
                debug!("Device not provisioned, provisioning before open");
                self.post_provision_request();
            }
            Err(e) => self.on_error(e.into()),
        }
    }

    fn post_provision_request(&mut self) {
        if self.provisioning_in_progress {
            debug!("Provisioning already in flight");
            return;
        }
        let (Some(engine), Some(lifetime)) = (self.engine.as_ref(), self.lifetime.as_ref()) else {
            return;
        };

        let request = engine.provision_request();
        match lifetime.worker.post(PendingRequest::Provision(request)) {
            Ok(()) => {
                self.provisioning_in_progress = true;
                self.metrics.record_provision_request();
            }
            Err(e) => self.on_error(e),
        }
    }

    fn post_key_request(&mut self) {
        let (Some(engine), Some(session), Some(scheme_data), Some(lifetime)) = (
            self.engine.as_ref(),
            self.session.as_ref(),
            self.scheme_data.as_ref(),
            self.lifetime.as_ref(),
        ) else {
            debug!(state = ?self.state, "No session to request keys for");
            return;
        };

        let posted = engine
            .key_request(
                &session.id,
                scheme_data,
                KeyType::Streaming,
                self.config.optional_key_request_parameters.as_ref(),
            )
            .map_err(DrmError::from)
            .and_then(|request| lifetime.worker.post(PendingRequest::Keys(request)));

        match posted {
            Ok(()) => self.metrics.record_key_request(),
            Err(e) => self.on_keys_error(e),
        }
    }

    fn on_provision_response(&mut self, result: Result<Vec<u8>, DrmError>) {
        self.provisioning_in_progress = false;
        if !self.accept_response(RequestKind::Provision) {
            return;
        }

        let response = match result {
            Ok(response) => response,
            Err(e) => return self.on_error(e),
        };
        let Some(engine) = self.engine.as_ref() else {
            return;
        };

        match engine.provide_provision_response(&response) {
            Ok(()) => {
                debug!(state = ?self.state, "Provisioning complete");
                if self.state == SessionState::Opening {
                    self.open_internal(false);
                } else {
                    self.post_key_request();
                }
            }
            Err(e) => self.on_error(e.into()),
        }
    }

    fn on_key_response(&mut self, result: Result<Vec<u8>, DrmError>) {
        if !self.accept_response(RequestKind::Keys) {
            return;
        }

        let response = match result {
            Ok(response) => response,
            Err(e) => return self.on_keys_error(e),
        };
        let (Some(engine), Some(session)) = (self.engine.as_ref(), self.session.as_ref()) else {
            return;
        };

        match engine.provide_key_response(&session.id, &response) {
            Ok(()) => {
                info!(session_id = %session.id, "Keys loaded");
                self.apply(SessionInput::KeysLoaded);
                self.last_error = None;
                self.metrics.record_keys_loaded();
                if let Some(listener) = &self.listener {
                    listener.keys_loaded();
                }
            }
            Err(e) => self.on_keys_error(e.into()),
        }
    }

    /// Staleness check shared by both response handlers.
    fn accept_response(&self, kind: RequestKind) -> bool {
        let accepted = self.state.accepts_response(kind);
        if !accepted {
            debug!(?kind, state = ?self.state, "Stale response discarded");
        }
        self.metrics.record_response(!accepted);
        accepted
    }

    fn on_keys_error(&mut self, error: DrmError) {
        if error.is_not_provisioned() {
            self.post_provision_request();
        } else {
            self.on_error(error);
        }
    }

    fn on_engine_event(&mut self, event: DrmEvent) {
        if self.open_count == 0 || !self.state.has_session() {
            debug!(?event, state = ?self.state, "Engine event ignored");
            return;
        }

        match event {
            DrmEvent::KeyRequired => self.post_key_request(),
            DrmEvent::KeyExpired => {
                if self.state == SessionState::OpenedWithKeys {
                    self.on_error(DrmError::KeysExpired);
                } else {
                    debug!(state = ?self.state, "Key expiry ignored without keys");
                }
            }
            DrmEvent::ProvisioningRequired => {
                self.apply(SessionInput::ProvisioningRequired);
                self.post_provision_request();
            }
            DrmEvent::Vendor(code) => debug!(code, "Vendor event ignored"),
        }
    }

    /// Error sink. Records, notifies, then demotes the state unless keys are
    /// already loaded.
    fn on_error(&mut self, error: DrmError) {
        warn!(state = ?self.state, error = %error, "Session manager error");
        self.metrics.record_error();
        if let Some(listener) = &self.listener {
            listener.error(&error);
        }

        let input = match error {
            DrmError::KeysExpired => SessionInput::KeysExpired,
            _ => SessionInput::Failure,
        };
        self.last_error = Some(error);
        self.apply(input);
    }
}

impl<E, C> DrmSessionApi for DrmSessionManager<E, C>
where
    E: SecurityEngine,
    C: DrmRequestCallback,
{
    type Crypto = E::Crypto;

    fn open(&mut self, context: ExecutionContext, init_data: &DrmInitData) -> DrmResult<()> {
        if self.engine.is_none() {
            return Err(self.unavailable());
        }
        match self.owner {
            Some(owner) => assert_eq!(
                owner, context,
                "DrmSessionManager opened from a different execution context"
            ),
            None => self.owner = Some(context),
        }

        self.open_count += 1;
        if self.open_count != 1 {
            debug!(refcount = self.open_count, "Session shared");
            return Ok(());
        }

        let scheme_id = self.config.scheme_id;
        let (responses, inbound) = mpsc::unbounded_channel();
        let worker = match RequestWorker::spawn(
            &self.config.worker_thread_name,
            scheme_id,
            Arc::clone(&self.callback),
            responses.clone(),
        ) {
            Ok(worker) => worker,
            Err(e) => {
                self.on_error(e);
                return Ok(());
            }
        };
        self.relay.attach(responses);
        self.lifetime = Some(OpenLifetime { inbound, worker });

        let Some(scheme_data) = init_data.get(&scheme_id).cloned() else {
            self.on_error(DrmError::Configuration { scheme_id });
            return Ok(());
        };
        self.scheme_data = Some(scheme_data);

        info!(%scheme_id, "Opening DRM session");
        self.apply(SessionInput::Open);
        self.open_internal(true);
        Ok(())
    }

    fn close(&mut self) {
        if self.open_count == 0 {
            warn!("close() without a matching open()");
            return;
        }
        self.open_count -= 1;
        if self.open_count != 0 {
            debug!(refcount = self.open_count, "Session still shared");
            return;
        }

        self.apply(SessionInput::Close);
        self.provisioning_in_progress = false;
        self.relay.detach();
        if let Some(OpenLifetime { inbound, worker }) = self.lifetime.take() {
            worker.shutdown();
            drop(inbound);
        }
        self.scheme_data = None;
        self.last_error = None;
        if let Some(ActiveSession { id, crypto }) = self.session.take() {
            drop(crypto);
            if let Some(engine) = self.engine.as_ref() {
                engine.close_session(&id);
            }
            info!(session_id = %id, "Engine session closed");
            self.metrics.record_session_closed();
        }
    }

    fn state(&self) -> SessionState {
        self.state
    }

    fn error(&self) -> Option<&DrmError> {
        match self.state {
            SessionState::Error | SessionState::OpenedWithKeys => self.last_error.as_ref(),
            _ => None,
        }
    }

    fn decryption_context(&self) -> DrmResult<&E::Crypto> {
        match (&self.session, self.state.has_session()) {
            (Some(session), true) => Ok(&session.crypto),
            _ => Err(DrmError::IllegalState {
                operation: "decryption_context",
                state: self.state,
            }),
        }
    }

    fn requires_secure_decoder_component(&self, mime_type: &str) -> DrmResult<bool> {
        match (&self.session, self.state.has_session()) {
            (Some(session), true) => Ok(session.crypto.requires_secure_decoder_component(mime_type)),
            _ => Err(DrmError::IllegalState {
                operation: "requires_secure_decoder_component",
                state: self.state,
            }),
        }
    }
}
