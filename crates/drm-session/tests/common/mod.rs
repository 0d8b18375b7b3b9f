//! Test doubles shared by the integration tests.
//!
//! - `MockEngine`: in-memory security engine with scripted provisioning
//! - `MockCallback`: request callback, optionally gated so tests decide when
//!   each blocking request returns
//! - `ChannelListener`: forwards listener notifications to a channel

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc as std_mpsc, Arc};
use std::time::Duration;

use drm_session::ports::{
    DecryptionContext, DrmRequestCallback, DrmSessionListener, SecurityEngine,
};
use drm_session::{
    CallbackError, DrmError, DrmEvent, DrmInitData, DrmSessionManager, EngineError,
    EngineEventRelay, KeyRequest, KeyType, ListenerDispatcher, ProvisionRequest, SchemeData,
    SessionId, SessionManagerConfig, WIDEVINE_UUID,
};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

pub const TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Security engine
// =============================================================================

#[derive(Default)]
pub struct EngineLog {
    pub provisioned: bool,
    /// Accept provisioning responses without becoming provisioned
    pub ignore_provisioning: bool,
    /// Reject every provisioning response
    pub reject_provisioning: bool,
    pub next_session: u8,
    pub open_session_calls: usize,
    pub closed_sessions: Vec<SessionId>,
    pub provision_responses: usize,
    pub key_request_parameters: Vec<Option<HashMap<String, String>>>,
    /// Session each accepted key response was applied to
    pub keys_applied: Vec<SessionId>,
    pub properties: HashMap<String, String>,
    pub relay: Option<EngineEventRelay>,
}

#[derive(Clone, Default)]
pub struct MockEngine {
    log: Arc<Mutex<EngineLog>>,
}

impl MockEngine {
    pub fn unprovisioned() -> Self {
        Self::default()
    }

    pub fn provisioned() -> Self {
        let engine = Self::default();
        engine.log.lock().provisioned = true;
        engine
    }

    pub fn log(&self) -> parking_lot::MutexGuard<'_, EngineLog> {
        self.log.lock()
    }

    /// Raise an event the way a platform callback thread would.
    pub fn raise(&self, event: DrmEvent) -> bool {
        let relay = self.log.lock().relay.clone();
        let engine_thread = std::thread::spawn(move || relay.map_or(false, |r| r.relay(event)));
        engine_thread.join().unwrap_or(false)
    }

    /// Factory handing out clones of this engine.
    pub fn factory(&self) -> impl Fn(Uuid) -> Result<MockEngine, EngineError> {
        let engine = self.clone();
        move |_scheme_id| Ok(engine.clone())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct MockCrypto {
    pub session_id: SessionId,
}

impl DecryptionContext for MockCrypto {
    fn requires_secure_decoder_component(&self, mime_type: &str) -> bool {
        mime_type.starts_with("video/")
    }
}

impl SecurityEngine for MockEngine {
    type Crypto = MockCrypto;

    fn set_event_relay(&self, relay: EngineEventRelay) {
        self.log.lock().relay = Some(relay);
    }

    fn open_session(&self) -> Result<SessionId, EngineError> {
        let mut log = self.log.lock();
        log.open_session_calls += 1;
        if !log.provisioned {
            return Err(EngineError::NotProvisioned);
        }
        log.next_session += 1;
        Ok(SessionId::new(vec![log.next_session]))
    }

    fn close_session(&self, session_id: &SessionId) {
        self.log.lock().closed_sessions.push(session_id.clone());
    }

    fn provision_request(&self) -> ProvisionRequest {
        ProvisionRequest {
            data: b"provision-request".to_vec(),
            default_url: "https://provisioning.example".to_string(),
        }
    }

    fn provide_provision_response(&self, response: &[u8]) -> Result<(), EngineError> {
        let mut log = self.log.lock();
        log.provision_responses += 1;
        if log.reject_provisioning || response.is_empty() {
            return Err(EngineError::DeniedByServer("certificate rejected".to_string()));
        }
        log.provisioned = !log.ignore_provisioning;
        Ok(())
    }

    fn key_request(
        &self,
        session_id: &SessionId,
        scheme_data: &SchemeData,
        _key_type: KeyType,
        optional_parameters: Option<&HashMap<String, String>>,
    ) -> Result<KeyRequest, EngineError> {
        let mut log = self.log.lock();
        if !log.provisioned {
            return Err(EngineError::NotProvisioned);
        }
        log.key_request_parameters.push(optional_parameters.cloned());
        let mut data = session_id.as_bytes().to_vec();
        data.extend_from_slice(&scheme_data.data);
        Ok(KeyRequest {
            data,
            default_url: "https://license.example".to_string(),
        })
    }

    fn provide_key_response(
        &self,
        session_id: &SessionId,
        _response: &[u8],
    ) -> Result<(), EngineError> {
        self.log.lock().keys_applied.push(session_id.clone());
        Ok(())
    }

    fn derive_decryption_context(&self, session_id: &SessionId) -> Result<MockCrypto, EngineError> {
        Ok(MockCrypto {
            session_id: session_id.clone(),
        })
    }

    fn property_string(&self, key: &str) -> Result<String, EngineError> {
        self.log
            .lock()
            .properties
            .get(key)
            .cloned()
            .ok_or_else(|| EngineError::Failed(format!("unknown property {}", key)))
    }

    fn property_byte_array(&self, key: &str) -> Result<Vec<u8>, EngineError> {
        self.property_string(key).map(String::into_bytes)
    }

    fn set_property_string(&self, key: &str, value: &str) -> Result<(), EngineError> {
        self.log
            .lock()
            .properties
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn set_property_byte_array(&self, key: &str, value: &[u8]) -> Result<(), EngineError> {
        let value = String::from_utf8(value.to_vec())
            .map_err(|e| EngineError::Failed(e.to_string()))?;
        self.set_property_string(key, &value)
    }
}

// =============================================================================
// Request callback
// =============================================================================

/// Permits for a gated [`MockCallback`]; one permit releases one request.
pub struct Gate(std_mpsc::Sender<()>);

impl Gate {
    pub fn release(&self, requests: usize) {
        for _ in 0..requests {
            let _ = self.0.send(());
        }
    }
}

pub struct MockCallback {
    gate: Option<Mutex<std_mpsc::Receiver<()>>>,
    pub provision_calls: AtomicUsize,
    pub key_calls: AtomicUsize,
    key_outcome: Mutex<Result<Vec<u8>, CallbackError>>,
    panic_on_keys: AtomicBool,
}

impl MockCallback {
    fn with_gate(gate: Option<std_mpsc::Receiver<()>>) -> Self {
        Self {
            gate: gate.map(Mutex::new),
            provision_calls: AtomicUsize::new(0),
            key_calls: AtomicUsize::new(0),
            key_outcome: Mutex::new(Ok(b"license".to_vec())),
            panic_on_keys: AtomicBool::new(false),
        }
    }

    /// Answers every request as soon as the worker runs it.
    pub fn immediate() -> Arc<Self> {
        Arc::new(Self::with_gate(None))
    }

    /// Holds every request until the test releases a permit.
    pub fn gated() -> (Arc<Self>, Gate) {
        let (tx, rx) = std_mpsc::channel();
        (Arc::new(Self::with_gate(Some(rx))), Gate(tx))
    }

    pub fn fail_keys_with(&self, error: CallbackError) {
        *self.key_outcome.lock() = Err(error);
    }

    pub fn succeed_keys(&self) {
        *self.key_outcome.lock() = Ok(b"license".to_vec());
    }

    pub fn panic_on_keys(&self) {
        self.panic_on_keys.store(true, Ordering::SeqCst);
    }

    pub fn provision_calls(&self) -> usize {
        self.provision_calls.load(Ordering::SeqCst)
    }

    pub fn key_calls(&self) -> usize {
        self.key_calls.load(Ordering::SeqCst)
    }

    fn wait_for_permit(&self) {
        if let Some(gate) = &self.gate {
            // A dropped gate releases everything.
            let _ = gate.lock().recv();
        }
    }
}

impl DrmRequestCallback for MockCallback {
    fn execute_provision_request(
        &self,
        _scheme_id: Uuid,
        _request: &ProvisionRequest,
    ) -> Result<Vec<u8>, CallbackError> {
        self.wait_for_permit();
        self.provision_calls.fetch_add(1, Ordering::SeqCst);
        Ok(b"device-certificate".to_vec())
    }

    fn execute_key_request(
        &self,
        _scheme_id: Uuid,
        _request: &KeyRequest,
    ) -> Result<Vec<u8>, CallbackError> {
        self.wait_for_permit();
        self.key_calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_keys.load(Ordering::SeqCst) {
            panic!("license server client crashed");
        }
        self.key_outcome.lock().clone()
    }
}

// =============================================================================
// Listener
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    KeysLoaded,
    Error(DrmError),
}

pub struct ChannelListener(mpsc::UnboundedSender<Notification>);

impl DrmSessionListener for ChannelListener {
    fn on_drm_keys_loaded(&self) {
        let _ = self.0.send(Notification::KeysLoaded);
    }

    fn on_drm_session_manager_error(&self, error: &DrmError) {
        let _ = self.0.send(Notification::Error(error.clone()));
    }
}

/// Listener dispatching onto the current test runtime.
pub fn listener() -> (ListenerDispatcher, mpsc::UnboundedReceiver<Notification>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let dispatcher = ListenerDispatcher::on_current_runtime(Arc::new(ChannelListener(tx)))
        .expect("tests run inside a tokio runtime");
    (dispatcher, rx)
}

pub async fn next_notification(rx: &mut mpsc::UnboundedReceiver<Notification>) -> Notification {
    tokio::time::timeout(TIMEOUT, rx.recv())
        .await
        .expect("notification within timeout")
        .expect("listener channel open")
}

// =============================================================================
// Manager helpers
// =============================================================================

pub type TestManager = DrmSessionManager<MockEngine, MockCallback>;

pub fn widevine_init_data() -> DrmInitData {
    DrmInitData::new().with(SchemeData::new(WIDEVINE_UUID, "video/mp4", b"pssh".to_vec()))
}

pub fn manager(
    engine: &MockEngine,
    callback: Arc<MockCallback>,
    listener: Option<ListenerDispatcher>,
) -> TestManager {
    manager_with_config(SessionManagerConfig::default(), engine, callback, listener)
}

pub fn manager_with_config(
    config: SessionManagerConfig,
    engine: &MockEngine,
    callback: Arc<MockCallback>,
    listener: Option<ListenerDispatcher>,
) -> TestManager {
    drm_telemetry::init_test_logging();
    DrmSessionManager::new(config, &engine.factory(), callback, listener)
        .expect("valid test configuration")
}

/// Drive the inbound queue until `done` holds.
pub async fn dispatch_until(manager: &mut TestManager, done: impl Fn(&TestManager) -> bool) {
    tokio::time::timeout(TIMEOUT, async {
        while !done(&*manager) {
            assert!(manager.dispatch_next().await, "inbound queue closed");
        }
    })
    .await
    .expect("condition reached within timeout");
}
