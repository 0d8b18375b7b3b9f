//! # drm-session
//!
//! Reference-counted session manager for streaming DRM playback.
//!
//! ## Overview
//!
//! This crate provides:
//! - **Session lifecycle**: one engine session shared by every consumer, opened on
//!   the first `open()` and torn down on the last `close()`
//! - **Provisioning**: device provisioning before open, or mid-session when the
//!   engine asks for it, with at most one request in flight
//! - **Licensing**: key requests on open and whenever the engine reports keys
//!   required or expired
//! - **Stale-response discarding**: responses that no longer match the session
//!   state, or that belong to a previous open lifetime, have no effect
//!
//! ## Architecture
//!
//! ```text
//!                     ┌──────────── owning context ────────────┐
//! media pipeline ──→  │  DrmSessionManager (state machine)     │ ──→ listener runtime
//!                     │        ↑ dispatch_pending/next         │
//!                     └────────┼───────────────────────────────┘
//!                              │ SessionMessage
//!              ┌───────────────┴───────────────┐
//!        RequestWorker                  EngineEventRelay
//!      (blocking callback)            (engine event threads)
//! ```
//!
//! ## Session States
//!
//! ```text
//!                                              keys loaded
//! [CLOSED] ──open──→ [OPENING] ──session──→ [OPENED] ────────→ [OPENED_WITH_KEYS]
//!    ↑                   │                     │   ←────────            │
//!    │                   │                     │   keys expired         │
//!    │                   └───── failure ───────┴────→ [ERROR]           │
//!    └────────────────────────── close (from any state) ────────────────┘
//! ```
//!
//! A failure while keys are loaded is reported but keeps `OPENED_WITH_KEYS`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use drm_session::{DrmSessionManager, SessionManagerConfig, ExecutionContext};
//! use drm_session::ports::DrmSessionApi;
//!
//! let mut manager = DrmSessionManager::new(
//!     SessionManagerConfig::default(),
//!     &engine_factory,
//!     Arc::new(license_client),
//!     ListenerDispatcher::on_current_runtime(listener),
//! )?;
//!
//! manager.open(ExecutionContext::new(), &init_data)?;
//! while manager.state() != SessionState::OpenedWithKeys {
//!     manager.dispatch_next().await;
//! }
//! let crypto = manager.decryption_context()?;
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod metrics;
pub mod ports;
pub mod service;

pub use adapters::{EngineEventRelay, ListenerDispatcher};
pub use config::{SessionManagerConfig, SessionManagerConfigBuilder, PLAYREADY_CUSTOM_DATA_KEY};
pub use domain::{
    DrmInitData, ExecutionContext, KeyType, SchemeData, SessionId, SessionState, CLEARKEY_UUID,
    PLAYREADY_UUID, WIDEVINE_UUID,
};
pub use error::{
    CallbackError, ConfigError, DrmError, DrmResult, EngineError, InitializationReason,
};
pub use events::{DrmEvent, KeyRequest, ProvisionRequest};
pub use metrics::{MetricsSnapshot, SessionMetrics};
pub use service::DrmSessionManager;
