//! Adapters Layer
//!
//! Thread plumbing between the owning context, the request worker, the
//! security engine's callback threads and the listener runtime.

pub mod event_relay;
pub mod listener;
pub mod request_worker;

pub use event_relay::EngineEventRelay;
pub use listener::ListenerDispatcher;
pub use request_worker::RequestWorker;
