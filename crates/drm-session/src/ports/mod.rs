//! Ports Layer
//!
//! Defines the interfaces (traits) for:
//! - Driving Ports (inbound) - API for the media pipeline
//! - Driven Ports (outbound) - security engine, request callback, listener

pub mod inbound;
pub mod outbound;

pub use inbound::DrmSessionApi;
pub use outbound::{
    DecryptionContext, DrmRequestCallback, DrmSessionListener, SecurityEngine,
    SecurityEngineFactory,
};
