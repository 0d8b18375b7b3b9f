//! Events Layer - messages crossing thread boundaries
//!
//! - `requests`: owning context → request worker
//! - `messages`: request worker and engine relay → owning context
//! - `engine`: asynchronous notifications raised by the security engine

pub mod engine;
pub mod messages;
pub mod requests;

pub use engine::DrmEvent;
pub use messages::SessionMessage;
pub use requests::{KeyRequest, PendingRequest, ProvisionRequest};
