//! Domain Layer
//!
//! Pure session state and value types, no I/O.

pub mod scheme;
pub mod session;
pub mod state;

pub use scheme::{DrmInitData, SchemeData, CLEARKEY_UUID, PLAYREADY_UUID, WIDEVINE_UUID};
pub use session::{ExecutionContext, KeyType, SessionId};
pub use state::{RequestKind, SessionInput, SessionState};
