//! Inbound Ports (Driving Ports)
//!
//! The contract a media pipeline uses to obtain a decryption context.

use crate::domain::{DrmInitData, ExecutionContext, SessionState};
use crate::error::{DrmError, DrmResult};
use crate::ports::outbound::DecryptionContext;

/// Reference-counted DRM session (Driving Port)
///
/// All methods run on the owning context. Failures of the asynchronous
/// provisioning/licensing exchange never surface as `Err` here; they are
/// observed through [`error`](Self::error) and the listener.
pub trait DrmSessionApi {
    /// Decryption context handed to the media pipeline
    type Crypto: DecryptionContext;

    /// Acquire the session for one more consumer.
    ///
    /// The first call binds the manager to `context`; only the 0→1 transition
    /// opens an engine session. Fails immediately if the security engine
    /// could not be instantiated.
    ///
    /// # Panics
    ///
    /// If `context` differs from the context bound by the first call.
    fn open(&mut self, context: ExecutionContext, init_data: &DrmInitData) -> DrmResult<()>;

    /// Release the session for one consumer. The 1→0 transition tears
    /// everything down.
    fn close(&mut self);

    /// Current session state
    fn state(&self) -> SessionState;

    /// Last failure, if the state exposes one
    fn error(&self) -> Option<&DrmError>;

    /// Decryption context bound to the current engine session
    ///
    /// Only valid in `Opened` and `OpenedWithKeys`.
    fn decryption_context(&self) -> DrmResult<&Self::Crypto>;

    /// Whether content of `mime_type` needs a secure decoder
    ///
    /// Only valid in `Opened` and `OpenedWithKeys`.
    fn requires_secure_decoder_component(&self, mime_type: &str) -> DrmResult<bool>;
}
