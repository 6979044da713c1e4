//! Boundary to the external signaling stack and audio output.
//!
//! The core never performs protocol work itself. It drives a
//! [`SignalingTransport`] and consumes the raw events the transport sends
//! back over the channel returned by [`SignalingTransport::initialize`].

use std::fmt;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::StackConfig;

/// Opaque handle naming one transport session (registration or call).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle(pub u64);

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Register,
    CallAudio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
}

/// Audio configuration applied to every call session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallAudioConfig {
    /// Start rendering remote audio as soon as media flows.
    pub remote_autoplay: bool,
}

impl Default for CallAudioConfig {
    fn default() -> Self {
        Self { remote_autoplay: true }
    }
}

/// Session creation parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionConfig {
    Register { expires: u32 },
    Call(CallAudioConfig),
}

/// A new call session announced by the stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingSession {
    pub handle: SessionHandle,
    /// Remote friendly name, when the stack knows one.
    pub remote_label: Option<String>,
}

/// Raw event emitted by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Stack-level event. `incoming` is set for new inbound calls.
    Stack {
        description: String,
        incoming: Option<IncomingSession>,
    },
    /// Event on a registration session.
    Registration {
        handle: SessionHandle,
        event_type: String,
        description: String,
    },
    /// Event on a call session.
    Session {
        handle: SessionHandle,
        description: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("initialization failed: {0}")]
    Init(String),
    #[error("request rejected with code {0}")]
    Rejected(i32),
    #[error("{0}")]
    Failed(String),
}

impl TransportError {
    /// The stack's own reason text, without the variant prefix.
    pub fn into_reason(self) -> String {
        match self {
            TransportError::Init(reason) | TransportError::Failed(reason) => reason,
            TransportError::Rejected(code) => format!("rejected with code {code}"),
        }
    }
}

/// Receiving half of the transport event stream.
pub type TransportEvents = mpsc::UnboundedReceiver<TransportEvent>;

/// Operations the core issues to the signaling stack.
///
/// All methods are synchronous: the stack acknowledges a request and reports
/// progress later as [`TransportEvent`]s.
pub trait SignalingTransport: Send + Sync {
    /// Initialize the stack and hand back its event stream.
    fn initialize(&self, config: &StackConfig) -> Result<TransportEvents, TransportError>;

    /// Start the initialized stack. Completion is reported as `stack started`.
    fn start(&self) -> Result<(), TransportError>;

    fn create_session(
        &self,
        kind: SessionKind,
        config: &SessionConfig,
    ) -> Result<SessionHandle, TransportError>;

    fn register(&self, session: SessionHandle) -> Result<(), TransportError>;

    /// Place an outgoing call. Implementations map a non-zero stack result
    /// code to [`TransportError::Rejected`].
    fn call(&self, session: SessionHandle, number: &str) -> Result<(), TransportError>;

    fn accept(&self, session: SessionHandle, audio: &CallAudioConfig) -> Result<(), TransportError>;

    fn hangup(&self, session: SessionHandle) -> Result<(), TransportError>;

    fn mute(&self, session: SessionHandle, media: MediaKind, mute: bool) -> Result<(), TransportError>;
}

/// Playback sink for the ringtone.
pub trait AudioSink: Send + Sync {
    fn play(&self);
    fn pause(&self);
}
