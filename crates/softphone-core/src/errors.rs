use thiserror::Error;

use crate::call::CallState;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhoneError {
    #[error("transport initialization failed: {0}")]
    InitializationFailed(String),
    #[error("stack failed to start: {0}")]
    StartFailed(String),
    #[error("registration failed: {0}")]
    RegistrationFailed(String),
    #[error("stack is not ready")]
    NotReady,
    #[error("no active call session")]
    NoActiveSession,
    #[error("call request rejected by transport (code {0})")]
    CallRequestRejected(i32),
    #[error("a call session is already active")]
    SessionBusy,
    #[error("{command} not allowed in state {state:?}")]
    InvalidState {
        state: CallState,
        command: &'static str,
    },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("phone processing loop has shut down")]
    Closed,
}
