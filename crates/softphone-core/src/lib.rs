//! Softphone core call logic.
//!
//! Drives an external SIP-over-WebSocket signaling stack through the
//! [`transport::SignalingTransport`] boundary: stack startup and
//! registration, a single active call session, ringtone control and
//! application notifications.
//! Consumed by native UI shells via UniFFI bindings.

pub mod call;
pub mod config;
pub mod errors;
pub mod events;
pub mod phone;
pub mod ringtone;
pub mod settings;
pub mod signal;
pub mod stack;
pub mod transport;

#[cfg(test)]
mod testing;

pub use call::{CallDirection, CallSession, CallState};
pub use config::StackConfig;
pub use errors::PhoneError;
pub use events::{CallEventListener, CallNotification, NotificationHub, Transition};
pub use phone::Softphone;
pub use settings::{PhoneSettings, SettingsStore};
pub use signal::SignalEvent;
pub use stack::StackStatus;
pub use transport::{
    AudioSink, CallAudioConfig, IncomingSession, MediaKind, SessionConfig, SessionHandle,
    SessionKind, SignalingTransport, TransportError, TransportEvent, TransportEvents,
};
