//! Normalization of raw signaling-stack event descriptions.
//!
//! The transport reports events as free-text descriptions. Everything past
//! this module only sees [`SignalEvent`], so growth in the transport's
//! vocabulary never leaks into the state machines.

/// Literal descriptions emitted by the signaling stack.
///
/// `FAILED_TO_START` keeps the stack's own spelling.
pub mod vocabulary {
    pub const CANCELLED: &str = "request cancelled";
    pub const CONNECTED: &str = "in call";
    pub const CONNECTING: &str = "call in progress...";
    pub const DECLINED: &str = "declined";
    pub const MEDIA_DENIED: &str = "media refused";
    pub const FAILED_TO_START: &str = "failed to connet to the server";
    pub const FORBIDDEN: &str = "forbidden";
    pub const INCOMING_CALL: &str = "incoming call";
    pub const REJECTED: &str = "call rejected";
    pub const RINGING: &str = "ringing";
    pub const STARTED: &str = "stack started";
    pub const TERMINATED: &str = "call terminated";
}

/// Closed set of events the core reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalEvent {
    Cancelled,
    Connected,
    Connecting,
    Declined,
    MediaDenied,
    FailedToStart,
    Forbidden,
    IncomingCall,
    Rejected,
    Ringing,
    Started,
    Terminated,
    Unknown,
}

impl SignalEvent {
    /// Every recognized event, in vocabulary order.
    pub const RECOGNIZED: [SignalEvent; 12] = [
        SignalEvent::Cancelled,
        SignalEvent::Connected,
        SignalEvent::Connecting,
        SignalEvent::Declined,
        SignalEvent::MediaDenied,
        SignalEvent::FailedToStart,
        SignalEvent::Forbidden,
        SignalEvent::IncomingCall,
        SignalEvent::Rejected,
        SignalEvent::Ringing,
        SignalEvent::Started,
        SignalEvent::Terminated,
    ];

    /// The transport description this event is recognized from.
    pub fn description(self) -> Option<&'static str> {
        use vocabulary::*;
        let s = match self {
            SignalEvent::Cancelled => CANCELLED,
            SignalEvent::Connected => CONNECTED,
            SignalEvent::Connecting => CONNECTING,
            SignalEvent::Declined => DECLINED,
            SignalEvent::MediaDenied => MEDIA_DENIED,
            SignalEvent::FailedToStart => FAILED_TO_START,
            SignalEvent::Forbidden => FORBIDDEN,
            SignalEvent::IncomingCall => INCOMING_CALL,
            SignalEvent::Rejected => REJECTED,
            SignalEvent::Ringing => RINGING,
            SignalEvent::Started => STARTED,
            SignalEvent::Terminated => TERMINATED,
            SignalEvent::Unknown => return None,
        };
        Some(s)
    }

    /// Signals that end a call without the remote side declining it.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SignalEvent::Cancelled
                | SignalEvent::Forbidden
                | SignalEvent::Terminated
                | SignalEvent::Rejected
        )
    }
}

/// Map a raw description onto a [`SignalEvent`].
///
/// Matching is exact but case-insensitive. Unrecognized input yields
/// [`SignalEvent::Unknown`]; this function never fails.
pub fn translate(raw: &str) -> SignalEvent {
    let lowered = raw.to_lowercase();
    SignalEvent::RECOGNIZED
        .into_iter()
        .find(|event| event.description() == Some(lowered.as_str()))
        .unwrap_or(SignalEvent::Unknown)
}

/// Outcome reported by a registration session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationSignal {
    Connected,
    Terminated,
    Other,
}

impl RegistrationSignal {
    /// Map a registration session event type (`connected`, `terminated`, ...).
    pub fn from_event_type(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("connected") {
            RegistrationSignal::Connected
        } else if raw.eq_ignore_ascii_case("terminated") {
            RegistrationSignal::Terminated
        } else {
            RegistrationSignal::Other
        }
    }
}
