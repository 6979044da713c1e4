use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::PhoneError;
use crate::events::{CallNotification, NotificationHub};
use crate::ringtone::RingtoneController;
use crate::signal::SignalEvent;
use crate::transport::{
    CallAudioConfig, IncomingSession, MediaKind, SessionConfig, SessionHandle, SessionKind,
    SignalingTransport, TransportError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallState {
    Idle,
    Outgoing,
    Incoming,
    Ringing,
    Connecting,
    Connected,
    Declined,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallDirection {
    Outgoing,
    Incoming,
}

/// The single active call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSession {
    pub id: Uuid,
    pub handle: SessionHandle,
    pub direction: CallDirection,
    pub state: CallState,
    pub muted: bool,
    pub remote_label: Option<String>,
    pub created_at: DateTime<Utc>,
    pub connected_at: Option<DateTime<Utc>>,
}

impl CallSession {
    fn new(handle: SessionHandle, direction: CallDirection, remote_label: Option<String>) -> Self {
        let state = match direction {
            CallDirection::Outgoing => CallState::Outgoing,
            CallDirection::Incoming => CallState::Incoming,
        };
        Self {
            id: Uuid::new_v4(),
            handle,
            direction,
            state,
            muted: false,
            remote_label,
            created_at: Utc::now(),
            connected_at: None,
        }
    }
}

/// Owns the active call session and applies signal and command transitions.
///
/// Every method runs to completion, side effects included, before returning.
/// Callers serialize access (see [`crate::phone::Softphone`]).
pub struct CallSessionStateMachine {
    transport: Arc<dyn SignalingTransport>,
    hub: NotificationHub,
    ringtone: RingtoneController,
    audio: CallAudioConfig,
    session: Option<CallSession>,
}

impl CallSessionStateMachine {
    pub fn new(
        transport: Arc<dyn SignalingTransport>,
        hub: NotificationHub,
        ringtone: RingtoneController,
        audio: CallAudioConfig,
    ) -> Self {
        Self {
            transport,
            hub,
            ringtone,
            audio,
            session: None,
        }
    }

    pub fn state(&self) -> CallState {
        self.session
            .as_ref()
            .map(|s| s.state)
            .unwrap_or(CallState::Idle)
    }

    pub fn session(&self) -> Option<&CallSession> {
        self.session.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn is_ringtone_playing(&self) -> bool {
        self.ringtone.is_playing()
    }

    /// Place an outgoing call. An empty number is ignored.
    pub fn call(&mut self, number: &str) -> Result<(), PhoneError> {
        if number.is_empty() {
            tracing::debug!("call ignored: empty number");
            return Ok(());
        }
        if let Some(active) = &self.session {
            tracing::warn!("call to {number} refused: session {} is {:?}", active.id, active.state);
            return Err(PhoneError::SessionBusy);
        }

        let handle = self
            .transport
            .create_session(SessionKind::CallAudio, &SessionConfig::Call(self.audio.clone()))
            .map_err(|e| PhoneError::Transport(e.to_string()))?;

        if let Err(e) = self.transport.call(handle, number) {
            tracing::warn!("call to {number} rejected, discarding {handle}: {e}");
            return Err(match e {
                TransportError::Rejected(code) => PhoneError::CallRequestRejected(code),
                other => PhoneError::Transport(other.to_string()),
            });
        }

        let session = CallSession::new(handle, CallDirection::Outgoing, Some(number.to_string()));
        tracing::info!("call {}: Idle -> Outgoing ({number}, {handle})", session.id);
        self.session = Some(session);
        Ok(())
    }

    /// Bind a session announced by the stack.
    ///
    /// A second inbound call while one is active is hung up.
    pub fn incoming(&mut self, incoming: IncomingSession) -> Option<CallState> {
        if let Some(active) = &self.session {
            tracing::warn!(
                "incoming {} refused: session {} is {:?}",
                incoming.handle,
                active.id,
                active.state
            );
            if let Err(e) = self.transport.hangup(incoming.handle) {
                tracing::error!("hangup of refused {} failed: {e}", incoming.handle);
            }
            return None;
        }

        let session = CallSession::new(
            incoming.handle,
            CallDirection::Incoming,
            incoming.remote_label.clone(),
        );
        tracing::info!("call {}: Idle -> Incoming ({})", session.id, incoming.handle);
        self.session = Some(session);

        self.hub.fire(CallNotification::Incoming {
            remote_label: incoming.remote_label.unwrap_or_default(),
        });
        self.ringtone.start();
        Some(CallState::Incoming)
    }

    pub fn answer(&mut self) -> Result<(), PhoneError> {
        let session = self.session.as_ref().ok_or(PhoneError::NoActiveSession)?;
        if !matches!(session.state, CallState::Incoming | CallState::Ringing) {
            return Err(PhoneError::InvalidState {
                state: session.state,
                command: "answer",
            });
        }

        self.transport
            .accept(session.handle, &self.audio)
            .map_err(|e| PhoneError::Transport(e.to_string()))?;
        self.enter(CallState::Connecting);
        self.hub.fire(CallNotification::Connecting);
        Ok(())
    }

    pub fn decline(&mut self) -> Result<(), PhoneError> {
        self.hang_up("decline")
    }

    pub fn end_call(&mut self) -> Result<(), PhoneError> {
        self.hang_up("end_call")
    }

    pub fn mute_call(&mut self, mute: bool) -> Result<(), PhoneError> {
        let session = self.session.as_mut().ok_or(PhoneError::NoActiveSession)?;
        if session.state != CallState::Connected {
            return Err(PhoneError::InvalidState {
                state: session.state,
                command: "mute_call",
            });
        }
        if session.muted == mute {
            tracing::debug!("call {} already muted={mute}", session.id);
            return Ok(());
        }

        self.transport
            .mute(session.handle, MediaKind::Audio, mute)
            .map_err(|e| PhoneError::Transport(e.to_string()))?;
        session.muted = mute;
        tracing::info!("call {} muted: {mute}", session.id);
        Ok(())
    }

    /// Apply a session-level signal for `handle`.
    ///
    /// Returns the state the signal moved the session into. Declined and
    /// Terminated are reported even though the machine is back to Idle.
    pub fn handle_signal(&mut self, handle: SessionHandle, signal: SignalEvent) -> Option<CallState> {
        let Some(session) = self.session.as_ref() else {
            tracing::debug!("{signal:?} on {handle} dropped: no active session");
            return None;
        };
        if session.handle != handle {
            tracing::debug!("{signal:?} on stale {handle} dropped");
            return None;
        }
        let current = session.state;

        match signal {
            SignalEvent::Ringing => {
                if !matches!(current, CallState::Outgoing | CallState::Incoming) {
                    tracing::debug!("Ringing ignored in {current:?}");
                    return None;
                }
                self.enter(CallState::Ringing);
                self.hub.fire(CallNotification::Ringing);
                self.ringtone.start();
                Some(CallState::Ringing)
            }
            SignalEvent::Connecting => {
                if current == CallState::Connecting {
                    return None;
                }
                self.enter(CallState::Connecting);
                self.hub.fire(CallNotification::Connecting);
                Some(CallState::Connecting)
            }
            SignalEvent::Connected => {
                if current == CallState::Connected {
                    return None;
                }
                self.enter(CallState::Connected);
                if let Some(session) = self.session.as_mut() {
                    session.connected_at = Some(Utc::now());
                }
                self.hub.fire(CallNotification::Connected);
                self.ringtone.stop();
                Some(CallState::Connected)
            }
            SignalEvent::Declined => Some(self.finish(CallState::Declined)),
            s if s.is_terminal() => Some(self.finish(CallState::Terminated)),
            other => {
                tracing::debug!("{other:?} is not a call-session signal");
                None
            }
        }
    }

    fn hang_up(&mut self, command: &'static str) -> Result<(), PhoneError> {
        let session = self.session.as_ref().ok_or(PhoneError::NoActiveSession)?;
        tracing::info!("{command}: hanging up call {}", session.id);
        self.transport
            .hangup(session.handle)
            .map_err(|e| PhoneError::Transport(e.to_string()))?;
        self.finish(CallState::Terminated);
        Ok(())
    }

    fn enter(&mut self, state: CallState) {
        if let Some(session) = self.session.as_mut() {
            tracing::info!("call {}: {:?} -> {state:?}", session.id, session.state);
            session.state = state;
        }
    }

    /// Move to a terminal state, notify, silence the ringtone and reset to Idle.
    fn finish(&mut self, terminal: CallState) -> CallState {
        self.enter(terminal);
        let notification = match terminal {
            CallState::Declined => CallNotification::Declined,
            _ => CallNotification::Terminated,
        };
        self.hub.fire(notification);
        self.ringtone.stop();
        if let Some(session) = self.session.take() {
            tracing::info!("call {}: {terminal:?} -> Idle", session.id);
        }
        terminal
    }
}
