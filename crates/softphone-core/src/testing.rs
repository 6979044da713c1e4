//! Recording doubles for the transport and audio sink.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tokio::sync::mpsc;

use crate::config::StackConfig;
use crate::transport::{
    AudioSink, CallAudioConfig, IncomingSession, MediaKind, SessionConfig, SessionHandle,
    SessionKind, SignalingTransport, TransportError, TransportEvent, TransportEvents,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Initialize,
    Start,
    CreateSession(SessionKind, SessionHandle),
    Register(SessionHandle),
    Call(SessionHandle, String),
    Accept(SessionHandle, CallAudioConfig),
    Hangup(SessionHandle),
    Mute(SessionHandle, MediaKind, bool),
}

#[derive(Default)]
pub struct MockTransport {
    requests: Mutex<Vec<Request>>,
    next_handle: AtomicU64,
    events: Mutex<Option<mpsc::UnboundedSender<TransportEvent>>>,
    init_error: Mutex<Option<String>>,
    start_error: Mutex<Option<String>>,
    session_error: Mutex<Option<String>>,
    register_error: Mutex<Option<String>>,
    call_reject_code: Mutex<Option<i32>>,
    startup: Mutex<Option<(String, String)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_initialize(&self, reason: &str) {
        *self.init_error.lock().unwrap() = Some(reason.to_string());
    }

    pub fn fail_start(&self, reason: &str) {
        *self.start_error.lock().unwrap() = Some(reason.to_string());
    }

    pub fn fail_create_session(&self, reason: &str) {
        *self.session_error.lock().unwrap() = Some(reason.to_string());
    }

    pub fn fail_register(&self, reason: &str) {
        *self.register_error.lock().unwrap() = Some(reason.to_string());
    }

    pub fn reject_calls(&self, code: i32) {
        *self.call_reject_code.lock().unwrap() = Some(code);
    }

    /// Report `stack started` from `start()` and answer `register()` with
    /// the given registration event.
    pub fn script_startup(&self, event_type: &str, description: &str) {
        *self.startup.lock().unwrap() = Some((event_type.to_string(), description.to_string()));
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }

    /// Handle of the most recently created session.
    pub fn last_handle(&self) -> SessionHandle {
        SessionHandle(self.next_handle.load(Ordering::SeqCst))
    }

    /// Allocate a handle for a session the stack creates itself.
    pub fn allocate_handle(&self) -> SessionHandle {
        SessionHandle(self.next_handle.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn emit(&self, event: TransportEvent) {
        let events = self.events.lock().unwrap();
        events
            .as_ref()
            .expect("transport not initialized")
            .send(event)
            .expect("event loop gone");
    }

    pub fn emit_stack(&self, description: &str) {
        self.emit(TransportEvent::Stack {
            description: description.to_string(),
            incoming: None,
        });
    }

    pub fn emit_incoming(&self, remote_label: &str) -> SessionHandle {
        let handle = self.allocate_handle();
        self.emit(TransportEvent::Stack {
            description: "incoming call".to_string(),
            incoming: Some(IncomingSession {
                handle,
                remote_label: Some(remote_label.to_string()),
            }),
        });
        handle
    }

    pub fn emit_registration(&self, handle: SessionHandle, event_type: &str, description: &str) {
        self.emit(TransportEvent::Registration {
            handle,
            event_type: event_type.to_string(),
            description: description.to_string(),
        });
    }

    pub fn emit_session(&self, handle: SessionHandle, description: &str) {
        self.emit(TransportEvent::Session {
            handle,
            description: description.to_string(),
        });
    }

    fn record(&self, request: Request) {
        self.requests.lock().unwrap().push(request);
    }
}

impl SignalingTransport for MockTransport {
    fn initialize(&self, _config: &StackConfig) -> Result<TransportEvents, TransportError> {
        self.record(Request::Initialize);
        if let Some(reason) = self.init_error.lock().unwrap().clone() {
            return Err(TransportError::Init(reason));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        *self.events.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    fn start(&self) -> Result<(), TransportError> {
        self.record(Request::Start);
        if let Some(reason) = self.start_error.lock().unwrap().clone() {
            return Err(TransportError::Failed(reason));
        }
        if self.startup.lock().unwrap().is_some() {
            self.emit_stack("stack started");
        }
        Ok(())
    }

    fn create_session(
        &self,
        kind: SessionKind,
        _config: &SessionConfig,
    ) -> Result<SessionHandle, TransportError> {
        if let Some(reason) = self.session_error.lock().unwrap().clone() {
            return Err(TransportError::Failed(reason));
        }
        let handle = self.allocate_handle();
        self.record(Request::CreateSession(kind, handle));
        Ok(handle)
    }

    fn register(&self, session: SessionHandle) -> Result<(), TransportError> {
        self.record(Request::Register(session));
        if let Some(reason) = self.register_error.lock().unwrap().clone() {
            return Err(TransportError::Failed(reason));
        }
        let scripted = self.startup.lock().unwrap().clone();
        if let Some((event_type, description)) = scripted {
            self.emit_registration(session, &event_type, &description);
        }
        Ok(())
    }

    fn call(&self, session: SessionHandle, number: &str) -> Result<(), TransportError> {
        self.record(Request::Call(session, number.to_string()));
        match *self.call_reject_code.lock().unwrap() {
            Some(code) => Err(TransportError::Rejected(code)),
            None => Ok(()),
        }
    }

    fn accept(&self, session: SessionHandle, audio: &CallAudioConfig) -> Result<(), TransportError> {
        self.record(Request::Accept(session, audio.clone()));
        Ok(())
    }

    fn hangup(&self, session: SessionHandle) -> Result<(), TransportError> {
        self.record(Request::Hangup(session));
        Ok(())
    }

    fn mute(&self, session: SessionHandle, media: MediaKind, mute: bool) -> Result<(), TransportError> {
        self.record(Request::Mute(session, media, mute));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    plays: AtomicUsize,
    pauses: AtomicUsize,
}

impl RecordingSink {
    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }

    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }
}

impl AudioSink for RecordingSink {
    fn play(&self) {
        self.plays.fetch_add(1, Ordering::SeqCst);
    }

    fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }
}
