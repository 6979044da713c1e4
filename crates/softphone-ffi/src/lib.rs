//! UniFFI bindings for softphone-core.
//!
//! Provides a SoftphoneClient object that wraps the core Softphone into a
//! single FFI-safe interface. The host supplies the signaling stack and the
//! ringtone player as callback interfaces and pushes the stack's raw events
//! back through the client.

use std::sync::{Arc, Mutex as StdMutex};

use softphone_core::{
    self, CallDirection as CoreCallDirection, CallNotification, CallSession,
    CallState as CoreCallState, PhoneError as CorePhoneError, PhoneSettings as CorePhoneSettings,
    SessionConfig, SessionHandle, SessionKind as CoreSessionKind, StackConfig as CoreStackConfig,
    StackStatus as CoreStackStatus, TransportError, TransportEvent, TransportEvents, Transition,
};
use tokio::sync::mpsc;

uniffi::include_scaffolding!("softphone");

// ── Namespace functions ──────────────────────────────────────────────

/// Initialize tracing/logging. Call once from the host before using SoftphoneClient.
fn init_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "softphone_core=debug,softphone_ffi=debug".into()),
            )
            .with_ansi(false)
            .try_init();
    });
}

// ── FFI-safe type conversions ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
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

impl From<CoreCallState> for CallState {
    fn from(s: CoreCallState) -> Self {
        match s {
            CoreCallState::Idle => Self::Idle,
            CoreCallState::Outgoing => Self::Outgoing,
            CoreCallState::Incoming => Self::Incoming,
            CoreCallState::Ringing => Self::Ringing,
            CoreCallState::Connecting => Self::Connecting,
            CoreCallState::Connected => Self::Connected,
            CoreCallState::Declined => Self::Declined,
            CoreCallState::Terminated => Self::Terminated,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallDirection {
    Outgoing,
    Incoming,
}

impl From<CoreCallDirection> for CallDirection {
    fn from(d: CoreCallDirection) -> Self {
        match d {
            CoreCallDirection::Outgoing => Self::Outgoing,
            CoreCallDirection::Incoming => Self::Incoming,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackStatus {
    Disabled,
    Pending,
    Ready,
    Failed,
}

impl From<CoreStackStatus> for StackStatus {
    fn from(s: CoreStackStatus) -> Self {
        match s {
            CoreStackStatus::Disabled => Self::Disabled,
            CoreStackStatus::Pending => Self::Pending,
            CoreStackStatus::Ready => Self::Ready,
            CoreStackStatus::Failed => Self::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Register,
    CallAudio,
}

impl From<CoreSessionKind> for SessionKind {
    fn from(k: CoreSessionKind) -> Self {
        match k {
            CoreSessionKind::Register => Self::Register,
            CoreSessionKind::CallAudio => Self::CallAudio,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallInfo {
    pub id: String,
    pub state: CallState,
    pub direction: CallDirection,
    pub muted: bool,
    pub remote_label: Option<String>,
    pub created_at_ms: i64,
    pub connected_at_ms: Option<i64>,
}

impl From<CallSession> for CallInfo {
    fn from(s: CallSession) -> Self {
        Self {
            id: s.id.to_string(),
            state: s.state.into(),
            direction: s.direction.into(),
            muted: s.muted,
            remote_label: s.remote_label,
            created_at_ms: s.created_at.timestamp_millis(),
            connected_at_ms: s.connected_at.map(|t| t.timestamp_millis()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StackConfig {
    pub realm: String,
    pub identity: String,
    pub public_identity: Option<String>,
    pub password: String,
    pub signaling_proxy_url: String,
    pub outbound_proxy_url: String,
    pub display_name: Option<String>,
    pub ice_servers: Vec<String>,
    pub enable_early_ims: bool,
    pub enable_rtcweb_breaker: bool,
    pub enable_media_stream_cache: bool,
    pub bandwidth: Option<u32>,
}

impl StackConfig {
    /// Core config with the stored preferences underneath. Fields set on
    /// `self` win over the settings.
    fn into_core(self, settings: &CorePhoneSettings) -> CoreStackConfig {
        let mut config = CoreStackConfig::new(
            self.realm,
            self.identity,
            self.password,
            self.signaling_proxy_url,
            self.outbound_proxy_url,
        );
        settings.apply_to(&mut config);
        config.public_identity = self.public_identity;
        if let Some(name) = self.display_name {
            config.display_name = name;
        }
        config.ice_servers = self.ice_servers;
        config.enable_early_ims = self.enable_early_ims;
        config.enable_rtcweb_breaker = self.enable_rtcweb_breaker;
        config.enable_media_stream_cache = self.enable_media_stream_cache;
        config.bandwidth = self.bandwidth;
        config
    }
}

impl From<&CoreStackConfig> for StackConfig {
    fn from(c: &CoreStackConfig) -> Self {
        Self {
            realm: c.realm.clone(),
            identity: c.identity.clone(),
            public_identity: Some(c.public_identity()),
            password: c.password.clone(),
            signaling_proxy_url: c.signaling_proxy_url.clone(),
            outbound_proxy_url: c.outbound_proxy_url.clone(),
            display_name: Some(c.display_name.clone()),
            ice_servers: c.ice_servers.clone(),
            enable_early_ims: c.enable_early_ims,
            enable_rtcweb_breaker: c.enable_rtcweb_breaker,
            enable_media_stream_cache: c.enable_media_stream_cache,
            bandwidth: c.bandwidth,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhoneSettings {
    pub display_name: String,
    pub ringtone_path: String,
    pub remote_autoplay: bool,
    pub registration_expires: u32,
}

impl From<CorePhoneSettings> for PhoneSettings {
    fn from(s: CorePhoneSettings) -> Self {
        Self {
            display_name: s.display_name,
            ringtone_path: s.ringtone_path,
            remote_autoplay: s.remote_autoplay,
            registration_expires: s.registration_expires,
        }
    }
}

// ── Error conversion ──────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum PhoneError {
    #[error("Initialization error: {msg}")]
    Initialization { msg: String },
    #[error("Start error: {msg}")]
    Start { msg: String },
    #[error("Registration error: {msg}")]
    Registration { msg: String },
    #[error("Not ready: {msg}")]
    NotReady { msg: String },
    #[error("No active session: {msg}")]
    NoActiveSession { msg: String },
    #[error("Call rejected with code {code}")]
    CallRejected { code: i32 },
    #[error("Session busy: {msg}")]
    SessionBusy { msg: String },
    #[error("Invalid state: {msg}")]
    InvalidState { msg: String },
    #[error("Transport error: {msg}")]
    Transport { msg: String },
    #[error("Config error: {msg}")]
    Config { msg: String },
    #[error("Closed: {msg}")]
    Closed { msg: String },
}

impl From<CorePhoneError> for PhoneError {
    fn from(e: CorePhoneError) -> Self {
        tracing::error!("PhoneError: {e}");
        let msg = e.to_string();
        match e {
            CorePhoneError::InitializationFailed(msg) => Self::Initialization { msg },
            CorePhoneError::StartFailed(msg) => Self::Start { msg },
            CorePhoneError::RegistrationFailed(msg) => Self::Registration { msg },
            CorePhoneError::NotReady => Self::NotReady { msg },
            CorePhoneError::NoActiveSession => Self::NoActiveSession { msg },
            CorePhoneError::CallRequestRejected(code) => Self::CallRejected { code },
            CorePhoneError::SessionBusy => Self::SessionBusy { msg },
            CorePhoneError::InvalidState { .. } => Self::InvalidState { msg },
            CorePhoneError::Transport(msg) => Self::Transport { msg },
            CorePhoneError::Config(msg) => Self::Config { msg },
            CorePhoneError::Closed => Self::Closed { msg },
        }
    }
}

// ── Callback interfaces ───────────────────────────────────────────────

/// The host's signaling stack. Every request returns the stack's result
/// code, 0 meaning accepted.
pub trait SignalingStack: Send + Sync {
    fn initialize(&self, config: StackConfig) -> i32;
    fn start(&self) -> i32;
    /// `None` when the stack refused to create the session.
    fn create_session(&self, kind: SessionKind, expires: u32, remote_autoplay: bool) -> Option<u64>;
    fn register(&self, session: u64) -> i32;
    fn call(&self, session: u64, number: String) -> i32;
    fn accept(&self, session: u64, remote_autoplay: bool) -> i32;
    fn hangup(&self, session: u64) -> i32;
    fn mute(&self, session: u64, mute: bool) -> i32;
}

pub trait RingtonePlayer: Send + Sync {
    /// Select the ringtone resource. The core always asks for looping playback.
    fn configure(&self, source: String, looping: bool);
    fn play(&self);
    fn pause(&self);
}

/// Call notifications. Invoked from the client's processing task; do not
/// call back into the client synchronously from these methods.
pub trait CallListener: Send + Sync {
    fn on_connecting(&self);
    fn on_connected(&self);
    fn on_declined(&self);
    fn on_incoming(&self, remote_label: String);
    fn on_ringing(&self);
    fn on_terminated(&self);
}

// ── Bridge transport: core requests → host stack ──────────────────────

struct HostTransport {
    stack: Box<dyn SignalingStack>,
    events: StdMutex<Option<mpsc::UnboundedSender<TransportEvent>>>,
}

impl HostTransport {
    fn new(stack: Box<dyn SignalingStack>) -> Self {
        Self {
            stack,
            events: StdMutex::new(None),
        }
    }

    fn push(&self, event: TransportEvent) {
        let events = self.events.lock().unwrap();
        match events.as_ref() {
            Some(tx) => {
                if tx.send(event).is_err() {
                    tracing::warn!("event dropped: processing loop gone");
                }
            }
            None => tracing::debug!("event dropped: stack not initialized: {event:?}"),
        }
    }

    fn check(op: &str, code: i32) -> Result<(), TransportError> {
        if code == 0 {
            Ok(())
        } else {
            Err(TransportError::Failed(format!("{op} returned code {code}")))
        }
    }
}

impl softphone_core::SignalingTransport for HostTransport {
    fn initialize(&self, config: &CoreStackConfig) -> Result<TransportEvents, TransportError> {
        let code = self.stack.initialize(config.into());
        if code != 0 {
            return Err(TransportError::Init(format!("stack initialize returned code {code}")));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        *self.events.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    fn start(&self) -> Result<(), TransportError> {
        Self::check("start", self.stack.start())
    }

    fn create_session(
        &self,
        kind: CoreSessionKind,
        config: &SessionConfig,
    ) -> Result<SessionHandle, TransportError> {
        let (expires, remote_autoplay) = match config {
            SessionConfig::Register { expires } => (*expires, false),
            SessionConfig::Call(audio) => (0, audio.remote_autoplay),
        };
        self.stack
            .create_session(kind.into(), expires, remote_autoplay)
            .map(SessionHandle)
            .ok_or_else(|| TransportError::Failed(format!("{kind:?} session refused")))
    }

    fn register(&self, session: SessionHandle) -> Result<(), TransportError> {
        Self::check("register", self.stack.register(session.0))
    }

    fn call(&self, session: SessionHandle, number: &str) -> Result<(), TransportError> {
        match self.stack.call(session.0, number.to_string()) {
            0 => Ok(()),
            code => Err(TransportError::Rejected(code)),
        }
    }

    fn accept(
        &self,
        session: SessionHandle,
        audio: &softphone_core::CallAudioConfig,
    ) -> Result<(), TransportError> {
        Self::check("accept", self.stack.accept(session.0, audio.remote_autoplay))
    }

    fn hangup(&self, session: SessionHandle) -> Result<(), TransportError> {
        Self::check("hangup", self.stack.hangup(session.0))
    }

    fn mute(
        &self,
        session: SessionHandle,
        _media: softphone_core::MediaKind,
        mute: bool,
    ) -> Result<(), TransportError> {
        Self::check("mute", self.stack.mute(session.0, mute))
    }
}

struct HostRingtone(Arc<dyn RingtonePlayer>);

impl softphone_core::AudioSink for HostRingtone {
    fn play(&self) {
        self.0.play();
    }

    fn pause(&self) {
        self.0.pause();
    }
}

// ── Bridge listener: core notification → FFI callback ────────────────

struct BridgeListener {
    ffi_listener: Arc<dyn CallListener>,
}

impl softphone_core::CallEventListener for BridgeListener {
    fn on_notification(&self, notification: CallNotification) {
        match notification {
            CallNotification::Connecting => self.ffi_listener.on_connecting(),
            CallNotification::Connected => self.ffi_listener.on_connected(),
            CallNotification::Declined => self.ffi_listener.on_declined(),
            CallNotification::Incoming { remote_label } => {
                self.ffi_listener.on_incoming(remote_label)
            }
            CallNotification::Ringing => self.ffi_listener.on_ringing(),
            CallNotification::Terminated => self.ffi_listener.on_terminated(),
        }
    }
}

// ── SoftphoneClient: main FFI object ──────────────────────────────────

pub struct SoftphoneClient {
    phone: softphone_core::Softphone,
    transport: Arc<HostTransport>,
    ringtone: Arc<dyn RingtonePlayer>,
    settings: softphone_core::SettingsStore,
    rt: tokio::runtime::Runtime,
}

impl SoftphoneClient {
    pub fn new(
        stack: Box<dyn SignalingStack>,
        ringtone: Box<dyn RingtonePlayer>,
        data_dir: String,
    ) -> Self {
        let rt = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");
        let settings = softphone_core::SettingsStore::new(&data_dir);
        let transport = Arc::new(HostTransport::new(stack));
        let ringtone: Arc<dyn RingtonePlayer> = Arc::from(ringtone);
        ringtone.configure(settings.get().ringtone_path, true);

        let phone = {
            let _guard = rt.enter();
            softphone_core::Softphone::new(
                transport.clone(),
                Arc::new(HostRingtone(ringtone.clone())),
                settings.get().call_audio(),
            )
        };
        tracing::info!("SoftphoneClient created (data dir {data_dir})");

        Self {
            phone,
            transport,
            ringtone,
            settings,
            rt,
        }
    }

    /// Blocks until registration succeeds or fails.
    pub fn become_ready(&self, config: StackConfig) -> Result<(), PhoneError> {
        let config = config.into_core(&self.settings.get());
        self.rt
            .block_on(self.phone.become_ready(config))
            .map_err(PhoneError::from)
    }

    pub fn teardown(&self) {
        if let Err(e) = self.rt.block_on(self.phone.teardown()) {
            tracing::warn!("teardown failed: {e}");
        }
    }

    pub fn stack_status(&self) -> StackStatus {
        match self.rt.block_on(self.phone.stack_status()) {
            Ok(status) => status.into(),
            Err(e) => {
                tracing::warn!("stack_status unavailable: {e}");
                StackStatus::Disabled
            }
        }
    }

    pub fn call(&self, number: Option<String>) -> Result<(), PhoneError> {
        let number = number.unwrap_or_default();
        self.rt
            .block_on(self.phone.call(&number))
            .map_err(PhoneError::from)
    }

    pub fn answer(&self) -> Result<(), PhoneError> {
        self.rt.block_on(self.phone.answer()).map_err(PhoneError::from)
    }

    pub fn decline(&self) -> Result<(), PhoneError> {
        self.rt.block_on(self.phone.decline()).map_err(PhoneError::from)
    }

    pub fn end_call(&self) -> Result<(), PhoneError> {
        self.rt.block_on(self.phone.end_call()).map_err(PhoneError::from)
    }

    pub fn mute_call(&self, mute: bool) -> Result<(), PhoneError> {
        self.rt
            .block_on(self.phone.mute_call(mute))
            .map_err(PhoneError::from)
    }

    pub fn call_info(&self) -> Option<CallInfo> {
        match self.rt.block_on(self.phone.call_info()) {
            Ok(session) => session.map(CallInfo::from),
            Err(e) => {
                tracing::warn!("call_info unavailable: {e}");
                None
            }
        }
    }

    /// Route every notification to `listener`, replacing previous listeners.
    pub fn set_listener(&self, listener: Box<dyn CallListener>) {
        let bridge: Arc<dyn softphone_core::CallEventListener> = Arc::new(BridgeListener {
            ffi_listener: Arc::from(listener),
        });
        for transition in [
            Transition::Connecting,
            Transition::Connected,
            Transition::Declined,
            Transition::Incoming,
            Transition::Ringing,
            Transition::Terminated,
        ] {
            self.phone.set_listener(transition, bridge.clone());
        }
    }

    pub fn push_stack_event(
        &self,
        description: String,
        incoming_session: Option<u64>,
        remote_label: Option<String>,
    ) {
        let incoming = incoming_session.map(|handle| softphone_core::IncomingSession {
            handle: SessionHandle(handle),
            remote_label,
        });
        self.transport.push(TransportEvent::Stack { description, incoming });
    }

    pub fn push_registration_event(&self, session: u64, event_type: String, description: String) {
        self.transport.push(TransportEvent::Registration {
            handle: SessionHandle(session),
            event_type,
            description,
        });
    }

    pub fn push_session_event(&self, session: u64, description: String) {
        self.transport.push(TransportEvent::Session {
            handle: SessionHandle(session),
            description,
        });
    }

    pub fn get_settings(&self) -> PhoneSettings {
        self.settings.get().into()
    }

    pub fn set_display_name(&self, name: String) {
        self.settings.set_display_name(name);
    }

    pub fn set_ringtone_path(&self, path: String) {
        self.settings.set_ringtone_path(path.clone());
        self.ringtone.configure(path, true);
    }

    /// Takes effect for clients created afterwards.
    pub fn set_remote_autoplay(&self, enabled: bool) {
        self.settings.set_remote_autoplay(enabled);
    }

    pub fn set_registration_expires(&self, seconds: u32) {
        self.settings.set_registration_expires(seconds);
    }
}
