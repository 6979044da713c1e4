use std::sync::Arc;

use tokio::sync::oneshot;

use crate::config::{DEFAULT_REGISTRATION_EXPIRES, StackConfig};
use crate::errors::PhoneError;
use crate::signal::{RegistrationSignal, SignalEvent};
use crate::transport::{SessionConfig, SessionHandle, SessionKind, SignalingTransport, TransportEvents};

/// Readiness of the signaling stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackStatus {
    /// Never started, or torn down.
    Disabled,
    /// Started and waiting for registration.
    Pending,
    /// Registered; calls can be placed and received.
    Ready,
    /// Initialization, start or registration failed.
    Failed,
}

/// Reply channel for the single outstanding `become_ready` request.
pub type ReadinessReply = oneshot::Sender<Result<(), PhoneError>>;

/// What the caller must do with a stack-level signal after the controller
/// has seen it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackAction {
    None,
    /// Media was refused; surface it as a `Declined` notification.
    NotifyDeclined,
    /// Bind the announced session in the call state machine.
    BindIncoming,
}

/// Drives stack initialization and registration to a single readiness
/// outcome.
pub struct StackLifecycleController {
    transport: Arc<dyn SignalingTransport>,
    enabled: bool,
    /// Set once `initialize` succeeded; the stack is never re-created
    /// while enabled.
    initialized: bool,
    status: StackStatus,
    registration: Option<SessionHandle>,
    registration_expires: u32,
    pending: Option<ReadinessReply>,
}

impl StackLifecycleController {
    pub fn new(transport: Arc<dyn SignalingTransport>) -> Self {
        Self {
            transport,
            enabled: false,
            initialized: false,
            status: StackStatus::Disabled,
            registration: None,
            registration_expires: DEFAULT_REGISTRATION_EXPIRES,
            pending: None,
        }
    }

    pub fn status(&self) -> StackStatus {
        if self.enabled {
            self.status
        } else {
            StackStatus::Disabled
        }
    }

    /// Fails with `NotReady` until the transport has been initialized.
    pub fn ensure_initialized(&self) -> Result<(), PhoneError> {
        if self.initialized {
            Ok(())
        } else {
            Err(PhoneError::NotReady)
        }
    }

    #[cfg(test)]
    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[cfg(test)]
    pub(crate) fn registration(&self) -> Option<SessionHandle> {
        self.registration
    }

    /// Start the stack, or answer a re-entrant request from current status.
    ///
    /// The reply is resolved now for immediate outcomes, or parked until
    /// registration settles. Returns the transport event stream when the
    /// stack was freshly initialized.
    pub fn become_ready(&mut self, config: &StackConfig, reply: ReadinessReply) -> Option<TransportEvents> {
        if self.enabled || self.initialized {
            let outcome = if self.status == StackStatus::Ready {
                self.enabled = true;
                tracing::info!("stack already registered, re-enabled");
                Ok(())
            } else {
                tracing::warn!("become_ready re-entered while {:?}", self.status);
                Err(PhoneError::NotReady)
            };
            let _ = reply.send(outcome);
            return None;
        }

        if let Err(e) = config.validate() {
            let _ = reply.send(Err(e));
            return None;
        }

        self.enabled = true;
        self.status = StackStatus::Pending;
        self.registration_expires = config.registration_expires;

        let events = match self.transport.initialize(config) {
            Ok(events) => events,
            Err(e) => {
                tracing::error!("transport initialization failed: {e}");
                self.status = StackStatus::Failed;
                let _ = reply.send(Err(PhoneError::InitializationFailed(e.into_reason())));
                return None;
            }
        };
        self.initialized = true;

        if let Err(e) = self.transport.start() {
            tracing::error!("stack start failed: {e}");
            self.status = StackStatus::Failed;
            let _ = reply.send(Err(PhoneError::StartFailed(e.into_reason())));
            return Some(events);
        }

        tracing::info!("stack starting for {}", config.public_identity());
        self.pending = Some(reply);
        Some(events)
    }

    /// Logically disable the stack. In-flight sessions are left alone.
    pub fn teardown(&mut self) {
        self.enabled = false;
        tracing::info!("stack disabled");
    }

    /// Consume a stack-level signal. Ignored while disabled.
    pub fn handle_stack_signal(&mut self, signal: SignalEvent, description: &str) -> StackAction {
        if !self.enabled || !self.initialized {
            tracing::debug!("stack signal {signal:?} ignored: stack disabled");
            return StackAction::None;
        }

        match signal {
            SignalEvent::Started => {
                self.start_registration();
                StackAction::None
            }
            SignalEvent::FailedToStart => {
                self.fail(PhoneError::StartFailed(description.to_string()));
                StackAction::None
            }
            SignalEvent::MediaDenied => {
                tracing::warn!("media refused by the platform");
                StackAction::NotifyDeclined
            }
            SignalEvent::IncomingCall => StackAction::BindIncoming,
            other => {
                tracing::debug!("stack signal {other:?} ({description}) has no stack effect");
                StackAction::None
            }
        }
    }

    /// Consume an event from the registration session.
    pub fn handle_registration(
        &mut self,
        handle: SessionHandle,
        signal: RegistrationSignal,
        description: &str,
    ) {
        if self.registration != Some(handle) {
            tracing::debug!("registration event on unknown {handle} dropped");
            return;
        }

        match signal {
            RegistrationSignal::Connected => {
                tracing::info!("registered ({handle})");
                self.status = StackStatus::Ready;
                if let Some(reply) = self.pending.take() {
                    let _ = reply.send(Ok(()));
                }
            }
            RegistrationSignal::Terminated => {
                self.registration = None;
                if self.status == StackStatus::Ready {
                    tracing::warn!("registration lost: {description}");
                    self.status = StackStatus::Failed;
                } else {
                    self.fail(PhoneError::RegistrationFailed(description.to_string()));
                }
            }
            RegistrationSignal::Other => {
                tracing::debug!("registration event ignored: {description}");
            }
        }
    }

    fn start_registration(&mut self) {
        if let Some(handle) = self.registration {
            tracing::debug!("registration {handle} already in flight");
            return;
        }

        let config = SessionConfig::Register {
            expires: self.registration_expires,
        };
        let handle = match self.transport.create_session(SessionKind::Register, &config) {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!("failed to create registration session: {e}");
                self.fail(PhoneError::RegistrationFailed(e.into_reason()));
                return;
            }
        };
        self.registration = Some(handle);

        if let Err(e) = self.transport.register(handle) {
            tracing::error!("register on {handle} failed: {e}");
            self.registration = None;
            self.fail(PhoneError::RegistrationFailed(e.into_reason()));
            return;
        }
        tracing::info!("registering ({handle}, expires {}s)", self.registration_expires);
    }

    fn fail(&mut self, error: PhoneError) {
        self.status = StackStatus::Failed;
        match self.pending.take() {
            Some(reply) => {
                tracing::warn!("readiness failed: {error}");
                let _ = reply.send(Err(error));
            }
            None => tracing::warn!("stack failure with no pending readiness: {error}"),
        }
    }
}
