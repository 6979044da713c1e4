use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::call::{CallSession, CallSessionStateMachine, CallState};
use crate::config::StackConfig;
use crate::errors::PhoneError;
use crate::events::{CallEventListener, CallNotification, NotificationHub, Transition};
use crate::ringtone::RingtoneController;
use crate::signal::{RegistrationSignal, SignalEvent, translate};
use crate::stack::{ReadinessReply, StackAction, StackLifecycleController, StackStatus};
use crate::transport::{
    AudioSink, CallAudioConfig, SignalingTransport, TransportEvent, TransportEvents,
};

type Reply<T> = oneshot::Sender<T>;

enum Command {
    BecomeReady { config: StackConfig, reply: ReadinessReply },
    Call { number: String, reply: Reply<Result<(), PhoneError>> },
    Answer { reply: Reply<Result<(), PhoneError>> },
    Decline { reply: Reply<Result<(), PhoneError>> },
    EndCall { reply: Reply<Result<(), PhoneError>> },
    Mute { mute: bool, reply: Reply<Result<(), PhoneError>> },
    Teardown { reply: Reply<()> },
    CallInfo { reply: Reply<Option<CallSession>> },
    StackStatus { reply: Reply<StackStatus> },
}

/// Application-facing handle to the call core.
///
/// Commands are queued to a single processing task that also consumes the
/// transport's event stream, so no two steps ever interleave. Cloning
/// shares the same task; it ends once every handle is dropped.
///
/// Ordering: every transport event queued when the task wakes is handled
/// before the next command, including events that arrived after the
/// command was sent. A command waits for as long as the transport keeps
/// its event queue non-empty.
#[derive(Clone)]
pub struct Softphone {
    commands: mpsc::UnboundedSender<Command>,
    hub: NotificationHub,
}

impl Softphone {
    /// Spawn the processing task. Must be called inside a tokio runtime.
    pub fn new(
        transport: Arc<dyn SignalingTransport>,
        ringtone: Arc<dyn AudioSink>,
        audio: CallAudioConfig,
    ) -> Self {
        let hub = NotificationHub::new();
        let core = PhoneCore {
            stack: StackLifecycleController::new(transport.clone()),
            calls: CallSessionStateMachine::new(
                transport,
                hub.clone(),
                RingtoneController::new(ringtone),
                audio,
            ),
            hub: hub.clone(),
            events: None,
        };

        let (commands, rx) = mpsc::unbounded_channel();
        tokio::spawn(core.run(rx));

        Self { commands, hub }
    }

    /// Install the listener for one transition, replacing the previous one.
    pub fn set_listener(&self, transition: Transition, listener: Arc<dyn CallEventListener>) {
        self.hub.set_listener(transition, listener);
    }

    pub fn on_connecting(&self, f: impl Fn() + Send + Sync + 'static) {
        self.on_transition(Transition::Connecting, f);
    }

    pub fn on_connected(&self, f: impl Fn() + Send + Sync + 'static) {
        self.on_transition(Transition::Connected, f);
    }

    pub fn on_declined(&self, f: impl Fn() + Send + Sync + 'static) {
        self.on_transition(Transition::Declined, f);
    }

    pub fn on_ringing(&self, f: impl Fn() + Send + Sync + 'static) {
        self.on_transition(Transition::Ringing, f);
    }

    pub fn on_terminated(&self, f: impl Fn() + Send + Sync + 'static) {
        self.on_transition(Transition::Terminated, f);
    }

    /// `f` receives the caller's friendly name.
    pub fn on_incoming(&self, f: impl Fn(String) + Send + Sync + 'static) {
        self.hub.set_listener(
            Transition::Incoming,
            Arc::new(move |n: CallNotification| {
                if let CallNotification::Incoming { remote_label } = n {
                    f(remote_label);
                }
            }),
        );
    }

    fn on_transition(&self, transition: Transition, f: impl Fn() + Send + Sync + 'static) {
        self.hub
            .set_listener(transition, Arc::new(move |_n: CallNotification| f()));
    }

    /// Initialize, start and register the stack.
    ///
    /// Resolves once registration succeeds. Signaling events keep flowing
    /// while this is pending.
    pub async fn become_ready(&self, config: StackConfig) -> Result<(), PhoneError> {
        self.request(|reply| Command::BecomeReady { config, reply }).await?
    }

    /// Place a call. An empty number is a no-op.
    ///
    /// Fails with `NotReady` before the stack has been initialized.
    pub async fn call(&self, number: &str) -> Result<(), PhoneError> {
        let number = number.to_string();
        self.request(|reply| Command::Call { number, reply }).await?
    }

    pub async fn answer(&self) -> Result<(), PhoneError> {
        self.request(|reply| Command::Answer { reply }).await?
    }

    pub async fn decline(&self) -> Result<(), PhoneError> {
        self.request(|reply| Command::Decline { reply }).await?
    }

    pub async fn end_call(&self) -> Result<(), PhoneError> {
        self.request(|reply| Command::EndCall { reply }).await?
    }

    pub async fn mute_call(&self, mute: bool) -> Result<(), PhoneError> {
        self.request(|reply| Command::Mute { mute, reply }).await?
    }

    /// Disable the stack. In-flight registration and calls are not unwound.
    pub async fn teardown(&self) -> Result<(), PhoneError> {
        self.request(|reply| Command::Teardown { reply }).await
    }

    /// Snapshot of the active call, if any.
    pub async fn call_info(&self) -> Result<Option<CallSession>, PhoneError> {
        self.request(|reply| Command::CallInfo { reply }).await
    }

    pub async fn call_state(&self) -> Result<CallState, PhoneError> {
        Ok(self
            .call_info()
            .await?
            .map(|s| s.state)
            .unwrap_or(CallState::Idle))
    }

    pub async fn stack_status(&self) -> Result<StackStatus, PhoneError> {
        self.request(|reply| Command::StackStatus { reply }).await
    }

    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T, PhoneError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(command(tx))
            .map_err(|_| PhoneError::Closed)?;
        rx.await.map_err(|_| PhoneError::Closed)
    }
}

/// State owned by the processing task.
struct PhoneCore {
    stack: StackLifecycleController,
    calls: CallSessionStateMachine,
    hub: NotificationHub,
    events: Option<TransportEvents>,
}

impl PhoneCore {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        loop {
            // Transport events already queued go ahead of queued commands.
            tokio::select! {
                biased;

                event = next_event(&mut self.events) => match event {
                    Some(event) => self.dispatch(event),
                    None => {
                        tracing::warn!("transport event stream closed");
                        self.events = None;
                    }
                },

                command = commands.recv() => match command {
                    Some(command) => self.execute(command),
                    None => break,
                },
            }
        }

        tracing::info!("phone processing loop ended");
    }

    fn execute(&mut self, command: Command) {
        match command {
            Command::BecomeReady { config, reply } => {
                if let Some(events) = self.stack.become_ready(&config, reply) {
                    self.events = Some(events);
                }
            }
            Command::Call { number, reply } => {
                let outcome = self
                    .stack
                    .ensure_initialized()
                    .and_then(|()| self.calls.call(&number));
                let _ = reply.send(outcome);
            }
            Command::Answer { reply } => {
                let _ = reply.send(self.calls.answer());
            }
            Command::Decline { reply } => {
                let _ = reply.send(self.calls.decline());
            }
            Command::EndCall { reply } => {
                let _ = reply.send(self.calls.end_call());
            }
            Command::Mute { mute, reply } => {
                let _ = reply.send(self.calls.mute_call(mute));
            }
            Command::Teardown { reply } => {
                self.stack.teardown();
                let _ = reply.send(());
            }
            Command::CallInfo { reply } => {
                let _ = reply.send(self.calls.session().cloned());
            }
            Command::StackStatus { reply } => {
                let _ = reply.send(self.stack.status());
            }
        }
    }

    fn dispatch(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Stack { description, incoming } => {
                let signal = translate(&description);
                if signal == SignalEvent::Unknown {
                    tracing::debug!("unrecognized stack event dropped: {description}");
                    return;
                }
                match self.stack.handle_stack_signal(signal, &description) {
                    StackAction::None => {}
                    StackAction::NotifyDeclined => self.hub.fire(CallNotification::Declined),
                    StackAction::BindIncoming => match incoming {
                        Some(session) => {
                            self.calls.incoming(session);
                        }
                        None => tracing::warn!("incoming call event without a session"),
                    },
                }
            }

            TransportEvent::Registration { handle, event_type, description } => {
                let signal = RegistrationSignal::from_event_type(&event_type);
                self.stack.handle_registration(handle, signal, &description);
            }

            TransportEvent::Session { handle, description } => {
                let signal = translate(&description);
                if signal == SignalEvent::Unknown {
                    tracing::debug!("unrecognized session event dropped: {description}");
                    return;
                }
                self.calls.handle_signal(handle, signal);
            }
        }
    }
}

async fn next_event(events: &mut Option<TransportEvents>) -> Option<TransportEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
