use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

/// Observable application-level transitions, one notification slot each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Connecting,
    Connected,
    Declined,
    Incoming,
    Ringing,
    Terminated,
}

/// Notification delivered to the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallNotification {
    Connecting,
    Connected,
    Declined,
    Incoming { remote_label: String },
    Ringing,
    Terminated,
}

impl CallNotification {
    pub fn transition(&self) -> Transition {
        match self {
            CallNotification::Connecting => Transition::Connecting,
            CallNotification::Connected => Transition::Connected,
            CallNotification::Declined => Transition::Declined,
            CallNotification::Incoming { .. } => Transition::Incoming,
            CallNotification::Ringing => Transition::Ringing,
            CallNotification::Terminated => Transition::Terminated,
        }
    }
}

/// Trait for receiving call notifications.
/// Implementations must be Send + Sync (called from the processing task).
pub trait CallEventListener: Send + Sync {
    fn on_notification(&self, notification: CallNotification);
}

impl<F> CallEventListener for F
where
    F: Fn(CallNotification) + Send + Sync,
{
    fn on_notification(&self, notification: CallNotification) {
        self(notification)
    }
}

/// One overwritable listener slot per [`Transition`].
///
/// Cloning shares the slots, so the application can install listeners
/// while the processing loop fires them.
#[derive(Clone, Default)]
pub struct NotificationHub {
    slots: Arc<RwLock<HashMap<Transition, Arc<dyn CallEventListener>>>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `listener` for `transition`, replacing any previous one.
    pub fn set_listener(&self, transition: Transition, listener: Arc<dyn CallEventListener>) {
        self.slots.write().unwrap().insert(transition, listener);
    }

    pub fn clear_listener(&self, transition: Transition) {
        self.slots.write().unwrap().remove(&transition);
    }

    #[cfg(test)]
    pub(crate) fn has_listener(&self, transition: Transition) -> bool {
        self.slots.read().unwrap().contains_key(&transition)
    }

    /// Invoke the listener for this notification's transition, if any.
    ///
    /// The slot lock is released before the listener runs. A panicking
    /// listener is logged and does not propagate.
    pub fn fire(&self, notification: CallNotification) {
        let transition = notification.transition();
        let listener = self.slots.read().unwrap().get(&transition).cloned();
        let Some(listener) = listener else {
            tracing::debug!("no listener for {transition:?}");
            return;
        };

        let result = panic::catch_unwind(AssertUnwindSafe(|| listener.on_notification(notification)));
        if let Err(panic_info) = result {
            let msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic".to_string()
            };
            tracing::error!("{transition:?} listener panicked: {msg}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingListener {
        count: Arc<AtomicUsize>,
    }

    impl CallEventListener for CountingListener {
        fn on_notification(&self, _notification: CallNotification) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn hub_dispatches_to_matching_slot_only() {
        let hub = NotificationHub::new();
        let connected = Arc::new(AtomicUsize::new(0));
        let ringing = Arc::new(AtomicUsize::new(0));

        hub.set_listener(
            Transition::Connected,
            Arc::new(CountingListener { count: connected.clone() }),
        );
        hub.set_listener(
            Transition::Ringing,
            Arc::new(CountingListener { count: ringing.clone() }),
        );

        hub.fire(CallNotification::Connected);

        assert_eq!(connected.load(Ordering::SeqCst), 1);
        assert_eq!(ringing.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn last_registration_wins() {
        let hub = NotificationHub::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        hub.set_listener(
            Transition::Terminated,
            Arc::new(CountingListener { count: first.clone() }),
        );
        hub.set_listener(
            Transition::Terminated,
            Arc::new(CountingListener { count: second.clone() }),
        );
        hub.fire(CallNotification::Terminated);

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    struct PanickingListener;

    impl CallEventListener for PanickingListener {
        fn on_notification(&self, _notification: CallNotification) {
            panic!("listener bug");
        }
    }

    #[test]
    fn panicking_listener_is_contained() {
        let hub = NotificationHub::new();
        let count = Arc::new(AtomicUsize::new(0));
        hub.set_listener(Transition::Incoming, Arc::new(PanickingListener));
        hub.set_listener(
            Transition::Terminated,
            Arc::new(CountingListener { count: count.clone() }),
        );

        hub.fire(CallNotification::Incoming { remote_label: "bob".into() });
        hub.fire(CallNotification::Terminated);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn firing_without_listener_is_a_no_op() {
        let hub = NotificationHub::new();
        hub.fire(CallNotification::Declined);
        assert!(!hub.has_listener(Transition::Declined));
    }

    #[test]
    fn closure_listener_receives_payload() {
        let hub = NotificationHub::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        hub.set_listener(
            Transition::Incoming,
            Arc::new(move |n: CallNotification| sink.lock().unwrap().push(n)),
        );

        hub.fire(CallNotification::Incoming { remote_label: "+15551234".into() });

        let captured = seen.lock().unwrap();
        assert_eq!(
            captured.as_slice(),
            &[CallNotification::Incoming { remote_label: "+15551234".into() }]
        );
    }

    #[test]
    fn listener_may_replace_its_own_slot() {
        let hub = NotificationHub::new();
        let inner = hub.clone();
        let count = Arc::new(AtomicUsize::new(0));
        let replacement = Arc::new(CountingListener { count: count.clone() });
        hub.set_listener(
            Transition::Ringing,
            Arc::new(move |_n: CallNotification| {
                inner.set_listener(Transition::Ringing, replacement.clone());
            }),
        );

        hub.fire(CallNotification::Ringing);
        hub.fire(CallNotification::Ringing);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cleared_slot_stops_dispatch() {
        let hub = NotificationHub::new();
        let count = Arc::new(AtomicUsize::new(0));
        hub.set_listener(
            Transition::Connecting,
            Arc::new(CountingListener { count: count.clone() }),
        );
        hub.clear_listener(Transition::Connecting);
        hub.fire(CallNotification::Connecting);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
