//! Change notification fan-out.
//!
//! Consumers either register a callback with [`ChangeNotifier::on_change`]
//! or take a broadcast receiver with [`ChangeNotifier::subscribe`]. Callbacks
//! run on the emitting task; each emission iterates over a snapshot of the
//! listener list, so a listener may unsubscribe itself (or others) while
//! being called without affecting the current round.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::types::ChangeEvent;

/// Default broadcast channel capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

type Listener = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;
type ListenerList = Mutex<Vec<(u64, Listener)>>;

/// Shares change events between the watcher and any number of consumers.
#[derive(Clone)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<ChangeEvent>,
    listeners: Arc<ListenerList>,
    next_id: Arc<AtomicU64>,
}

impl ChangeNotifier {
    /// Create a new notifier with the given broadcast capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Deliver an event to every callback, then to broadcast subscribers.
    pub fn send(&self, event: ChangeEvent) {
        let snapshot: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in &snapshot {
            listener(&event);
        }

        match self.sender.send(event) {
            Ok(count) => {
                crate::debug_event!(
                    "notify",
                    "sent",
                    "{} callbacks, {count} subscribers",
                    snapshot.len()
                );
            }
            Err(_) => {
                crate::debug_event!("notify", "sent", "{} callbacks", snapshot.len());
            }
        }
    }

    /// Subscribe to the broadcast stream.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    /// Register a callback. Dropping the handle does not unsubscribe.
    pub fn on_change<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push((id, Arc::new(listener)));
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("listeners", &self.listener_count())
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

/// Handle returned by [`ChangeNotifier::on_change`].
#[derive(Debug, Clone)]
pub struct Subscription {
    id: u64,
    listeners: Weak<ListenerList>,
}

impl Subscription {
    /// Remove the callback. Later emissions will not call it.
    pub fn unsubscribe(&self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.lock().retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChangeCategory, Scope};
    use std::path::PathBuf;
    use std::sync::atomic::AtomicUsize;

    fn event() -> ChangeEvent {
        ChangeEvent::modified(
            ChangeCategory::Config,
            Scope::Global,
            PathBuf::from("/home/u/.config/opencode/opencode.jsonc"),
        )
    }

    #[test]
    fn test_callbacks_receive_events() {
        let notifier = ChangeNotifier::default();
        let count = Arc::new(AtomicUsize::new(0));

        let seen = count.clone();
        notifier.on_change(move |e| {
            assert_eq!(e.scope, Scope::Global);
            seen.fetch_add(1, Ordering::SeqCst);
        });

        notifier.send(event());
        notifier.send(event());
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unsubscribe_during_callback() {
        let notifier = ChangeNotifier::default();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let handle: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let own = handle.clone();
        let hits = first.clone();
        let sub = notifier.on_change(move |_| {
            hits.fetch_add(1, Ordering::SeqCst);
            if let Some(sub) = own.lock().as_ref() {
                sub.unsubscribe();
            }
        });
        *handle.lock() = Some(sub);

        let hits = second.clone();
        notifier.on_change(move |_| {
            hits.fetch_add(1, Ordering::SeqCst);
        });

        notifier.send(event());
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.listener_count(), 1);

        notifier.send(event());
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_broadcast_subscribers() {
        let notifier = ChangeNotifier::new(8);
        let mut rx = notifier.subscribe();

        notifier.send(event());
        let received = rx.recv().await.unwrap();
        assert_eq!(received.category, ChangeCategory::Config);
    }

    #[test]
    fn test_send_without_consumers() {
        let notifier = ChangeNotifier::default();
        notifier.send(event());
        assert_eq!(notifier.listener_count(), 0);
    }
}
