//! Synchronous observer list for change notification.
//!
//! Every CRDT wrapper carries a `Listeners` and fires it after a local
//! mutation or a merge that changed its visible value. Callbacks run
//! synchronously, once per notification, in registration order. There
//! is no implicit global event bus; each component owns its list.

/// Handle returned by [`Listeners::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback = Box<dyn FnMut() + Send>;

/// An ordered list of change callbacks.
#[derive(Default)]
pub struct Listeners {
    next_id: u64,
    entries: Vec<(ListenerId, Callback)>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback. Callbacks fire in registration order.
    pub fn subscribe(&mut self, callback: impl FnMut() + Send + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, Box::new(callback)));
        id
    }

    /// Remove a previously registered callback.
    ///
    /// Returns `false` if the id was already removed or never issued.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    /// Invoke every callback once, in registration order.
    pub fn notify(&mut self) {
        for (_, callback) in &mut self.entries {
            callback();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_notify_fires_in_registration_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut listeners = Listeners::new();

        for tag in 0..3 {
            let order = order.clone();
            listeners.subscribe(move || order.lock().unwrap().push(tag));
        }

        listeners.notify();
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut listeners = Listeners::new();

        let count_clone = count.clone();
        let id = listeners.subscribe(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        listeners.notify();
        assert!(listeners.unsubscribe(id));
        listeners.notify();

        assert_eq!(count.load(Ordering::SeqCst), 1);
        // Second unsubscribe is a no-op
        assert!(!listeners.unsubscribe(id));
    }

    #[test]
    fn test_each_callback_fires_once_per_notify() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut listeners = Listeners::new();

        let count_clone = count.clone();
        listeners.subscribe(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        listeners.notify();
        listeners.notify();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
