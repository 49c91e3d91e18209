//! Change notification for presentation collaborators
//!
//! Subscribers register per collection and receive a `ChangeEvent` after
//! every committed write to it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::Serialize;

use super::collection::Collection;

/// What happened to the collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Inserted,
    Updated,
    Removed,
    /// The whole collection was replaced (load, restore, repair)
    Reloaded,
}

/// A committed change to one collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    pub collection: Collection,
    pub kind: ChangeKind,
    /// Key of the affected record; `None` for `Reloaded`
    pub record_id: Option<String>,
    /// Store revision after the change
    pub revision: u64,
}

/// Handle returned by `subscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

/// Per-collection subscriber registry
#[derive(Default)]
pub struct ChangeNotifier {
    next_id: AtomicU64,
    subscribers: RwLock<HashMap<SubscriptionId, (Collection, Callback)>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, collection: Collection, callback: F) -> SubscriptionId
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        if let Ok(mut subscribers) = self.subscribers.write() {
            subscribers.insert(id, (collection, Arc::new(callback)));
        }
        id
    }

    /// Returns false if the subscription was unknown
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers
            .write()
            .map(|mut subscribers| subscribers.remove(&id).is_some())
            .unwrap_or(false)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Deliver an event to the collection's subscribers
    ///
    /// Callbacks run after the registry lock is released, so a callback may
    /// subscribe or unsubscribe.
    pub fn notify(&self, event: &ChangeEvent) {
        let callbacks: Vec<Callback> = match self.subscribers.read() {
            Ok(subscribers) => subscribers
                .values()
                .filter(|(collection, _)| *collection == event.collection)
                .map(|(_, callback)| Arc::clone(callback))
                .collect(),
            Err(_) => return,
        };

        for callback in callbacks {
            callback(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn event(collection: Collection, revision: u64) -> ChangeEvent {
        ChangeEvent {
            collection,
            kind: ChangeKind::Updated,
            record_id: Some("bank-1".into()),
            revision,
        }
    }

    #[test]
    fn test_only_matching_collection_is_notified() {
        let notifier = ChangeNotifier::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        notifier.subscribe(Collection::BankAccounts, move |e| {
            sink.lock().unwrap().push(e.revision)
        });

        notifier.notify(&event(Collection::BankAccounts, 1));
        notifier.notify(&event(Collection::Transactions, 2));
        notifier.notify(&event(Collection::BankAccounts, 3));

        assert_eq!(*seen.lock().unwrap(), vec![1, 3]);
    }

    #[test]
    fn test_unsubscribe() {
        let notifier = ChangeNotifier::new();
        let count = Arc::new(AtomicU64::new(0));
        let sink = Arc::clone(&count);
        let id = notifier.subscribe(Collection::Users, move |_| {
            sink.fetch_add(1, Ordering::SeqCst);
        });

        notifier.notify(&event(Collection::Users, 1));
        assert!(notifier.unsubscribe(id));
        assert!(!notifier.unsubscribe(id));
        notifier.notify(&event(Collection::Users, 2));

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.subscriber_count(), 0);
    }
}
