//! # Relationship Change Bus
//!
//! In-process broadcast for social-graph changes (follow/unfollow landing,
//! mute edits). Publishing carries **no payload**: a notification means
//! "something you derived from the relationship graph may be stale" and
//! each subscriber re-derives whatever it displays from the source of
//! truth. That keeps the bus free of partial-update ordering bugs at the
//! cost of redundant re-derivation, which is the right trade for a client
//! core.
//!
//! Dispatch is synchronous on the publishing thread against a snapshot of
//! the listener table. The table lock is released before any listener
//! runs, so listeners may freely subscribe, unsubscribe (including
//! themselves), or publish again from inside the callback.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Opaque handle returned by [`RelationshipBus::subscribe`].
///
/// Ids are never reused within one bus, so a stale handle can only ever
/// miss (making [`RelationshipBus::unsubscribe`] a safe no-op), never hit
/// another subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    entries: HashMap<u64, Listener>,
}

/// Synchronous, payload-free pub/sub for relationship changes.
///
/// Cheap to clone; all clones share one listener table.
#[derive(Clone, Default)]
pub struct RelationshipBus {
    listeners: Arc<Mutex<ListenerTable>>,
}

impl RelationshipBus {
    /// Creates a bus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener and returns its handle.
    ///
    /// The listener is invoked on the publishing thread starting with the
    /// *next* dispatch; a publish already in flight works from its own
    /// snapshot and will not see it.
    pub fn subscribe(&self, listener: impl Fn() + Send + Sync + 'static) -> SubscriptionId {
        let mut table = self.listeners.lock();
        let id = table.next_id;
        table.next_id += 1;
        table.entries.insert(id, Arc::new(listener));
        SubscriptionId(id)
    }

    /// Removes a listener. Unknown or already-removed handles are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners.lock().entries.remove(&id.0);
    }

    /// Notifies every listener registered at the moment of the call.
    ///
    /// Invocation order is unspecified. A listener that unsubscribes
    /// itself mid-dispatch still runs in this dispatch, because the
    /// snapshot was taken first.
    pub fn publish(&self) {
        let snapshot: Vec<Listener> = {
            let table = self.listeners.lock();
            table.entries.values().cloned().collect()
        };
        for listener in snapshot {
            listener();
        }
    }

    /// Number of currently registered listeners.
    pub fn subscriber_count(&self) -> usize {
        self.listeners.lock().entries.len()
    }
}

impl std::fmt::Debug for RelationshipBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationshipBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_publish_invokes_every_listener_exactly_once() {
        let bus = RelationshipBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let hits = hits.clone();
            bus.subscribe(move || {
                hits.fetch_add(1, Ordering::SeqCst);
            });
        }

        bus.publish();
        assert_eq!(hits.load(Ordering::SeqCst), 3);

        bus.publish();
        assert_eq!(hits.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_publish_with_no_subscribers_is_a_no_op() {
        let bus = RelationshipBus::new();
        bus.publish();
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_unsubscribed_listener_is_not_invoked() {
        let bus = RelationshipBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let id = {
            let hits = hits.clone();
            bus.subscribe(move || {
                hits.fetch_add(1, Ordering::SeqCst);
            })
        };

        bus.unsubscribe(id);
        bus.publish();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unsubscribe_unknown_handle_is_a_no_op() {
        let bus = RelationshipBus::new();
        let id = bus.subscribe(|| {});
        bus.unsubscribe(id);
        // Second removal of the same handle must not disturb anything.
        bus.unsubscribe(id);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_self_unsubscribe_during_dispatch_still_runs_in_that_dispatch() {
        let bus = RelationshipBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        // The listener needs its own id; thread it through a slot.
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));
        let id = {
            let bus = bus.clone();
            let slot = slot.clone();
            let hits = hits.clone();
            bus.clone().subscribe(move || {
                hits.fetch_add(1, Ordering::SeqCst);
                if let Some(id) = *slot.lock() {
                    bus.unsubscribe(id);
                }
            })
        };
        *slot.lock() = Some(id);

        bus.publish();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscriber_count(), 0);

        // Gone from the table, so the next dispatch skips it.
        bus.publish();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribing_another_listener_mid_dispatch_does_not_skip_it() {
        let bus = RelationshipBus::new();
        let target_hits = Arc::new(AtomicUsize::new(0));
        let other_hits = Arc::new(AtomicUsize::new(0));

        let target = {
            let target_hits = target_hits.clone();
            bus.subscribe(move || {
                target_hits.fetch_add(1, Ordering::SeqCst);
            })
        };
        // One listener removes the target, another just counts; invocation
        // order is unspecified, so the snapshot must protect the target
        // either way.
        {
            let bus = bus.clone();
            bus.clone().subscribe(move || {
                bus.unsubscribe(target);
            });
        }
        {
            let other_hits = other_hits.clone();
            bus.subscribe(move || {
                other_hits.fetch_add(1, Ordering::SeqCst);
            });
        }

        // Every listener in the dispatch-start snapshot runs exactly once,
        // including the one removed mid-pass.
        bus.publish();
        assert_eq!(target_hits.load(Ordering::SeqCst), 1);
        assert_eq!(other_hits.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscriber_count(), 2);

        // The removal takes effect from the next dispatch.
        bus.publish();
        assert_eq!(target_hits.load(Ordering::SeqCst), 1);
        assert_eq!(other_hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_listener_subscribed_during_dispatch_waits_for_next_dispatch() {
        let bus = RelationshipBus::new();
        let late_hits = Arc::new(AtomicUsize::new(0));

        {
            let bus = bus.clone();
            let late_hits = late_hits.clone();
            bus.clone().subscribe(move || {
                let late_hits = late_hits.clone();
                bus.subscribe(move || {
                    late_hits.fetch_add(1, Ordering::SeqCst);
                });
            });
        }

        bus.publish();
        assert_eq!(late_hits.load(Ordering::SeqCst), 0);
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish();
        assert_eq!(late_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clones_share_one_listener_table() {
        let bus = RelationshipBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        {
            let hits = hits.clone();
            bus.subscribe(move || {
                hits.fetch_add(1, Ordering::SeqCst);
            });
        }

        let other = bus.clone();
        other.publish();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(other.subscriber_count(), 1);
    }
}
