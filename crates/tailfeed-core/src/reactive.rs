//! Shared values with change tickets
//!
//! [`Shared<T>`] is the unit of state the view layer renders: an
//! `Arc`-shared value with a version counter that moves on every write.
//! Frontends hold a [`ChangeTicket`] per rendered item and poll it each
//! frame — a cheap atomic read — re-rendering only what actually changed.
//!
//! Cells are handles, not copies: cloning a `Shared<FeedEntity>` yields a
//! second handle onto the same storage, which is how the interaction store,
//! the hydration coordinator, and a view all observe one entity.
//!
//! Poll-based rather than push-based so the primitive stays runtime-agnostic
//! and never calls back into frontend code while holding the lock.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

struct SharedInner<T> {
    value: RwLock<T>,
    version: AtomicU64,
}

/// A shared, observable value.
#[derive(Clone)]
pub struct Shared<T> {
    inner: Arc<SharedInner<T>>,
}

impl<T: Send + Sync + 'static> Shared<T> {
    /// Wrap a value in a fresh cell at version 0.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(SharedInner {
                value: RwLock::new(value),
                version: AtomicU64::new(0),
            }),
        }
    }

    /// Current version; moves by one on every completed write.
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Acquire)
    }

    /// Read through a closure without cloning the value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.read())
    }

    /// Mutate through a closure, then bump the version once.
    ///
    /// The closure runs under the write lock, so everything it touches is a
    /// single observable step — a flag and its counter can never be seen
    /// halfway through a toggle.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let result = {
            let mut guard = self.inner.value.write();
            f(&mut guard)
        };
        self.inner.version.fetch_add(1, Ordering::Release);
        result
    }

    /// Replace the value wholesale.
    pub fn set(&self, value: T) {
        self.update(|slot| *slot = value);
    }

    /// Get a change ticket anchored at the current version.
    pub fn ticket(&self) -> ChangeTicket<T> {
        ChangeTicket {
            source: self.inner.clone(),
            last_seen: self.version(),
        }
    }

    /// Whether two cells are handles onto the same storage.
    pub fn same_cell(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone + Send + Sync + 'static> Shared<T> {
    /// Clone the current value out of the cell.
    pub fn get(&self) -> T {
        self.inner.value.read().clone()
    }
}

impl<T: std::fmt::Debug + Send + Sync + 'static> std::fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shared")
            .field("value", &*self.inner.value.read())
            .field("version", &self.version())
            .finish()
    }
}

/// A poll-based subscription to one [`Shared`] cell.
///
/// Tracks the last version it observed; [`ChangeTicket::poll`] reports a
/// change at most once per write burst (rapid writes coalesce into the
/// latest value).
pub struct ChangeTicket<T> {
    source: Arc<SharedInner<T>>,
    last_seen: u64,
}

impl<T: Send + Sync + 'static> ChangeTicket<T> {
    /// Whether the cell has changed since the last poll.
    pub fn has_changed(&self) -> bool {
        self.source.version.load(Ordering::Acquire) > self.last_seen
    }

    /// Observe a pending change, if any, through a closure.
    ///
    /// Returns `Some` with the closure's result when the cell moved since
    /// the last poll, advancing the ticket; `None` otherwise.
    pub fn poll<R>(&mut self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let current = self.source.version.load(Ordering::Acquire);
        if current > self.last_seen {
            self.last_seen = current;
            Some(f(&self.source.value.read()))
        } else {
            None
        }
    }
}

impl<T: Clone + Send + Sync + 'static> ChangeTicket<T> {
    /// Clone out a pending change, if any.
    pub fn poll_value(&mut self) -> Option<T> {
        self.poll(Clone::clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_read() {
        let cell = Shared::new(41);
        assert_eq!(cell.with(|v| *v), 41);
        assert_eq!(cell.version(), 0);
    }

    #[test]
    fn test_update_bumps_version_once() {
        let cell = Shared::new(0);
        cell.update(|v| *v += 10);
        assert_eq!(cell.get(), 10);
        assert_eq!(cell.version(), 1);
    }

    #[test]
    fn test_clone_is_a_handle_not_a_copy() {
        let a = Shared::new(String::from("before"));
        let b = a.clone();
        a.set(String::from("after"));
        assert_eq!(b.get(), "after");
        assert!(a.same_cell(&b));
    }

    #[test]
    fn test_ticket_poll_cycle() {
        let cell = Shared::new(0);
        let mut ticket = cell.ticket();

        assert!(!ticket.has_changed());
        assert_eq!(ticket.poll_value(), None);

        cell.set(7);
        assert!(ticket.has_changed());
        assert_eq!(ticket.poll_value(), Some(7));
        assert_eq!(ticket.poll_value(), None);
    }

    #[test]
    fn test_ticket_coalesces_rapid_writes() {
        let cell = Shared::new(0);
        let mut ticket = cell.ticket();

        cell.set(1);
        cell.set(2);
        cell.set(3);

        assert_eq!(ticket.poll_value(), Some(3));
        assert_eq!(ticket.poll_value(), None);
    }

    #[test]
    fn test_independent_tickets() {
        let cell = Shared::new(0);
        let mut first = cell.ticket();
        let mut second = cell.ticket();

        cell.set(5);
        assert_eq!(first.poll_value(), Some(5));
        // One ticket advancing does not consume the other's change.
        assert_eq!(second.poll_value(), Some(5));
    }

    #[test]
    fn test_update_returns_closure_result() {
        let cell = Shared::new(vec![1, 2, 3]);
        let len = cell.update(|v| {
            v.push(4);
            v.len()
        });
        assert_eq!(len, 4);
    }
}
