//! # Interaction State Store
//!
//! Owns the live, mutable view of every feed entity currently on screen
//! and runs the optimistic like/repost protocol against the remote store.
//!
//! ## Protocol
//!
//! A toggle flips the viewer flag and moves the paired counter *before*
//! the remote call is issued, in one synchronous step, so the UI observes
//! `{flag, count}` move together. The remote write then confirms the
//! optimistic state (no further change) or rejects it, in which case the
//! store restores the flag/counter pair captured when that toggle began.
//!
//! Each in-flight toggle carries its own [`ToggleOp`] record, scoped to
//! one [`InteractionKind`]. Overlapping toggles therefore compose: a like
//! rollback never touches repost fields, and two racing like toggles each
//! restore their own captured pair. If local and remote state still
//! diverge after a pathological interleaving, the next hydration pass is
//! the reconciliation point.
//!
//! ## Lifecycle
//!
//! Entities enter the store via [`InteractionStore::register`] (normally
//! called by the hydration coordinator on page load) and leave via
//! [`InteractionStore::retire`] when the owning view tears down. Holder
//! counts let two views share one cell for the same post. Results of
//! async work that settles after retirement are dropped, never applied
//! into a discarded entity; a generation stamp per registration keeps a
//! retire-then-reregister race from leaking a stale rollback into the
//! fresh cell.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tailfeed_core::effects::InteractionWriteEffects;
use tailfeed_core::{FeedEntity, InteractionKind, InteractionSnapshot, PostId, Shared};
use tracing::{debug, warn};

use crate::errors::InteractionError;

// ============================================================================
// Registry
// ============================================================================

struct EntityEntry {
    cell: Shared<FeedEntity>,
    /// Stamp for this registration; a re-registered post gets a new one.
    generation: u64,
    /// Number of views currently holding this entity.
    holders: u32,
    in_flight_likes: u32,
    in_flight_reposts: u32,
}

impl EntityEntry {
    fn in_flight_mut(&mut self, kind: InteractionKind) -> &mut u32 {
        match kind {
            InteractionKind::Like => &mut self.in_flight_likes,
            InteractionKind::Repost => &mut self.in_flight_reposts,
        }
    }

    fn in_flight(&self, kind: InteractionKind) -> u32 {
        match kind {
            InteractionKind::Like => self.in_flight_likes,
            InteractionKind::Repost => self.in_flight_reposts,
        }
    }
}

#[derive(Default)]
struct Registry {
    next_generation: u64,
    entries: HashMap<PostId, EntityEntry>,
}

// ============================================================================
// Operation records
// ============================================================================

/// One in-flight toggle: the pair it captured and the value it is writing.
///
/// Lives on the toggle future's stack; there is deliberately no shared
/// "previous value" slot that racing toggles could trample.
struct ToggleOp {
    prior: InteractionSnapshot,
    target: bool,
}

/// Admission ticket for one toggle against one registration.
struct FlightTicket {
    cell: Shared<FeedEntity>,
    generation: u64,
}

/// Outcome of applying one hydrated flag into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagApply {
    /// The flag was written into the live entity.
    Applied,
    /// A toggle for the same kind is in flight; the hydrated answer is
    /// older than the user's pending intent and was dropped.
    InFlight,
    /// The post is no longer registered; the result was discarded.
    NotRegistered,
}

// ============================================================================
// Store
// ============================================================================

/// Registry of live entities plus the optimistic toggle protocol.
///
/// Cheap to clone; all clones share one registry and remote handle.
#[derive(Clone)]
pub struct InteractionStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    remote: Arc<dyn InteractionWriteEffects>,
    registry: Mutex<Registry>,
    /// Toggles currently awaiting a remote response, across all entities.
    in_flight_total: AtomicUsize,
}

impl InteractionStore {
    /// Creates a store writing through the given remote handle.
    pub fn new(remote: Arc<dyn InteractionWriteEffects>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                remote,
                registry: Mutex::new(Registry::default()),
                in_flight_total: AtomicUsize::new(0),
            }),
        }
    }

    // ------------------------------------------------------------------------
    // Registry surface
    // ------------------------------------------------------------------------

    /// Registers an entity and returns the shared cell the UI renders.
    ///
    /// If the post is already registered the existing cell is returned and
    /// its holder count is bumped; the freshly fetched copy is dropped so
    /// live optimistic state is never clobbered by a page re-fetch. The
    /// next hydration pass refreshes the viewer flags either way.
    pub fn register(&self, entity: FeedEntity) -> Shared<FeedEntity> {
        let mut registry = self.inner.registry.lock();
        let generation = registry.next_generation;
        match registry.entries.entry(entity.id().clone()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                entry.holders = entry.holders.saturating_add(1);
                entry.cell.clone()
            }
            Entry::Vacant(vacant) => {
                let cell = Shared::new(entity);
                vacant.insert(EntityEntry {
                    cell: cell.clone(),
                    generation,
                    holders: 1,
                    in_flight_likes: 0,
                    in_flight_reposts: 0,
                });
                registry.next_generation += 1;
                cell
            }
        }
    }

    /// Releases one holder of a post; drops the entry when the last
    /// holder is gone. Returns `true` when the entity was discarded.
    ///
    /// Unknown ids are ignored, so teardown code may retire
    /// unconditionally.
    pub fn retire(&self, post_id: &PostId) -> bool {
        let mut registry = self.inner.registry.lock();
        let Some(entry) = registry.entries.get_mut(post_id) else {
            return false;
        };
        entry.holders = entry.holders.saturating_sub(1);
        if entry.holders == 0 {
            registry.entries.remove(post_id);
            debug!(post_id = %post_id, "discarded entity");
            true
        } else {
            false
        }
    }

    /// The live cell for a post, if registered.
    pub fn cell(&self, post_id: &PostId) -> Option<Shared<FeedEntity>> {
        self.inner
            .registry
            .lock()
            .entries
            .get(post_id)
            .map(|entry| entry.cell.clone())
    }

    /// Whether a post currently has a live cell.
    pub fn is_registered(&self, post_id: &PostId) -> bool {
        self.inner.registry.lock().entries.contains_key(post_id)
    }

    /// Number of registered entities.
    pub fn registered_count(&self) -> usize {
        self.inner.registry.lock().entries.len()
    }

    /// Toggles currently awaiting a remote response, across all entities.
    ///
    /// Instrumentation for the frontend's "syncing" affordance.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight_total.load(Ordering::Acquire)
    }

    // ------------------------------------------------------------------------
    // Optimistic toggles
    // ------------------------------------------------------------------------

    /// Toggles the viewer's like on a post. Returns the new flag value.
    ///
    /// The flag and counter move before this future first suspends; a
    /// remote rejection rolls both back and surfaces as
    /// [`InteractionError::RemoteRejected`].
    pub async fn toggle_like(&self, post_id: &PostId) -> Result<bool, InteractionError> {
        self.toggle(post_id, InteractionKind::Like).await
    }

    /// Toggles the viewer's repost of a post. Returns the new flag value.
    pub async fn toggle_repost(&self, post_id: &PostId) -> Result<bool, InteractionError> {
        self.toggle(post_id, InteractionKind::Repost).await
    }

    async fn toggle(
        &self,
        post_id: &PostId,
        kind: InteractionKind,
    ) -> Result<bool, InteractionError> {
        let flight = self.begin_flight(post_id, kind)?;

        // Optimistic apply: flag and counter move together under the cell
        // write lock, before the first await point.
        let applied = flight.cell.update(|entity| {
            entity.as_interactable_mut().map(|fields| {
                let prior = fields.snapshot(kind);
                let target = fields.toggle(kind);
                ToggleOp { prior, target }
            })
        });
        let op = match applied {
            Ok(op) => op,
            Err(err) => {
                self.end_flight(post_id, kind, flight.generation);
                return Err(err.into());
            }
        };
        debug!(post_id = %post_id, kind = %kind, target = op.target, "applied optimistic toggle");

        let outcome = match kind {
            InteractionKind::Like => self.inner.remote.set_liked(post_id, op.target).await,
            InteractionKind::Repost => self.inner.remote.set_reposted(post_id, op.target).await,
        };

        // Settle. The cell comes back only if this registration is still
        // live, so a rollback can never land in a discarded or
        // re-registered entity.
        let live_cell = self.end_flight(post_id, kind, flight.generation);

        match outcome {
            Ok(()) => {
                debug!(post_id = %post_id, kind = %kind, target = op.target, "remote confirmed toggle");
                Ok(op.target)
            }
            Err(source) => {
                match live_cell {
                    Some(cell) => {
                        cell.update(|entity| {
                            if let Ok(fields) = entity.as_interactable_mut() {
                                fields.restore(kind, op.prior);
                            }
                        });
                        warn!(
                            post_id = %post_id,
                            kind = %kind,
                            error = %source,
                            "remote rejected toggle, rolled back"
                        );
                    }
                    None => {
                        debug!(
                            post_id = %post_id,
                            kind = %kind,
                            "toggle settled after retirement, dropped rollback"
                        );
                    }
                }
                Err(InteractionError::RemoteRejected {
                    post_id: post_id.clone(),
                    kind,
                    source,
                })
            }
        }
    }

    fn begin_flight(
        &self,
        post_id: &PostId,
        kind: InteractionKind,
    ) -> Result<FlightTicket, InteractionError> {
        let mut registry = self.inner.registry.lock();
        let entry = registry
            .entries
            .get_mut(post_id)
            .ok_or_else(|| InteractionError::NotRegistered {
                post_id: post_id.clone(),
            })?;
        *entry.in_flight_mut(kind) += 1;
        self.inner.in_flight_total.fetch_add(1, Ordering::AcqRel);
        Ok(FlightTicket {
            cell: entry.cell.clone(),
            generation: entry.generation,
        })
    }

    /// Closes out one flight. Returns the cell iff the same registration
    /// is still live.
    fn end_flight(
        &self,
        post_id: &PostId,
        kind: InteractionKind,
        generation: u64,
    ) -> Option<Shared<FeedEntity>> {
        self.inner.in_flight_total.fetch_sub(1, Ordering::AcqRel);
        let mut registry = self.inner.registry.lock();
        let entry = registry.entries.get_mut(post_id)?;
        if entry.generation != generation {
            return None;
        }
        let counter = entry.in_flight_mut(kind);
        *counter = counter.saturating_sub(1);
        Some(entry.cell.clone())
    }

    // ------------------------------------------------------------------------
    // Hydration ingress
    // ------------------------------------------------------------------------

    /// Writes a hydrated viewer flag into the live entity.
    ///
    /// Counters are untouched: fetched counts already include the viewer.
    /// The write is skipped when a toggle for the same kind is in flight
    /// (the pending user intent is newer than the queried answer) and when
    /// the post has been retired.
    ///
    /// The in-flight check and the write happen under one registry lock
    /// hold, so a toggle admitted between them cannot have its optimistic
    /// flip overwritten by a stale answer. The toggle path never takes the
    /// registry lock while holding a cell lock, so nesting the cell write
    /// inside the registry hold cannot deadlock.
    pub fn apply_hydrated_flag(
        &self,
        post_id: &PostId,
        kind: InteractionKind,
        value: bool,
    ) -> FlagApply {
        let registry = self.inner.registry.lock();
        let Some(entry) = registry.entries.get(post_id) else {
            return FlagApply::NotRegistered;
        };
        if entry.in_flight(kind) > 0 {
            return FlagApply::InFlight;
        }
        entry.cell.update(|entity| {
            if let Ok(fields) = entity.as_interactable_mut() {
                fields.set_viewer_flag(kind, value);
            }
        });
        FlagApply::Applied
    }
}

impl std::fmt::Debug for InteractionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionStore")
            .field("registered", &self.registered_count())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}
