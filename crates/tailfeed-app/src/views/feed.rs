//! # Feed Page View State
//!
//! An ordered page of feed entities plus the load phase a frontend drives
//! its skeleton/content/spinner states from. Entity cells are shared with
//! the interaction store, so a toggle confirmed or rolled back anywhere is
//! visible through this page without any copying.

use serde::{Deserialize, Serialize};
use tailfeed_core::{FeedEntity, PostId, Shared};

use crate::hydration::HydrationReport;
use crate::interactions::InteractionStore;

// =============================================================================
// Load Phase
// =============================================================================

/// Lifecycle of one page load.
///
/// Strictly forward: `Requested → EntitiesFetched → Hydrating → Ready`,
/// with `Hydrating → Ready` re-entered on a refresh pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageLoadPhase {
    /// The fetch has been issued; nothing to render yet
    Requested,
    /// Entities arrived and are registered; viewer flags still default
    EntitiesFetched,
    /// Per-item flag queries are in flight
    Hydrating,
    /// Every query has settled; the page is fully renderable
    Ready,
}

impl PageLoadPhase {
    /// Whether the page still has work in flight.
    pub fn is_loading(&self) -> bool {
        !matches!(self, Self::Ready)
    }

    /// Whether the page is fully settled.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Lowercase label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::EntitiesFetched => "entities_fetched",
            Self::Hydrating => "hydrating",
            Self::Ready => "ready",
        }
    }
}

// =============================================================================
// Page
// =============================================================================

struct PageEntry {
    post_id: PostId,
    cell: Shared<FeedEntity>,
}

/// One fetched page of entities, in fetch order.
///
/// The page holds one registry holder per entity; [`FeedPage::retire`]
/// releases them when the owning screen tears down. Retiring is what stops
/// late toggle rollbacks and hydration answers from landing in entities
/// the screen no longer shows.
pub struct FeedPage {
    phase: Shared<PageLoadPhase>,
    entries: Vec<PageEntry>,
    report: Option<HydrationReport>,
    retired: bool,
}

impl FeedPage {
    /// Starts a page load. The page is empty until entities are attached.
    pub fn request() -> Self {
        Self {
            phase: Shared::new(PageLoadPhase::Requested),
            entries: Vec::new(),
            report: None,
            retired: false,
        }
    }

    /// Registers fetched entities with the store and takes ownership of
    /// one holder each. Page order is fetch order.
    ///
    /// Only valid once, from `Requested`; later calls are ignored and
    /// return `false`.
    pub fn attach_fetched(&mut self, store: &InteractionStore, fetched: Vec<FeedEntity>) -> bool {
        if self.phase.get() != PageLoadPhase::Requested {
            return false;
        }
        self.entries = fetched
            .into_iter()
            .map(|entity| {
                let post_id = entity.id().clone();
                let cell = store.register(entity);
                PageEntry { post_id, cell }
            })
            .collect();
        self.phase.set(PageLoadPhase::EntitiesFetched);
        true
    }

    pub(crate) fn mark_hydrating(&mut self) {
        self.phase.set(PageLoadPhase::Hydrating);
    }

    pub(crate) fn complete(&mut self, report: HydrationReport) {
        self.report = Some(report);
        self.phase.set(PageLoadPhase::Ready);
    }

    /// Current load phase.
    pub fn phase(&self) -> PageLoadPhase {
        self.phase.get()
    }

    /// The phase cell, for frontends polling transitions.
    pub fn phase_cell(&self) -> &Shared<PageLoadPhase> {
        &self.phase
    }

    /// Report from the most recent hydration pass, if one has settled.
    pub fn report(&self) -> Option<&HydrationReport> {
        self.report.as_ref()
    }

    /// Number of entities in the page.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the page holds no entities.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entity ids in page order.
    pub fn post_ids(&self) -> Vec<PostId> {
        self.entries.iter().map(|entry| entry.post_id.clone()).collect()
    }

    /// Entity cells in page order.
    pub fn cells(&self) -> impl Iterator<Item = &Shared<FeedEntity>> {
        self.entries.iter().map(|entry| &entry.cell)
    }

    /// The cell for one entity in this page.
    pub fn cell(&self, post_id: &PostId) -> Option<&Shared<FeedEntity>> {
        self.entries
            .iter()
            .find(|entry| &entry.post_id == post_id)
            .map(|entry| &entry.cell)
    }

    /// Releases this page's registry holders.
    ///
    /// Idempotent; the second and later calls do nothing, so teardown code
    /// may retire unconditionally.
    pub fn retire(&mut self, store: &InteractionStore) {
        if self.retired {
            return;
        }
        self.retired = true;
        for entry in &self.entries {
            store.retire(&entry.post_id);
        }
    }
}

impl std::fmt::Debug for FeedPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedPage")
            .field("phase", &self.phase.get())
            .field("entries", &self.entries.len())
            .field("retired", &self.retired)
            .finish()
    }
}
