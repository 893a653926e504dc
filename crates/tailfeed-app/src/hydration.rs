//! # Hydration Coordinator
//!
//! Enriches a freshly fetched page of entities with the viewer's own
//! like/repost flags by querying the remote store per item.
//!
//! Failure isolation is per flag, not per page: a query that errors or
//! times out leaves that one flag at its default (`false`) and is recorded
//! in the [`HydrationReport`]; every other query proceeds. Nothing in this
//! module raises at the page level — the page becomes `Ready` once every
//! query has settled, and the report says how clean the pass was.
//!
//! Hydration writes flags only. Fetched counters already include the
//! viewer's own contribution, so moving them here would double-count.
//! Applying a flag defers to the store's guards: an answer for a kind with
//! a toggle in flight is stale by construction and is dropped, as is an
//! answer for an entity retired mid-pass.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tailfeed_core::effects::InteractionQueryEffects;
use tailfeed_core::{FeedEntity, InteractionKind, PostId, RemoteStoreError, UserId};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::interactions::{FlagApply, InteractionStore};
use crate::views::FeedPage;

// ============================================================================
// Configuration
// ============================================================================

/// Tuning knobs for a hydration pass.
#[derive(Debug, Clone)]
pub struct HydrationConfig {
    /// Deadline for each individual remote query; an elapsed query is
    /// treated as that flag's failure, never as a page failure.
    pub item_timeout: Duration,
    /// Entities hydrated concurrently. Bounds the burst of remote calls a
    /// large page would otherwise fire at once.
    pub max_concurrency: usize,
}

impl Default for HydrationConfig {
    fn default() -> Self {
        Self {
            item_timeout: Duration::from_secs(5),
            max_concurrency: 8,
        }
    }
}

// ============================================================================
// Report
// ============================================================================

/// How one flag query ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagOutcome {
    /// The queried value was written into the live entity.
    Applied {
        /// The fetched flag value
        value: bool,
    },
    /// The query failed; the flag keeps its default.
    Defaulted {
        /// Why the query failed
        error: RemoteStoreError,
    },
    /// A toggle for this kind was in flight; the answer was dropped in
    /// favor of the pending user intent.
    Superseded,
    /// The entity was retired before the answer landed.
    Discarded,
}

/// Per-item outcome of a hydration pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// The entity was queried; per-flag results inside.
    Queried {
        /// Outcome of the like-flag query
        like: FlagOutcome,
        /// Outcome of the repost-flag query
        repost: FlagOutcome,
    },
    /// The entity's shape carries no interaction fields; skipped whole.
    Unsupported {
        /// Kind tag the client could not interpret
        raw_kind: String,
    },
}

/// One entity's line in the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    /// The entity this line describes
    pub post_id: PostId,
    /// What happened to it
    pub outcome: ItemOutcome,
}

impl ItemReport {
    /// Both flags settled without a query failure.
    pub fn fully_hydrated(&self) -> bool {
        matches!(
            &self.outcome,
            ItemOutcome::Queried { like, repost }
                if !matches!(like, FlagOutcome::Defaulted { .. })
                    && !matches!(repost, FlagOutcome::Defaulted { .. })
        )
    }

    /// At least one flag kept its default because a query failed.
    pub fn is_defaulted(&self) -> bool {
        matches!(
            &self.outcome,
            ItemOutcome::Queried { like, repost }
                if matches!(like, FlagOutcome::Defaulted { .. })
                    || matches!(repost, FlagOutcome::Defaulted { .. })
        )
    }
}

/// Settled outcomes for one hydration pass, in page order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HydrationReport {
    /// One line per entity, ordered as the page was fetched
    pub items: Vec<ItemReport>,
}

impl HydrationReport {
    /// Entities whose flags all settled cleanly.
    pub fn hydrated_count(&self) -> usize {
        self.items.iter().filter(|item| item.fully_hydrated()).count()
    }

    /// Entities left at default because a query failed.
    pub fn defaulted_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_defaulted()).count()
    }

    /// Entities skipped for carrying an unrecognized shape.
    pub fn unsupported_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item.outcome, ItemOutcome::Unsupported { .. }))
            .count()
    }

    /// No query failures anywhere in the pass.
    pub fn is_clean(&self) -> bool {
        self.defaulted_count() == 0
    }

    /// The line for one entity, if it was part of the pass.
    pub fn item(&self, post_id: &PostId) -> Option<&ItemReport> {
        self.items.iter().find(|item| &item.post_id == post_id)
    }
}

// ============================================================================
// Coordinator
// ============================================================================

/// Runs hydration passes for one viewer against one query handle.
pub struct HydrationCoordinator {
    query: Arc<dyn InteractionQueryEffects>,
    viewer: UserId,
    config: HydrationConfig,
}

impl HydrationCoordinator {
    /// Creates a coordinator with default tuning.
    pub fn new(query: Arc<dyn InteractionQueryEffects>, viewer: UserId) -> Self {
        Self::with_config(query, viewer, HydrationConfig::default())
    }

    /// Creates a coordinator with explicit tuning.
    pub fn with_config(
        query: Arc<dyn InteractionQueryEffects>,
        viewer: UserId,
        config: HydrationConfig,
    ) -> Self {
        Self {
            query,
            viewer,
            config,
        }
    }

    /// The viewer identity this coordinator hydrates for.
    pub fn viewer(&self) -> &UserId {
        &self.viewer
    }

    /// Registers a fetched page with the store and hydrates it.
    ///
    /// Drives the page through `Requested → EntitiesFetched → Hydrating →
    /// Ready`; the returned page is `Ready` and carries the pass's report.
    pub async fn load_page(
        &self,
        store: &InteractionStore,
        fetched: Vec<FeedEntity>,
    ) -> FeedPage {
        let mut page = FeedPage::request();
        page.attach_fetched(store, fetched);
        self.hydrate(store, &mut page).await;
        page
    }

    /// Hydrates an attached page, refreshing flags if run again later.
    ///
    /// The page re-enters `Hydrating` for the duration and settles back to
    /// `Ready` once every query has either answered, failed, or timed out.
    pub async fn hydrate(
        &self,
        store: &InteractionStore,
        page: &mut FeedPage,
    ) -> HydrationReport {
        page.mark_hydrating();
        let report = self.hydrate_batch(store, &page.post_ids()).await;
        page.complete(report.clone());
        report
    }

    /// Hydrates an arbitrary batch of registered posts.
    ///
    /// Items are processed in order, at most `max_concurrency` at a time;
    /// the report preserves batch order.
    pub async fn hydrate_batch(
        &self,
        store: &InteractionStore,
        post_ids: &[PostId],
    ) -> HydrationReport {
        let mut items = Vec::with_capacity(post_ids.len());
        let width = self.config.max_concurrency.max(1);
        for chunk in post_ids.chunks(width) {
            let settled = join_all(chunk.iter().map(|id| self.hydrate_item(store, id))).await;
            items.extend(settled);
        }

        let report = HydrationReport { items };
        debug!(
            total = report.items.len(),
            hydrated = report.hydrated_count(),
            defaulted = report.defaulted_count(),
            unsupported = report.unsupported_count(),
            "hydration pass settled"
        );
        report
    }

    async fn hydrate_item(&self, store: &InteractionStore, post_id: &PostId) -> ItemReport {
        // Shape gate first: unknown shapes are skipped without burning
        // remote calls on them.
        match store.cell(post_id) {
            None => {
                return ItemReport {
                    post_id: post_id.clone(),
                    outcome: ItemOutcome::Queried {
                        like: FlagOutcome::Discarded,
                        repost: FlagOutcome::Discarded,
                    },
                };
            }
            Some(cell) => {
                let unsupported =
                    cell.with(|entity| (!entity.is_interactable()).then(|| entity.kind_label().to_string()));
                if let Some(raw_kind) = unsupported {
                    debug!(post_id = %post_id, raw_kind = %raw_kind, "skipped unsupported shape");
                    return ItemReport {
                        post_id: post_id.clone(),
                        outcome: ItemOutcome::Unsupported { raw_kind },
                    };
                }
            }
        }

        let (like, repost) = tokio::join!(
            self.query_flag(post_id, InteractionKind::Like),
            self.query_flag(post_id, InteractionKind::Repost),
        );

        ItemReport {
            post_id: post_id.clone(),
            outcome: ItemOutcome::Queried {
                like: self.apply_flag(store, post_id, InteractionKind::Like, like),
                repost: self.apply_flag(store, post_id, InteractionKind::Repost, repost),
            },
        }
    }

    async fn query_flag(
        &self,
        post_id: &PostId,
        kind: InteractionKind,
    ) -> Result<bool, RemoteStoreError> {
        let deadline = self.config.item_timeout;
        let settled = match kind {
            InteractionKind::Like => {
                timeout(deadline, self.query.like_exists(post_id, &self.viewer)).await
            }
            InteractionKind::Repost => {
                timeout(deadline, self.query.repost_exists(post_id, &self.viewer)).await
            }
        };
        match settled {
            Ok(result) => result,
            Err(_) => Err(RemoteStoreError::timeout(deadline.as_millis() as u64)),
        }
    }

    fn apply_flag(
        &self,
        store: &InteractionStore,
        post_id: &PostId,
        kind: InteractionKind,
        fetched: Result<bool, RemoteStoreError>,
    ) -> FlagOutcome {
        match fetched {
            Ok(value) => match store.apply_hydrated_flag(post_id, kind, value) {
                FlagApply::Applied => FlagOutcome::Applied { value },
                FlagApply::InFlight => {
                    debug!(post_id = %post_id, kind = %kind, "dropped hydrated flag, toggle in flight");
                    FlagOutcome::Superseded
                }
                FlagApply::NotRegistered => {
                    debug!(post_id = %post_id, kind = %kind, "dropped hydrated flag, entity retired");
                    FlagOutcome::Discarded
                }
            },
            Err(error) => {
                warn!(post_id = %post_id, kind = %kind, error = %error, "hydration query failed, keeping default");
                FlagOutcome::Defaulted { error }
            }
        }
    }
}

impl std::fmt::Debug for HydrationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HydrationCoordinator")
            .field("viewer", &self.viewer)
            .field("config", &self.config)
            .finish()
    }
}
