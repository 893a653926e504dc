//! Tailfeed App - Headless Social Client Core
//!
//! The stateful layer between a rendering frontend and the remote store:
//!
//! - [`InteractionStore`]: live entity cells plus the optimistic
//!   like/repost toggle protocol with per-operation rollback
//! - [`RelationshipBus`]: synchronous, payload-free pub/sub for
//!   follow-graph changes
//! - [`HydrationCoordinator`]: per-item viewer-flag enrichment with
//!   isolated failures and a per-page load state machine
//! - [`views`]: the headless page and profile state frontends render from
//!
//! # Architecture
//!
//! Everything here is transport-agnostic: remote access goes through the
//! effect traits in `tailfeed-core`, and render invalidation goes through
//! shared cells and change tickets rather than callbacks into frontend
//! code. The one callback surface is the relationship bus, whose listeners
//! only mark derived state stale.

pub mod errors;
pub mod hydration;
pub mod interactions;
pub mod relationships;
pub mod views;

// Re-export primary types
pub use errors::InteractionError;
pub use hydration::{
    FlagOutcome, HydrationConfig, HydrationCoordinator, HydrationReport, ItemOutcome, ItemReport,
};
pub use interactions::{FlagApply, InteractionStore};
pub use relationships::{RelationshipBus, SubscriptionId};
pub use views::{FeedPage, PageLoadPhase, ProfileStats, ProfileStatsView};
