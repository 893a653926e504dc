//! # Application Error Types
//!
//! Errors surfaced by the interaction store to the embedding frontend.
//!
//! Hydration never raises at the page level — partial failure is reported
//! per item in [`crate::hydration::HydrationReport`] — so the only error
//! enum here is the toggle path's. Entity-shape and remote-transport
//! failures from `tailfeed-core` are wrapped rather than re-declared.

use tailfeed_core::{EntityError, InteractionKind, PostId, RemoteStoreError};
use thiserror::Error;

/// Failure of a single like/repost toggle.
///
/// Every variant leaves the entity in a consistent state: either the
/// optimistic mutation was rolled back, or it was never applied.
#[derive(Debug, Clone, Error)]
pub enum InteractionError {
    /// The post is not (or no longer) registered with the store.
    ///
    /// Raised when a toggle races view teardown; benign from the store's
    /// perspective since no mutation was applied.
    #[error("post {post_id} is not registered with the interaction store")]
    NotRegistered {
        /// Id the caller passed
        post_id: PostId,
    },

    /// The entity's shape does not carry interaction fields.
    #[error(transparent)]
    Entity(#[from] EntityError),

    /// The remote store refused or failed the write; the optimistic
    /// mutation has been rolled back.
    #[error("remote {kind} update for post {post_id} failed: {source}")]
    RemoteRejected {
        /// Post the toggle addressed
        post_id: PostId,
        /// Which flag/counter pair was being toggled
        kind: InteractionKind,
        /// Transport-level cause
        #[source]
        source: RemoteStoreError,
    },
}

impl InteractionError {
    /// Whether retrying the same call can reasonably succeed.
    ///
    /// Transient transport failures are retryable; shape errors and
    /// rejections are not, and a missing registration means the view is
    /// gone.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::NotRegistered { .. } => false,
            Self::Entity(_) => false,
            Self::RemoteRejected { source, .. } => source.is_transient(),
        }
    }
}
