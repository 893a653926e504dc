//! Remote store trait definitions
//!
//! Three narrow traits rather than one wide one: the hydration coordinator
//! only needs queries, the interaction store only needs writes, and profile
//! views only need the social graph. Handlers are free to implement all
//! three on one type.

use crate::error::RemoteStoreError;
use crate::identifiers::{PostId, UserId};
use async_trait::async_trait;

/// Read-side interaction state: "does this viewer like/repost this post?"
#[async_trait]
pub trait InteractionQueryEffects: Send + Sync {
    /// Whether a like edge exists from `user_id` to `post_id`.
    async fn like_exists(&self, post_id: &PostId, user_id: &UserId)
        -> Result<bool, RemoteStoreError>;

    /// Whether a repost edge exists from `user_id` to `post_id`.
    async fn repost_exists(
        &self,
        post_id: &PostId,
        user_id: &UserId,
    ) -> Result<bool, RemoteStoreError>;
}

/// Write-side interaction state for the authenticated viewer.
///
/// Calls are absolute (`set`, not `toggle`) so a retried or reordered call
/// converges instead of flipping twice.
#[async_trait]
pub trait InteractionWriteEffects: Send + Sync {
    /// Record or clear the viewer's like on a post.
    async fn set_liked(&self, post_id: &PostId, liked: bool) -> Result<(), RemoteStoreError>;

    /// Record or clear the viewer's repost of a post.
    async fn set_reposted(&self, post_id: &PostId, reposted: bool)
        -> Result<(), RemoteStoreError>;
}

/// Follow-graph queries.
///
/// The core holds no relationship edges of its own; subscribers of the
/// relationship change bus re-derive whatever counts they display through
/// these calls.
#[async_trait]
pub trait SocialGraphEffects: Send + Sync {
    /// Accounts following `user_id`.
    async fn list_followers(&self, user_id: &UserId) -> Result<Vec<UserId>, RemoteStoreError>;

    /// Accounts `user_id` follows.
    async fn list_following(&self, user_id: &UserId) -> Result<Vec<UserId>, RemoteStoreError>;
}
