//! Test data factories
//!
//! Builders for feed entities with deterministic defaults, so tests only
//! state the fields they care about.

use serde_json::json;
use tailfeed_core::{
    FeedEntity, Interactions, ParlayPick, ParlayRecord, PostId, PostRecord, UserId,
};
use uuid::Uuid;

/// Fixed creation time used by every builder default.
const DEFAULT_CREATED_AT: u64 = 1_700_000_000_000;

/// A unique post id, for tests that need ids nothing else references.
pub fn fresh_post_id() -> PostId {
    PostId::new(format!("post-{}", Uuid::new_v4()))
}

fn default_interactions(likes: u32, reposts: u32, comments: u32) -> Interactions {
    Interactions::with_counts(likes, reposts, comments)
}

// ============================================================================
// Post builder
// ============================================================================

/// Builder for plain posts.
#[derive(Debug, Clone)]
pub struct PostBuilder {
    id: PostId,
    author_id: UserId,
    content: String,
    created_at: u64,
    interactions: Interactions,
}

impl PostBuilder {
    /// Creates a builder with neutral defaults for `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: PostId::new(id),
            author_id: UserId::new("author"),
            content: "post body".to_string(),
            created_at: DEFAULT_CREATED_AT,
            interactions: default_interactions(0, 0, 0),
        }
    }

    /// Set the author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author_id = UserId::new(author);
        self
    }

    /// Set the body text.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Set the creation time (ms since epoch).
    pub fn with_created_at(mut self, created_at: u64) -> Self {
        self.created_at = created_at;
        self
    }

    /// Set the like counter.
    pub fn with_likes(mut self, likes: u32) -> Self {
        self.interactions.like_count = likes;
        self
    }

    /// Set the repost counter.
    pub fn with_reposts(mut self, reposts: u32) -> Self {
        self.interactions.repost_count = reposts;
        self
    }

    /// Set the comment counter.
    pub fn with_comments(mut self, comments: u32) -> Self {
        self.interactions.comment_count = comments;
        self
    }

    /// Set the viewer's like flag.
    pub fn with_liked(mut self, liked: bool) -> Self {
        self.interactions.viewer_has_liked = liked;
        self
    }

    /// Set the viewer's repost flag.
    pub fn with_reposted(mut self, reposted: bool) -> Self {
        self.interactions.viewer_has_reposted = reposted;
        self
    }

    /// Build the entity.
    pub fn build(self) -> FeedEntity {
        FeedEntity::Post(PostRecord {
            id: self.id,
            author_id: self.author_id,
            content: self.content,
            created_at: self.created_at,
            interactions: self.interactions,
        })
    }
}

// ============================================================================
// Parlay builder
// ============================================================================

/// Builder for pick-parlay posts.
#[derive(Debug, Clone)]
pub struct ParlayBuilder {
    id: PostId,
    author_id: UserId,
    content: String,
    created_at: u64,
    picks: Vec<ParlayPick>,
    interactions: Interactions,
}

impl ParlayBuilder {
    /// Creates a builder with neutral defaults for `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: PostId::new(id),
            author_id: UserId::new("author"),
            content: "parlay slip".to_string(),
            created_at: DEFAULT_CREATED_AT,
            picks: Vec::new(),
            interactions: default_interactions(0, 0, 0),
        }
    }

    /// Set the author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author_id = UserId::new(author);
        self
    }

    /// Append one pick leg.
    pub fn with_pick(
        mut self,
        event: impl Into<String>,
        selection: impl Into<String>,
        odds: i32,
    ) -> Self {
        self.picks.push(ParlayPick {
            event: event.into(),
            selection: selection.into(),
            odds,
        });
        self
    }

    /// Set the like counter.
    pub fn with_likes(mut self, likes: u32) -> Self {
        self.interactions.like_count = likes;
        self
    }

    /// Set the repost counter.
    pub fn with_reposts(mut self, reposts: u32) -> Self {
        self.interactions.repost_count = reposts;
        self
    }

    /// Set the viewer's like flag.
    pub fn with_liked(mut self, liked: bool) -> Self {
        self.interactions.viewer_has_liked = liked;
        self
    }

    /// Build the entity.
    pub fn build(self) -> FeedEntity {
        FeedEntity::Parlay(ParlayRecord {
            id: self.id,
            author_id: self.author_id,
            content: self.content,
            created_at: self.created_at,
            picks: self.picks,
            interactions: self.interactions,
        })
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// An entity whose kind the client does not recognize.
pub fn unknown_entity(id: impl Into<String>, raw_kind: impl Into<String>) -> FeedEntity {
    let raw_kind = raw_kind.into();
    FeedEntity::Unknown {
        id: PostId::new(id),
        payload: json!({ "kind": raw_kind }),
        raw_kind,
    }
}

/// A small page mixing every shape: three posts, two parlays, one
/// unknown-kind record.
pub fn mixed_page() -> Vec<FeedEntity> {
    vec![
        PostBuilder::new("post-1").with_likes(5).build(),
        ParlayBuilder::new("parlay-1")
            .with_pick("UTA@DEN", "DEN -4.5", -110)
            .with_pick("BOS@MIA", "over 212.0", -105)
            .with_likes(12)
            .build(),
        PostBuilder::new("post-2").with_author("friend").build(),
        unknown_entity("mystery-1", "live_audio_room"),
        ParlayBuilder::new("parlay-2").with_pick("NYK@PHI", "NYK +2.5", 100).build(),
        PostBuilder::new("post-3").with_reposts(3).build(),
    ]
}
