//! # Feed Entity Model
//!
//! Unifies the record shapes that appear in a feed — plain posts and
//! pick-parlay posts — behind one capability surface, so interaction and
//! hydration code never branches on the concrete shape.
//!
//! The shared capability block is [`Interactions`]: counters plus the
//! viewer's own like/repost flags. [`FeedEntity::as_interactable_mut`]
//! returns a borrow of that block, so a mutation through the handle *is* a
//! mutation of the record — there is no copy to reconcile. Shapes the
//! deployed client does not recognize are carried as
//! [`FeedEntity::Unknown`] and fail fast with [`EntityError::Unsupported`].

use crate::error::EntityError;
use crate::identifiers::{PostId, UserId};
use serde::{Deserialize, Serialize};

// ============================================================================
// Interaction Fields
// ============================================================================

/// Which interaction family an operation addresses.
///
/// Like and repost are symmetric everywhere in the core; keying on the kind
/// keeps the two code paths from drifting apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionKind {
    /// The like flag/counter pair
    Like,
    /// The repost flag/counter pair
    Repost,
}

impl InteractionKind {
    /// Lowercase label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Repost => "repost",
        }
    }
}

impl std::fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A saved flag/counter pair for one interaction kind.
///
/// Taken at toggle invocation time and restored on rollback; scoped to one
/// kind so a rollback never disturbs the other family's fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractionSnapshot {
    /// Viewer flag at snapshot time
    pub flag: bool,
    /// Counter at snapshot time
    pub count: u32,
}

/// The shared mutable capability block of every interactable entity.
///
/// Counters are non-negative; the store is the only writer once an entity
/// is registered. Viewer flags are local-only until confirmed by the remote
/// store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interactions {
    /// Number of likes, including the viewer's when `viewer_has_liked`
    pub like_count: u32,
    /// Number of reposts, including the viewer's when `viewer_has_reposted`
    pub repost_count: u32,
    /// Number of comments (display-only; no toggle path)
    pub comment_count: u32,
    /// Whether the viewer has liked this entity
    pub viewer_has_liked: bool,
    /// Whether the viewer has reposted this entity
    pub viewer_has_reposted: bool,
}

impl Interactions {
    /// Create a block with counters only; viewer flags default to `false`
    /// until hydration fills them.
    pub fn with_counts(like_count: u32, repost_count: u32, comment_count: u32) -> Self {
        Self {
            like_count,
            repost_count,
            comment_count,
            viewer_has_liked: false,
            viewer_has_reposted: false,
        }
    }

    /// Read the flag for one kind.
    pub fn flag(&self, kind: InteractionKind) -> bool {
        match kind {
            InteractionKind::Like => self.viewer_has_liked,
            InteractionKind::Repost => self.viewer_has_reposted,
        }
    }

    /// Read the counter for one kind.
    pub fn count(&self, kind: InteractionKind) -> u32 {
        match kind {
            InteractionKind::Like => self.like_count,
            InteractionKind::Repost => self.repost_count,
        }
    }

    /// Snapshot one kind's flag/counter pair.
    pub fn snapshot(&self, kind: InteractionKind) -> InteractionSnapshot {
        InteractionSnapshot {
            flag: self.flag(kind),
            count: self.count(kind),
        }
    }

    /// Flip one kind's flag and move its counter with it.
    ///
    /// Returns the new flag value. The counter is adjusted by +1 when the
    /// flag turns on and −1 when it turns off; the decrement saturates so a
    /// server-side count that raced to zero can never underflow.
    pub fn toggle(&mut self, kind: InteractionKind) -> bool {
        let now_set = !self.flag(kind);
        let (flag, count) = self.pair_mut(kind);
        *flag = now_set;
        *count = if now_set {
            count.saturating_add(1)
        } else {
            count.saturating_sub(1)
        };
        now_set
    }

    /// Restore one kind's flag/counter pair from a snapshot.
    ///
    /// The rollback path: only the failed toggle's own kind is touched.
    pub fn restore(&mut self, kind: InteractionKind, snapshot: InteractionSnapshot) {
        let (flag, count) = self.pair_mut(kind);
        *flag = snapshot.flag;
        *count = snapshot.count;
    }

    /// Set one kind's viewer flag without moving the counter.
    ///
    /// The hydration path: fetched counters already include the viewer's own
    /// interaction, so confirming the flag must not double-count it.
    pub fn set_viewer_flag(&mut self, kind: InteractionKind, value: bool) {
        match kind {
            InteractionKind::Like => self.viewer_has_liked = value,
            InteractionKind::Repost => self.viewer_has_reposted = value,
        }
    }

    fn pair_mut(&mut self, kind: InteractionKind) -> (&mut bool, &mut u32) {
        match kind {
            InteractionKind::Like => (&mut self.viewer_has_liked, &mut self.like_count),
            InteractionKind::Repost => (&mut self.viewer_has_reposted, &mut self.repost_count),
        }
    }
}

// ============================================================================
// Record Shapes
// ============================================================================

/// A plain post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    /// Opaque identifier, unique, immutable
    pub id: PostId,
    /// Author account
    pub author_id: UserId,
    /// Post body (rendering is a frontend concern)
    pub content: String,
    /// Creation time, ms since epoch
    pub created_at: u64,
    /// Shared interaction block
    pub interactions: Interactions,
}

/// One leg of a parlay.
///
/// Opaque to the interaction layer; carried for the frontends that render
/// pick slips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParlayPick {
    /// Event the pick is on (e.g. a fixture label)
    pub event: String,
    /// The selection within the event
    pub selection: String,
    /// American odds for the selection
    pub odds: i32,
}

/// A post with an attached pick parlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParlayRecord {
    /// Opaque identifier, unique, immutable
    pub id: PostId,
    /// Author account
    pub author_id: UserId,
    /// Post body
    pub content: String,
    /// Creation time, ms since epoch
    pub created_at: u64,
    /// The structured picks; the core never reads these
    pub picks: Vec<ParlayPick>,
    /// Shared interaction block
    pub interactions: Interactions,
}

// ============================================================================
// FeedEntity
// ============================================================================

/// A feed item: one of the record shapes the client understands, or a shape
/// it does not.
///
/// The `Unknown` variant exists for forward compatibility — the remote feed
/// may interleave record kinds added after this client shipped. Such items
/// keep their place in the page but every interaction capability fails with
/// a typed error instead of silently doing nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedEntity {
    /// A plain post
    Post(PostRecord),
    /// A post carrying a pick parlay
    Parlay(ParlayRecord),
    /// A record shape this client does not recognize
    Unknown {
        /// Identifier reported by the remote store
        id: PostId,
        /// The kind tag the client could not interpret
        raw_kind: String,
        /// The raw payload, preserved for diagnostics
        payload: serde_json::Value,
    },
}

impl FeedEntity {
    /// The entity's identifier, present for every shape.
    pub fn id(&self) -> &PostId {
        match self {
            Self::Post(record) => &record.id,
            Self::Parlay(record) => &record.id,
            Self::Unknown { id, .. } => id,
        }
    }

    /// Kind label for logging.
    pub fn kind_label(&self) -> &str {
        match self {
            Self::Post(_) => "post",
            Self::Parlay(_) => "parlay",
            Self::Unknown { raw_kind, .. } => raw_kind,
        }
    }

    /// Whether the interaction layer can operate on this entity.
    pub fn is_interactable(&self) -> bool {
        !matches!(self, Self::Unknown { .. })
    }

    /// The shared capability view, read-only.
    ///
    /// Fails with [`EntityError::Unsupported`] for unrecognized shapes.
    pub fn as_interactable(&self) -> Result<&Interactions, EntityError> {
        match self {
            Self::Post(record) => Ok(&record.interactions),
            Self::Parlay(record) => Ok(&record.interactions),
            Self::Unknown { id, raw_kind, .. } => {
                Err(EntityError::unsupported(id.clone(), raw_kind.clone()))
            }
        }
    }

    /// The shared capability view, mutable.
    ///
    /// The returned borrow aliases the record's own storage: holders of the
    /// entity observe every write made through it.
    pub fn as_interactable_mut(&mut self) -> Result<&mut Interactions, EntityError> {
        match self {
            Self::Post(record) => Ok(&mut record.interactions),
            Self::Parlay(record) => Ok(&mut record.interactions),
            Self::Unknown { id, raw_kind, .. } => {
                Err(EntityError::unsupported(id.clone(), raw_kind.clone()))
            }
        }
    }
}

impl From<PostRecord> for FeedEntity {
    fn from(record: PostRecord) -> Self {
        Self::Post(record)
    }
}

impl From<ParlayRecord> for FeedEntity {
    fn from(record: ParlayRecord) -> Self {
        Self::Parlay(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: &str, likes: u32) -> FeedEntity {
        FeedEntity::Post(PostRecord {
            id: PostId::new(id),
            author_id: UserId::new("author-1"),
            content: "big win incoming".to_string(),
            created_at: 1700000000000,
            interactions: Interactions::with_counts(likes, 2, 1),
        })
    }

    fn parlay(id: &str) -> FeedEntity {
        FeedEntity::Parlay(ParlayRecord {
            id: PostId::new(id),
            author_id: UserId::new("author-2"),
            content: "three-leg special".to_string(),
            created_at: 1700000000001,
            picks: vec![ParlayPick {
                event: "UTA @ DEN".to_string(),
                selection: "DEN -4.5".to_string(),
                odds: -110,
            }],
            interactions: Interactions::with_counts(0, 0, 0),
        })
    }

    fn unknown(id: &str) -> FeedEntity {
        FeedEntity::Unknown {
            id: PostId::new(id),
            raw_kind: "poll_v2".to_string(),
            payload: serde_json::json!({"options": ["a", "b"]}),
        }
    }

    #[test]
    fn test_capability_view_over_both_shapes() {
        for entity in [post("p1", 5), parlay("p2")] {
            let view = entity.as_interactable().expect("supported shape");
            assert!(!view.viewer_has_liked);
            assert!(entity.is_interactable());
        }
    }

    #[test]
    fn test_mutation_through_handle_is_visible_on_record() {
        let mut entity = post("p1", 5);
        {
            let view = entity.as_interactable_mut().expect("supported shape");
            view.toggle(InteractionKind::Like);
        }
        // The handle aliases the record: the original storage moved.
        match &entity {
            FeedEntity::Post(record) => {
                assert!(record.interactions.viewer_has_liked);
                assert_eq!(record.interactions.like_count, 6);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_unknown_shape_fails_fast() {
        let mut entity = unknown("p9");
        assert!(!entity.is_interactable());

        let err = entity.as_interactable().expect_err("must not no-op");
        assert_eq!(
            err,
            EntityError::unsupported(PostId::new("p9"), "poll_v2")
        );
        assert!(entity.as_interactable_mut().is_err());
    }

    #[test]
    fn test_toggle_moves_flag_and_count_together() {
        let mut block = Interactions::with_counts(5, 0, 0);

        assert!(block.toggle(InteractionKind::Like));
        assert_eq!(block.like_count, 6);
        assert!(block.viewer_has_liked);

        assert!(!block.toggle(InteractionKind::Like));
        assert_eq!(block.like_count, 5);
        assert!(!block.viewer_has_liked);
    }

    #[test]
    fn test_toggle_off_saturates_at_zero() {
        // A raced server-side count can reach zero while the local flag is
        // still set; untoggling must not underflow.
        let mut block = Interactions {
            like_count: 0,
            viewer_has_liked: true,
            ..Interactions::default()
        };
        block.toggle(InteractionKind::Like);
        assert_eq!(block.like_count, 0);
        assert!(!block.viewer_has_liked);
    }

    #[test]
    fn test_snapshot_restore_is_kind_scoped() {
        let mut block = Interactions::with_counts(5, 7, 0);
        let saved = block.snapshot(InteractionKind::Like);

        block.toggle(InteractionKind::Like);
        block.toggle(InteractionKind::Repost);
        block.restore(InteractionKind::Like, saved);

        assert_eq!(block.like_count, 5);
        assert!(!block.viewer_has_liked);
        // The other family keeps its toggle.
        assert_eq!(block.repost_count, 8);
        assert!(block.viewer_has_reposted);
    }

    #[test]
    fn test_set_viewer_flag_does_not_move_count() {
        let mut block = Interactions::with_counts(5, 2, 0);
        block.set_viewer_flag(InteractionKind::Like, true);
        assert!(block.viewer_has_liked);
        assert_eq!(block.like_count, 5);
    }

    #[test]
    fn test_entity_id_present_for_all_shapes() {
        assert_eq!(post("p1", 0).id(), &PostId::new("p1"));
        assert_eq!(parlay("p2").id(), &PostId::new("p2"));
        assert_eq!(unknown("p3").id(), &PostId::new("p3"));
    }

    #[test]
    fn test_kind_tagged_serde() {
        let entity = parlay("p2");
        let json = serde_json::to_value(&entity).expect("serialize");
        assert_eq!(json["kind"], "parlay");
        let back: FeedEntity = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, entity);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Toggling the same kind twice is the identity, for any
            /// starting pair with a representable count.
            #[test]
            fn test_double_toggle_is_identity(
                count in 1u32..=1_000_000,
                flag in any::<bool>(),
                kind in prop_oneof![Just(InteractionKind::Like), Just(InteractionKind::Repost)]
            ) {
                let mut block = Interactions::default();
                let (block_flag, block_count) = block.pair_mut(kind);
                *block_flag = flag;
                *block_count = count;

                let before = block.snapshot(kind);
                block.toggle(kind);
                block.toggle(kind);
                prop_assert_eq!(block.snapshot(kind), before);
            }

            /// Restore lands exactly on the snapshot no matter how many
            /// toggles happened in between, including saturated ones.
            #[test]
            fn test_restore_returns_to_snapshot(
                count in 0u32..=1_000_000,
                flag in any::<bool>(),
                toggles in 0usize..8
            ) {
                let mut block = Interactions::default();
                let (block_flag, block_count) = block.pair_mut(InteractionKind::Like);
                *block_flag = flag;
                *block_count = count;

                let saved = block.snapshot(InteractionKind::Like);
                for _ in 0..toggles {
                    block.toggle(InteractionKind::Like);
                }
                block.restore(InteractionKind::Like, saved);
                prop_assert_eq!(block.snapshot(InteractionKind::Like), saved);
            }
        }
    }
}
