//! Scriptable in-memory remote store
//!
//! [`MockRemote`] implements every collaborator trait the client core
//! consumes, backed by plain in-memory sets. Tests seed relationship
//! edges, script failures per operation or per post, and gate calls so
//! interleavings become deterministic: a held call is logged on arrival,
//! parks until released, then settles with the outcome decided at
//! arrival time.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use tailfeed_core::effects::{
    InteractionQueryEffects, InteractionWriteEffects, SocialGraphEffects,
};
use tailfeed_core::{PostId, RemoteStoreError, UserId};

// ============================================================================
// Call vocabulary
// ============================================================================

/// The operations the mock can receive, for scripting and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    /// `like_exists` query
    LikeExists,
    /// `repost_exists` query
    RepostExists,
    /// `set_liked` write
    SetLiked,
    /// `set_reposted` write
    SetReposted,
    /// `list_followers` query
    ListFollowers,
    /// `list_following` query
    ListFollowing,
}

/// One received call with its arguments, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    /// A `like_exists` query
    LikeExists {
        /// Post queried
        post_id: PostId,
        /// User whose like is queried
        user_id: UserId,
    },
    /// A `repost_exists` query
    RepostExists {
        /// Post queried
        post_id: PostId,
        /// User whose repost is queried
        user_id: UserId,
    },
    /// A `set_liked` write
    SetLiked {
        /// Post written
        post_id: PostId,
        /// Target flag value
        liked: bool,
    },
    /// A `set_reposted` write
    SetReposted {
        /// Post written
        post_id: PostId,
        /// Target flag value
        reposted: bool,
    },
    /// A `list_followers` query
    ListFollowers {
        /// Subject user
        user_id: UserId,
    },
    /// A `list_following` query
    ListFollowing {
        /// Subject user
        user_id: UserId,
    },
}

impl RemoteCall {
    /// The operation this call belongs to.
    pub fn op(&self) -> RemoteOp {
        match self {
            Self::LikeExists { .. } => RemoteOp::LikeExists,
            Self::RepostExists { .. } => RemoteOp::RepostExists,
            Self::SetLiked { .. } => RemoteOp::SetLiked,
            Self::SetReposted { .. } => RemoteOp::SetReposted,
            Self::ListFollowers { .. } => RemoteOp::ListFollowers,
            Self::ListFollowing { .. } => RemoteOp::ListFollowing,
        }
    }
}

// ============================================================================
// Failure rules and gates
// ============================================================================

struct FailureRule {
    op: RemoteOp,
    post_scope: Option<PostId>,
    /// `None` means the rule never exhausts.
    remaining: Option<u32>,
    error: RemoteStoreError,
}

impl FailureRule {
    fn matches(&self, op: RemoteOp, post_id: Option<&PostId>) -> bool {
        if self.op != op {
            return false;
        }
        match (&self.post_scope, post_id) {
            (None, _) => true,
            (Some(scoped), Some(called)) => scoped == called,
            (Some(_), None) => false,
        }
    }
}

/// A hold point calls park at until released.
#[derive(Default)]
struct Gate {
    held: AtomicBool,
    notify: Notify,
}

impl Gate {
    fn hold(&self) {
        self.held.store(true, Ordering::Release);
    }

    fn release(&self) {
        self.held.store(false, Ordering::Release);
        self.notify.notify_waiters();
    }

    async fn pass(&self) {
        loop {
            // Register before checking, so a release between the check and
            // the await cannot be missed.
            let notified = self.notify.notified();
            if !self.held.load(Ordering::Acquire) {
                return;
            }
            notified.await;
        }
    }
}

// ============================================================================
// MockRemote
// ============================================================================

#[derive(Default)]
struct MockRemoteState {
    /// (post, user) like edges
    likes: HashSet<(PostId, UserId)>,
    /// (post, user) repost edges
    reposts: HashSet<(PostId, UserId)>,
    /// (follower, followee) edges
    follows: HashSet<(UserId, UserId)>,
    failures: Vec<FailureRule>,
    calls: Vec<RemoteCall>,
}

/// In-memory remote store with scriptable failures and call gates.
///
/// Writes are viewer-implicit, like the production transport: `set_liked`
/// records an edge for the viewer this mock was built for, and the query
/// side reads the same edges, so toggle-then-hydrate scenarios stay
/// consistent end to end.
#[derive(Clone)]
pub struct MockRemote {
    viewer: UserId,
    state: Arc<Mutex<MockRemoteState>>,
    write_gate: Arc<Gate>,
    query_gate: Arc<Gate>,
}

impl MockRemote {
    /// Creates an empty mock whose writes act as `viewer`.
    pub fn for_viewer(viewer: UserId) -> Self {
        Self {
            viewer,
            state: Arc::new(Mutex::new(MockRemoteState::default())),
            write_gate: Arc::new(Gate::default()),
            query_gate: Arc::new(Gate::default()),
        }
    }

    /// The viewer identity writes are attributed to.
    pub fn viewer(&self) -> &UserId {
        &self.viewer
    }

    // ------------------------------------------------------------------------
    // Seeding and direct inspection
    // ------------------------------------------------------------------------

    /// Records a like edge.
    pub fn seed_like(&self, post_id: PostId, user_id: UserId) {
        self.state.lock().likes.insert((post_id, user_id));
    }

    /// Records a repost edge.
    pub fn seed_repost(&self, post_id: PostId, user_id: UserId) {
        self.state.lock().reposts.insert((post_id, user_id));
    }

    /// Records a follow edge from `follower` to `followee`.
    pub fn seed_follow(&self, follower: UserId, followee: UserId) {
        self.state.lock().follows.insert((follower, followee));
    }

    /// Removes a follow edge; absent edges are ignored.
    pub fn unfollow(&self, follower: &UserId, followee: &UserId) {
        self.state
            .lock()
            .follows
            .remove(&(follower.clone(), followee.clone()));
    }

    /// Whether a like edge exists right now.
    pub fn has_like(&self, post_id: &PostId, user_id: &UserId) -> bool {
        self.state
            .lock()
            .likes
            .iter()
            .any(|(p, u)| p == post_id && u == user_id)
    }

    /// Whether a repost edge exists right now.
    pub fn has_repost(&self, post_id: &PostId, user_id: &UserId) -> bool {
        self.state
            .lock()
            .reposts
            .iter()
            .any(|(p, u)| p == post_id && u == user_id)
    }

    // ------------------------------------------------------------------------
    // Failure scripting
    // ------------------------------------------------------------------------

    /// Fails the next matching call once, any post.
    pub fn fail_once(&self, op: RemoteOp, error: RemoteStoreError) {
        self.state.lock().failures.push(FailureRule {
            op,
            post_scope: None,
            remaining: Some(1),
            error,
        });
    }

    /// Fails every matching call until [`MockRemote::clear_failures`].
    pub fn fail_always(&self, op: RemoteOp, error: RemoteStoreError) {
        self.state.lock().failures.push(FailureRule {
            op,
            post_scope: None,
            remaining: None,
            error,
        });
    }

    /// Fails every matching call for one post until
    /// [`MockRemote::clear_failures`].
    pub fn fail_for_post(&self, op: RemoteOp, post_id: PostId, error: RemoteStoreError) {
        self.state.lock().failures.push(FailureRule {
            op,
            post_scope: Some(post_id),
            remaining: None,
            error,
        });
    }

    /// Drops every scripted failure rule.
    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    // ------------------------------------------------------------------------
    // Gates
    // ------------------------------------------------------------------------

    /// Parks subsequent writes until [`MockRemote::release_writes`].
    pub fn hold_writes(&self) {
        self.write_gate.hold();
    }

    /// Releases parked and future writes.
    pub fn release_writes(&self) {
        self.write_gate.release();
    }

    /// Parks subsequent queries until [`MockRemote::release_queries`].
    pub fn hold_queries(&self) {
        self.query_gate.hold();
    }

    /// Releases parked and future queries.
    pub fn release_queries(&self) {
        self.query_gate.release();
    }

    // ------------------------------------------------------------------------
    // Call log
    // ------------------------------------------------------------------------

    /// Every call received so far, in arrival order.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state.lock().calls.clone()
    }

    /// How many calls of one operation have arrived.
    pub fn call_count(&self, op: RemoteOp) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.op() == op)
            .count()
    }

    /// Yields until at least `at_least` calls of `op` have arrived.
    ///
    /// Held calls count on arrival, so this is how tests line up an
    /// interleaving before releasing a gate.
    pub async fn wait_for_calls(&self, op: RemoteOp, at_least: usize) {
        loop {
            if self.call_count(op) >= at_least {
                return;
            }
            tokio::task::yield_now().await;
        }
    }

    /// Logs an arriving call and decides its outcome from the failure
    /// rules. The decision is made before any gate parking, so a test's
    /// script applies in arrival order regardless of release order.
    fn admit(&self, call: RemoteCall, post_id: Option<&PostId>) -> Result<(), RemoteStoreError> {
        let op = call.op();
        let mut state = self.state.lock();
        state.calls.push(call);

        let matched = state
            .failures
            .iter_mut()
            .position(|rule| rule.matches(op, post_id) && rule.remaining != Some(0));
        match matched {
            Some(index) => {
                let error = state.failures[index].error.clone();
                if let Some(remaining) = state.failures[index].remaining.as_mut() {
                    *remaining -= 1;
                    if *remaining == 0 {
                        state.failures.remove(index);
                    }
                }
                Err(error)
            }
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for MockRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MockRemote")
            .field("viewer", &self.viewer)
            .field("likes", &state.likes.len())
            .field("reposts", &state.reposts.len())
            .field("follows", &state.follows.len())
            .field("calls", &state.calls.len())
            .finish()
    }
}

// ============================================================================
// Collaborator trait impls
// ============================================================================

#[async_trait]
impl InteractionQueryEffects for MockRemote {
    async fn like_exists(
        &self,
        post_id: &PostId,
        user_id: &UserId,
    ) -> Result<bool, RemoteStoreError> {
        let decided = self.admit(
            RemoteCall::LikeExists {
                post_id: post_id.clone(),
                user_id: user_id.clone(),
            },
            Some(post_id),
        );
        self.query_gate.pass().await;
        decided?;
        Ok(self
            .state
            .lock()
            .likes
            .iter()
            .any(|(p, u)| p == post_id && u == user_id))
    }

    async fn repost_exists(
        &self,
        post_id: &PostId,
        user_id: &UserId,
    ) -> Result<bool, RemoteStoreError> {
        let decided = self.admit(
            RemoteCall::RepostExists {
                post_id: post_id.clone(),
                user_id: user_id.clone(),
            },
            Some(post_id),
        );
        self.query_gate.pass().await;
        decided?;
        Ok(self
            .state
            .lock()
            .reposts
            .iter()
            .any(|(p, u)| p == post_id && u == user_id))
    }
}

#[async_trait]
impl InteractionWriteEffects for MockRemote {
    async fn set_liked(&self, post_id: &PostId, liked: bool) -> Result<(), RemoteStoreError> {
        let decided = self.admit(
            RemoteCall::SetLiked {
                post_id: post_id.clone(),
                liked,
            },
            Some(post_id),
        );
        self.write_gate.pass().await;
        decided?;
        let mut state = self.state.lock();
        let edge = (post_id.clone(), self.viewer.clone());
        if liked {
            state.likes.insert(edge);
        } else {
            state.likes.remove(&edge);
        }
        Ok(())
    }

    async fn set_reposted(
        &self,
        post_id: &PostId,
        reposted: bool,
    ) -> Result<(), RemoteStoreError> {
        let decided = self.admit(
            RemoteCall::SetReposted {
                post_id: post_id.clone(),
                reposted,
            },
            Some(post_id),
        );
        self.write_gate.pass().await;
        decided?;
        let mut state = self.state.lock();
        let edge = (post_id.clone(), self.viewer.clone());
        if reposted {
            state.reposts.insert(edge);
        } else {
            state.reposts.remove(&edge);
        }
        Ok(())
    }
}

#[async_trait]
impl SocialGraphEffects for MockRemote {
    async fn list_followers(&self, user_id: &UserId) -> Result<Vec<UserId>, RemoteStoreError> {
        let decided = self.admit(
            RemoteCall::ListFollowers {
                user_id: user_id.clone(),
            },
            None,
        );
        self.query_gate.pass().await;
        decided?;
        Ok(self
            .state
            .lock()
            .follows
            .iter()
            .filter(|(_, followee)| followee == user_id)
            .map(|(follower, _)| follower.clone())
            .collect())
    }

    async fn list_following(&self, user_id: &UserId) -> Result<Vec<UserId>, RemoteStoreError> {
        let decided = self.admit(
            RemoteCall::ListFollowing {
                user_id: user_id.clone(),
            },
            None,
        );
        self.query_gate.pass().await;
        decided?;
        Ok(self
            .state
            .lock()
            .follows
            .iter()
            .filter(|(follower, _)| follower == user_id)
            .map(|(_, followee)| followee.clone())
            .collect())
    }
}
