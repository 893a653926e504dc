//! # Profile Stats View State
//!
//! Follower/following counts for one profile screen, kept current by
//! re-deriving from the social graph whenever the relationship bus
//! announces a change.
//!
//! The bus carries no payload, so the listener only marks this view
//! stale; the frontend's frame loop calls
//! [`ProfileStatsView::refresh_if_stale`] to fold the re-derivation into
//! its normal async work. A failed re-derivation keeps the previous
//! counts on screen and leaves the view stale so the next frame retries.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tailfeed_core::effects::SocialGraphEffects;
use tailfeed_core::{RemoteStoreError, Shared, UserId};
use tracing::{debug, warn};

use crate::relationships::{RelationshipBus, SubscriptionId};

/// Derived counts for one profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfileStats {
    /// Accounts following the subject
    pub followers: u32,
    /// Accounts the subject follows
    pub following: u32,
}

/// Live follower/following counts for one subject.
///
/// Subscribes to the relationship bus on open and unsubscribes on drop,
/// so an unmounted profile screen never re-derives.
pub struct ProfileStatsView {
    subject: UserId,
    graph: Arc<dyn SocialGraphEffects>,
    stats: Shared<ProfileStats>,
    stale: Arc<AtomicBool>,
    bus: RelationshipBus,
    subscription: SubscriptionId,
}

impl ProfileStatsView {
    /// Opens a view for `subject`, subscribed to relationship changes.
    ///
    /// Counts start at zero and stale, so the first frame triggers a
    /// refresh.
    pub fn open(bus: &RelationshipBus, graph: Arc<dyn SocialGraphEffects>, subject: UserId) -> Self {
        let stale = Arc::new(AtomicBool::new(true));
        let flag = stale.clone();
        let subscription = bus.subscribe(move || flag.store(true, Ordering::Release));
        Self {
            subject,
            graph,
            stats: Shared::new(ProfileStats::default()),
            stale,
            bus: bus.clone(),
            subscription,
        }
    }

    /// The profile this view derives counts for.
    pub fn subject(&self) -> &UserId {
        &self.subject
    }

    /// Current counts. Zero until the first refresh lands.
    pub fn stats(&self) -> ProfileStats {
        self.stats.get()
    }

    /// The counts cell, for frontends polling changes.
    pub fn stats_cell(&self) -> &Shared<ProfileStats> {
        &self.stats
    }

    /// Whether a relationship change has outdated the current counts.
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::Acquire)
    }

    /// Re-derives both counts from the social graph.
    ///
    /// On failure the previous counts are kept and the view stays stale;
    /// the error is surfaced for the caller's notice-level reporting.
    pub async fn refresh(&self) -> Result<ProfileStats, RemoteStoreError> {
        // Clear first: a change landing mid-query re-marks and the next
        // frame picks it up.
        self.stale.store(false, Ordering::Release);

        let derived = async {
            let (followers, following) = tokio::join!(
                self.graph.list_followers(&self.subject),
                self.graph.list_following(&self.subject),
            );
            Ok::<ProfileStats, RemoteStoreError>(ProfileStats {
                followers: followers?.len() as u32,
                following: following?.len() as u32,
            })
        }
        .await;

        match derived {
            Ok(stats) => {
                self.stats.set(stats);
                debug!(
                    subject = %self.subject,
                    followers = stats.followers,
                    following = stats.following,
                    "profile stats refreshed"
                );
                Ok(stats)
            }
            Err(error) => {
                self.stale.store(true, Ordering::Release);
                warn!(
                    subject = %self.subject,
                    error = %error,
                    "profile stats refresh failed, keeping previous counts"
                );
                Err(error)
            }
        }
    }

    /// Refreshes only when a change has been announced since the last
    /// refresh. Frame-loop entry point.
    pub async fn refresh_if_stale(&self) -> Result<Option<ProfileStats>, RemoteStoreError> {
        if !self.is_stale() {
            return Ok(None);
        }
        self.refresh().await.map(Some)
    }
}

impl Drop for ProfileStatsView {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.subscription);
    }
}

impl std::fmt::Debug for ProfileStatsView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileStatsView")
            .field("subject", &self.subject)
            .field("stats", &self.stats.get())
            .field("stale", &self.is_stale())
            .finish()
    }
}
