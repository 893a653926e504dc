//! Integration Tests for Page Hydration
//!
//! Drives the hydration coordinator over full pages against the mock
//! remote: per-item failure isolation, the page load state machine,
//! idempotent re-runs, per-item timeouts, and the interplay with
//! in-flight toggles and the relationship bus.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use tailfeed_app::{
    FeedPage, FlagOutcome, HydrationConfig, HydrationCoordinator, InteractionStore, ItemOutcome,
    PageLoadPhase, ProfileStatsView, RelationshipBus,
};
use tailfeed_core::{FeedEntity, PostId, RemoteStoreError, UserId};
use tailfeed_testkit::{mixed_page, MockRemote, PostBuilder, RemoteOp};

// ============================================================================
// Test Helpers
// ============================================================================

fn viewer() -> UserId {
    UserId::new("viewer")
}

fn setup() -> (InteractionStore, HydrationCoordinator, Arc<MockRemote>) {
    let mock = Arc::new(MockRemote::for_viewer(viewer()));
    let store = InteractionStore::new(mock.clone());
    let coordinator = HydrationCoordinator::new(mock.clone(), viewer());
    (store, coordinator, mock)
}

fn posts(n: usize) -> Vec<FeedEntity> {
    (1..=n).map(|i| PostBuilder::new(format!("p{i}")).build()).collect()
}

fn liked(page: &FeedPage, id: &str) -> bool {
    page.cell(&PostId::new(id))
        .expect("in page")
        .with(|entity| entity.as_interactable().map(|f| f.viewer_has_liked) == Ok(true))
}

// ============================================================================
// Happy Path
// ============================================================================

#[tokio::test]
async fn test_load_page_hydrates_seeded_flags() {
    let (store, coordinator, mock) = setup();
    mock.seed_like(PostId::new("p1"), viewer());
    mock.seed_like(PostId::new("p3"), viewer());
    mock.seed_repost(PostId::new("p2"), viewer());

    let page = coordinator.load_page(&store, posts(3)).await;
    assert_eq!(page.phase(), PageLoadPhase::Ready);
    let report = page.report().expect("settled pass");
    assert!(report.is_clean());
    assert_eq!(report.hydrated_count(), 3);

    assert!(liked(&page, "p1"));
    assert!(!liked(&page, "p2"));
    assert!(liked(&page, "p3"));
}

#[tokio::test]
async fn test_hydration_is_idempotent_over_unchanged_remote_state() {
    let (store, coordinator, mock) = setup();
    mock.seed_like(PostId::new("p2"), viewer());

    let mut page = coordinator.load_page(&store, posts(3)).await;
    let first: Vec<bool> = (1..=3).map(|i| liked(&page, &format!("p{i}"))).collect();

    let report = coordinator.hydrate(&store, &mut page).await;
    assert!(report.is_clean());
    let second: Vec<bool> = (1..=3).map(|i| liked(&page, &format!("p{i}"))).collect();
    assert_eq!(first, second);
    assert_eq!(page.phase(), PageLoadPhase::Ready);
}

// ============================================================================
// Partial Failure
// ============================================================================

#[tokio::test]
async fn test_two_failing_items_leave_eight_hydrated_and_two_defaulted() {
    let (store, coordinator, mock) = setup();
    for i in 1..=10 {
        mock.seed_like(PostId::new(format!("p{i}")), viewer());
    }
    mock.fail_for_post(
        RemoteOp::LikeExists,
        PostId::new("p3"),
        RemoteStoreError::unavailable("shard down"),
    );
    mock.fail_for_post(
        RemoteOp::RepostExists,
        PostId::new("p7"),
        RemoteStoreError::unavailable("shard down"),
    );

    let page = coordinator.load_page(&store, posts(10)).await;

    // The page-level call settled without raising; failures are per item.
    let report = page.report().expect("settled pass");
    assert_eq!(report.items.len(), 10);
    assert_eq!(report.hydrated_count(), 8);
    assert_eq!(report.defaulted_count(), 2);

    // Failed queries keep the default; the other flag of the same item
    // still hydrates.
    assert!(!liked(&page, "p3"));
    assert!(liked(&page, "p7"));
    assert!(liked(&page, "p4"));

    let p3 = report.item(&PostId::new("p3")).expect("reported");
    match &p3.outcome {
        ItemOutcome::Queried { like, repost } => {
            assert!(matches!(like, FlagOutcome::Defaulted { .. }));
            assert!(matches!(repost, FlagOutcome::Applied { value: false }));
        }
        other => panic!("expected queried outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unknown_shapes_are_skipped_without_remote_calls() {
    let (store, coordinator, mock) = setup();
    let page = coordinator.load_page(&store, mixed_page()).await;

    let report = page.report().expect("settled pass");
    assert_eq!(report.unsupported_count(), 1);
    assert!(report.is_clean());

    let skipped = report.item(&PostId::new("mystery-1")).expect("reported");
    assert_eq!(
        skipped.outcome,
        ItemOutcome::Unsupported {
            raw_kind: "live_audio_room".to_string()
        }
    );
    // Five interactable items, two queries each.
    assert_eq!(mock.call_count(RemoteOp::LikeExists), 5);
    assert_eq!(mock.call_count(RemoteOp::RepostExists), 5);
}

// ============================================================================
// Timeouts
// ============================================================================

#[tokio::test]
async fn test_slow_queries_default_after_the_item_timeout() {
    let mock = Arc::new(MockRemote::for_viewer(viewer()));
    let store = InteractionStore::new(mock.clone());
    let coordinator = HydrationCoordinator::with_config(
        mock.clone(),
        viewer(),
        HydrationConfig {
            item_timeout: Duration::from_millis(20),
            max_concurrency: 8,
        },
    );
    mock.seed_like(PostId::new("p1"), viewer());
    mock.hold_queries();

    let page = coordinator.load_page(&store, posts(2)).await;

    // The pass settled despite every query being parked.
    let report = page.report().expect("settled pass");
    assert_eq!(report.defaulted_count(), 2);
    assert!(!liked(&page, "p1"));
    match &report.item(&PostId::new("p1")).expect("reported").outcome {
        ItemOutcome::Queried { like, .. } => {
            assert!(matches!(
                like,
                FlagOutcome::Defaulted {
                    error: RemoteStoreError::Timeout { .. }
                }
            ));
        }
        other => panic!("expected queried outcome, got {other:?}"),
    }

    // A later pass against a released remote converges.
    mock.release_queries();
    let mut page = page;
    let report = coordinator.hydrate(&store, &mut page).await;
    assert!(report.is_clean());
    assert!(liked(&page, "p1"));
}

// ============================================================================
// Interplay with Toggles and Teardown
// ============================================================================

#[tokio::test]
async fn test_hydrated_answer_never_overwrites_a_pending_toggle() {
    let (store, coordinator, mock) = setup();
    let id = PostId::new("p1");
    let page = coordinator.load_page(&store, posts(1)).await;
    mock.hold_writes();

    // User taps like; the write parks.
    let toggle = {
        let store = store.clone();
        let id = id.clone();
        tokio::spawn(async move { store.toggle_like(&id).await })
    };
    mock.wait_for_calls(RemoteOp::SetLiked, 1).await;

    // A refresh pass answers from pre-toggle remote state.
    let report = coordinator.hydrate_batch(&store, &[id.clone()]).await;
    match &report.item(&id).expect("reported").outcome {
        ItemOutcome::Queried { like, .. } => assert_eq!(like, &FlagOutcome::Superseded),
        other => panic!("expected queried outcome, got {other:?}"),
    }
    assert!(liked(&page, "p1"));

    mock.release_writes();
    toggle.await.expect("join").expect("toggle confirms");
    assert!(liked(&page, "p1"));
}

#[tokio::test]
async fn test_page_retired_mid_pass_discards_late_answers() {
    let (store, coordinator, mock) = setup();
    let mut page = FeedPage::request();
    page.attach_fetched(&store, posts(2));
    mock.hold_queries();

    let ids = page.post_ids();
    let pass = {
        let coordinator = Arc::new(coordinator);
        let store = store.clone();
        tokio::spawn(async move { coordinator.hydrate_batch(&store, &ids).await })
    };
    mock.wait_for_calls(RemoteOp::LikeExists, 2).await;

    // The screen unmounts while queries are parked.
    page.retire(&store);
    mock.release_queries();
    let report = pass.await.expect("join");

    for item in &report.items {
        match &item.outcome {
            ItemOutcome::Queried { like, repost } => {
                assert_eq!(like, &FlagOutcome::Discarded);
                assert_eq!(repost, &FlagOutcome::Discarded);
            }
            other => panic!("expected queried outcome, got {other:?}"),
        }
    }
    assert_eq!(store.registered_count(), 0);
}

// ============================================================================
// Relationship Bus End to End
// ============================================================================

#[tokio::test]
async fn test_follow_change_propagates_to_every_open_profile_view() {
    let mock = Arc::new(MockRemote::for_viewer(viewer()));
    let bus = RelationshipBus::new();
    mock.seed_follow(UserId::new("a"), UserId::new("subject"));

    // Two profile screens open on the same subject.
    let first = ProfileStatsView::open(&bus, mock.clone(), UserId::new("subject"));
    let second = ProfileStatsView::open(&bus, mock.clone(), UserId::new("subject"));
    first.refresh().await.expect("refresh");
    second.refresh().await.expect("refresh");
    assert_eq!(first.stats().followers, 1);

    // A follow lands elsewhere in the app; the bus fans the notice out and
    // each view re-derives rather than receiving a diff.
    mock.seed_follow(UserId::new("b"), UserId::new("subject"));
    bus.publish();
    assert!(first.is_stale());
    assert!(second.is_stale());

    first.refresh_if_stale().await.expect("refresh");
    second.refresh_if_stale().await.expect("refresh");
    assert_eq!(first.stats().followers, 2);
    assert_eq!(second.stats().followers, 2);

    // A closed view stops listening; the survivor keeps re-deriving.
    drop(second);
    mock.unfollow(&UserId::new("a"), &UserId::new("subject"));
    bus.publish();
    assert_eq!(bus.subscriber_count(), 1);
    first.refresh_if_stale().await.expect("refresh");
    assert_eq!(first.stats().followers, 1);
}
