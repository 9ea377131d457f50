//! Sessions publishing through the ledger while a feed watches the same store.

use std::sync::Arc;
use std::time::Duration;

use flourish_app::Session;
use flourish_leaderboard::{ChannelObserver, LeaderboardEvent, LeaderboardFeed, LeaderboardSnapshot};
use flourish_ledger::{LedgerError, ScoreLedger, StaticIdentity};
use flourish_oracle::KeywordOracle;
use flourish_primitives::UserId;
use flourish_store::{DocumentStore, MemoryDocumentStore};
use tokio::sync::mpsc::UnboundedReceiver;

fn session_for(store: &MemoryDocumentStore, user: &str) -> Session {
    let ledger = ScoreLedger::with_defaults(
        Arc::new(store.clone()),
        Arc::new(StaticIdentity::signed_in(user)),
    );
    Session::new(Arc::new(KeywordOracle), Arc::new(ledger))
}

async fn next_snapshot(rx: &mut UnboundedReceiver<LeaderboardEvent>) -> LeaderboardSnapshot {
    match tokio::time::timeout(Duration::from_secs(5), rx.recv()).await {
        Ok(Some(LeaderboardEvent::Snapshot(snapshot))) => snapshot,
        other => panic!("expected a snapshot, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_submissions_reach_the_feed() {
    let store = MemoryDocumentStore::new();
    let feed = LeaderboardFeed::with_defaults(Arc::new(store.clone()));
    let (observer, mut rx) = ChannelObserver::new();
    feed.start_listening(observer).unwrap();
    assert!(next_snapshot(&mut rx).await.is_empty());

    let mut alice = session_for(&store, "alice-0001");
    let submission = alice
        .submit("Creek cleanup", "volunteered picking up trash")
        .await
        .unwrap();
    assert_eq!(submission.total, 40);

    let snapshot = next_snapshot(&mut rx).await;
    let me = UserId::new("alice-0001");
    assert_eq!(snapshot.rank_of(&me), Some(1));
    assert_eq!(snapshot.entries()[0].points, 40);
    assert_eq!(snapshot.entries()[0].label(Some(&me)), "flower alic (me)");

    let mut bob = session_for(&store, "bob-0002");
    bob.submit("Thrift", "went thrifting for a coat").await.unwrap();
    bob.submit("Thrift again", "more thrifting").await.unwrap();

    // Each of bob's writes delivers a snapshot; the last one ranks him first.
    let mut snapshot = next_snapshot(&mut rx).await;
    while snapshot.rank_of(&UserId::new("bob-0002")) != Some(1) {
        snapshot = next_snapshot(&mut rx).await;
    }
    assert_eq!(snapshot.entries()[0].points, 50);
    assert_eq!(snapshot.rank_of(&me), Some(2));

    feed.stop_listening();
    alice.sync_points(Some("alice")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_rename_shows_in_fetch() {
    let store = MemoryDocumentStore::new();
    let session = session_for(&store, "carol-0003");
    session.sync_points(None).await.unwrap();
    session.rename("Carol").await.unwrap();
    session.rename("   ").await.unwrap();

    let feed = LeaderboardFeed::with_defaults(Arc::new(store.clone()));
    let snapshot = feed.fetch().await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.entries()[0].display_name.as_deref(), Some("Carol"));
    assert_eq!(snapshot.entries()[0].points, 20);
}

#[tokio::test]
async fn test_signed_out_session_never_writes() {
    let store = MemoryDocumentStore::new();
    let ledger = ScoreLedger::with_defaults(Arc::new(store.clone()), Arc::new(StaticIdentity::signed_out()));
    let mut session = Session::new(Arc::new(KeywordOracle), Arc::new(ledger));

    let err = session.submit("Bus", "took the bus").await.unwrap_err();
    assert!(matches!(
        err,
        flourish_app::SubmitError::Ledger { source: LedgerError::NotAuthenticated, .. }
    ));
    assert!(matches!(session.rename("x").await, Err(LedgerError::NotAuthenticated)));
    assert_eq!(store.commit_count(), 0);
    assert!(store.get("leaderboard", "anyone").await.unwrap().is_none());
}
