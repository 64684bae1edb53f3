//! Routing behaviour across several Active sessions, with a real log file.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use parley_router::{HistoryBuffer, LogSink, Routed, Router};
use parley_session::{
    DEFAULT_OUTBOUND_CAPACITY, Group, GroupTable, OutboundReceiver,
    SessionRegistry, outbound_channel,
};
use parley_transport::ConnectionId;

fn addr() -> SocketAddr {
    "127.0.0.1:7000".parse().unwrap()
}

async fn router_with_log(log_path: &Path, groups: GroupTable) -> Router {
    Router::new(
        Arc::new(SessionRegistry::new(None)),
        Arc::new(groups),
        Arc::new(HistoryBuffer::new(20)),
        Arc::new(LogSink::open(log_path).await.unwrap()),
    )
}

async fn join(router: &Router, n: u64, name: &str) -> OutboundReceiver {
    let (tx, mut rx) = outbound_channel(DEFAULT_OUTBOUND_CAPACITY);
    router
        .admit(ConnectionId::new(n), name, addr(), tx)
        .await
        .unwrap();
    // Drop the welcome and any replay.
    while rx.try_recv().is_ok() {}
    rx
}

fn drain(rx: &mut OutboundReceiver) -> Vec<String> {
    let mut lines = Vec::new();
    while let Ok(line) = rx.try_recv() {
        lines.push(line);
    }
    lines
}

/// Log entries with the `[timestamp] ` prefix removed.
fn log_entries(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| l[22..].to_string())
        .collect()
}

#[tokio::test]
async fn test_global_broadcast_reaches_everyone_including_sender() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("chat_log.txt");
    let router = router_with_log(&log, GroupTable::default()).await;

    let mut a = join(&router, 1, "A").await;
    let mut b = join(&router, 2, "B").await;
    let mut c = join(&router, 3, "C").await;
    drain(&mut a);
    drain(&mut b);

    let routed = router.route(ConnectionId::new(1), "A", "hi").await;

    assert_eq!(routed, Routed::Global { delivered: 3 });
    assert_eq!(drain(&mut a), ["A: hi"]);
    assert_eq!(drain(&mut b), ["A: hi"]);
    assert_eq!(drain(&mut c), ["A: hi"]);
    assert_eq!(log_entries(&log).last().map(String::as_str), Some("A: hi"));
}

#[tokio::test]
async fn test_direct_message_is_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("chat_log.txt");
    let router = router_with_log(&log, GroupTable::default()).await;

    let mut a = join(&router, 1, "A").await;
    let mut b = join(&router, 2, "B").await;
    let mut c = join(&router, 3, "C").await;
    drain(&mut a);
    drain(&mut b);

    let routed = router.route(ConnectionId::new(1), "A", "PRIVMSG B hello").await;

    assert_eq!(
        routed,
        Routed::Direct {
            recipient: "B".into()
        }
    );
    assert_eq!(drain(&mut b), ["(DM from A): hello"]);
    assert_eq!(drain(&mut a), ["(DM to B): hello"]);
    assert!(drain(&mut c).is_empty());
    assert!(log_entries(&log).contains(&"DM from A to B: hello".to_string()));
}

#[tokio::test]
async fn test_direct_message_to_offline_user_is_not_logged() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("chat_log.txt");
    let router = router_with_log(&log, GroupTable::default()).await;

    let mut a = join(&router, 1, "A").await;
    let entries_before = log_entries(&log).len();

    let routed = router.route(ConnectionId::new(1), "A", "PRIVMSG zed yo").await;

    assert_eq!(routed, Routed::Rejected);
    assert_eq!(
        drain(&mut a),
        ["System: User 'zed' not found or is offline."]
    );
    assert_eq!(log_entries(&log).len(), entries_before);
}

#[tokio::test]
async fn test_group_message_skips_offline_members_and_logs_once() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("chat_log.txt");
    let groups = GroupTable::new([Group::new("friends", ["alice", "bob"])]);
    let router = router_with_log(&log, groups).await;

    let mut alice = join(&router, 1, "alice").await;

    let routed = router
        .route(ConnectionId::new(1), "alice", "GROUPMSG friends hey")
        .await;

    assert_eq!(
        routed,
        Routed::Group {
            group: "friends".into(),
            delivered: 0
        }
    );
    assert_eq!(drain(&mut alice), ["(To #friends): hey"]);
    let group_entries: Vec<String> = log_entries(&log)
        .into_iter()
        .filter(|l| l.starts_with("GROUPMSG"))
        .collect();
    assert_eq!(group_entries, ["GROUPMSG to #friends from alice: hey"]);
}

#[tokio::test]
async fn test_group_message_reaches_online_members_only() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("chat_log.txt");
    let groups = GroupTable::new([Group::new("friends", ["alice", "bob"])]);
    let router = router_with_log(&log, groups).await;

    let mut alice = join(&router, 1, "alice").await;
    let mut bob = join(&router, 2, "bob").await;
    let mut carol = join(&router, 3, "carol").await;
    drain(&mut alice);
    drain(&mut bob);

    router
        .route(ConnectionId::new(1), "alice", "GROUPMSG friends hey all")
        .await;

    assert_eq!(drain(&mut bob), ["(#friends from alice): hey all"]);
    assert_eq!(drain(&mut alice), ["(To #friends): hey all"]);
    assert!(drain(&mut carol).is_empty());
}

#[tokio::test]
async fn test_history_keeps_last_twenty_lines() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("chat_log.txt");
    let router = router_with_log(&log, GroupTable::default()).await;

    let _a = join(&router, 1, "A").await;
    for i in 0..25 {
        router
            .route(ConnectionId::new(1), "A", &format!("message {i}"))
            .await;
    }

    let snapshot = router.history().snapshot();
    let expected: Vec<String> = (5..25).map(|i| format!("A: message {i}")).collect();
    assert_eq!(snapshot, expected);
}

#[tokio::test]
async fn test_departure_is_announced_once_and_frees_username() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("chat_log.txt");
    let router = router_with_log(&log, GroupTable::default()).await;

    let mut a = join(&router, 1, "A").await;
    let _b = join(&router, 2, "B").await;
    let mut c = join(&router, 3, "C").await;
    drain(&mut a);

    router.depart(ConnectionId::new(2)).await;
    router.depart(ConnectionId::new(2)).await;

    assert_eq!(drain(&mut a), ["System: B has left the chat."]);
    assert_eq!(drain(&mut c), ["System: B has left the chat."]);
    assert_eq!(router.registry().read().find("B"), None);

    let (tx, _rx) = outbound_channel(DEFAULT_OUTBOUND_CAPACITY);
    router
        .admit(ConnectionId::new(4), "B", addr(), tx)
        .await
        .expect("username should be reusable after departure");
}
