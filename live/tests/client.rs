//! `LiveStreamClient` connection lifecycle against a nullable source.

use std::sync::Arc;
use std::time::Duration;

use passvote_live::{LiveEvent, LiveStreamClient};
use passvote_nullables::NullStreamSource;
use passvote_types::{LiveOption, LiveSnapshot, PollId};
use tokio::sync::mpsc;

async fn settle(source: &NullStreamSource, open: usize) {
    for _ in 0..100 {
        if source.open_connections() == open {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "expected {open} open connections, found {}",
        source.open_connections()
    );
}

async fn recv(rx: &mut mpsc::UnboundedReceiver<LiveEvent>) -> LiveEvent {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for a live event")
        .expect("live channel closed")
}

#[tokio::test]
async fn delivers_open_snapshots_and_errors() {
    let source = Arc::new(NullStreamSource::new());
    let mut client = LiveStreamClient::new(Arc::clone(&source), "http://polls.test");
    let (tx, mut rx) = mpsc::unbounded_channel();

    assert!(client.start(&PollId::from("p-1"), tx));
    assert_eq!(source.opened_urls(), vec!["http://polls.test/polls/p-1/results"]);

    let snapshot = LiveSnapshot::new(3, vec![LiveOption::new("a", 2), LiveOption::new("b", 1)]);
    source.emit_open();
    source.emit_snapshot(&snapshot);
    source.emit_error("connection reset");

    assert_eq!(recv(&mut rx).await, LiveEvent::Open);
    assert_eq!(recv(&mut rx).await, LiveEvent::Snapshot(snapshot));
    assert_eq!(recv(&mut rx).await, LiveEvent::Error("connection reset".into()));
}

#[tokio::test]
async fn unparseable_messages_are_dropped() {
    let source = Arc::new(NullStreamSource::new());
    let mut client = LiveStreamClient::new(Arc::clone(&source), "http://polls.test");
    let (tx, mut rx) = mpsc::unbounded_channel();
    client.start(&PollId::from("p-1"), tx);

    source.emit_raw("{not json");
    let snapshot = LiveSnapshot::new(1, vec![LiveOption::new("a", 1)]);
    source.emit_snapshot(&snapshot);

    assert_eq!(recv(&mut rx).await, LiveEvent::Snapshot(snapshot));
    assert_eq!(source.open_connections(), 1);
}

#[tokio::test]
async fn same_poll_start_is_a_no_op() {
    let source = Arc::new(NullStreamSource::new());
    let mut client = LiveStreamClient::new(Arc::clone(&source), "http://polls.test");
    let (tx, _rx) = mpsc::unbounded_channel();

    assert!(client.start(&PollId::from("p-1"), tx.clone()));
    assert!(!client.start(&PollId::from("p-1"), tx));
    assert_eq!(source.opened_urls().len(), 1);
    settle(&source, 1).await;
}

#[tokio::test]
async fn other_poll_replaces_connection() {
    let source = Arc::new(NullStreamSource::new());
    let mut client = LiveStreamClient::new(Arc::clone(&source), "http://polls.test/");
    let (tx, _rx) = mpsc::unbounded_channel();

    client.start(&PollId::from("p-1"), tx.clone());
    client.start(&PollId::from("p-2"), tx);

    assert_eq!(client.active_poll(), Some(&PollId::from("p-2")));
    assert_eq!(
        source.opened_urls(),
        vec![
            "http://polls.test/polls/p-1/results",
            "http://polls.test/polls/p-2/results"
        ]
    );
    settle(&source, 1).await;
}

#[tokio::test]
async fn stop_is_idempotent_and_closes() {
    let source = Arc::new(NullStreamSource::new());
    let mut client = LiveStreamClient::new(Arc::clone(&source), "http://polls.test");
    let (tx, _rx) = mpsc::unbounded_channel();
    client.start(&PollId::from("p-1"), tx);
    settle(&source, 1).await;

    client.stop();
    client.stop();
    assert!(!client.is_active());
    settle(&source, 0).await;
}

#[tokio::test]
async fn dropping_the_client_closes() {
    let source = Arc::new(NullStreamSource::new());
    let (tx, _rx) = mpsc::unbounded_channel();
    {
        let mut client = LiveStreamClient::new(Arc::clone(&source), "http://polls.test");
        client.start(&PollId::from("p-1"), tx);
        settle(&source, 1).await;
    }
    settle(&source, 0).await;
}

#[tokio::test]
async fn ended_stream_is_no_longer_active_and_can_restart() {
    let source = Arc::new(NullStreamSource::new());
    let mut client = LiveStreamClient::new(Arc::clone(&source), "http://polls.test");
    let (tx, _rx) = mpsc::unbounded_channel();
    let poll = PollId::from("p-1");
    client.start(&poll, tx.clone());
    settle(&source, 1).await;

    source.close_latest();
    settle(&source, 0).await;
    for _ in 0..100 {
        if !client.is_active() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(!client.is_active());
    assert_eq!(client.active_poll(), None);

    assert!(client.start(&poll, tx));
    settle(&source, 1).await;
    assert_eq!(source.opened_urls().len(), 2);
}
