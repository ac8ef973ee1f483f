//! Event stream publisher: framing, idle timeout, disconnect.

use std::time::{Duration, Instant};

use edu_assistant::agent::AgentEvent;
use edu_assistant::chat::bridge::BridgeItem;
use edu_assistant::chat::frame::StreamFrame;
use edu_assistant::chat::publisher::{publish_turn, TurnExit};
use tokio::sync::mpsc;

async fn drain(mut rx: mpsc::Receiver<StreamFrame>) -> Vec<StreamFrame> {
    let mut frames = Vec::new();
    while let Some(frame) = rx.recv().await {
        frames.push(frame);
    }
    frames
}

#[tokio::test]
async fn frames_follow_events_and_end_with_done() {
    let (item_tx, item_rx) = mpsc::channel(8);
    let (frame_tx, frame_rx) = mpsc::channel(8);

    for item in [
        BridgeItem::Event(AgentEvent::Thinking("pondering".into())),
        BridgeItem::Event(AgentEvent::TextDelta("Hi".into())),
        BridgeItem::Event(AgentEvent::TextDelta(" there".into())),
        BridgeItem::Event(AgentEvent::Done(Some("sess-2".into()))),
        BridgeItem::End,
    ] {
        item_tx.send(item).await.expect("enqueue");
    }

    let outcome = publish_turn(item_rx, frame_tx, Duration::from_secs(5), "t").await;
    let frames = drain(frame_rx).await;

    assert_eq!(
        frames,
        vec![
            StreamFrame::thinking("pondering"),
            StreamFrame::text("Hi"),
            StreamFrame::text(" there"),
            StreamFrame::done(Some("sess-2".into())),
        ]
    );
    assert_eq!(outcome.exit, TurnExit::Completed);
    assert_eq!(outcome.transcript.text(), "Hi there");
    assert_eq!(outcome.resume_token.as_deref(), Some("sess-2"));
}

#[tokio::test]
async fn closed_channel_counts_as_end() {
    let (item_tx, item_rx) = mpsc::channel(2);
    let (frame_tx, frame_rx) = mpsc::channel(2);
    item_tx
        .send(BridgeItem::Event(AgentEvent::TextDelta("x".into())))
        .await
        .expect("enqueue");
    drop(item_tx);

    let outcome = publish_turn(item_rx, frame_tx, Duration::from_secs(5), "t").await;
    let frames = drain(frame_rx).await;

    assert_eq!(outcome.exit, TurnExit::Completed);
    assert_eq!(frames.last(), Some(&StreamFrame::done(None)));
    assert_eq!(frames.iter().filter(|f| f.is_done()).count(), 1);
}

#[tokio::test]
async fn idle_timeout_closes_with_single_done_frame() {
    let (item_tx, item_rx) = mpsc::channel(2);
    let (frame_tx, frame_rx) = mpsc::channel(4);
    item_tx
        .send(BridgeItem::Event(AgentEvent::TextDelta("partial".into())))
        .await
        .expect("enqueue");

    let idle = Duration::from_millis(200);
    let started = Instant::now();
    let outcome = publish_turn(item_rx, frame_tx, idle, "t").await;
    let elapsed = started.elapsed();

    assert_eq!(outcome.exit, TurnExit::IdleTimeout);
    assert!(elapsed >= idle, "waited at least one interval");
    assert!(elapsed < idle * 5, "closed promptly after the interval: {elapsed:?}");
    assert_eq!(outcome.resume_token, None);

    let frames = drain(frame_rx).await;
    assert_eq!(
        frames,
        vec![StreamFrame::text("partial"), StreamFrame::done(None)]
    );

    // The producer side is not torn down; its late sends are simply ignored.
    assert!(item_tx.send(BridgeItem::End).await.is_err());
}

#[tokio::test]
async fn client_disconnect_stops_reading_but_keeps_transcript() {
    let (item_tx, item_rx) = mpsc::channel(8);
    let (frame_tx, frame_rx) = mpsc::channel(1);
    drop(frame_rx);

    item_tx
        .send(BridgeItem::Event(AgentEvent::TextDelta("Par".into())))
        .await
        .expect("enqueue");
    item_tx
        .send(BridgeItem::Event(AgentEvent::TextDelta("tial".into())))
        .await
        .expect("enqueue");

    let outcome = publish_turn(item_rx, frame_tx, Duration::from_secs(5), "t").await;

    assert_eq!(outcome.exit, TurnExit::ClientDisconnected);
    assert_eq!(outcome.transcript.text(), "Par");
}

#[tokio::test]
async fn stalled_reader_is_treated_as_disconnected() {
    let (item_tx, item_rx) = mpsc::channel(8);
    let (frame_tx, frame_rx) = mpsc::channel(1);

    for text in ["a", "b", "c"] {
        item_tx
            .send(BridgeItem::Event(AgentEvent::TextDelta(text.into())))
            .await
            .expect("enqueue");
    }

    let idle = Duration::from_millis(200);
    let started = Instant::now();
    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        publish_turn(item_rx, frame_tx, idle, "t"),
    )
    .await
    .expect("publisher returns while the reader is stalled");

    assert_eq!(outcome.exit, TurnExit::ClientDisconnected);
    assert!(started.elapsed() < idle * 5, "gave up within the bound");
    // "b" was taken from the bridge but never delivered; it still counts.
    assert_eq!(outcome.transcript.text(), "ab");
    assert!(item_tx.send(BridgeItem::End).await.is_err(), "bridge receiver released");

    let frames = drain(frame_rx).await;
    assert_eq!(frames, vec![StreamFrame::text("a")]);
}

#[tokio::test]
async fn done_token_supersedes_nothing_when_absent() {
    let (item_tx, item_rx) = mpsc::channel(4);
    let (frame_tx, frame_rx) = mpsc::channel(4);
    item_tx
        .send(BridgeItem::Event(AgentEvent::TextDelta("4".into())))
        .await
        .expect("enqueue");
    item_tx.send(BridgeItem::End).await.expect("enqueue");

    let outcome = publish_turn(item_rx, frame_tx, Duration::from_secs(5), "t").await;
    let frames = drain(frame_rx).await;

    assert_eq!(outcome.resume_token, None);
    assert_eq!(frames.last().map(StreamFrame::data_json).as_deref(), Some(r#"{"session_id":null}"#));
}
