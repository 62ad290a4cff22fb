//! End-to-end relay scenarios over in-memory sessions

use std::time::Duration;

use relay_rs::client::{FramePublisher, FrameSubscriber};
use relay_rs::registry::{RegistryError, StreamKey};
use relay_rs::transport::{MemorySession, Session};
use relay_rs::stats::RelayStats;
use relay_rs::{Frame, RelayServer, ServerConfig};
use tokio::io::AsyncWriteExt;
use tracing_subscriber::EnvFilter;

const WAIT: Duration = Duration::from_secs(5);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn next_frame(subscriber: &mut FrameSubscriber) -> Frame {
    tokio::time::timeout(WAIT, subscriber.recv())
        .await
        .expect("timed out waiting for frame")
        .expect("subscriber closed")
}

/// Poll relay stats until `done` holds; counters are updated after delivery
async fn settled_stats(
    server: &RelayServer,
    stream_id: &str,
    done: impl Fn(&RelayStats) -> bool,
) -> RelayStats {
    let key = StreamKey::new(stream_id);
    tokio::time::timeout(WAIT, async {
        loop {
            let stats = server
                .registry()
                .stream_stats(&key)
                .await
                .expect("relay removed while its publisher is alive");
            if done(&stats) {
                return stats;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("timed out waiting for relay stats")
}

async fn attach(server: &RelayServer, stream_id: &str) -> FrameSubscriber {
    let (relay_side, client_side) = MemorySession::pair();
    server.subscribe(stream_id, relay_side).await.unwrap();
    FrameSubscriber::new(client_side)
}

#[tokio::test]
async fn frames_on_one_stream_arrive_in_order_with_exact_lengths() {
    init_tracing();
    let server = RelayServer::new(ServerConfig::default());

    let (relay_side, publisher_side) = MemorySession::pair();
    let _handle = server.publish("scenario-a", relay_side).await.unwrap();
    let mut subscriber = attach(&server, "scenario-a").await;

    let publisher = FramePublisher::new(publisher_side);
    let mut writer = publisher.open_stream().await.unwrap();
    for len in [0usize, 100, 65536] {
        writer.write_frame(&Frame::new(vec![0xab; len])).await.unwrap();
    }
    writer.finish().await.unwrap();

    for expected in [0usize, 100, 65536] {
        let frame = next_frame(&mut subscriber).await;
        assert_eq!(frame.len(), expected);
        assert!(frame.payload().iter().all(|b| *b == 0xab));
    }
}

#[tokio::test]
async fn every_subscriber_gets_the_same_payload() {
    init_tracing();
    let server = RelayServer::new(ServerConfig::default());

    let (relay_side, publisher_side) = MemorySession::pair();
    let _handle = server.publish("scenario-b", relay_side).await.unwrap();
    let mut first = attach(&server, "scenario-b").await;
    let mut second = attach(&server, "scenario-b").await;

    let payload: Vec<u8> = (0u8..10).collect();
    let publisher = FramePublisher::new(publisher_side.clone());
    publisher.send(payload.clone()).await.unwrap();

    let a = next_frame(&mut first).await;
    let b = next_frame(&mut second).await;
    assert_eq!(a.payload().as_ref(), payload.as_slice());
    assert_eq!(a, b);
}

#[tokio::test]
async fn publisher_disconnect_frees_the_stream_key() {
    init_tracing();
    let server = RelayServer::new(ServerConfig::default());

    let (relay_side, publisher_side) = MemorySession::pair();
    let handle = server.publish("scenario-c", relay_side).await.unwrap();
    assert_eq!(server.registry().stream_count().await, 1);

    publisher_side.close();
    tokio::time::timeout(WAIT, handle.closed()).await.unwrap();

    let key = StreamKey::new("scenario-c");
    assert!(server.registry().lookup(&key).await.is_err());

    let (relay_side, _publisher_side) = MemorySession::pair();
    let handle = server.publish("scenario-c", relay_side).await.unwrap();

    let relay = server.registry().lookup(&key).await.unwrap();
    assert_eq!(relay.publisher_id(), Some(handle.session_id()));
    assert_eq!(relay.subscriber_count().await, 0);
}

#[tokio::test]
async fn failed_subscriber_does_not_affect_others_or_publisher() {
    init_tracing();
    let server = RelayServer::new(ServerConfig::default());

    let (relay_side, publisher_side) = MemorySession::pair();
    let _handle = server.publish("scenario-d", relay_side).await.unwrap();

    let (broken, broken_client) = MemorySession::pair();
    server.subscribe("scenario-d", broken).await.unwrap();
    broken_client.close();

    let mut healthy = attach(&server, "scenario-d").await;

    // Keep a handle: dropping the last client handle ends the session.
    let publisher = FramePublisher::new(publisher_side.clone());
    let written = publisher.send(vec![7u8; 10]).await.unwrap();
    assert_eq!(written, 14);

    let frame = next_frame(&mut healthy).await;
    assert_eq!(frame.payload().as_ref(), &[7u8; 10]);

    let stats = settled_stats(&server, "scenario-d", |s| {
        s.subscribers.len() == 2 && s.subscribers[1].frames_sent == 1
    })
    .await;
    assert_eq!(stats.delivery_failures, 1);
    assert_eq!(stats.subscribers[0].failures, 1);
    assert_eq!(stats.subscribers[0].frames_sent, 0);
    assert!(stats.has_publisher());

    // The publisher keeps going after the failure.
    publisher.send(vec![8u8; 3]).await.unwrap();
    assert_eq!(next_frame(&mut healthy).await.payload().as_ref(), &[8u8; 3]);
}

#[tokio::test]
async fn dropping_every_publisher_handle_ends_the_stream() {
    init_tracing();
    let server = RelayServer::new(ServerConfig::default());

    let (relay_side, publisher_side) = MemorySession::pair();
    let handle = server.publish("dropped", relay_side).await.unwrap();

    FramePublisher::new(publisher_side).send(vec![1u8]).await.unwrap();
    tokio::time::timeout(WAIT, handle.closed()).await.unwrap();

    assert!(server
        .registry()
        .lookup(&StreamKey::new("dropped"))
        .await
        .is_err());
}

#[tokio::test]
async fn many_frames_keep_their_order() {
    init_tracing();
    let server = RelayServer::new(ServerConfig::default());

    let (relay_side, publisher_side) = MemorySession::pair();
    let _handle = server.publish("ordered", relay_side).await.unwrap();
    let mut subscriber = attach(&server, "ordered").await;

    let publisher = FramePublisher::new(publisher_side);
    let mut writer = publisher.open_stream().await.unwrap();
    for i in 0u32..50 {
        let mut payload = i.to_le_bytes().to_vec();
        payload.resize(4 + (i as usize * 37) % 1000, 0);
        writer.write_frame(&Frame::new(payload)).await.unwrap();
    }
    writer.finish().await.unwrap();

    for i in 0u32..50 {
        let frame = next_frame(&mut subscriber).await;
        assert_eq!(frame.payload()[..4], i.to_le_bytes());
        assert_eq!(frame.len(), 4 + (i as usize * 37) % 1000);
    }
}

#[tokio::test]
async fn subscribe_requires_a_publisher() {
    init_tracing();
    let server = RelayServer::new(ServerConfig::default());

    let (relay_side, _client_side) = MemorySession::pair();
    let err = server.subscribe("later", relay_side).await.unwrap_err();
    assert_eq!(err, RegistryError::StreamNotFound(StreamKey::new("later")));
    assert_eq!(err.status_code(), 404);

    let (publisher, _publisher_side) = MemorySession::pair();
    let _handle = server.publish("later", publisher).await.unwrap();

    let (relay_side, _client_side) = MemorySession::pair();
    assert!(server.subscribe("later", relay_side).await.is_ok());
}

#[tokio::test]
async fn late_subscriber_misses_earlier_frames() {
    init_tracing();
    let server = RelayServer::new(ServerConfig::default());

    let (relay_side, publisher_side) = MemorySession::pair();
    let _handle = server.publish("late", relay_side).await.unwrap();
    let publisher = FramePublisher::new(publisher_side);

    let mut early = attach(&server, "late").await;
    publisher.send(vec![1u8]).await.unwrap();
    assert_eq!(next_frame(&mut early).await.payload().as_ref(), &[1u8]);

    let mut late = attach(&server, "late").await;
    publisher.send(vec![2u8]).await.unwrap();

    assert_eq!(next_frame(&mut late).await.payload().as_ref(), &[2u8]);
    assert_eq!(next_frame(&mut early).await.payload().as_ref(), &[2u8]);
}

#[tokio::test]
async fn malformed_stream_does_not_stop_the_relay() {
    init_tracing();
    let server = RelayServer::new(ServerConfig::default());

    let (relay_side, publisher_side) = MemorySession::pair();
    let _handle = server.publish("robust", relay_side).await.unwrap();
    let mut subscriber = attach(&server, "robust").await;

    // Declared length far beyond the maximum frame size
    let mut bad = publisher_side.open_uni().await.unwrap();
    let _ = bad.write_all(&u32::MAX.to_le_bytes()).await;
    let _ = bad.shutdown().await;

    // Stream cut in the middle of a payload
    let mut truncated = publisher_side.open_uni().await.unwrap();
    truncated.write_all(&[8, 0, 0, 0, 1, 2]).await.unwrap();
    truncated.shutdown().await.unwrap();

    FramePublisher::new(publisher_side.clone())
        .send(vec![5u8; 5])
        .await
        .unwrap();

    assert_eq!(next_frame(&mut subscriber).await.payload().as_ref(), &[5u8; 5]);
}

#[tokio::test]
async fn second_publisher_is_rejected_with_conflict() {
    init_tracing();
    let server = RelayServer::new(ServerConfig::default());

    let (first, _first_side) = MemorySession::pair();
    let (second, _second_side) = MemorySession::pair();

    let _handle = server.publish("taken", first).await.unwrap();
    let err = server.publish("taken", second).await.unwrap_err();

    assert_eq!(err, RegistryError::PublisherExists(StreamKey::new("taken")));
    assert_eq!(err.status_code(), 409);
}
