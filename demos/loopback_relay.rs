//! Loopback relay - one publisher, several subscribers, all in memory
//!
//! Run with: cargo run --example loopback_relay -- [SUBSCRIBERS] [FRAMES]
//!
//! This example demonstrates:
//! - Loading `ServerConfig` from the environment (`RELAY_ADDR`, `TLS_CERT_PATH`, ...)
//! - Publishing frames into a relay with `FramePublisher`
//! - Fan-out to several `FrameSubscriber`s over `MemorySession` pairs
//! - Relay statistics after the publisher disconnects
//!
//! # Architecture
//!
//! ```text
//!   FramePublisher ──MemorySession──► RelayServer ──MemorySession──► FrameSubscriber x N
//!                                        │
//!                                   StreamRegistry["demo"]
//! ```

use relay_rs::client::{FramePublisher, FrameSubscriber};
use relay_rs::error::{ConfigError, Error};
use relay_rs::registry::StreamKey;
use relay_rs::transport::MemorySession;
use relay_rs::{RelayServer, ServerConfig};
use tracing_subscriber::EnvFilter;

const STREAM_ID: &str = "demo";

fn print_usage() {
    eprintln!("Usage: loopback_relay [SUBSCRIBERS] [FRAMES]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  SUBSCRIBERS  Number of subscribers (default: 3)");
    eprintln!("  FRAMES       Number of frames to publish (default: 10)");
}

fn parse_arg(args: &[String], index: usize, default: usize) -> Result<usize, String> {
    match args.get(index) {
        Some(value) => value
            .parse()
            .map_err(|_| format!("Invalid number: '{}'", value)),
        None => Ok(default),
    }
}

#[tokio::main]
async fn main() -> relay_rs::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let (subscribers, frames) = match (parse_arg(&args, 1, 3), parse_arg(&args, 2, 10)) {
        (Ok(s), Ok(f)) => (s, f),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("relay_rs=debug,loopback_relay=debug")),
        )
        .init();

    let server = match RelayServer::from_env() {
        Ok(server) => server,
        Err(Error::Config(ConfigError::MissingTls)) => {
            // Only in-memory sessions below, so a network listener is never started
            println!("No TLS configured (not needed for a loopback run)");
            RelayServer::new(ServerConfig::from_env()?)
        }
        Err(e) => return Err(e),
    };

    let (relay_side, publisher_side) = MemorySession::pair();
    let handle = server.publish(STREAM_ID, relay_side).await?;
    println!("[{}] Publishing to '{}'", handle.session_id(), STREAM_ID);

    let mut readers = Vec::with_capacity(subscribers);
    for _ in 0..subscribers {
        let (relay_side, client_side) = MemorySession::pair();
        let id = server.subscribe(STREAM_ID, relay_side).await?;
        println!("Subscriber {} attached", id);
        readers.push(FrameSubscriber::new(client_side));
    }

    let publisher = FramePublisher::new(publisher_side.clone());
    for i in 0..frames {
        let payload = format!("frame {}", i).into_bytes();
        publisher.send(payload).await?;
    }

    for (n, reader) in readers.iter_mut().enumerate() {
        for _ in 0..frames {
            match reader.recv().await {
                Some(frame) => tracing::debug!(
                    reader = n,
                    payload = %String::from_utf8_lossy(frame.payload()),
                    "Frame received"
                ),
                None => break,
            }
        }
    }

    if let Some(stats) = server.registry().stream_stats(&StreamKey::new(STREAM_ID)).await {
        println!();
        println!("=== Relay '{}' ===", stats.stream_key);
        println!("Frames forwarded:  {}", stats.frames_forwarded);
        println!("Bytes forwarded:   {}", stats.bytes_forwarded);
        println!("Delivery failures: {}", stats.delivery_failures);
        for sub in &stats.subscribers {
            println!(
                "  subscriber {}: {} frames, {} bytes",
                sub.id, sub.frames_sent, sub.bytes_sent
            );
        }
    }

    publisher_side.close();
    handle.closed().await;
    println!();
    println!(
        "Publisher gone, {} relays registered",
        server.registry().stream_count().await
    );

    Ok(())
}
