//! Selective-forwarding relay for length-delimited frames
//!
//! A publisher sends frames over a multiplexed session, one frame per
//! unidirectional stream. The relay reassembles them and forwards each frame,
//! in order, to every subscriber registered under the same stream key.
//!
//! ```text
//!   publisher ──streams──► Transport<_, Publisher> ─► ReceiveEndpoint
//!                                                          │
//!                                                        Relay (StreamRegistry[key])
//!                                                          │
//!   subscriber ◄─streams── Transport<_, Subscriber> ◄─ SendEndpoint (one per subscriber)
//! ```
//!
//! # Example
//! ```no_run
//! use relay_rs::client::{FramePublisher, FrameSubscriber};
//! use relay_rs::transport::MemorySession;
//! use relay_rs::{RelayServer, ServerConfig};
//!
//! # async fn example() -> relay_rs::Result<()> {
//! let server = RelayServer::new(ServerConfig::default());
//!
//! let (pub_server, pub_client) = MemorySession::pair();
//! let _handle = server.publish("cam", pub_server).await?;
//!
//! let (sub_server, sub_client) = MemorySession::pair();
//! server.subscribe("cam", sub_server).await?;
//! let mut subscriber = FrameSubscriber::new(sub_client);
//!
//! FramePublisher::new(pub_client).send(vec![1u8, 2, 3]).await?;
//! let frame = subscriber.recv().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod endpoint;
pub mod error;
pub mod framing;
pub mod media;
pub mod registry;
pub mod server;
pub mod stats;
pub mod transport;

pub use error::{Error, Result};
pub use framing::Frame;
pub use registry::{Relay, StreamKey, StreamRegistry};
pub use server::{RelayServer, ServerConfig};
