//! Relay request handling
//!
//! Turns publish and subscribe requests for an upgraded session into
//! registry operations. The session upgrade itself (WebTransport over
//! HTTP/3, or any other multiplexed transport) happens in front of this and
//! hands over a [`Session`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::endpoint::{ReceiveEndpoint, SendEndpoint};
use crate::registry::{RegistryError, StreamKey, StreamRegistry, SubscriberId};
use crate::server::config::ServerConfig;
use crate::transport::{PublisherTransport, Session, SubscriberTransport};

/// Frame relay server
pub struct RelayServer {
    config: ServerConfig,
    registry: Arc<StreamRegistry>,
    next_session_id: AtomicU64,
}

impl RelayServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            registry: Arc::new(StreamRegistry::new()),
            next_session_id: AtomicU64::new(1),
        }
    }

    /// Create a server for network use, validating `config` first
    ///
    /// Fails with [`ConfigError::MissingTls`](crate::error::ConfigError::MissingTls)
    /// unless both a certificate and a key are configured.
    pub fn try_new(config: ServerConfig) -> crate::Result<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Create a server from `RELAY_ADDR`, `TLS_CERT_PATH`, `TLS_KEY_PATH` and friends
    pub fn from_env() -> crate::Result<Self> {
        Self::try_new(ServerConfig::from_env()?)
    }

    /// Get a reference to the stream registry
    pub fn registry(&self) -> &Arc<StreamRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind `session` as the publisher of `stream_id`
    ///
    /// Creates the relay and starts forwarding. When the session ends the
    /// relay is removed from the registry, freeing the key for the next
    /// publisher. Fails with [`RegistryError::PublisherExists`] if the key
    /// already has a relay.
    pub async fn publish<S: Session>(
        &self,
        stream_id: &str,
        session: S,
    ) -> Result<PublishHandle, RegistryError> {
        let key = StreamKey::new(stream_id);
        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);

        let (relay, existed) = self.registry.get_or_create(&key).await;
        if existed {
            tracing::warn!(
                stream = %key,
                session_id = session_id,
                "Publish rejected: publisher already exists"
            );
            return Err(RegistryError::PublisherExists(key));
        }

        let transport =
            PublisherTransport::new(session, session_id, self.config.transport.clone());
        let mut source = ReceiveEndpoint::new(transport);

        let registry = Arc::clone(&self.registry);
        let owned = Arc::clone(&relay);
        let removal_key = key.clone();
        source.on_close(move || async move {
            registry.remove(&removal_key, &owned).await;
        });

        let task = match relay.publish(source) {
            Ok(task) => task,
            Err(e) => {
                // Relay was just created by this call, nobody else can bind it
                self.registry.remove(&key, &relay).await;
                return Err(e);
            }
        };

        Ok(PublishHandle {
            session_id,
            key,
            task,
        })
    }

    /// Register `session` as a subscriber of `stream_id`
    ///
    /// Fails with [`RegistryError::StreamNotFound`] if nothing is published
    /// under the key. The subscriber receives frames forwarded from now on.
    pub async fn subscribe<S: Session>(
        &self,
        stream_id: &str,
        session: S,
    ) -> Result<SubscriberId, RegistryError> {
        let key = StreamKey::new(stream_id);
        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);

        let relay = match self.registry.lookup(&key).await {
            Ok(relay) => relay,
            Err(e) => {
                tracing::warn!(
                    stream = %key,
                    session_id = session_id,
                    "Subscribe rejected: stream not found"
                );
                return Err(e);
            }
        };

        let transport =
            SubscriberTransport::new(session, session_id, self.config.transport.clone());
        let id = relay.subscribe(Arc::new(SendEndpoint::new(transport))).await;

        tracing::debug!(
            stream = %key,
            session_id = session_id,
            subscriber = %id,
            "Subscriber attached"
        );

        Ok(id)
    }
}

impl std::fmt::Debug for RelayServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayServer")
            .field("bind_addr", &self.config.bind_addr)
            .finish()
    }
}

/// Handle to an accepted publisher
#[derive(Debug)]
pub struct PublishHandle {
    session_id: u64,
    key: StreamKey,
    task: JoinHandle<()>,
}

impl PublishHandle {
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn key(&self) -> &StreamKey {
        &self.key
    }

    /// Wait until the publisher is gone and its relay was removed
    pub async fn closed(self) {
        if let Err(e) = self.task.await {
            tracing::error!(stream = %self.key, error = %e, "Broadcast task failed");
        }
    }
}
