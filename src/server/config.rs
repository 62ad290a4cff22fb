//! Server configuration

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::transport::TransportConfig;

/// Default listen address
pub const DEFAULT_BIND_ADDR: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED), 4443);

/// Environment variable names read by [`ServerConfig::from_env`]
pub mod env {
    pub const RELAY_ADDR: &str = "RELAY_ADDR";
    pub const TLS_CERT_PATH: &str = "TLS_CERT_PATH";
    pub const TLS_KEY_PATH: &str = "TLS_KEY_PATH";
    pub const RELAY_SEND_TIMEOUT_MS: &str = "RELAY_SEND_TIMEOUT_MS";
    pub const RELAY_MAX_FRAME_SIZE: &str = "RELAY_MAX_FRAME_SIZE";
}

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// TLS certificate path
    pub tls_cert: Option<PathBuf>,

    /// TLS private key path
    pub tls_key: Option<PathBuf>,

    /// Options applied to every accepted session
    pub transport: TransportConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR,
            tls_cert: None,
            tls_key: None,
            transport: TransportConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup
    ///
    /// Unset keys keep their defaults. TLS paths are not checked here, call
    /// [`validate`](Self::validate) before serving.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = parse(&lookup, env::RELAY_ADDR)? {
            config.bind_addr = addr;
        }
        config.tls_cert = lookup(env::TLS_CERT_PATH).map(PathBuf::from);
        config.tls_key = lookup(env::TLS_KEY_PATH).map(PathBuf::from);

        if let Some(ms) = parse::<u64, _>(&lookup, env::RELAY_SEND_TIMEOUT_MS)? {
            config.transport.send_timeout = Duration::from_millis(ms);
        }
        if let Some(size) = parse(&lookup, env::RELAY_MAX_FRAME_SIZE)? {
            config.transport.max_frame_size = size;
        }

        Ok(config)
    }

    /// Check that the config can be served
    pub fn validate(&self) -> Result<(), ConfigError> {
        match (&self.tls_cert, &self.tls_key) {
            (Some(_), Some(_)) => Ok(()),
            _ => Err(ConfigError::MissingTls),
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set certificate and key paths
    pub fn tls(mut self, cert: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        self.tls_cert = Some(cert.into());
        self.tls_key = Some(key.into());
        self
    }

    /// Set the transport options
    pub fn transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }
}

fn parse<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
    }
}
