//! Relay server
//!
//! Request handling for publish and subscribe sessions plus the bootstrap
//! configuration.

pub mod config;
pub mod handler;

pub use config::ServerConfig;
pub use handler::{PublishHandle, RelayServer};
