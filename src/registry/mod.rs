//! Stream registry for pub/sub routing
//!
//! The registry maps stream keys to relays. A relay forwards frames from its
//! single publisher to every subscriber registered on the same key.
//!
//! # Architecture
//!
//! ```text
//!                          Arc<StreamRegistry>
//!                     ┌─────────────────────────┐
//!                     │ relays: HashMap<Key,    │
//!                     │   Arc<Relay> {          │
//!                     │     publisher slot,     │
//!                     │     subscribers (COW),  │
//!                     │   }                     │
//!                     │ >                       │
//!                     └───────────┬─────────────┘
//!                                 │
//!         ┌───────────────────────┼───────────────────────┐
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//!    [Publisher]            [Subscriber]            [Subscriber]
//!    ReceiveEndpoint        SendEndpoint            SendEndpoint
//!         │                       ▲                       ▲
//!         └──► relay.forward() ───┴───────────────────────┘
//! ```
//!
//! # Zero-Copy Design
//!
//! `bytes::Bytes` is reference counted, so every subscriber writes from the
//! same allocation the publisher's frame was assembled in.

pub mod error;
pub mod key;
pub mod relay;
pub mod store;

pub use error::RegistryError;
pub use key::StreamKey;
pub use relay::{ForwardReport, Relay, SubscriberId};
pub use store::StreamRegistry;
