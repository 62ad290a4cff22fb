//! Relay statistics

pub mod metrics;

pub use crate::registry::ForwardReport;
pub use metrics::{FrameCounters, RelayStats, SubscriberStats};
