//! Runtime adapters: cycle timer, lease hand-off, and observability views.

pub mod api;
#[cfg(feature = "tokio-runtime")]
pub mod cycle_driver;
pub mod lease_sink;

pub use api::{cluster_capacity_report, health, queue_usage_report, retention_cutoff_ms, QueueUsageView};
#[cfg(feature = "tokio-runtime")]
pub use cycle_driver::CycleDriver;
pub use lease_sink::LeaseSink;
