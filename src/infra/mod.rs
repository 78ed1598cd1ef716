//! Infrastructure adapters for cluster state, job queues, and lease delivery.

pub mod cluster;
pub mod lease;
pub mod queue;

pub use cluster::InMemoryClusterState;
pub use lease::InMemoryLeaseSink;
pub use queue::InMemoryJobQueue;
