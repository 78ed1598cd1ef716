//! Cluster state providers.

pub mod memory;

pub use memory::InMemoryClusterState;
