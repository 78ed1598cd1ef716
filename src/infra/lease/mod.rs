//! Lease sinks.

pub mod memory;

pub use memory::InMemoryLeaseSink;
