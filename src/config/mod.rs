//! Configuration models for scheduling, retention, and executors.

pub mod scheduling;

pub use scheduling::{ArmadaConfig, EventRetentionPolicy, ExecutorConfig, SchedulingConfig};
