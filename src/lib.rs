//! # Armada Allocation
//!
//! Resource accounting and fair-share lease allocation for a multi-cluster
//! batch scheduler.
//!
//! A central control plane leases queued jobs to per-cluster executors that
//! run them on Kubernetes. Every scheduling cycle this crate answers two
//! questions for a cluster: how much may be leased right now, and which
//! queues get it.
//!
//! ## Core Problem Solved
//!
//! - **Accounting**: node allocatable capacity and container *limits* are
//!   summed exactly (fixed-point milli-units) across nodes, pods and
//!   containers, tolerating missing or malformed data.
//! - **Safety**: no cycle leases more than `MaximalClusterFractionToSchedule`
//!   of total capacity, nor more than the actual spare capacity. A resource
//!   whose claims exceed capacity has no budget at all.
//! - **Fairness**: every queue carries a usage figure that halves every
//!   `PriorityHalfTime`; queues with less recent usage are served first
//!   (deterministically) or more often (probabilistically).
//! - **Throughput**: at most `QueueLeaseBatchSize` jobs per queue per cycle,
//!   and nothing below `MinimumResourceToSchedule`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use armada_allocation::builders::build_schedulers;
//! use armada_allocation::config::{ArmadaConfig, ExecutorConfig};
//! use armada_allocation::infra::{InMemoryClusterState, InMemoryJobQueue};
//! use armada_allocation::util::clock::now_ms;
//!
//! let cfg = ArmadaConfig::load("armada.json")?;
//! let (usage, schedulers) = build_schedulers(&cfg, &[executor])?;
//! let decision = schedulers["cluster-a"].run_cycle(&cluster_state, &job_queue, now_ms());
//! for lease in &decision.leases {
//!     println!("{} <- {:?}", lease.queue, lease.job_ids);
//! }
//! ```
//!
//! For complete examples, see `tests/allocation_cycle_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Resource vectors, aggregation, usage tracking, and lease policy.
pub mod core;
/// Configuration models for scheduling, retention, and executors.
pub mod config;
/// Builders to construct schedulers from configuration.
pub mod builders;
/// Infrastructure adapters for cluster state, job queues, and lease delivery.
pub mod infra;
/// Runtime adapters: cycle timer, lease hand-off, and observability views.
pub mod runtime;
/// Shared utilities.
pub mod util;
