//! Read-only observability views over allocation state.

use serde::{Deserialize, Serialize};

use crate::config::EventRetentionPolicy;
use crate::core::{
    ClusterCapacityReport, ClusterStateProvider, ComputeResources, SchedulingError, UsageStore,
};

/// Decayed usage of one queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueUsageView {
    /// Queue name.
    pub queue: String,
    /// Usage decayed to the report time.
    pub usage: ComputeResources,
    /// Time of the last recorded update (ms since epoch).
    pub last_updated_ms: u128,
}

/// Health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag.
    pub ok: bool,
}

/// Usage of every observed queue decayed to `now_ms`, ordered by queue name.
pub fn queue_usage_report(store: &UsageStore, now_ms: u128) -> Vec<QueueUsageView> {
    store
        .snapshot()
        .into_iter()
        .map(|(queue, entry)| QueueUsageView {
            usage: entry.decayed(now_ms, store.half_time()),
            last_updated_ms: entry.last_updated_ms,
            queue,
        })
        .collect()
}

/// Allocatable, claimed and spare capacity of a cluster.
pub fn cluster_capacity_report(
    cluster_id: &str,
    provider: &dyn ClusterStateProvider,
) -> Result<ClusterCapacityReport, SchedulingError> {
    let nodes = provider.nodes()?;
    let pods = provider.pods()?;
    let report = ClusterCapacityReport::from_snapshot(cluster_id, &nodes, &pods);
    if report.is_overcommitted() {
        tracing::warn!(
            "cluster {} overcommitted: {:?}",
            cluster_id,
            report.spare.negative_names()
        );
    }
    Ok(report)
}

/// Events created before the returned time (ms since epoch) may be swept;
/// `None` when expiry is disabled.
pub fn retention_cutoff_ms(policy: &EventRetentionPolicy, now_ms: u128) -> Option<u128> {
    policy
        .expiry_enabled
        .then(|| now_ms.saturating_sub(policy.retention_duration().as_millis()))
}

/// Return a health payload.
pub const fn health() -> Health {
    Health { ok: true }
}
