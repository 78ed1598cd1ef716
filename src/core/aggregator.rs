//! Cluster resource aggregation.
//!
//! Sums node allocatable capacity and container limits into
//! [`ComputeResources`] totals. Missing or malformed resource data never
//! fails a sum: the affected value counts as zero and is reported in
//! [`Aggregation::incomplete`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::ComputeResources;

/// Raw Kubernetes resource list: resource name to quantity string.
pub type ResourceList = BTreeMap<String, String>;

/// A cluster node as reported by the executor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Node {
    /// Node name.
    pub name: String,
    /// Allocatable resources; `None` when the status was not populated.
    #[serde(default)]
    pub allocatable: Option<ResourceList>,
}

impl Node {
    /// Create a node with the given allocatable list.
    pub fn new(name: impl Into<String>, allocatable: ResourceList) -> Self {
        Self {
            name: name.into(),
            allocatable: Some(allocatable),
        }
    }
}

/// Pod lifecycle phase; only phases that hold resources count as claims.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PodPhase {
    /// Accepted but not all containers are running.
    #[default]
    Pending,
    /// Bound to a node with at least one running container.
    Running,
    /// All containers terminated successfully.
    Succeeded,
    /// All containers terminated, at least one in failure.
    Failed,
    /// State could not be obtained.
    Unknown,
}

impl PodPhase {
    /// True when a pod in this phase still reserves its limits.
    pub const fn holds_resources(self) -> bool {
        !matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// A single container and its resource limits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Container {
    /// Container name.
    pub name: String,
    /// Resource limits; `None` when no limits were declared.
    #[serde(default)]
    pub limits: Option<ResourceList>,
}

impl Container {
    /// Create a container with the given limits.
    pub fn new(name: impl Into<String>, limits: ResourceList) -> Self {
        Self {
            name: name.into(),
            limits: Some(limits),
        }
    }
}

/// A pod and its containers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pod {
    /// Pod name.
    pub name: String,
    /// Lifecycle phase.
    #[serde(default)]
    pub phase: PodPhase,
    /// Containers in declaration order.
    #[serde(default)]
    pub containers: Vec<Container>,
}

impl Pod {
    /// Create a pending pod with the given containers.
    pub fn new(name: impl Into<String>, containers: Vec<Container>) -> Self {
        Self {
            name: name.into(),
            phase: PodPhase::Pending,
            containers,
        }
    }

    /// Sum of container limits for this pod.
    ///
    /// Containers run concurrently and each reserves its own limit, so the
    /// pod claim is the sum, not the maximum.
    pub fn total_limit(&self) -> ComputeResources {
        sum_lists(self.containers.iter().map(|c| (&c.name, c.limits.as_ref()))).total
    }
}

/// Result of a lossy aggregation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregation {
    /// Summed resources.
    pub total: ComputeResources,
    /// Number of missing lists plus malformed entries substituted with zero.
    pub incomplete: usize,
}

/// Capacity figures for one cluster, as exported for observability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterCapacityReport {
    /// Cluster identifier.
    pub cluster_id: String,
    /// Total allocatable capacity.
    pub allocatable: ComputeResources,
    /// Total limits claimed by active pods.
    pub claimed: ComputeResources,
    /// `allocatable - claimed`; negative entries signal overcommit.
    pub spare: ComputeResources,
}

impl ClusterCapacityReport {
    /// Build a report from node and pod snapshots.
    pub fn from_snapshot(cluster_id: impl Into<String>, nodes: &[Node], pods: &[Pod]) -> Self {
        let allocatable = total_allocatable(nodes);
        let claimed = total_claimed(&active_pods(pods));
        let spare = allocatable.sub(&claimed);
        Self {
            cluster_id: cluster_id.into(),
            allocatable,
            claimed,
            spare,
        }
    }

    /// True when any resource is claimed beyond capacity.
    pub fn is_overcommitted(&self) -> bool {
        self.spare.has_negative()
    }
}

fn sum_lists<'a, I>(lists: I) -> Aggregation
where
    I: Iterator<Item = (&'a String, Option<&'a ResourceList>)>,
{
    let mut out = Aggregation::default();
    for (owner, list) in lists {
        let Some(list) = list else {
            tracing::debug!("{} has no resource list, counting as zero", owner);
            out.incomplete += 1;
            continue;
        };
        let (parsed, malformed) = ComputeResources::from_resource_list_lossy(list);
        if !malformed.is_empty() {
            tracing::warn!(
                "{} has malformed resource values for {:?}, counting as zero",
                owner,
                malformed
            );
            out.incomplete += malformed.len();
        }
        out.total += &parsed;
    }
    out
}

/// Sum allocatable resources across nodes, reporting degraded entries.
pub fn aggregate_allocatable(nodes: &[Node]) -> Aggregation {
    sum_lists(nodes.iter().map(|n| (&n.name, n.allocatable.as_ref())))
}

/// Sum container limits across all containers of all pods, reporting
/// degraded entries. Pods without containers contribute zero.
pub fn aggregate_claimed(pods: &[Pod]) -> Aggregation {
    sum_lists(
        pods.iter()
            .flat_map(|p| p.containers.iter())
            .map(|c| (&c.name, c.limits.as_ref())),
    )
}

/// Total allocatable capacity of a node set. Empty input yields zero.
pub fn total_allocatable(nodes: &[Node]) -> ComputeResources {
    aggregate_allocatable(nodes).total
}

/// Total resource limits claimed by a pod set. Empty input yields zero.
pub fn total_claimed(pods: &[Pod]) -> ComputeResources {
    aggregate_claimed(pods).total
}

/// Pods whose phase still holds resources.
pub fn active_pods(pods: &[Pod]) -> Vec<Pod> {
    pods.iter()
        .filter(|p| p.phase.holds_resources())
        .cloned()
        .collect()
}
