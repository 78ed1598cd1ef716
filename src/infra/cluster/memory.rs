//! In-memory cluster state, replaced wholesale on every executor report.

use parking_lot::RwLock;

use crate::core::{ClusterStateProvider, Node, Pod, SchedulingError};

#[derive(Debug, Default)]
struct Snapshot {
    nodes: Vec<Node>,
    pods: Vec<Pod>,
}

/// Latest node and pod snapshot reported for a cluster.
#[derive(Debug, Default)]
pub struct InMemoryClusterState {
    snapshot: RwLock<Snapshot>,
}

impl InMemoryClusterState {
    /// Create a state holding the given snapshot.
    pub fn new(nodes: Vec<Node>, pods: Vec<Pod>) -> Self {
        Self {
            snapshot: RwLock::new(Snapshot { nodes, pods }),
        }
    }

    /// Replace nodes and pods together so readers never mix two reports.
    pub fn replace(&self, nodes: Vec<Node>, pods: Vec<Pod>) {
        *self.snapshot.write() = Snapshot { nodes, pods };
    }
}

impl ClusterStateProvider for InMemoryClusterState {
    fn nodes(&self) -> Result<Vec<Node>, SchedulingError> {
        Ok(self.snapshot.read().nodes.clone())
    }

    fn pods(&self) -> Result<Vec<Pod>, SchedulingError> {
        Ok(self.snapshot.read().pods.clone())
    }
}
