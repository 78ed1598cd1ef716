//! Scheduling cycle orchestration.
//!
//! A [`Scheduler`] owns the policy for one cluster and shares the queue
//! [`UsageStore`] with the schedulers of other clusters. Each cycle reads
//! the cluster and job snapshots, decides leases, and feeds the grants back
//! into the usage store. A cycle never returns an error: when inputs cannot
//! be read it yields an empty [`LeaseDecision`].

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::aggregator::{active_pods, aggregate_allocatable, aggregate_claimed, Node, Pod};
use crate::core::{
    build_audit_event, AuditSink, ComputeResources, LeaseDecision, PendingJob, PolicyEngine,
    QueueCandidate, QueueInfo, SchedulingError, UsageStore,
};

/// Source of the current cluster state.
pub trait ClusterStateProvider: Send + Sync {
    /// Nodes with their allocatable resources.
    fn nodes(&self) -> Result<Vec<Node>, SchedulingError>;
    /// Pods with their container limits.
    fn pods(&self) -> Result<Vec<Pod>, SchedulingError>;
}

/// Source of queues and their pending jobs.
pub trait JobSource: Send + Sync {
    /// All known queues.
    fn queues(&self) -> Result<Vec<QueueInfo>, SchedulingError>;
    /// Up to `limit` pending jobs of `queue`, in lease order.
    fn pending_jobs(&self, queue: &str, limit: usize) -> Result<Vec<PendingJob>, SchedulingError>;
}

/// Lease scheduler for a single cluster.
pub struct Scheduler {
    cluster_id: String,
    engine: PolicyEngine,
    usage: Arc<UsageStore>,
    audit: Option<Arc<Mutex<Box<dyn AuditSink>>>>,
}

impl Scheduler {
    /// Create a scheduler for `cluster_id` sharing `usage` with other clusters.
    pub fn new(cluster_id: impl Into<String>, engine: PolicyEngine, usage: Arc<UsageStore>) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            engine,
            usage,
            audit: None,
        }
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Box<dyn AuditSink>) -> Self {
        self.audit = Some(Arc::new(Mutex::new(audit)));
        self
    }

    /// Attach a shared audit sink.
    #[must_use]
    pub fn with_shared_audit(mut self, audit: Arc<Mutex<Box<dyn AuditSink>>>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Cluster this scheduler leases for.
    pub fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    /// Read-only access to the shared usage store.
    pub fn usage(&self) -> &Arc<UsageStore> {
        &self.usage
    }

    /// Policy engine in use.
    pub const fn engine(&self) -> &PolicyEngine {
        &self.engine
    }

    /// Run one full cycle against live providers and record the grants.
    pub fn run_cycle(
        &self,
        cluster: &dyn ClusterStateProvider,
        jobs: &dyn JobSource,
        now_ms: u128,
    ) -> LeaseDecision {
        let (nodes, pods) = match (cluster.nodes(), cluster.pods()) {
            (Ok(nodes), Ok(pods)) => (nodes, pods),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!("cluster {} state unavailable: {}", self.cluster_id, e);
                self.record_audit("-", "empty_cycle", Some(e.to_string()));
                return LeaseDecision::empty(&self.cluster_id);
            }
        };

        let queues = match jobs.queues() {
            Ok(queues) => queues,
            Err(e) => {
                tracing::warn!("queue listing unavailable: {}", e);
                self.record_audit("-", "empty_cycle", Some(e.to_string()));
                return LeaseDecision::empty(&self.cluster_id);
            }
        };

        let batch = self.engine.limits().queue_lease_batch_size;
        let candidates = queues
            .into_iter()
            .filter_map(|queue| match jobs.pending_jobs(&queue.name, batch) {
                Ok(pending) => Some(QueueCandidate {
                    queue,
                    jobs: pending,
                }),
                Err(e) => {
                    tracing::warn!("skipping queue {} this cycle: {}", queue.name, e);
                    None
                }
            })
            .collect();

        let decision = self.plan(&nodes, &pods, candidates, now_ms);
        self.commit(&decision, now_ms);
        decision
    }

    /// Decide leases from materialised snapshots without touching the usage
    /// store.
    pub fn plan(
        &self,
        nodes: &[Node],
        pods: &[Pod],
        candidates: Vec<QueueCandidate>,
        now_ms: u128,
    ) -> LeaseDecision {
        let capacity = aggregate_allocatable(nodes);
        let claimed = aggregate_claimed(&active_pods(pods));
        if capacity.incomplete + claimed.incomplete > 0 {
            let err = SchedulingError::DataIncomplete(format!(
                "{} resource entries missing or malformed, counted as zero",
                capacity.incomplete + claimed.incomplete
            ));
            tracing::warn!("cluster {}: {}", self.cluster_id, err);
            self.record_audit("-", "data_incomplete", Some(err.to_string()));
        }

        let usage = self.usage.usage_at(now_ms);
        let decision = self.engine.decide(
            &self.cluster_id,
            &capacity.total,
            &claimed.total,
            &usage,
            candidates,
        );

        if !decision.overcommitted.is_empty() {
            let err = SchedulingError::OvercommitDetected(decision.overcommitted.join(","));
            self.record_audit("-", "overcommit", Some(err.to_string()));
        }
        decision
    }

    /// Feed a decision's grants into the usage store.
    pub fn commit(&self, decision: &LeaseDecision, now_ms: u128) {
        self.usage.apply_cycle(now_ms, &decision.grants());
        for lease in &decision.leases {
            self.record_audit(&lease.queue, "lease", Some(lease.job_ids.join(",")));
        }
        if decision.is_empty() {
            self.record_audit("-", "empty_cycle", None);
        }
        tracing::info!(
            "cluster {} cycle leased {} jobs across {} queues",
            self.cluster_id,
            decision.job_count(),
            decision.leases.len()
        );
    }

    /// Undo the usage of a lease the transport could not deliver or that an
    /// executor returned.
    pub fn return_lease(&self, queue: &str, resources: &ComputeResources) {
        self.usage.revoke(queue, resources);
        self.record_audit(queue, "lease_returned", None);
    }

    /// Undo every grant in `decision`.
    pub fn return_decision(&self, decision: &LeaseDecision) {
        let grants: BTreeMap<String, ComputeResources> = decision.grants();
        for (queue, resources) in &grants {
            self.return_lease(queue, resources);
        }
    }

    fn record_audit(&self, queue: &str, action: &str, payload: Option<String>) {
        if let Some(audit_sink) = &self.audit {
            let mut sink = audit_sink.lock();
            sink.record(build_audit_event(
                self.cluster_id.clone(),
                queue,
                action,
                payload,
            ));
        }
    }
}
