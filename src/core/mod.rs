//! Core resource accounting and lease allocation.

pub mod aggregator;
pub mod audit;
pub mod error;
pub mod policy;
pub mod priority;
pub mod quantity;
pub mod resources;
pub mod scheduler;

pub use aggregator::{
    total_allocatable, total_claimed, Aggregation, ClusterCapacityReport, Container, Node, Pod,
    PodPhase, ResourceList,
};
pub use audit::{build_audit_event, AuditEvent, AuditSink, InMemoryAuditSink};
pub use error::{AppResult, SchedulingError};
pub use policy::{
    compute_budget, Budget, LeaseDecision, PendingJob, PolicyEngine, PolicyLimits,
    QueueCandidate, QueueInfo, QueueLease, SchedulingStrategy,
};
pub use priority::{decay_factor, usage_score, QueueUsage, UsageStore};
pub use quantity::Quantity;
pub use resources::{ComputeResources, ComputeResourcesFloat};
pub use scheduler::{ClusterStateProvider, JobSource, Scheduler};
