//! In-memory lease sink for development and testing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::{LeaseDecision, SchedulingError};
use crate::infra::InMemoryJobQueue;
use crate::runtime::LeaseSink;

/// Records delivered decisions and optionally removes leased jobs from an
/// [`InMemoryJobQueue`].
#[derive(Debug, Default)]
pub struct InMemoryLeaseSink {
    delivered: Mutex<Vec<LeaseDecision>>,
    jobs: Option<Arc<InMemoryJobQueue>>,
    rejecting: AtomicBool,
}

impl InMemoryLeaseSink {
    /// Create a sink that only records decisions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sink that also dequeues leased jobs from `jobs`.
    pub fn with_job_queue(jobs: Arc<InMemoryJobQueue>) -> Self {
        Self {
            jobs: Some(jobs),
            ..Self::default()
        }
    }

    /// Make subsequent deliveries fail, simulating an unavailable transport.
    pub fn set_rejecting(&self, rejecting: bool) {
        self.rejecting.store(rejecting, Ordering::Release);
    }

    /// Decisions delivered so far.
    pub fn delivered(&self) -> Vec<LeaseDecision> {
        self.delivered.lock().clone()
    }

    /// Total jobs leased across delivered decisions.
    pub fn leased_job_count(&self) -> usize {
        self.delivered.lock().iter().map(LeaseDecision::job_count).sum()
    }
}

#[async_trait]
impl LeaseSink for InMemoryLeaseSink {
    async fn deliver(&self, decision: &LeaseDecision) -> Result<(), SchedulingError> {
        if self.rejecting.load(Ordering::Acquire) {
            return Err(SchedulingError::Backend("lease transport unavailable".into()));
        }
        if let Some(jobs) = &self.jobs {
            for lease in &decision.leases {
                jobs.remove_jobs(&lease.queue, &lease.job_ids);
            }
        }
        self.delivered.lock().push(decision.clone());
        Ok(())
    }
}
