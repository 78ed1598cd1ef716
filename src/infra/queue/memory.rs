//! In-memory job queues with priority and submission-order awareness.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use parking_lot::RwLock;

use crate::core::{JobSource, PendingJob, QueueInfo, SchedulingError};

/// Wrapper to make `PendingJob` orderable by priority (lowest value first)
/// and FIFO within priority.
#[derive(Debug, Clone)]
struct OrderedJob {
    job: PendingJob,
}

impl PartialEq for OrderedJob {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OrderedJob {}

impl PartialOrd for OrderedJob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedJob {
    fn cmp(&self, other: &Self) -> Ordering {
        self.job
            .priority
            .cmp(&other.job.priority)
            .then_with(|| self.job.created_at_ms.cmp(&other.job.created_at_ms))
            .then_with(|| self.job.id.cmp(&other.job.id))
    }
}

#[derive(Debug)]
struct QueueState {
    info: QueueInfo,
    jobs: BTreeSet<OrderedJob>,
}

/// In-memory store of queues and their pending jobs.
#[derive(Debug)]
pub struct InMemoryJobQueue {
    max_depth: usize,
    queues: RwLock<BTreeMap<String, QueueState>>,
}

impl InMemoryJobQueue {
    /// Create a store allowing at most `max_depth` pending jobs per queue.
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            queues: RwLock::new(BTreeMap::new()),
        }
    }

    /// Register or update a queue.
    pub fn upsert_queue(&self, info: QueueInfo) {
        let mut queues = self.queues.write();
        match queues.get_mut(&info.name) {
            Some(state) => state.info = info,
            None => {
                queues.insert(
                    info.name.clone(),
                    QueueState {
                        info,
                        jobs: BTreeSet::new(),
                    },
                );
            }
        }
    }

    /// Add a pending job, creating its queue with default settings if needed.
    pub fn enqueue(&self, job: PendingJob) -> Result<(), SchedulingError> {
        let mut queues = self.queues.write();
        let state = queues
            .entry(job.queue.clone())
            .or_insert_with(|| QueueState {
                info: QueueInfo::new(job.queue.clone()),
                jobs: BTreeSet::new(),
            });
        if state.jobs.len() >= self.max_depth {
            return Err(SchedulingError::QueueFull(job.queue));
        }
        state.jobs.insert(OrderedJob { job });
        Ok(())
    }

    /// Remove the given jobs from a queue, returning how many were removed.
    pub fn remove_jobs(&self, queue: &str, job_ids: &[String]) -> usize {
        let mut queues = self.queues.write();
        let Some(state) = queues.get_mut(queue) else {
            return 0;
        };
        let before = state.jobs.len();
        state.jobs.retain(|j| !job_ids.contains(&j.job.id));
        before - state.jobs.len()
    }

    /// Pending jobs in `queue`.
    pub fn len(&self, queue: &str) -> usize {
        self.queues.read().get(queue).map_or(0, |s| s.jobs.len())
    }

    /// Pending jobs across all queues.
    pub fn total_len(&self) -> usize {
        self.queues.read().values().map(|s| s.jobs.len()).sum()
    }

    /// Maximum depth allowed per queue.
    pub const fn max_depth(&self) -> usize {
        self.max_depth
    }
}

impl JobSource for InMemoryJobQueue {
    fn queues(&self) -> Result<Vec<QueueInfo>, SchedulingError> {
        Ok(self.queues.read().values().map(|s| s.info.clone()).collect())
    }

    fn pending_jobs(&self, queue: &str, limit: usize) -> Result<Vec<PendingJob>, SchedulingError> {
        Ok(self
            .queues
            .read()
            .get(queue)
            .map(|s| s.jobs.iter().take(limit).map(|j| j.job.clone()).collect())
            .unwrap_or_default())
    }
}
