//! Lease policy: turns capacity, claims and queue usage into a bounded,
//! fair lease decision for one scheduling cycle.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::core::priority::usage_score;
use crate::core::{ComputeResources, ComputeResourcesFloat};

/// Added to a queue's usage score before inverting it into a draw weight, so
/// idle queues get a large but finite weight.
pub const USAGE_SCORE_FLOOR: f64 = 0.01;

/// A job waiting for a lease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingJob {
    /// Job identifier.
    pub id: String,
    /// Owning queue.
    pub queue: String,
    /// Job priority within its queue; lower values are leased first.
    pub priority: u32,
    /// Submission time in milliseconds since epoch.
    pub created_at_ms: u128,
    /// Resources the job needs (sum of its container limits).
    pub request: ComputeResources,
}

/// Queue properties relevant to fair share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueInfo {
    /// Queue name.
    pub name: String,
    /// Multiplier on the queue's usage score; larger means lower share.
    pub priority_factor: f64,
}

impl QueueInfo {
    /// Queue with the default priority factor of 1.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            priority_factor: 1.0,
        }
    }

    /// Priority factor, falling back to 1 when not finite or not positive.
    pub fn effective_priority_factor(&self) -> f64 {
        if self.priority_factor.is_finite() && self.priority_factor > 0.0 {
            self.priority_factor
        } else {
            1.0
        }
    }
}

/// A queue together with its pending jobs in lease order.
#[derive(Debug, Clone)]
pub struct QueueCandidate {
    /// Queue properties.
    pub queue: QueueInfo,
    /// Jobs in the order they should be leased.
    pub jobs: Vec<PendingJob>,
}

/// How the next queue to serve is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingStrategy {
    /// Serve queues in ascending usage order, ties broken by queue name.
    Deterministic,
    /// Draw queues at random, weighted inversely to usage.
    Probabilistic,
}

impl SchedulingStrategy {
    /// Strategy selected by the `use_probabilistic_scheduling_for_all_resources` flag.
    pub const fn from_probabilistic_flag(probabilistic: bool) -> Self {
        if probabilistic {
            Self::Probabilistic
        } else {
            Self::Deterministic
        }
    }
}

/// Per-cycle limits applied by the policy.
#[derive(Debug, Clone)]
pub struct PolicyLimits {
    /// Upper bound on the fraction of total capacity leased per cycle.
    pub maximal_cluster_fraction: f64,
    /// Maximum number of jobs leased to one queue per cycle.
    pub queue_lease_batch_size: usize,
    /// Smallest request worth scheduling.
    pub minimum_resource: ComputeResourcesFloat,
    /// Queue selection strategy.
    pub strategy: SchedulingStrategy,
}

/// Resources and jobs leased to one queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueLease {
    /// Queue name.
    pub queue: String,
    /// Leased job identifiers in lease order.
    pub job_ids: Vec<String>,
    /// Sum of the leased jobs' requests.
    pub resources: ComputeResources,
}

/// Outcome of one scheduling cycle for one cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseDecision {
    /// Cluster the leases are for.
    pub cluster_id: String,
    /// Leases in the order queues were served.
    pub leases: Vec<QueueLease>,
    /// Budget the leases were drawn from.
    pub budget: ComputeResources,
    /// Resources claimed beyond capacity at the start of the cycle.
    pub overcommitted: Vec<String>,
}

impl LeaseDecision {
    /// A decision that leases nothing.
    pub fn empty(cluster_id: impl Into<String>) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            ..Self::default()
        }
    }

    /// True when no job was leased.
    pub fn is_empty(&self) -> bool {
        self.leases.iter().all(|l| l.job_ids.is_empty())
    }

    /// Number of leased jobs.
    pub fn job_count(&self) -> usize {
        self.leases.iter().map(|l| l.job_ids.len()).sum()
    }

    /// Sum of all granted resources.
    pub fn total_granted(&self) -> ComputeResources {
        self.leases.iter().map(|l| &l.resources).sum()
    }

    /// Granted resources keyed by queue.
    pub fn grants(&self) -> BTreeMap<String, ComputeResources> {
        let mut out: BTreeMap<String, ComputeResources> = BTreeMap::new();
        for lease in &self.leases {
            *out.entry(lease.queue.clone()).or_default() += &lease.resources;
        }
        out
    }
}

/// Budget available for new leases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Budget {
    /// Resources that may be leased this cycle.
    pub available: ComputeResources,
    /// Resources whose claims exceed capacity.
    pub overcommitted: Vec<String>,
}

/// `min(capacity * fraction, capacity - claimed)` per resource, never negative.
pub fn compute_budget(
    capacity: &ComputeResources,
    claimed: &ComputeResources,
    fraction: f64,
) -> Budget {
    let capacity = capacity.clamp_non_negative();
    let spare = capacity.sub(claimed);
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    Budget {
        available: capacity.scale(fraction).min(&spare).clamp_non_negative(),
        overcommitted: spare.negative_names(),
    }
}

struct Ranked {
    candidate: QueueCandidate,
    score: f64,
}

/// Selects leases for a cycle according to [`PolicyLimits`].
pub struct PolicyEngine {
    limits: PolicyLimits,
    rng: Mutex<StdRng>,
}

impl PolicyEngine {
    /// Create an engine; `seed` fixes the probabilistic draw sequence.
    pub fn new(limits: PolicyLimits, seed: Option<u64>) -> Self {
        let rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Self {
            limits,
            rng: Mutex::new(rng),
        }
    }

    /// Limits in effect.
    pub const fn limits(&self) -> &PolicyLimits {
        &self.limits
    }

    /// Decide leases for one cycle.
    ///
    /// `usage` holds each queue's decayed usage; absent queues count as zero.
    pub fn decide(
        &self,
        cluster_id: &str,
        capacity: &ComputeResources,
        claimed: &ComputeResources,
        usage: &BTreeMap<String, ComputeResources>,
        candidates: Vec<QueueCandidate>,
    ) -> LeaseDecision {
        let budget = compute_budget(capacity, claimed, self.limits.maximal_cluster_fraction);
        if !budget.overcommitted.is_empty() {
            tracing::warn!(
                "cluster {} overcommitted on {:?}, leasing nothing for those resources",
                cluster_id,
                budget.overcommitted
            );
        }

        let zero = ComputeResources::zero();
        let ranked: Vec<Ranked> = candidates
            .into_iter()
            .filter(|c| !c.jobs.is_empty())
            .map(|candidate| {
                let queue_usage = usage.get(&candidate.queue.name).unwrap_or(&zero);
                let score = usage_score(queue_usage, capacity)
                    * candidate.queue.effective_priority_factor();
                Ranked { candidate, score }
            })
            .collect();

        let mut remaining = budget.available.clone();
        let leases = match self.limits.strategy {
            SchedulingStrategy::Deterministic => self.serve_in_rank_order(ranked, &mut remaining),
            SchedulingStrategy::Probabilistic => self.serve_by_draw(ranked, &mut remaining),
        };

        LeaseDecision {
            cluster_id: cluster_id.to_string(),
            leases,
            budget: budget.available,
            overcommitted: budget.overcommitted,
        }
    }

    fn serve_in_rank_order(
        &self,
        mut ranked: Vec<Ranked>,
        remaining: &mut ComputeResources,
    ) -> Vec<QueueLease> {
        ranked.sort_by(|a, b| {
            a.score
                .total_cmp(&b.score)
                .then_with(|| a.candidate.queue.name.cmp(&b.candidate.queue.name))
        });
        let mut leases = Vec::new();
        for entry in ranked {
            if self.budget_exhausted(remaining) {
                break;
            }
            if let Some(lease) = self.admit_batch(&entry.candidate, remaining) {
                leases.push(lease);
            }
        }
        leases
    }

    fn serve_by_draw(
        &self,
        mut ranked: Vec<Ranked>,
        remaining: &mut ComputeResources,
    ) -> Vec<QueueLease> {
        // stable starting order so a seeded rng reproduces the same draws
        ranked.sort_by(|a, b| a.candidate.queue.name.cmp(&b.candidate.queue.name));
        let mut rng = self.rng.lock();
        let mut leases = Vec::new();
        while !ranked.is_empty() && !self.budget_exhausted(remaining) {
            let weights: Vec<f64> = ranked
                .iter()
                .map(|r| 1.0 / (r.score.max(0.0) + USAGE_SCORE_FLOOR))
                .collect();
            let index = draw_weighted(&mut *rng, &weights);
            let entry = ranked.remove(index);
            if let Some(lease) = self.admit_batch(&entry.candidate, remaining) {
                leases.push(lease);
            }
        }
        leases
    }

    fn budget_exhausted(&self, remaining: &ComputeResources) -> bool {
        let exhausted = remaining.is_zero()
            || remaining.as_float().is_less_than(&self.limits.minimum_resource);
        if exhausted {
            tracing::debug!("remaining budget below minimum, ending cycle");
        }
        exhausted
    }

    fn admit_batch(
        &self,
        candidate: &QueueCandidate,
        remaining: &mut ComputeResources,
    ) -> Option<QueueLease> {
        let mut lease = QueueLease {
            queue: candidate.queue.name.clone(),
            job_ids: Vec::new(),
            resources: ComputeResources::zero(),
        };
        for job in &candidate.jobs {
            if lease.job_ids.len() >= self.limits.queue_lease_batch_size {
                break;
            }
            let request = job.request.clamp_non_negative();
            if request
                .as_float()
                .is_below_everywhere(&self.limits.minimum_resource)
            {
                tracing::debug!("job {} below minimum schedulable resource, deferred", job.id);
                break;
            }
            if !remaining.dominates(&request) {
                tracing::debug!("job {} does not fit remaining budget", job.id);
                break;
            }
            *remaining -= &request;
            lease.resources += &request;
            lease.job_ids.push(job.id.clone());
        }
        if lease.job_ids.is_empty() {
            None
        } else {
            tracing::debug!(
                "leasing {} jobs to queue {}",
                lease.job_ids.len(),
                lease.queue
            );
            Some(lease)
        }
    }
}

/// Index drawn with probability proportional to `weights[i]`; the first
/// index when no weight is positive.
fn draw_weighted<R: Rng + ?Sized>(rng: &mut R, weights: &[f64]) -> usize {
    match WeightedIndex::new(weights) {
        Ok(dist) => dist.sample(rng),
        Err(e) => {
            tracing::debug!("weighted draw unavailable ({}), taking first queue", e);
            0
        }
    }
}
