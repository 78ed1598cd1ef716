//! Per-queue decaying usage tracking.
//!
//! Each queue's recorded usage fades with an exponential half-life:
//! `usage(t) = usage(t-1) * 2^(-dt / half_time) + granted`. A zero half-time
//! means immediate full decay, so only the most recent grant is remembered.
//!
//! Usage is accumulated at full floating point precision and only rounded to
//! milli-units when read, so frequent cycles do not compound rounding loss.
//!
//! [`UsageStore`] is the only state that survives between scheduling cycles.
//! Readers always see a complete map: cycle results are computed against the
//! current map and swapped in under a single write lock.

use std::collections::BTreeMap;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::core::{ComputeResources, ComputeResourcesFloat};

/// Recorded usage for one queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueUsage {
    /// Usage in whole units as of `last_updated_ms`, unrounded.
    pub usage: ComputeResourcesFloat,
    /// Time of the last decay/update in milliseconds since epoch.
    pub last_updated_ms: u128,
}

impl QueueUsage {
    fn empty(now_ms: u128) -> Self {
        Self {
            usage: ComputeResourcesFloat::default(),
            last_updated_ms: now_ms,
        }
    }

    /// Recorded usage rounded to the nearest milli-unit.
    pub fn exact(&self) -> ComputeResources {
        self.usage.to_exact_rounded()
    }

    /// Usage decayed forward to `now_ms`, rounded to the nearest milli-unit.
    pub fn decayed(&self, now_ms: u128, half_time: Duration) -> ComputeResources {
        self.decayed_precise(now_ms, half_time).to_exact_rounded()
    }

    fn decayed_precise(&self, now_ms: u128, half_time: Duration) -> ComputeResourcesFloat {
        let elapsed = elapsed_between(self.last_updated_ms, now_ms);
        self.usage.scale(decay_factor(elapsed, half_time))
    }
}

/// Multiplier applied to usage after `elapsed` has passed.
///
/// Returns `0.5^(elapsed / half_time)`, and `0.0` when `half_time` is zero.
pub fn decay_factor(elapsed: Duration, half_time: Duration) -> f64 {
    if half_time.is_zero() {
        return 0.0;
    }
    0.5_f64.powf(elapsed.as_secs_f64() / half_time.as_secs_f64())
}

#[allow(clippy::cast_possible_truncation)]
fn elapsed_between(from_ms: u128, to_ms: u128) -> Duration {
    // clock skew counts as no time passing
    let millis = to_ms.saturating_sub(from_ms).min(u128::from(u64::MAX));
    Duration::from_millis(millis as u64)
}

/// Scalar usage score of `usage` relative to cluster `capacity`.
///
/// The sum over resources of `usage[r] / capacity[r]`; resources the cluster
/// does not offer are ignored.
pub fn usage_score(usage: &ComputeResources, capacity: &ComputeResources) -> f64 {
    usage
        .iter()
        .filter(|(name, _)| capacity.get(name).millis() > 0)
        .map(|(name, quantity)| quantity.as_f64() / capacity.get(name).as_f64())
        .sum()
}

/// Store of per-queue decayed usage.
#[derive(Debug)]
pub struct UsageStore {
    half_time: Duration,
    queues: RwLock<BTreeMap<String, QueueUsage>>,
}

impl UsageStore {
    /// Create an empty store with the given half-time.
    pub fn new(half_time: Duration) -> Self {
        Self {
            half_time,
            queues: RwLock::new(BTreeMap::new()),
        }
    }

    /// Configured half-time.
    pub const fn half_time(&self) -> Duration {
        self.half_time
    }

    /// Number of queues observed so far.
    pub fn len(&self) -> usize {
        self.queues.read().len()
    }

    /// True when no queue has been observed.
    pub fn is_empty(&self) -> bool {
        self.queues.read().is_empty()
    }

    /// Raw recorded state for one queue, if observed.
    pub fn get(&self, queue: &str) -> Option<QueueUsage> {
        self.queues.read().get(queue).cloned()
    }

    /// Copy of the raw recorded state of every observed queue.
    pub fn snapshot(&self) -> BTreeMap<String, QueueUsage> {
        self.queues.read().clone()
    }

    /// Usage of every observed queue decayed to `now_ms`, from one consistent
    /// view of the store.
    pub fn usage_at(&self, now_ms: u128) -> BTreeMap<String, ComputeResources> {
        self.queues
            .read()
            .iter()
            .map(|(name, entry)| (name.clone(), entry.decayed(now_ms, self.half_time)))
            .collect()
    }

    /// Decay every queue to `now_ms` and add this cycle's grants.
    ///
    /// Queues appearing only in `grants` are created. The new map replaces
    /// the old one in a single step.
    pub fn apply_cycle(&self, now_ms: u128, grants: &BTreeMap<String, ComputeResources>) {
        let mut queues = self.queues.write();
        let mut next: BTreeMap<String, QueueUsage> = queues
            .iter()
            .map(|(name, entry)| {
                (
                    name.clone(),
                    QueueUsage {
                        usage: entry.decayed_precise(now_ms, self.half_time),
                        last_updated_ms: now_ms.max(entry.last_updated_ms),
                    },
                )
            })
            .collect();

        for (name, granted) in grants {
            let entry = next
                .entry(name.clone())
                .or_insert_with(|| QueueUsage::empty(now_ms));
            entry.usage = entry.usage.add_exact(granted);
        }

        tracing::debug!(
            "usage store updated: {} queues, {} granted this cycle",
            next.len(),
            grants.len()
        );
        *queues = next;
    }

    /// Record a single grant for `queue` at `now_ms`, decaying only that queue.
    pub fn record(&self, now_ms: u128, queue: &str, granted: &ComputeResources) {
        let mut queues = self.queues.write();
        let entry = queues
            .entry(queue.to_string())
            .or_insert_with(|| QueueUsage::empty(now_ms));
        entry.usage = entry.decayed_precise(now_ms, self.half_time).add_exact(granted);
        entry.last_updated_ms = now_ms.max(entry.last_updated_ms);
    }

    /// Remove previously granted resources, e.g. when a lease is returned.
    ///
    /// Applies no decay, so a grant immediately followed by a revoke restores
    /// the prior value. Per-resource results are floored at zero.
    pub fn revoke(&self, queue: &str, returned: &ComputeResources) {
        let mut queues = self.queues.write();
        if let Some(entry) = queues.get_mut(queue) {
            entry.usage = entry.usage.sub_exact_clamped(returned);
        } else {
            tracing::debug!("revoke for unobserved queue {} ignored", queue);
        }
    }
}
