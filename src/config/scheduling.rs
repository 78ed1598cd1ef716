//! Control plane and executor configuration structures.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::{AppResult, ComputeResourcesFloat, PolicyLimits, SchedulingStrategy};

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "ARMADA_";

/// Lease policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingConfig {
    /// Draw queues at random weighted by inverse usage instead of ranking.
    #[serde(default)]
    pub use_probabilistic_scheduling_for_all_resources: bool,
    /// Maximum jobs leased to one queue per cycle.
    pub queue_lease_batch_size: usize,
    /// Requests below this in every listed resource are not scheduled.
    #[serde(default)]
    pub minimum_resource_to_schedule: ComputeResourcesFloat,
    /// Fraction of total cluster capacity that may be leased per cycle.
    pub maximal_cluster_fraction_to_schedule: f64,
    /// Seed for the probabilistic draw; random when absent.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl SchedulingConfig {
    /// Validate scheduling values.
    pub fn validate(&self) -> Result<(), String> {
        let fraction = self.maximal_cluster_fraction_to_schedule;
        if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
            return Err(format!(
                "maximal_cluster_fraction_to_schedule must be within [0, 1], got {fraction}"
            ));
        }
        if self.queue_lease_batch_size == 0 {
            return Err("queue_lease_batch_size must be greater than 0".into());
        }
        if self.minimum_resource_to_schedule.has_invalid() {
            return Err("minimum_resource_to_schedule values must be finite and non-negative".into());
        }
        Ok(())
    }

    /// Selected queue strategy.
    pub const fn strategy(&self) -> SchedulingStrategy {
        SchedulingStrategy::from_probabilistic_flag(
            self.use_probabilistic_scheduling_for_all_resources,
        )
    }

    /// Policy limits derived from this configuration.
    pub fn to_limits(&self) -> PolicyLimits {
        PolicyLimits {
            maximal_cluster_fraction: self.maximal_cluster_fraction_to_schedule,
            queue_lease_batch_size: self.queue_lease_batch_size,
            minimum_resource: self.minimum_resource_to_schedule.clone(),
            strategy: self.strategy(),
        }
    }
}

/// Retention of job events for the external sweeper.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventRetentionPolicy {
    /// Whether events expire at all.
    pub expiry_enabled: bool,
    /// Age after which events expire, in seconds.
    pub retention_duration_secs: u64,
}

impl EventRetentionPolicy {
    /// Validate retention values.
    pub fn validate(&self) -> Result<(), String> {
        if self.expiry_enabled && self.retention_duration_secs == 0 {
            return Err("retention_duration_secs must be greater than 0 when expiry is enabled".into());
        }
        Ok(())
    }

    /// Retention duration.
    pub const fn retention_duration(&self) -> Duration {
        Duration::from_secs(self.retention_duration_secs)
    }

    /// True when an event of the given age should be removed.
    pub fn is_expired(&self, age: Duration) -> bool {
        self.expiry_enabled && age > self.retention_duration()
    }
}

/// Root control plane configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmadaConfig {
    /// Half-life of recorded queue usage, in seconds; 0 disables memory.
    pub priority_half_time_secs: u64,
    /// Lease policy.
    pub scheduling: SchedulingConfig,
    /// Event retention.
    #[serde(default)]
    pub event_retention: EventRetentionPolicy,
}

impl ArmadaConfig {
    /// Validate all sections.
    pub fn validate(&self) -> Result<(), String> {
        self.scheduling
            .validate()
            .map_err(|e| format!("scheduling invalid: {e}"))?;
        self.event_retention
            .validate()
            .map_err(|e| format!("event_retention invalid: {e}"))?;
        Ok(())
    }

    /// Usage half-life.
    pub const fn priority_half_time(&self) -> Duration {
        Duration::from_secs(self.priority_half_time_secs)
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load a JSON file, apply `ARMADA_*` overrides from the environment and
    /// a `.env` file if present, then validate.
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let mut cfg: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!("no .env file loaded: {}", e);
        }
        cfg.apply_overrides(|key| std::env::var(key).ok())
            .map_err(anyhow::Error::msg)?;
        cfg.validate().map_err(anyhow::Error::msg)?;
        Ok(cfg)
    }

    /// Apply overrides looked up by full variable name (`ARMADA_...`).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(v) = var("PRIORITY_HALF_TIME_SECS") {
            self.priority_half_time_secs = parse_override("PRIORITY_HALF_TIME_SECS", &v)?;
        }
        if let Some(v) = var("QUEUE_LEASE_BATCH_SIZE") {
            self.scheduling.queue_lease_batch_size = parse_override("QUEUE_LEASE_BATCH_SIZE", &v)?;
        }
        if let Some(v) = var("MAXIMAL_CLUSTER_FRACTION_TO_SCHEDULE") {
            self.scheduling.maximal_cluster_fraction_to_schedule =
                parse_override("MAXIMAL_CLUSTER_FRACTION_TO_SCHEDULE", &v)?;
        }
        if let Some(v) = var("USE_PROBABILISTIC_SCHEDULING_FOR_ALL_RESOURCES") {
            self.scheduling.use_probabilistic_scheduling_for_all_resources =
                parse_override("USE_PROBABILISTIC_SCHEDULING_FOR_ALL_RESOURCES", &v)?;
        }
        Ok(())
    }
}

fn parse_override<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| format!("{ENV_PREFIX}{name}={raw} invalid: {e}"))
}

/// Per-cluster executor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Cluster identifier reported with every lease request.
    pub cluster_id: String,
    /// Interval between scheduling cycles for this cluster, in seconds.
    pub allocate_spare_cluster_capacity_interval_secs: u64,
}

impl ExecutorConfig {
    /// Validate executor values.
    pub fn validate(&self) -> Result<(), String> {
        if self.cluster_id.trim().is_empty() {
            return Err("cluster_id must not be empty".into());
        }
        if self.allocate_spare_cluster_capacity_interval_secs == 0 {
            return Err("allocate_spare_cluster_capacity_interval_secs must be greater than 0".into());
        }
        Ok(())
    }

    /// Cycle interval.
    pub const fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.allocate_spare_cluster_capacity_interval_secs)
    }
}
