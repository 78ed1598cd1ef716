//! Builders to construct per-cluster schedulers from configuration.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{ArmadaConfig, ExecutorConfig};
use crate::core::{PolicyEngine, Scheduler, SchedulingError, UsageStore};

/// Build a scheduler for one executor cluster sharing `usage`.
///
/// Invalid configuration is fatal: no scheduler is produced.
pub fn build_scheduler(
    cfg: &ArmadaConfig,
    executor: &ExecutorConfig,
    usage: Arc<UsageStore>,
) -> Result<Scheduler, SchedulingError> {
    cfg.validate()
        .map_err(|e| SchedulingError::ConfigurationInvalid(format!("config invalid: {e}")))?;
    executor.validate().map_err(|e| {
        SchedulingError::ConfigurationInvalid(format!("executor `{}` invalid: {e}", executor.cluster_id))
    })?;

    let engine = PolicyEngine::new(cfg.scheduling.to_limits(), cfg.scheduling.random_seed);
    Ok(Scheduler::new(executor.cluster_id.clone(), engine, usage))
}

/// Build one scheduler per executor, all sharing a single usage store.
///
/// A configured seed is offset per cluster so clusters do not replay the same
/// draw sequence.
pub fn build_schedulers(
    cfg: &ArmadaConfig,
    executors: &[ExecutorConfig],
) -> Result<(Arc<UsageStore>, HashMap<String, Scheduler>), SchedulingError> {
    if executors.is_empty() {
        return Err(SchedulingError::ConfigurationInvalid(
            "at least one executor must be defined".into(),
        ));
    }

    let usage = Arc::new(UsageStore::new(cfg.priority_half_time()));
    let mut schedulers = HashMap::new();
    for (offset, executor) in (0_u64..).zip(executors) {
        if schedulers.contains_key(&executor.cluster_id) {
            return Err(SchedulingError::ConfigurationInvalid(format!(
                "duplicate cluster_id `{}`",
                executor.cluster_id
            )));
        }
        let mut cluster_cfg = cfg.clone();
        cluster_cfg.scheduling.random_seed =
            cfg.scheduling.random_seed.map(|seed| seed.wrapping_add(offset));
        let scheduler = build_scheduler(&cluster_cfg, executor, Arc::clone(&usage))?;
        tracing::info!(
            "built scheduler for cluster {} ({:?})",
            executor.cluster_id,
            cfg.scheduling.strategy()
        );
        schedulers.insert(executor.cluster_id.clone(), scheduler);
    }

    Ok((usage, schedulers))
}
