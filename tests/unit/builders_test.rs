//! Tests for builder modules

use std::sync::Arc;

use armada_allocation::builders::{build_scheduler, build_schedulers};
use armada_allocation::config::{ArmadaConfig, EventRetentionPolicy, ExecutorConfig, SchedulingConfig};
use armada_allocation::core::{
    ComputeResources, ComputeResourcesFloat, SchedulingError, SchedulingStrategy, UsageStore,
};

fn config() -> ArmadaConfig {
    ArmadaConfig {
        priority_half_time_secs: 600,
        scheduling: SchedulingConfig {
            use_probabilistic_scheduling_for_all_resources: true,
            queue_lease_batch_size: 10,
            minimum_resource_to_schedule: ComputeResourcesFloat::default(),
            maximal_cluster_fraction_to_schedule: 0.5,
            random_seed: Some(42),
        },
        event_retention: EventRetentionPolicy::default(),
    }
}

fn executor(id: &str) -> ExecutorConfig {
    ExecutorConfig {
        cluster_id: id.into(),
        allocate_spare_cluster_capacity_interval_secs: 5,
    }
}

#[test]
fn test_build_scheduler_from_config() {
    let usage = Arc::new(UsageStore::new(config().priority_half_time()));
    let scheduler = build_scheduler(&config(), &executor("cluster-a"), Arc::clone(&usage)).unwrap();
    assert_eq!(scheduler.cluster_id(), "cluster-a");
    assert_eq!(scheduler.engine().limits().queue_lease_batch_size, 10);
    assert_eq!(
        scheduler.engine().limits().strategy,
        SchedulingStrategy::Probabilistic
    );
    assert!(Arc::ptr_eq(scheduler.usage(), &usage));
}

#[test]
fn test_negative_fraction_prevents_scheduler() {
    let mut cfg = config();
    cfg.scheduling.maximal_cluster_fraction_to_schedule = -0.5;
    let usage = Arc::new(UsageStore::new(cfg.priority_half_time()));
    let err = build_scheduler(&cfg, &executor("cluster-a"), usage).err().unwrap();
    assert!(matches!(err, SchedulingError::ConfigurationInvalid(_)));
}

#[test]
fn test_invalid_executor_prevents_scheduler() {
    let usage = Arc::new(UsageStore::new(config().priority_half_time()));
    let err = build_scheduler(&config(), &executor(""), usage).err().unwrap();
    assert!(matches!(err, SchedulingError::ConfigurationInvalid(_)));
}

#[test]
fn test_build_schedulers_shares_usage() {
    let (usage, schedulers) =
        build_schedulers(&config(), &[executor("cluster-a"), executor("cluster-b")]).unwrap();
    assert_eq!(schedulers.len(), 2);
    for scheduler in schedulers.values() {
        assert!(Arc::ptr_eq(scheduler.usage(), &usage));
    }

    let grant = ComputeResources::parse([("cpu", "2")]).unwrap();
    schedulers["cluster-a"].usage().record(0, "queue-a", &grant);
    assert_eq!(
        schedulers["cluster-b"].usage().get("queue-a").unwrap().exact(),
        grant
    );
}

#[test]
fn test_build_schedulers_rejects_empty_executors() {
    let err = build_schedulers(&config(), &[]).err().unwrap();
    assert!(matches!(err, SchedulingError::ConfigurationInvalid(_)));
}

#[test]
fn test_build_schedulers_rejects_duplicate_cluster_ids() {
    let err = build_schedulers(&config(), &[executor("cluster-a"), executor("cluster-a")])
        .err()
        .unwrap();
    assert!(err.to_string().contains("duplicate cluster_id"));
}
