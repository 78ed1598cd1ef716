//! Tests for configuration validation

use std::collections::HashMap;
use std::time::Duration;

use armada_allocation::config::{
    ArmadaConfig, EventRetentionPolicy, ExecutorConfig, SchedulingConfig,
};
use armada_allocation::core::{ComputeResourcesFloat, SchedulingStrategy};

fn scheduling() -> SchedulingConfig {
    SchedulingConfig {
        use_probabilistic_scheduling_for_all_resources: false,
        queue_lease_batch_size: 200,
        minimum_resource_to_schedule: ComputeResourcesFloat::default().with("cpu", 0.25),
        maximal_cluster_fraction_to_schedule: 0.5,
        random_seed: None,
    }
}

fn armada(scheduling: SchedulingConfig) -> ArmadaConfig {
    ArmadaConfig {
        priority_half_time_secs: 1200,
        scheduling,
        event_retention: EventRetentionPolicy::default(),
    }
}

#[test]
fn test_scheduling_config_validation() {
    assert!(scheduling().validate().is_ok());
    assert!(armada(scheduling()).validate().is_ok());
}

#[test]
fn test_negative_fraction_is_invalid() {
    let mut cfg = scheduling();
    cfg.maximal_cluster_fraction_to_schedule = -0.1;
    assert!(cfg.validate().is_err());
    cfg.maximal_cluster_fraction_to_schedule = 1.5;
    assert!(cfg.validate().is_err());
    cfg.maximal_cluster_fraction_to_schedule = f64::NAN;
    assert!(cfg.validate().is_err());
}

#[test]
fn test_zero_batch_size_is_invalid() {
    let mut cfg = scheduling();
    cfg.queue_lease_batch_size = 0;
    assert!(cfg.validate().is_err());
}

#[test]
fn test_negative_minimum_is_invalid() {
    let mut cfg = scheduling();
    cfg.minimum_resource_to_schedule = ComputeResourcesFloat::default().with("memory", -1.0);
    let err = armada(cfg).validate().unwrap_err();
    assert!(err.starts_with("scheduling invalid"));
}

#[test]
fn test_strategy_follows_flag() {
    let mut cfg = scheduling();
    assert_eq!(cfg.strategy(), SchedulingStrategy::Deterministic);
    cfg.use_probabilistic_scheduling_for_all_resources = true;
    assert_eq!(cfg.to_limits().strategy, SchedulingStrategy::Probabilistic);
}

#[test]
fn test_event_retention() {
    let disabled = EventRetentionPolicy::default();
    assert!(disabled.validate().is_ok());
    assert!(!disabled.is_expired(Duration::from_secs(1_000_000)));

    let enabled = EventRetentionPolicy {
        expiry_enabled: true,
        retention_duration_secs: 60,
    };
    assert!(enabled.is_expired(Duration::from_secs(61)));
    assert!(!enabled.is_expired(Duration::from_secs(60)));

    let broken = EventRetentionPolicy {
        expiry_enabled: true,
        retention_duration_secs: 0,
    };
    assert!(broken.validate().is_err());
}

#[test]
fn test_executor_config_validation() {
    let valid = ExecutorConfig {
        cluster_id: "cluster-a".into(),
        allocate_spare_cluster_capacity_interval_secs: 5,
    };
    assert!(valid.validate().is_ok());
    assert_eq!(valid.cycle_interval(), Duration::from_secs(5));

    let mut invalid = valid.clone();
    invalid.cluster_id = "  ".into();
    assert!(invalid.validate().is_err());

    let mut invalid = valid;
    invalid.allocate_spare_cluster_capacity_interval_secs = 0;
    assert!(invalid.validate().is_err());
}

#[test]
fn test_armada_config_from_json() {
    let json = r#"{
        "priority_half_time_secs": 1200,
        "scheduling": {
            "use_probabilistic_scheduling_for_all_resources": true,
            "queue_lease_batch_size": 200,
            "minimum_resource_to_schedule": { "cpu": 0.25, "memory": 100000000 },
            "maximal_cluster_fraction_to_schedule": 0.25
        },
        "event_retention": {
            "expiry_enabled": true,
            "retention_duration_secs": 604800
        }
    }"#;

    let config = ArmadaConfig::from_json_str(json).unwrap();
    assert_eq!(config.priority_half_time(), Duration::from_secs(1200));
    assert_eq!(config.scheduling.queue_lease_batch_size, 200);
    assert!((config.scheduling.minimum_resource_to_schedule.get("cpu") - 0.25).abs() < 1e-12);
    assert_eq!(config.scheduling.strategy(), SchedulingStrategy::Probabilistic);
    assert!(config.event_retention.expiry_enabled);
}

#[test]
fn test_armada_config_from_json_rejects_invalid() {
    let json = r#"{
        "priority_half_time_secs": 0,
        "scheduling": {
            "queue_lease_batch_size": 10,
            "maximal_cluster_fraction_to_schedule": -1.0
        }
    }"#;
    assert!(ArmadaConfig::from_json_str(json).is_err());
    assert!(ArmadaConfig::from_json_str("{").unwrap_err().starts_with("parse error"));
}

#[test]
fn test_env_overrides() {
    let mut env = HashMap::new();
    env.insert("ARMADA_PRIORITY_HALF_TIME_SECS", "60");
    env.insert("ARMADA_QUEUE_LEASE_BATCH_SIZE", "7");
    env.insert("ARMADA_MAXIMAL_CLUSTER_FRACTION_TO_SCHEDULE", "0.1");
    env.insert("ARMADA_USE_PROBABILISTIC_SCHEDULING_FOR_ALL_RESOURCES", "true");

    let mut cfg = armada(scheduling());
    cfg.apply_overrides(|key| env.get(key).map(|v| (*v).to_string()))
        .unwrap();
    assert_eq!(cfg.priority_half_time_secs, 60);
    assert_eq!(cfg.scheduling.queue_lease_batch_size, 7);
    assert!((cfg.scheduling.maximal_cluster_fraction_to_schedule - 0.1).abs() < 1e-12);
    assert!(cfg.scheduling.use_probabilistic_scheduling_for_all_resources);
}

#[test]
fn test_env_override_rejects_garbage() {
    let mut cfg = armada(scheduling());
    let err = cfg
        .apply_overrides(|key| (key == "ARMADA_QUEUE_LEASE_BATCH_SIZE").then(|| "many".to_string()))
        .unwrap_err();
    assert!(err.contains("ARMADA_QUEUE_LEASE_BATCH_SIZE"));
}

#[test]
fn test_load_from_file() {
    let dir = std::env::temp_dir().join(format!("armada-config-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("armada.json");
    std::fs::write(&path, serde_json::to_string(&armada(scheduling())).unwrap()).unwrap();

    let loaded = ArmadaConfig::load(&path).unwrap();
    assert!(loaded.scheduling.queue_lease_batch_size > 0);

    assert!(ArmadaConfig::load(dir.join("missing.json")).is_err());
    std::fs::remove_dir_all(&dir).ok();
}
