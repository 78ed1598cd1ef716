//! Tests for runtime adapters

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use armada_allocation::config::EventRetentionPolicy;
use armada_allocation::core::{
    ComputeResources, ComputeResourcesFloat, Container, Node, PendingJob, Pod, PolicyEngine,
    PolicyLimits, QueueInfo, Scheduler, SchedulingStrategy, UsageStore,
};
use armada_allocation::infra::{InMemoryClusterState, InMemoryJobQueue, InMemoryLeaseSink};
use armada_allocation::runtime::{
    cluster_capacity_report, health, queue_usage_report, retention_cutoff_ms, CycleDriver,
};

fn resources(cpu: &str, memory: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("cpu".to_string(), cpu.to_string()),
        ("memory".to_string(), memory.to_string()),
    ])
}

fn cluster() -> Arc<InMemoryClusterState> {
    Arc::new(InMemoryClusterState::new(
        vec![Node::new("node-1", resources("8", "32Gi"))],
        vec![Pod::new(
            "running",
            vec![Container::new("main", resources("2", "4Gi"))],
        )],
    ))
}

fn job_queue(jobs: usize) -> Arc<InMemoryJobQueue> {
    let queue = Arc::new(InMemoryJobQueue::new(100));
    queue.upsert_queue(QueueInfo::new("research"));
    for i in 0..jobs {
        queue
            .enqueue(PendingJob {
                id: format!("job-{i}"),
                queue: "research".into(),
                priority: 0,
                created_at_ms: i as u128,
                request: ComputeResources::parse([("cpu", "1"), ("memory", "1Gi")]).unwrap(),
            })
            .unwrap();
    }
    queue
}

fn scheduler() -> Arc<Scheduler> {
    let limits = PolicyLimits {
        maximal_cluster_fraction: 0.5,
        queue_lease_batch_size: 10,
        minimum_resource: ComputeResourcesFloat::default(),
        strategy: SchedulingStrategy::Deterministic,
    };
    Arc::new(Scheduler::new(
        "cluster-a",
        PolicyEngine::new(limits, Some(1)),
        Arc::new(UsageStore::new(Duration::from_secs(600))),
    ))
}

#[tokio::test]
async fn test_run_once_delivers_and_dequeues() {
    let jobs = job_queue(6);
    let sink = Arc::new(InMemoryLeaseSink::with_job_queue(Arc::clone(&jobs)));
    let scheduler = scheduler();
    let driver = CycleDriver::new(
        Arc::clone(&scheduler),
        cluster(),
        jobs.clone(),
        sink.clone(),
        Duration::from_secs(1),
    );

    // half of 8 cpu is 4, spare is 6
    let decision = driver.run_once().await;
    assert_eq!(decision.job_count(), 4);
    assert_eq!(sink.leased_job_count(), 4);
    assert_eq!(jobs.len("research"), 2);
    assert!(scheduler.usage().get("research").is_some());
}

#[tokio::test]
async fn test_run_once_returns_usage_when_delivery_fails() {
    let jobs = job_queue(3);
    let sink = Arc::new(InMemoryLeaseSink::with_job_queue(Arc::clone(&jobs)));
    sink.set_rejecting(true);
    let scheduler = scheduler();
    let driver = CycleDriver::new(
        Arc::clone(&scheduler),
        cluster(),
        jobs.clone(),
        sink.clone(),
        Duration::from_secs(1),
    );

    let decision = driver.run_once().await;
    assert!(decision.is_empty());
    assert!(sink.delivered().is_empty());
    assert_eq!(jobs.len("research"), 3);
    let usage = scheduler.usage().get("research").unwrap().exact();
    assert!(usage.is_zero());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_driver_runs_until_shutdown() {
    let jobs = job_queue(20);
    let sink = Arc::new(InMemoryLeaseSink::with_job_queue(Arc::clone(&jobs)));
    let driver = CycleDriver::new(
        scheduler(),
        cluster(),
        jobs.clone(),
        sink.clone(),
        Duration::from_millis(10),
    );

    let (task, shutdown) = driver.spawn(&tokio::runtime::Handle::current());
    for _ in 0..200 {
        if sink.delivered().len() >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    shutdown.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap();
    assert!(sink.delivered().len() >= 2);
}

#[test]
fn test_queue_usage_report_decays() {
    let store = UsageStore::new(Duration::from_secs(60));
    let grant = ComputeResources::parse([("cpu", "4")]).unwrap();
    store.record(0, "b-queue", &grant);
    store.record(0, "a-queue", &grant);

    let report = queue_usage_report(&store, 60_000);
    assert_eq!(report.len(), 2);
    assert_eq!(report[0].queue, "a-queue");
    assert_eq!(report[0].usage, ComputeResources::parse([("cpu", "2")]).unwrap());
    assert_eq!(report[0].last_updated_ms, 0);
}

#[test]
fn test_cluster_capacity_report() {
    let report = cluster_capacity_report("cluster-a", cluster().as_ref()).unwrap();
    assert_eq!(report.cluster_id, "cluster-a");
    assert_eq!(
        report.spare,
        ComputeResources::parse([("cpu", "6"), ("memory", "28Gi")]).unwrap()
    );
    assert!(!report.is_overcommitted());
    assert!(serde_json::to_string(&report).unwrap().contains("\"spare\""));
}

#[test]
fn test_retention_cutoff() {
    let disabled = EventRetentionPolicy::default();
    assert_eq!(retention_cutoff_ms(&disabled, 100_000), None);

    let enabled = EventRetentionPolicy {
        expiry_enabled: true,
        retention_duration_secs: 60,
    };
    assert_eq!(retention_cutoff_ms(&enabled, 100_000), Some(40_000));
    assert_eq!(retention_cutoff_ms(&enabled, 10_000), Some(0));
}

#[test]
fn test_health() {
    assert!(health().ok);
}
