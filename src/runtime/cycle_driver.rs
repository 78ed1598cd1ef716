//! Tokio timer driving scheduling cycles.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::core::{ClusterStateProvider, JobSource, LeaseDecision, Scheduler};
use crate::runtime::LeaseSink;
use crate::util::clock::now_ms;

/// Runs a cluster's scheduling cycle on a fixed interval and hands each
/// decision to a [`LeaseSink`].
pub struct CycleDriver {
    scheduler: Arc<Scheduler>,
    cluster: Arc<dyn ClusterStateProvider>,
    jobs: Arc<dyn JobSource>,
    sink: Arc<dyn LeaseSink>,
    interval: Duration,
}

impl CycleDriver {
    /// Create a driver; `interval` must be non-zero.
    pub fn new(
        scheduler: Arc<Scheduler>,
        cluster: Arc<dyn ClusterStateProvider>,
        jobs: Arc<dyn JobSource>,
        sink: Arc<dyn LeaseSink>,
        interval: Duration,
    ) -> Self {
        Self {
            scheduler,
            cluster,
            jobs,
            sink,
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    /// Run a single cycle and deliver its decision.
    ///
    /// If delivery fails the decision's usage is returned to the store and
    /// an empty decision is reported.
    pub async fn run_once(&self) -> LeaseDecision {
        let decision =
            self.scheduler
                .run_cycle(self.cluster.as_ref(), self.jobs.as_ref(), now_ms());
        if decision.is_empty() {
            return decision;
        }
        match self.sink.deliver(&decision).await {
            Ok(()) => decision,
            Err(e) => {
                tracing::warn!(
                    "cluster {} lease delivery failed, returning usage: {}",
                    self.scheduler.cluster_id(),
                    e
                );
                self.scheduler.return_decision(&decision);
                LeaseDecision::empty(self.scheduler.cluster_id())
            }
        }
    }

    /// Run cycles until `shutdown` becomes `true` or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            "cycle driver for cluster {} started (interval {:?})",
            self.scheduler.cluster_id(),
            self.interval
        );
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_once().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!(
            "cycle driver for cluster {} shutting down",
            self.scheduler.cluster_id()
        );
    }

    /// Spawn the driver on `handle`, returning its task and shutdown switch.
    pub fn spawn(self, handle: &tokio::runtime::Handle) -> (JoinHandle<()>, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        let task = handle.spawn(self.run(rx));
        (task, tx)
    }
}
