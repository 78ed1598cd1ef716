//! Hand-off point between the allocation core and the lease transport.

use async_trait::async_trait;

use crate::core::{LeaseDecision, SchedulingError};

/// Receives complete lease decisions and delivers them to executors.
///
/// A decision is applied entirely or not at all; on error the caller returns
/// the decision's usage to the store.
#[async_trait]
pub trait LeaseSink: Send + Sync {
    /// Persist and deliver the leases in `decision`.
    async fn deliver(&self, decision: &LeaseDecision) -> Result<(), SchedulingError>;
}
