//! # Event Deduplication
//!
//! Providers redeliver an event when an earlier delivery was not
//! acknowledged in time. The gateway claims each event id here before
//! dispatching, so a given id is applied at most once.

use crate::error::PaymentResult;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Store of processed webhook event ids.
///
/// `mark_seen` must be an atomic check-and-set: when several deliveries of
/// the same id race, exactly one of them gets `true`.
#[async_trait]
pub trait EventDedupStore: Send + Sync {
    /// Whether the id has already been claimed
    async fn seen(&self, event_id: &str) -> PaymentResult<bool>;

    /// Claim the id. Returns `false` if it was already claimed.
    async fn mark_seen(&self, event_id: &str) -> PaymentResult<bool>;

    /// Drop a claim so a later redelivery is processed again.
    async fn release(&self, event_id: &str) -> PaymentResult<()>;
}

/// Shared dedup store
pub type BoxedDedupStore = Arc<dyn EventDedupStore>;

/// In-process dedup store.
///
/// Entries older than the retention window are pruned on write. Only suitable
/// for a single instance; several instances need a shared store.
#[derive(Debug, Clone)]
pub struct MemoryDedupStore {
    claimed: Arc<Mutex<HashMap<String, DateTime<Utc>>>>,
    retention: Duration,
}

impl MemoryDedupStore {
    pub fn new(retention: Duration) -> Self {
        Self {
            claimed: Arc::new(Mutex::new(HashMap::new())),
            retention,
        }
    }

    /// Number of ids currently held
    pub async fn len(&self) -> usize {
        self.claimed.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn claim_at(&self, event_id: &str, now: DateTime<Utc>) -> bool {
        let mut claimed = self.claimed.lock().await;
        let cutoff = now - self.retention;
        claimed.retain(|_, at| *at > cutoff);

        if claimed.contains_key(event_id) {
            return false;
        }
        claimed.insert(event_id.to_string(), now);
        true
    }
}

impl Default for MemoryDedupStore {
    fn default() -> Self {
        Self::new(Duration::hours(72))
    }
}

#[async_trait]
impl EventDedupStore for MemoryDedupStore {
    async fn seen(&self, event_id: &str) -> PaymentResult<bool> {
        let claimed = self.claimed.lock().await;
        Ok(claimed.contains_key(event_id))
    }

    async fn mark_seen(&self, event_id: &str) -> PaymentResult<bool> {
        Ok(self.claim_at(event_id, Utc::now()).await)
    }

    async fn release(&self, event_id: &str) -> PaymentResult<()> {
        let mut claimed = self.claimed.lock().await;
        claimed.remove(event_id);
        Ok(())
    }
}
