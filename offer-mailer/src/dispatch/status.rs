//! Per-address delivery status tracking.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::types::DeliveryStatus;

/// Process-lifetime store of the latest delivery status for every address.
///
/// Keyed by address only, so a later campaign overwrites the record of an
/// earlier one. Iteration order is the order addresses were first seen.
#[derive(Clone, Default)]
pub struct StatusTracker {
    inner: Arc<RwLock<StatusTable>>,
}

#[derive(Default)]
struct StatusTable {
    index: HashMap<String, usize>,
    records: Vec<DeliveryStatus>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest status for `address`, if it was ever submitted.
    pub async fn get(&self, address: &str) -> Option<DeliveryStatus> {
        let table = self.inner.read().await;
        table
            .index
            .get(address)
            .map(|&slot| table.records[slot].clone())
    }

    /// Snapshot of every record, in first-seen order.
    pub async fn get_all(&self) -> Vec<DeliveryStatus> {
        self.inner.read().await.records.clone()
    }

    /// Overwrite the full record for `address`.
    pub async fn set(&self, address: &str, status: DeliveryStatus) {
        let mut table = self.inner.write().await;
        table.put(address, status);
    }

    /// Reset every address of a batch to `Pending` under a single write lock.
    pub async fn reset_pending(&self, addresses: &[String]) {
        let mut table = self.inner.write().await;
        for address in addresses {
            table.put(address, DeliveryStatus::pending(address));
        }
    }
}

impl StatusTable {
    fn put(&mut self, address: &str, status: DeliveryStatus) {
        match self.index.get(address) {
            Some(&slot) => self.records[slot] = status,
            None => {
                self.index.insert(address.to_string(), self.records.len());
                self.records.push(status);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::types::Status;

    #[tokio::test]
    async fn test_get_unknown_address() {
        let tracker = StatusTracker::new();
        assert!(tracker.get("nobody@x.com").await.is_none());
        assert!(tracker.get_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_set_overwrites_whole_record() {
        let tracker = StatusTracker::new();
        tracker
            .set("a@x.com", DeliveryStatus::failed("a@x.com", 0, "boom".to_string()))
            .await;
        tracker.set("a@x.com", DeliveryStatus::sent("a@x.com", 1)).await;

        let status = tracker.get("a@x.com").await.unwrap();
        assert_eq!(status.status, Status::Sent);
        assert_eq!(status.attempts, 2);
        // No merge: the error from the earlier write is gone
        assert!(status.error.is_none());
        assert_eq!(tracker.get_all().await.len(), 1);
    }

    #[tokio::test]
    async fn test_get_all_keeps_first_seen_order() {
        let tracker = StatusTracker::new();
        tracker
            .reset_pending(&["b@x.com".to_string(), "a@x.com".to_string()])
            .await;
        tracker.set("c@x.com", DeliveryStatus::sent("c@x.com", 0)).await;
        tracker.set("b@x.com", DeliveryStatus::sent("b@x.com", 0)).await;

        let emails: Vec<String> = tracker
            .get_all()
            .await
            .into_iter()
            .map(|s| s.email)
            .collect();
        assert_eq!(emails, vec!["b@x.com", "a@x.com", "c@x.com"]);
    }

    #[tokio::test]
    async fn test_reset_pending_clears_previous_campaign() {
        let tracker = StatusTracker::new();
        tracker.set("a@x.com", DeliveryStatus::sent("a@x.com", 2)).await;
        tracker.reset_pending(&["a@x.com".to_string()]).await;

        let status = tracker.get("a@x.com").await.unwrap();
        assert_eq!(status.status, Status::Pending);
        assert_eq!(status.attempts, 0);
    }
}
