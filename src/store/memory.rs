//! In-process implementations of the store contracts.
//!
//! Backs the test suite and local runs without Postgres. Keyed maps use
//! dashmap so entry-level operations give the same atomic upsert /
//! insert-if-absent guarantees the engine expects from a real store.

use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::errors::Result;
use crate::models::{
    AuditLogEntry, DeadLetterEntry, DeviceTrust, FraudEvaluation, Notification, Transaction,
    TransactionStatus, UserBehaviorBaseline,
};
use crate::store::{
    AuditLogStore, BaselineStore, DeadLetterStore, DeviceTrustStore, EvaluationStore,
    NotificationStore, TransactionStore,
};

#[derive(Default)]
pub struct MemoryStore {
    transactions: DashMap<Uuid, Transaction>,
    baselines: DashMap<Uuid, UserBehaviorBaseline>,
    devices: DashMap<Uuid, DeviceTrust>,
    evaluations: RwLock<Vec<FraudEvaluation>>,
    audit: RwLock<Vec<AuditLogEntry>>,
    notifications: RwLock<Vec<Notification>>,
    dead_letters: RwLock<Vec<DeadLetterEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_transaction(&self, txn: Transaction) {
        self.transactions.insert(txn.id, txn);
    }

    pub fn transaction(&self, id: Uuid) -> Option<Transaction> {
        self.transactions.get(&id).map(|t| t.clone())
    }

    pub fn baseline_for(&self, user_id: Uuid) -> Option<UserBehaviorBaseline> {
        self.baselines.get(&user_id).map(|b| b.clone())
    }

    pub fn device_for(&self, user_id: Uuid) -> Option<DeviceTrust> {
        self.devices.get(&user_id).map(|d| d.clone())
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn evaluations_for(&self, transaction_id: Uuid) -> Vec<FraudEvaluation> {
        self.evaluations
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.transaction_id == transaction_id)
            .cloned()
            .collect()
    }

    pub fn audit_entries(&self) -> Vec<AuditLogEntry> {
        self.audit.read().unwrap().clone()
    }

    pub fn notifications_for(&self, user_id: Uuid) -> Vec<Notification> {
        self.notifications
            .read()
            .unwrap()
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn dead_letters(&self) -> Vec<DeadLetterEntry> {
        self.dead_letters.read().unwrap().clone()
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn find(&self, id: Uuid) -> Result<Option<Transaction>> {
        Ok(self.transactions.get(&id).map(|t| t.clone()))
    }

    async fn update_disposition(
        &self,
        id: Uuid,
        status: TransactionStatus,
        risk_score: i32,
    ) -> Result<()> {
        if let Some(mut txn) = self.transactions.get_mut(&id) {
            txn.status = status;
            txn.risk_score = risk_score;
        }
        Ok(())
    }

    async fn count_recent_for_user(&self, user_id: Uuid, since: DateTime<Utc>) -> Result<i64> {
        let count = self
            .transactions
            .iter()
            .filter(|t| t.user_id == user_id && t.created_at > since)
            .count();
        Ok(count as i64)
    }
}

#[async_trait]
impl BaselineStore for MemoryStore {
    async fn average_for_user(&self, user_id: Uuid) -> Result<Option<Decimal>> {
        Ok(self.baselines.get(&user_id).map(|b| b.avg_amount))
    }

    async fn record_success(&self, user_id: Uuid, amount: Decimal) -> Result<()> {
        // The entry holds the shard lock, so this is a single atomic upsert.
        self.baselines
            .entry(user_id)
            .and_modify(|b| {
                b.total_txns += 1;
                b.total_amount += amount;
                b.avg_amount = b.total_amount / Decimal::from(b.total_txns);
                b.last_updated = Utc::now();
            })
            .or_insert_with(|| UserBehaviorBaseline {
                user_id,
                total_txns: 1,
                total_amount: amount,
                avg_amount: amount,
                last_updated: Utc::now(),
            });
        Ok(())
    }
}

#[async_trait]
impl DeviceTrustStore for MemoryStore {
    async fn find_for_user(&self, user_id: Uuid) -> Result<Option<DeviceTrust>> {
        Ok(self.devices.get(&user_id).map(|d| d.clone()))
    }

    async fn insert_if_absent(&self, device: DeviceTrust) -> Result<()> {
        self.devices.entry(device.user_id).or_insert(device);
        Ok(())
    }
}

#[async_trait]
impl EvaluationStore for MemoryStore {
    async fn append(&self, evaluation: FraudEvaluation) -> Result<()> {
        self.evaluations.write().unwrap().push(evaluation);
        Ok(())
    }

    async fn exists_for_transaction(&self, transaction_id: Uuid) -> Result<bool> {
        Ok(self
            .evaluations
            .read()
            .unwrap()
            .iter()
            .any(|e| e.transaction_id == transaction_id))
    }
}

#[async_trait]
impl AuditLogStore for MemoryStore {
    async fn append(&self, entry: AuditLogEntry) -> Result<()> {
        self.audit.write().unwrap().push(entry);
        Ok(())
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn append(&self, notification: Notification) -> Result<()> {
        self.notifications.write().unwrap().push(notification);
        Ok(())
    }
}

#[async_trait]
impl DeadLetterStore for MemoryStore {
    async fn append(&self, entry: DeadLetterEntry) -> Result<()> {
        self.dead_letters.write().unwrap().push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn baseline_upsert_recomputes_average() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();

        store.record_success(user, dec!(100)).await.unwrap();
        store.record_success(user, dec!(200)).await.unwrap();

        let baseline = store.baseline_for(user).unwrap();
        assert_eq!(baseline.total_txns, 2);
        assert_eq!(baseline.total_amount, dec!(300));
        assert_eq!(baseline.avg_amount, dec!(150));
        assert_eq!(
            store.average_for_user(user).await.unwrap(),
            Some(dec!(150))
        );
    }

    #[tokio::test]
    async fn first_device_wins() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();

        let first = DeviceTrust::first_seen_now(user, "device-a").unwrap();
        let second = DeviceTrust::first_seen_now(user, "device-b").unwrap();

        store.insert_if_absent(first).await.unwrap();
        store.insert_if_absent(second).await.unwrap();

        assert_eq!(store.device_count(), 1);
        assert_eq!(store.device_for(user).unwrap().device_id, "device-a");
    }
}
