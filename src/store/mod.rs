//! Store contracts for the evaluation pipeline.
//!
//! Each trait is the narrow CRUD surface one evaluation needs; the engine
//! never assumes more of a backend than these signatures. Per-user races on
//! baseline and device-trust rows are resolved by the stores' atomic
//! upsert / insert-if-absent primitives, not by engine-side locking.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::errors::Result;
use crate::models::{
    AuditLogEntry, DeadLetterEntry, DeviceTrust, FraudEvaluation, Notification, Transaction,
    TransactionStatus,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::{create_pool, health_check, PostgresStore};

#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<Transaction>>;

    /// Single keyed update of status and risk_score.
    async fn update_disposition(
        &self,
        id: Uuid,
        status: TransactionStatus,
        risk_score: i32,
    ) -> Result<()>;

    /// Count of a user's transactions created after `since`.
    async fn count_recent_for_user(&self, user_id: Uuid, since: DateTime<Utc>) -> Result<i64>;
}

#[async_trait]
pub trait BaselineStore: Send + Sync {
    async fn average_for_user(&self, user_id: Uuid) -> Result<Option<Decimal>>;

    /// Atomic insert-or-update keyed by user_id: bump the transaction count,
    /// add the amount and recompute the running average in one step.
    async fn record_success(&self, user_id: Uuid, amount: Decimal) -> Result<()>;
}

#[async_trait]
pub trait DeviceTrustStore: Send + Sync {
    async fn find_for_user(&self, user_id: Uuid) -> Result<Option<DeviceTrust>>;

    /// Insert unless the user already has a trusted device. First device
    /// wins; a concurrent duplicate insert must leave exactly one row.
    async fn insert_if_absent(&self, device: DeviceTrust) -> Result<()>;
}

#[async_trait]
pub trait EvaluationStore: Send + Sync {
    async fn append(&self, evaluation: FraudEvaluation) -> Result<()>;

    /// Idempotency probe for redelivered events.
    async fn exists_for_transaction(&self, transaction_id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait AuditLogStore: Send + Sync {
    async fn append(&self, entry: AuditLogEntry) -> Result<()>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn append(&self, notification: Notification) -> Result<()>;
}

#[async_trait]
pub trait DeadLetterStore: Send + Sync {
    async fn append(&self, entry: DeadLetterEntry) -> Result<()>;
}

/// The full set of stores one evaluator works against. Fields are separate so
/// tests can swap a single concern (e.g. a failing audit store).
#[derive(Clone)]
pub struct Stores {
    pub transactions: Arc<dyn TransactionStore>,
    pub baselines: Arc<dyn BaselineStore>,
    pub devices: Arc<dyn DeviceTrustStore>,
    pub evaluations: Arc<dyn EvaluationStore>,
    pub audit: Arc<dyn AuditLogStore>,
    pub notifications: Arc<dyn NotificationStore>,
    pub dead_letters: Arc<dyn DeadLetterStore>,
}

impl Stores {
    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self::from_shared(Arc::new(PostgresStore::new(pool)))
    }

    pub fn in_memory(store: Arc<MemoryStore>) -> Self {
        Self::from_shared(store)
    }

    fn from_shared<S>(store: Arc<S>) -> Self
    where
        S: TransactionStore
            + BaselineStore
            + DeviceTrustStore
            + EvaluationStore
            + AuditLogStore
            + NotificationStore
            + DeadLetterStore
            + 'static,
    {
        Stores {
            transactions: store.clone(),
            baselines: store.clone(),
            devices: store.clone(),
            evaluations: store.clone(),
            audit: store.clone(),
            notifications: store.clone(),
            dead_letters: store,
        }
    }
}
