//! Postgres implementations of the store contracts, over sqlx.
//!
//! Shared-row races (baseline, device trust) lean on `ON CONFLICT` so that
//! concurrent evaluations for the same user stay correct without engine-side
//! locking.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use crate::errors::Result;
use crate::models::{
    AuditLogEntry, DeadLetterEntry, DeviceTrust, FraudEvaluation, Notification, Transaction,
    TransactionStatus,
};
use crate::store::{
    AuditLogStore, BaselineStore, DeadLetterStore, DeviceTrustStore, EvaluationStore,
    NotificationStore, TransactionStore,
};

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await?;

    Ok(pool)
}

pub async fn health_check(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        PostgresStore { pool }
    }
}

#[async_trait]
impl TransactionStore for PostgresStore {
    async fn find(&self, id: Uuid) -> Result<Option<Transaction>> {
        let txn = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT * FROM transactions WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(txn)
    }

    async fn update_disposition(
        &self,
        id: Uuid,
        status: TransactionStatus,
        risk_score: i32,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE transactions SET status = $2, risk_score = $3 WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(risk_score)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn count_recent_for_user(&self, user_id: Uuid, since: DateTime<Utc>) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM transactions
            WHERE user_id = $1 AND created_at > $2
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

#[async_trait]
impl BaselineStore for PostgresStore {
    async fn average_for_user(&self, user_id: Uuid) -> Result<Option<Decimal>> {
        let avg: Option<Decimal> = sqlx::query_scalar(
            r#"
            SELECT avg_amount FROM user_behavior_baselines WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(avg)
    }

    async fn record_success(&self, user_id: Uuid, amount: Decimal) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_behavior_baselines
                (user_id, total_txns, total_amount, avg_amount, last_updated)
            VALUES ($1, 1, $2, $2, NOW())
            ON CONFLICT (user_id)
            DO UPDATE SET
                total_txns = user_behavior_baselines.total_txns + 1,
                total_amount = user_behavior_baselines.total_amount + EXCLUDED.total_amount,
                avg_amount =
                    (user_behavior_baselines.total_amount + EXCLUDED.total_amount)
                    / (user_behavior_baselines.total_txns + 1),
                last_updated = NOW()
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl DeviceTrustStore for PostgresStore {
    async fn find_for_user(&self, user_id: Uuid) -> Result<Option<DeviceTrust>> {
        let device = sqlx::query_as::<_, DeviceTrust>(
            r#"
            SELECT * FROM trusted_devices WHERE user_id = $1 LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(device)
    }

    async fn insert_if_absent(&self, device: DeviceTrust) -> Result<()> {
        // Unique index on user_id enforces the single-trusted-device model.
        sqlx::query(
            r#"
            INSERT INTO trusted_devices (device_id, user_id, first_seen)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(&device.device_id)
        .bind(device.user_id)
        .bind(device.first_seen)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl EvaluationStore for PostgresStore {
    async fn append(&self, evaluation: FraudEvaluation) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO fraud_evaluations
                (id, transaction_id, risk_score, rules_triggered, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(evaluation.id)
        .bind(evaluation.transaction_id)
        .bind(evaluation.risk_score)
        .bind(&evaluation.rules_triggered)
        .bind(evaluation.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn exists_for_transaction(&self, transaction_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(SELECT 1 FROM fraud_evaluations WHERE transaction_id = $1)
            "#,
        )
        .bind(transaction_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}

#[async_trait]
impl AuditLogStore for PostgresStore {
    async fn append(&self, entry: AuditLogEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs
                (id, event_type, entity_type, entity_id, description, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.id)
        .bind(&entry.event_type)
        .bind(&entry.entity_type)
        .bind(entry.entity_id)
        .bind(&entry.description)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl NotificationStore for PostgresStore {
    async fn append(&self, notification: Notification) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications
                (id, user_id, transaction_id, type, channel, status, title, message, created_at, read_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(notification.id)
        .bind(notification.user_id)
        .bind(notification.transaction_id)
        .bind(&notification.kind)
        .bind(&notification.channel)
        .bind(&notification.status)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.created_at)
        .bind(notification.read_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl DeadLetterStore for PostgresStore {
    async fn append(&self, entry: DeadLetterEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO evaluation_dead_letters
                (id, transaction_id, step, reason, attempts, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.id)
        .bind(entry.transaction_id)
        .bind(&entry.step)
        .bind(&entry.reason)
        .bind(entry.attempts)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
