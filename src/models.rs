use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::{FraudEngineError, Result};
use crate::rules::FraudRule;

/// Transaction status enumeration
///
/// PENDING -> FAILED is owned by the external staleness sweep; this engine
/// only ever moves PENDING to SUCCESS, FLAGGED or BLOCKED.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Success,
    Flagged,
    Blocked,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Success => "SUCCESS",
            TransactionStatus::Flagged => "FLAGGED",
            TransactionStatus::Blocked => "BLOCKED",
            TransactionStatus::Failed => "FAILED",
        }
    }
}

/// Transaction row, owned by the transaction-creation service at creation.
/// The evaluator mutates status and risk_score exactly once per evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub device_id: String,
    pub location: String,
    pub payment_method: String,
    pub status: TransactionStatus,
    pub risk_score: i32,
    pub created_at: DateTime<Utc>,
}

/// Append-only record of one evaluation attempt.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FraudEvaluation {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub risk_score: i32,
    pub rules_triggered: String,
    pub created_at: DateTime<Utc>,
}

impl FraudEvaluation {
    pub fn new(transaction_id: Uuid, risk_score: i32, triggered: &[FraudRule]) -> Self {
        FraudEvaluation {
            id: Uuid::new_v4(),
            transaction_id,
            risk_score,
            rules_triggered: FraudRule::join(triggered),
            created_at: Utc::now(),
        }
    }
}

/// Per-user running spend average, learned only from successful transactions.
/// Invariant: avg_amount = total_amount / total_txns.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserBehaviorBaseline {
    pub user_id: Uuid,
    pub total_txns: i64,
    pub total_amount: Decimal,
    pub avg_amount: Decimal,
    pub last_updated: DateTime<Utc>,
}

/// The single device permanently associated with a user after their first
/// successful transaction. First device wins; never overwritten.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DeviceTrust {
    pub device_id: String,
    pub user_id: Uuid,
    pub first_seen: DateTime<Utc>,
}

impl DeviceTrust {
    /// Build a trust row for a device observed now. An empty device id is
    /// never trustworthy and is rejected at construction.
    pub fn first_seen_now(user_id: Uuid, device_id: &str) -> Result<Self> {
        if device_id.is_empty() {
            return Err(FraudEngineError::Validation(
                "cannot trust an empty device id".to_string(),
            ));
        }
        Ok(DeviceTrust {
            device_id: device_id.to_string(),
            user_id,
            first_seen: Utc::now(),
        })
    }
}

/// Append-only audit trail entry, one per evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn for_transaction(event_type: &str, transaction_id: Uuid, triggered: &[FraudRule]) -> Self {
        AuditLogEntry {
            id: Uuid::new_v4(),
            event_type: event_type.to_string(),
            entity_type: "TRANSACTION".to_string(),
            entity_id: transaction_id,
            description: format!("Triggered rules: {}", FraudRule::join(triggered)),
            created_at: Utc::now(),
        }
    }
}

/// In-app notification. Created at most once per evaluation, and only for
/// FLAGGED or BLOCKED outcomes. Delivery is out of scope.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub transaction_id: Option<Uuid>,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub channel: String,
    pub status: String,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl Notification {
    fn transaction_notice(user_id: Uuid, transaction_id: Uuid, kind: &str, title: &str, message: &str) -> Self {
        Notification {
            id: Uuid::new_v4(),
            user_id,
            transaction_id: Some(transaction_id),
            kind: kind.to_string(),
            channel: "IN_APP".to_string(),
            status: "SENT".to_string(),
            title: title.to_string(),
            message: message.to_string(),
            created_at: Utc::now(),
            read_at: None,
        }
    }

    pub fn transaction_flagged(user_id: Uuid, transaction_id: Uuid) -> Self {
        Self::transaction_notice(
            user_id,
            transaction_id,
            "TXN_FLAGGED",
            "Transaction Flagged",
            "Your transaction was flagged due to unusual activity.",
        )
    }

    pub fn transaction_blocked(user_id: Uuid, transaction_id: Uuid) -> Self {
        Self::transaction_notice(
            user_id,
            transaction_id,
            "TXN_BLOCKED",
            "Transaction Blocked",
            "Your transaction was blocked due to high risk.",
        )
    }
}

/// Record of a side-effecting evaluation step that exhausted its retry budget.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DeadLetterEntry {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub step: String,
    pub reason: String,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
}

impl DeadLetterEntry {
    pub fn new(transaction_id: Uuid, step: &str, reason: &str, attempts: u32) -> Self {
        DeadLetterEntry {
            id: Uuid::new_v4(),
            transaction_id,
            step: step.to_string(),
            reason: reason.to_string(),
            attempts: attempts as i32,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_device_id_is_rejected() {
        let user = Uuid::new_v4();
        assert!(DeviceTrust::first_seen_now(user, "").is_err());
        assert!(DeviceTrust::first_seen_now(user, "device-1").is_ok());
    }

    #[test]
    fn flagged_notification_copy_is_fixed() {
        let n = Notification::transaction_flagged(Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(n.kind, "TXN_FLAGGED");
        assert_eq!(n.channel, "IN_APP");
        assert_eq!(n.status, "SENT");
        assert_eq!(n.title, "Transaction Flagged");
        assert!(n.read_at.is_none());
    }
}
