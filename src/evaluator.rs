//! Evaluation orchestrator.
//!
//! Runs one fraud evaluation end to end: contextual reads, pure scoring,
//! disposition, then the bookkeeping writes. The write steps are deliberately
//! not transactional across stores; each runs under the retry supervisor and
//! a failed step never aborts the remaining ones or rolls back earlier ones.

use std::future::Future;

use chrono::Duration;
use rust_decimal::Decimal;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::disposition::Disposition;
use crate::errors::Result;
use crate::metrics;
use crate::models::{AuditLogEntry, DeadLetterEntry, DeviceTrust, FraudEvaluation, Notification};
use crate::rules::{self, RuleInput};
use crate::store::Stores;
use crate::supervisor::{RetryPolicy, StepOutcome};

pub struct Evaluator {
    stores: Stores,
    policy: RetryPolicy,
    velocity_window: Duration,
}

impl Evaluator {
    pub fn new(stores: Stores, policy: RetryPolicy, velocity_window: Duration) -> Self {
        Evaluator {
            stores,
            policy,
            velocity_window,
        }
    }

    /// Evaluate one transaction. Fire-and-forget: nothing is escalated to the
    /// caller, the only observable effects are the store writes.
    pub async fn evaluate(&self, transaction_id: Uuid) {
        info!("Fraud evaluation started for transaction {}", transaction_id);

        // Redeliveries are expected from an at-least-once queue; an existing
        // evaluation record means this transaction was already handled.
        match self
            .stores
            .evaluations
            .exists_for_transaction(transaction_id)
            .await
        {
            Ok(true) => {
                info!(
                    "Transaction {} already evaluated, skipping redelivery",
                    transaction_id
                );
                metrics::EVALUATIONS_SKIPPED_TOTAL.inc();
                return;
            }
            Ok(false) => {}
            Err(e) => {
                // Best effort: a duplicate record beats a missed evaluation.
                warn!(
                    "Idempotency check failed for {}, proceeding: {}",
                    transaction_id, e
                );
            }
        }

        let txn = match self.stores.transactions.find(transaction_id).await {
            Ok(Some(txn)) => txn,
            Ok(None) => {
                warn!(
                    "Transaction {} not found, leaving it to the staleness sweep",
                    transaction_id
                );
                return;
            }
            Err(e) => {
                error!("Failed to load transaction {}: {}", transaction_id, e);
                return;
            }
        };

        // Contextual reads are best effort: a missing or unreadable value
        // degrades to "no history" rather than aborting the evaluation.
        let baseline_avg = match self.stores.baselines.average_for_user(txn.user_id).await {
            Ok(Some(avg)) => avg,
            Ok(None) => Decimal::ZERO,
            Err(e) => {
                warn!("Baseline read failed for user {}: {}", txn.user_id, e);
                Decimal::ZERO
            }
        };

        let since = chrono::Utc::now() - self.velocity_window;
        let recent_count = match self
            .stores
            .transactions
            .count_recent_for_user(txn.user_id, since)
            .await
        {
            Ok(count) => count,
            Err(e) => {
                warn!("Velocity count failed for user {}: {}", txn.user_id, e);
                0
            }
        };

        let trusted_device = match self.stores.devices.find_for_user(txn.user_id).await {
            Ok(device) => device,
            Err(e) => {
                warn!("Device lookup failed for user {}: {}", txn.user_id, e);
                None
            }
        };

        let verdict = rules::evaluate(&RuleInput {
            amount: txn.amount,
            device_id: &txn.device_id,
            baseline_avg,
            recent_count,
            trusted_device: trusted_device.as_ref().map(|d| d.device_id.as_str()),
        });

        let evaluation = FraudEvaluation::new(transaction_id, verdict.risk_score, &verdict.triggered);
        self.supervised(transaction_id, "append_evaluation", || {
            self.stores.evaluations.append(evaluation.clone())
        })
        .await;

        let disposition = Disposition::from_score(verdict.risk_score);
        info!(
            "Transaction {} scored {} -> {} [{}]",
            transaction_id,
            verdict.risk_score,
            disposition.status().as_str(),
            evaluation.rules_triggered
        );

        match disposition {
            Disposition::Flagged => {
                let notification = Notification::transaction_flagged(txn.user_id, txn.id);
                self.supervised(transaction_id, "create_notification", || {
                    self.stores.notifications.append(notification.clone())
                })
                .await;
            }
            Disposition::Blocked => {
                let notification = Notification::transaction_blocked(txn.user_id, txn.id);
                self.supervised(transaction_id, "create_notification", || {
                    self.stores.notifications.append(notification.clone())
                })
                .await;
            }
            Disposition::Success => {}
        }

        self.supervised(transaction_id, "update_transaction", || {
            self.stores
                .transactions
                .update_disposition(txn.id, disposition.status(), verdict.risk_score)
        })
        .await;

        let audit = AuditLogEntry::for_transaction(disposition.event_type(), txn.id, &verdict.triggered);
        self.supervised(transaction_id, "append_audit_log", || {
            self.stores.audit.append(audit.clone())
        })
        .await;

        // Learn behavior only from transactions the engine let through.
        if disposition == Disposition::Success {
            self.supervised(transaction_id, "update_baseline", || {
                self.stores.baselines.record_success(txn.user_id, txn.amount)
            })
            .await;

            // Register the primary device once; it is never rotated.
            if trusted_device.is_none() {
                match DeviceTrust::first_seen_now(txn.user_id, &txn.device_id) {
                    Ok(device) => {
                        self.supervised(transaction_id, "register_device", || {
                            self.stores.devices.insert_if_absent(device.clone())
                        })
                        .await;
                    }
                    Err(e) => {
                        warn!(
                            "Skipping device registration for transaction {}: {}",
                            transaction_id, e
                        );
                    }
                }
            }
        }

        metrics::EVALUATIONS_TOTAL
            .with_label_values(&[disposition.status().as_str()])
            .inc();
    }

    /// Run one write step under the retry policy; exhausted steps become
    /// dead-letter entries and the evaluation carries on.
    async fn supervised<F, Fut>(&self, transaction_id: Uuid, step: &'static str, op: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        if let StepOutcome::DeadLettered { reason, attempts } = self.policy.run(step, op).await {
            metrics::DEAD_LETTERS_TOTAL.with_label_values(&[step]).inc();
            let entry = DeadLetterEntry::new(transaction_id, step, &reason, attempts);
            if let Err(e) = self.stores.dead_letters.append(entry).await {
                error!(
                    "Failed to record dead letter for step {} of {}: {}",
                    step, transaction_id, e
                );
            }
        }
    }
}
