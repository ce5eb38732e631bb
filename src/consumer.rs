// NATS consumer for the fraud engine
// Listens to transactions.created and kicks off one evaluation per event

use std::sync::Arc;

use futures_util::StreamExt;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::evaluator::Evaluator;
use crate::metrics;

/// One message per created transaction, published by the transaction service.
/// Delivery is at-least-once and unordered across users.
#[derive(Debug, Deserialize, Serialize)]
pub struct TransactionCreatedEvent {
    pub transaction_id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub device_id: String,
}

pub async fn start_transaction_consumer(
    nats_url: &str,
    subject: String,
    evaluator: Arc<Evaluator>,
) -> anyhow::Result<()> {
    info!("Starting transaction consumer...");

    let nats_client = async_nats::connect(nats_url).await?;
    info!("✅ Connected to NATS: {}", nats_url);

    let mut subscriber = nats_client.subscribe(subject.clone()).await?;
    info!("📡 Subscribed to: {}", subject);

    tokio::spawn(async move {
        while let Some(msg) = subscriber.next().await {
            match serde_json::from_slice::<TransactionCreatedEvent>(&msg.payload) {
                Ok(event) => {
                    info!(
                        "📥 Received transaction event {} (user {}, amount {})",
                        event.transaction_id, event.user_id, event.amount
                    );

                    // One independent task per event; the consumer loop never
                    // waits for an evaluation to finish.
                    let evaluator = evaluator.clone();
                    tokio::spawn(async move {
                        evaluator.evaluate(event.transaction_id).await;
                    });
                }
                Err(e) => {
                    // Dropped, never retried: the payload will not get better.
                    metrics::MALFORMED_EVENTS_TOTAL.inc();
                    error!("Dropping malformed transaction event: {}", e);
                }
            }
        }

        warn!("⚠️ Transaction consumer stream ended");
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn event_decodes_from_queue_payload() {
        let payload = serde_json::json!({
            "transaction_id": "7b3c68d1-6c1e-4a7e-9f3a-2a2b6d2f9c01",
            "user_id": "9d4e2f60-8f0b-4c1d-b5a3-1c9e8d7f6a02",
            "amount": "2500.50",
            "device_id": "device-1",
        });
        let event: TransactionCreatedEvent =
            serde_json::from_slice(&serde_json::to_vec(&payload).unwrap()).unwrap();
        assert_eq!(event.amount, dec!(2500.50));
        assert_eq!(event.device_id, "device-1");
    }

    #[test]
    fn malformed_payload_fails_to_decode() {
        let garbage = br#"{"transaction_id": "not-a-uuid"}"#;
        assert!(serde_json::from_slice::<TransactionCreatedEvent>(garbage).is_err());
    }
}
