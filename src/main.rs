use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use fraud_engine::config::Config;
use fraud_engine::consumer;
use fraud_engine::evaluator::Evaluator;
use fraud_engine::store::{self, Stores};
use fraud_engine::supervisor::RetryPolicy;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "fraud_engine=debug".to_string()),
        )
        .init();

    info!("Starting Fraud Engine...");

    let config = Config::from_env();
    info!("Configuration loaded successfully");

    let pool = match store::create_pool(&config.database.url, config.database.max_connections).await
    {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to create database pool: {}", e);
            return Err(e.into());
        }
    };
    info!("Database pool created");

    store::health_check(&pool).await?;
    info!("Database health check passed");

    let stores = Stores::postgres(pool);
    let policy = RetryPolicy {
        max_attempts: config.fraud.retry_max_attempts,
        base_delay: Duration::from_millis(config.fraud.retry_base_delay_ms),
    };
    let evaluator = Arc::new(Evaluator::new(
        stores,
        policy,
        chrono::Duration::seconds(config.fraud.velocity_window_secs),
    ));

    info!("🔎 Starting NATS consumer for transaction events...");
    if let Err(e) = consumer::start_transaction_consumer(
        &config.nats.url,
        config.nats.transaction_subject.clone(),
        evaluator,
    )
    .await
    {
        error!("Failed to start NATS consumer: {}", e);
        return Err(e);
    }
    info!("✅ NATS consumer started successfully");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down Fraud Engine");

    Ok(())
}
