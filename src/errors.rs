use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, FraudEngineError>;

#[derive(Error, Debug)]
pub enum FraudEngineError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("NATS error: {0}")]
    Nats(String),

    #[error("Malformed event: {0}")]
    MalformedEvent(#[from] serde_json::Error),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(Uuid),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl FraudEngineError {
    /// Whether a supervised step hitting this error is worth retrying.
    /// Store I/O can be transient; everything else fails the step outright.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FraudEngineError::Database(_)
                | FraudEngineError::Nats(_)
                | FraudEngineError::Store(_)
        )
    }
}
