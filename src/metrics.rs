//! Prometheus metrics for the fraud engine

use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec,
};

lazy_static! {
    /// Completed evaluations by disposition
    pub static ref EVALUATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "fraud_evaluations_total",
        "Completed fraud evaluations by disposition",
        &["disposition"]
    )
    .unwrap();

    /// Redeliveries skipped by the idempotency check
    pub static ref EVALUATIONS_SKIPPED_TOTAL: IntCounter = register_int_counter!(
        "fraud_evaluations_skipped_total",
        "Evaluations skipped because the transaction was already evaluated"
    )
    .unwrap();

    /// Undecodable trigger payloads dropped at ingestion
    pub static ref MALFORMED_EVENTS_TOTAL: IntCounter = register_int_counter!(
        "fraud_malformed_events_total",
        "Malformed transaction events dropped at ingestion"
    )
    .unwrap();

    /// Evaluation steps that exhausted their retry budget
    pub static ref DEAD_LETTERS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "fraud_dead_letters_total",
        "Evaluation steps dead-lettered after retries, by step",
        &["step"]
    )
    .unwrap();
}
