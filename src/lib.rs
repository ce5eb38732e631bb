//! Asynchronous fraud evaluation engine.
//!
//! Consumes `transactions.created` events, scores each transaction against a
//! fixed rule set, resolves a disposition (allow / flag / block) and performs
//! the bookkeeping a correct evaluation owes: evaluation record, audit trail,
//! notification, behavioral baseline and trusted-device registration.

pub mod config;
pub mod consumer;
pub mod disposition;
pub mod errors;
pub mod evaluator;
pub mod metrics;
pub mod models;
pub mod rules;
pub mod store;
pub mod supervisor;

pub use errors::{FraudEngineError, Result};
