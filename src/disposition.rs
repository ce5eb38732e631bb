//! Disposition resolver: total risk score to terminal transaction status.

use serde::{Deserialize, Serialize};

use crate::models::TransactionStatus;

/// Score at or above which a transaction is flagged for review.
pub const FLAG_THRESHOLD: i32 = 30;
/// Score above which a transaction is blocked outright.
pub const BLOCK_THRESHOLD: i32 = 70;

/// Terminal outcome of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Disposition {
    Success,
    Flagged,
    Blocked,
}

impl Disposition {
    /// Fixed total-order mapping: < 30 allowed, 30..=70 flagged, > 70 blocked.
    pub fn from_score(score: i32) -> Self {
        if score > BLOCK_THRESHOLD {
            Disposition::Blocked
        } else if score >= FLAG_THRESHOLD {
            Disposition::Flagged
        } else {
            Disposition::Success
        }
    }

    pub fn status(&self) -> TransactionStatus {
        match self {
            Disposition::Success => TransactionStatus::Success,
            Disposition::Flagged => TransactionStatus::Flagged,
            Disposition::Blocked => TransactionStatus::Blocked,
        }
    }

    /// Audit event type for this outcome.
    pub fn event_type(&self) -> &'static str {
        match self {
            Disposition::Success => "TRANSACTION_ALLOWED",
            Disposition::Flagged => "TRANSACTION_FLAGGED",
            Disposition::Blocked => "TRANSACTION_BLOCKED",
        }
    }

    /// Whether this outcome notifies the user.
    pub fn is_adverse(&self) -> bool {
        matches!(self, Disposition::Flagged | Disposition::Blocked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_law() {
        assert_eq!(Disposition::from_score(0), Disposition::Success);
        assert_eq!(Disposition::from_score(29), Disposition::Success);
        assert_eq!(Disposition::from_score(30), Disposition::Flagged);
        assert_eq!(Disposition::from_score(70), Disposition::Flagged);
        assert_eq!(Disposition::from_score(71), Disposition::Blocked);
        assert_eq!(Disposition::from_score(120), Disposition::Blocked);
    }

    #[test]
    fn status_and_event_match() {
        assert_eq!(Disposition::Success.status(), TransactionStatus::Success);
        assert_eq!(Disposition::Success.event_type(), "TRANSACTION_ALLOWED");
        assert_eq!(Disposition::Flagged.status(), TransactionStatus::Flagged);
        assert_eq!(Disposition::Flagged.event_type(), "TRANSACTION_FLAGGED");
        assert_eq!(Disposition::Blocked.status(), TransactionStatus::Blocked);
        assert_eq!(Disposition::Blocked.event_type(), "TRANSACTION_BLOCKED");
        assert!(!Disposition::Success.is_adverse());
        assert!(Disposition::Flagged.is_adverse());
        assert!(Disposition::Blocked.is_adverse());
    }
}
