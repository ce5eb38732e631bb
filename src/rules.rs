//! Fraud rule engine.
//!
//! Pure scoring over a transaction snapshot plus two contextual reads
//! (behavioral baseline, recent-transaction count) supplied by the evaluator.
//! The score is the sum of independent rule contributions; each rule fires at
//! most once and the triggered list follows evaluation order: amount rules,
//! velocity rules, device rules.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Amount above which a user's very first transaction is considered risky.
pub const FIRST_TXN_HIGH_AMOUNT: Decimal = dec!(100_000);

/// Velocity amount buckets. Each bucket pairs with its own count threshold:
/// the larger the amounts, the fewer repeats it takes to look rapid.
pub const RAPID_MEDIUM_MIN: Decimal = dec!(1_000);
pub const RAPID_LARGE_MIN: Decimal = dec!(10_000);
pub const RAPID_VERY_LARGE_MIN: Decimal = dec!(50_000);

pub const RAPID_MEDIUM_COUNT: i64 = 4;
pub const RAPID_LARGE_COUNT: i64 = 3;
pub const RAPID_VERY_LARGE_COUNT: i64 = 2;

/// Identifier of a single fraud rule, in the exact spelling recorded on
/// evaluation rows and audit descriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FraudRule {
    FirstTransactionHighAmount,
    AmountDeviationHigh,
    AmountDeviationMedium,
    AmountDeviationLow,
    RapidMediumAmount,
    RapidLargeAmount,
    RapidVeryLargeAmount,
    UntrustedDevice,
    MissingDeviceId,
}

impl FraudRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            FraudRule::FirstTransactionHighAmount => "FIRST_TRANSACTION_HIGH_AMOUNT",
            FraudRule::AmountDeviationHigh => "AMOUNT_DEVIATION_HIGH",
            FraudRule::AmountDeviationMedium => "AMOUNT_DEVIATION_MEDIUM",
            FraudRule::AmountDeviationLow => "AMOUNT_DEVIATION_LOW",
            FraudRule::RapidMediumAmount => "RAPID_MEDIUM_AMOUNT",
            FraudRule::RapidLargeAmount => "RAPID_LARGE_AMOUNT",
            FraudRule::RapidVeryLargeAmount => "RAPID_VERY_LARGE_AMOUNT",
            FraudRule::UntrustedDevice => "UNTRUSTED_DEVICE",
            FraudRule::MissingDeviceId => "MISSING_DEVICE_ID",
        }
    }

    /// Risk contribution of this rule when it fires.
    pub fn weight(&self) -> i32 {
        match self {
            FraudRule::FirstTransactionHighAmount => 30,
            FraudRule::AmountDeviationHigh => 40,
            FraudRule::AmountDeviationMedium => 30,
            FraudRule::AmountDeviationLow => 20,
            FraudRule::RapidMediumAmount => 20,
            FraudRule::RapidLargeAmount => 30,
            FraudRule::RapidVeryLargeAmount => 40,
            FraudRule::UntrustedDevice => 30,
            FraudRule::MissingDeviceId => 50,
        }
    }

    /// Comma-joined rule list as stored on evaluation and audit rows.
    pub fn join(rules: &[FraudRule]) -> String {
        rules
            .iter()
            .map(|r| r.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl std::fmt::Display for FraudRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the rule engine is allowed to look at.
///
/// `baseline_avg` of zero means the user has no successful history yet.
/// `recent_count` is the user's transaction count inside the trailing
/// velocity window, including the transaction under evaluation.
#[derive(Debug, Clone)]
pub struct RuleInput<'a> {
    pub amount: Decimal,
    pub device_id: &'a str,
    pub baseline_avg: Decimal,
    pub recent_count: i64,
    pub trusted_device: Option<&'a str>,
}

/// Outcome of one scoring pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleVerdict {
    pub risk_score: i32,
    pub triggered: Vec<FraudRule>,
}

/// Score a transaction. Deterministic, no I/O.
pub fn evaluate(input: &RuleInput<'_>) -> RuleVerdict {
    let mut score = 0i32;
    let mut triggered = Vec::new();

    fn fire(rule: FraudRule, score: &mut i32, triggered: &mut Vec<FraudRule>) {
        *score += rule.weight();
        triggered.push(rule);
    }

    // First transaction safety check: no history and a very large opener.
    if input.baseline_avg == Decimal::ZERO && input.amount > FIRST_TXN_HIGH_AMOUNT {
        fire(FraudRule::FirstTransactionHighAmount, &mut score, &mut triggered);
    }

    // Deviation from the user's usual spend, highest tier first.
    if input.baseline_avg > Decimal::ZERO {
        if input.amount >= input.baseline_avg * dec!(10) {
            fire(FraudRule::AmountDeviationHigh, &mut score, &mut triggered);
        } else if input.amount >= input.baseline_avg * dec!(5) {
            fire(FraudRule::AmountDeviationMedium, &mut score, &mut triggered);
        } else if input.amount >= input.baseline_avg * dec!(2) {
            fire(FraudRule::AmountDeviationLow, &mut score, &mut triggered);
        }
    }

    // Velocity, amount-aware: buckets are disjoint so at most one fires.
    if input.amount >= RAPID_MEDIUM_MIN
        && input.amount < RAPID_LARGE_MIN
        && input.recent_count >= RAPID_MEDIUM_COUNT
    {
        fire(FraudRule::RapidMediumAmount, &mut score, &mut triggered);
    }
    if input.amount >= RAPID_LARGE_MIN
        && input.amount < RAPID_VERY_LARGE_MIN
        && input.recent_count >= RAPID_LARGE_COUNT
    {
        fire(FraudRule::RapidLargeAmount, &mut score, &mut triggered);
    }
    if input.amount >= RAPID_VERY_LARGE_MIN && input.recent_count >= RAPID_VERY_LARGE_COUNT {
        fire(FraudRule::RapidVeryLargeAmount, &mut score, &mut triggered);
    }

    // Device mismatch: only the first device is ever trusted, anything else
    // adds risk, every time.
    if let Some(trusted) = input.trusted_device {
        if trusted != input.device_id {
            fire(FraudRule::UntrustedDevice, &mut score, &mut triggered);
        }
    }

    // Missing device guard.
    if input.device_id.is_empty() {
        fire(FraudRule::MissingDeviceId, &mut score, &mut triggered);
    }

    RuleVerdict {
        risk_score: score,
        triggered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn input(amount: Decimal) -> RuleInput<'static> {
        RuleInput {
            amount,
            device_id: "device-1",
            baseline_avg: Decimal::ZERO,
            recent_count: 0,
            trusted_device: None,
        }
    }

    #[test]
    fn first_transaction_high_amount() {
        let verdict = evaluate(&input(dec!(200_000)));
        assert_eq!(verdict.risk_score, 30);
        assert_eq!(verdict.triggered, vec![FraudRule::FirstTransactionHighAmount]);
    }

    #[test]
    fn first_transaction_small_amount_is_clean() {
        let verdict = evaluate(&input(dec!(50)));
        assert_eq!(verdict.risk_score, 0);
        assert!(verdict.triggered.is_empty());
    }

    #[test]
    fn deviation_tiers_are_mutually_exclusive() {
        let avg = dec!(100);
        let cases = [
            (dec!(1_050), 40, FraudRule::AmountDeviationHigh),
            (dec!(500), 30, FraudRule::AmountDeviationMedium),
            (dec!(200), 20, FraudRule::AmountDeviationLow),
        ];
        for (amount, expected_score, expected_rule) in cases {
            let verdict = evaluate(&RuleInput {
                baseline_avg: avg,
                ..input(amount)
            });
            assert_eq!(verdict.risk_score, expected_score, "amount {amount}");
            assert_eq!(verdict.triggered, vec![expected_rule]);
        }
    }

    #[test]
    fn amount_near_baseline_is_clean() {
        let verdict = evaluate(&RuleInput {
            baseline_avg: dec!(100),
            ..input(dec!(150))
        });
        assert_eq!(verdict.risk_score, 0);
    }

    #[test]
    fn velocity_tiers() {
        let cases = [
            (dec!(5_000), 4, 20, FraudRule::RapidMediumAmount),
            (dec!(20_000), 3, 30, FraudRule::RapidLargeAmount),
            (dec!(60_000), 2, 40, FraudRule::RapidVeryLargeAmount),
        ];
        for (amount, count, expected_score, expected_rule) in cases {
            let verdict = evaluate(&RuleInput {
                recent_count: count,
                ..input(amount)
            });
            assert_eq!(verdict.risk_score, expected_score, "amount {amount}");
            assert_eq!(verdict.triggered, vec![expected_rule]);
        }
    }

    #[test]
    fn velocity_below_count_threshold_is_clean() {
        let verdict = evaluate(&RuleInput {
            recent_count: 3,
            ..input(dec!(5_000))
        });
        assert_eq!(verdict.risk_score, 0);
    }

    #[test]
    fn untrusted_device_adds_risk() {
        let verdict = evaluate(&RuleInput {
            trusted_device: Some("device-x"),
            ..input(dec!(50))
        });
        assert_eq!(verdict.risk_score, 30);
        assert_eq!(verdict.triggered, vec![FraudRule::UntrustedDevice]);
    }

    #[test]
    fn trusted_device_match_is_clean() {
        let verdict = evaluate(&RuleInput {
            trusted_device: Some("device-1"),
            ..input(dec!(50))
        });
        assert_eq!(verdict.risk_score, 0);
    }

    #[test]
    fn missing_device_id() {
        let verdict = evaluate(&RuleInput {
            device_id: "",
            ..input(dec!(50))
        });
        assert_eq!(verdict.risk_score, 50);
        assert_eq!(verdict.triggered, vec![FraudRule::MissingDeviceId]);
    }

    #[test]
    fn missing_device_with_trusted_on_file_triggers_both_device_rules() {
        let verdict = evaluate(&RuleInput {
            device_id: "",
            trusted_device: Some("device-x"),
            ..input(dec!(50))
        });
        assert_eq!(verdict.risk_score, 80);
        assert_eq!(
            verdict.triggered,
            vec![FraudRule::UntrustedDevice, FraudRule::MissingDeviceId]
        );
    }

    #[test]
    fn triggered_list_follows_evaluation_order() {
        // First-txn amount rule, then velocity, then device.
        let verdict = evaluate(&RuleInput {
            amount: dec!(200_000),
            device_id: "",
            baseline_avg: Decimal::ZERO,
            recent_count: 2,
            trusted_device: None,
        });
        assert_eq!(
            verdict.triggered,
            vec![
                FraudRule::FirstTransactionHighAmount,
                FraudRule::RapidVeryLargeAmount,
                FraudRule::MissingDeviceId,
            ]
        );
        assert_eq!(verdict.risk_score, 30 + 40 + 50);
    }

    proptest! {
        #[test]
        fn score_is_sum_of_triggered_weights(
            amount in 0u64..1_000_000,
            avg in 0u64..200_000,
            count in 0i64..10,
            device in "[a-z]{0,6}",
            trusted in proptest::option::of("[a-z]{1,6}"),
        ) {
            let input = RuleInput {
                amount: Decimal::from(amount),
                device_id: &device,
                baseline_avg: Decimal::from(avg),
                recent_count: count,
                trusted_device: trusted.as_deref(),
            };
            let verdict = evaluate(&input);
            let sum: i32 = verdict.triggered.iter().map(|r| r.weight()).sum();
            prop_assert_eq!(verdict.risk_score, sum);
            prop_assert!(verdict.risk_score >= 0);
            // Same inputs, same verdict.
            prop_assert_eq!(evaluate(&input), verdict);
        }
    }
}
