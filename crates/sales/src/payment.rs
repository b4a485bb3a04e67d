//! Split-payment settlement.
//!
//! A sale can be paid with several method/amount lines. Lines are matched
//! against the order total in the order they were entered; whatever exceeds the
//! total is change handed back, so it never reaches the till balance.

use serde::{Deserialize, Serialize};

use tillbook_core::{DomainError, DomainResult, Money};
use tillbook_register::PaymentMethod;

/// One tendered payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentLine {
    pub method: PaymentMethod,
    pub amount: Money,
}

impl PaymentLine {
    pub fn new(method: PaymentMethod, amount: Money) -> Self {
        Self { method, amount }
    }
}

/// Result of matching tendered lines against an order total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub total: Money,
    pub tendered: Money,
    /// Cash portion applied toward the total (what the till gains).
    pub cash_applied: Money,
    /// `tendered - total`.
    pub change: Money,
    /// Applied amount per tendered line, same order as the input.
    pub applied: Vec<PaymentLine>,
}

impl Settlement {
    pub fn applied_by_method(&self, method: PaymentMethod) -> Money {
        self.applied
            .iter()
            .filter(|line| line.method == method)
            .map(|line| line.amount)
            .sum()
    }

    /// One collection per method with a positive applied amount, cash first.
    pub fn collections(&self) -> Vec<PaymentLine> {
        PaymentMethod::ALL
            .into_iter()
            .map(|method| PaymentLine::new(method, self.applied_by_method(method)))
            .filter(|line| line.amount.is_positive())
            .collect()
    }
}

/// Match `payments` against `total`.
///
/// Rejects the whole settlement (nothing applied) when the total is not
/// positive, a line is not positive, the tendered sum falls short or cannot
/// be represented.
pub fn settle(total: Money, payments: &[PaymentLine]) -> DomainResult<Settlement> {
    if !total.is_positive() {
        return Err(DomainError::validation("order total must be positive"));
    }

    if let Some(bad) = payments.iter().find(|line| !line.amount.is_positive()) {
        return Err(DomainError::validation(format!(
            "payment amount must be positive ({:?} {})",
            bad.method, bad.amount
        )));
    }

    let tendered = Money::checked_sum(payments.iter().map(|line| line.amount))?;
    if tendered < total {
        return Err(DomainError::insufficient_payment(total, tendered));
    }

    let mut remaining = total;
    let mut cash_applied = Money::zero();
    let mut applied = Vec::with_capacity(payments.len());

    for line in payments {
        let portion = line.amount.min(remaining);
        remaining -= portion;
        if line.method == PaymentMethod::Cash {
            cash_applied += portion;
        }
        applied.push(PaymentLine::new(line.method, portion));
    }

    Ok(Settlement {
        total,
        tendered,
        cash_applied,
        change: tendered - total,
        applied,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn money(cents: i64) -> Money {
        Money::from_cents(cents)
    }

    #[test]
    fn cash_overpayment_only_banks_the_total() {
        let s = settle(
            Money::new(dec!(42.00)),
            &[PaymentLine::new(PaymentMethod::Cash, Money::new(dec!(50.00)))],
        )
        .unwrap();

        assert_eq!(s.cash_applied, money(4_200));
        assert_eq!(s.change, money(800));
        assert_eq!(s.tendered, money(5_000));
    }

    #[test]
    fn split_cash_and_card_applies_cash_portion() {
        let s = settle(
            money(4_200),
            &[
                PaymentLine::new(PaymentMethod::Cash, money(2_000)),
                PaymentLine::new(PaymentMethod::Card, money(2_200)),
            ],
        )
        .unwrap();

        assert_eq!(s.cash_applied, money(2_000));
        assert_eq!(s.applied_by_method(PaymentMethod::Card), money(2_200));
        assert_eq!(s.change, Money::zero());
        assert_eq!(
            s.collections(),
            vec![
                PaymentLine::new(PaymentMethod::Cash, money(2_000)),
                PaymentLine::new(PaymentMethod::Card, money(2_200)),
            ]
        );
    }

    #[test]
    fn lines_after_the_total_is_met_apply_nothing() {
        let s = settle(
            money(3_000),
            &[
                PaymentLine::new(PaymentMethod::Pix, money(3_000)),
                PaymentLine::new(PaymentMethod::Cash, money(1_000)),
            ],
        )
        .unwrap();

        assert_eq!(s.cash_applied, Money::zero());
        assert_eq!(s.applied[1].amount, Money::zero());
        assert_eq!(s.change, money(1_000));
        assert_eq!(s.collections(), vec![PaymentLine::new(PaymentMethod::Pix, money(3_000))]);
    }

    #[test]
    fn short_payment_is_rejected() {
        let err = settle(
            money(4_200),
            &[
                PaymentLine::new(PaymentMethod::Cash, money(2_000)),
                PaymentLine::new(PaymentMethod::Card, money(2_000)),
            ],
        )
        .unwrap_err();

        assert_eq!(err, DomainError::insufficient_payment(money(4_200), money(4_000)));
    }

    #[test]
    fn no_payments_is_insufficient() {
        let err = settle(money(100), &[]).unwrap_err();
        assert!(matches!(err, DomainError::InsufficientPayment { .. }));
    }

    #[test]
    fn non_positive_inputs_are_validation_errors() {
        assert!(matches!(
            settle(Money::zero(), &[PaymentLine::new(PaymentMethod::Cash, money(100))]),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            settle(money(100), &[PaymentLine::new(PaymentMethod::Cash, money(-100))]),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn tendered_sum_past_the_decimal_range_is_a_validation_error() {
        let huge = Money::new(dec!(50000000000000000000000000000));
        let err = settle(
            Money::new(dec!(1.00)),
            &[
                PaymentLine::new(PaymentMethod::Cash, huge),
                PaymentLine::new(PaymentMethod::Card, huge),
            ],
        )
        .unwrap_err();

        match err {
            DomainError::Validation(msg) => assert!(msg.contains("out of range")),
            other => panic!("Expected Validation, got {other:?}"),
        }
    }

    fn method_strategy() -> impl Strategy<Value = PaymentMethod> {
        prop_oneof![
            Just(PaymentMethod::Cash),
            Just(PaymentMethod::Card),
            Just(PaymentMethod::Pix),
        ]
    }

    proptest! {
        /// Property: applied portions sum to the total, cash applied never exceeds
        /// tendered cash, and change is what is left over.
        #[test]
        fn applied_portions_cover_exactly_the_total(
            total in 1i64..100_000,
            lines in prop::collection::vec((method_strategy(), 1i64..50_000), 1..6)
        ) {
            let payments: Vec<_> = lines
                .iter()
                .map(|(m, a)| PaymentLine::new(*m, money(*a)))
                .collect();
            let tendered: i64 = lines.iter().map(|(_, a)| a).sum();

            match settle(money(total), &payments) {
                Ok(s) => {
                    prop_assert!(tendered >= total);
                    let applied: Money = s.applied.iter().map(|l| l.amount).sum();
                    prop_assert_eq!(applied, money(total));
                    let cash_tendered: i64 = lines
                        .iter()
                        .filter(|(m, _)| *m == PaymentMethod::Cash)
                        .map(|(_, a)| a)
                        .sum();
                    prop_assert!(s.cash_applied <= money(cash_tendered));
                    prop_assert_eq!(s.change, money(tendered - total));
                }
                Err(e) => {
                    prop_assert!(tendered < total);
                    prop_assert!(
                        matches!(e, DomainError::InsufficientPayment { .. }),
                        "unexpected error"
                    );
                }
            }
        }
    }
}
