//! End-to-end tests over shared in-memory storage.
//!
//! Tests: Desk/Checkout → JsonLedgerStore + JsonSalesHistoryStore → storage → reload
//!
//! Verifies:
//! - A full trading day reconciles at close
//! - State survives a fresh set of services over the same storage
//! - The balance equation holds for arbitrary movement sequences

use std::sync::Arc;

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal_macros::dec;

use tillbook_core::{DomainError, Money, RegisterId};
use tillbook_register::{ClosingStatus, PaymentMethod, WithdrawalCategory};
use tillbook_sales::{
    FinalizeSale, HistoryFilter, OrderId, OrderItem, PaymentLine, SaleSource, SaleStatus,
};

use crate::checkout::Checkout;
use crate::desk::{DeskError, RegisterDesk};
use crate::history_store::{JsonSalesHistoryStore, SalesHistoryStore};
use crate::ledger_store::{JsonLedgerStore, LEGACY_REGISTER_KEY};
use crate::storage::{InMemoryStorage, KeyValueStorage};

type Desk = RegisterDesk<JsonLedgerStore<Arc<InMemoryStorage>>>;
type History = JsonSalesHistoryStore<Arc<InMemoryStorage>>;

fn services(storage: &Arc<InMemoryStorage>) -> (Desk, History) {
    (
        RegisterDesk::new(RegisterId::new(), JsonLedgerStore::new(storage.clone())),
        JsonSalesHistoryStore::new(storage.clone()),
    )
}

fn m(value: rust_decimal::Decimal) -> Money {
    Money::new(value)
}

fn order(id: &str, source: SaleSource, price: Money, payments: Vec<PaymentLine>) -> FinalizeSale {
    FinalizeSale {
        order_id: OrderId::new(id).unwrap(),
        customer: format!("Cliente {id}"),
        source,
        items: vec![OrderItem::new("Pizza Calabresa", 1, price)],
        payments,
        status: if source == SaleSource::Counter {
            SaleStatus::Completed
        } else {
            SaleStatus::Delivered
        },
        occurred_at: Utc::now(),
    }
}

#[test]
fn trading_day_reconciles_at_close() {
    let storage = Arc::new(InMemoryStorage::new());
    let (desk, history) = services(&storage);
    let checkout = Checkout::new(&desk, &history);

    desk.open(m(dec!(100))).unwrap();
    checkout
        .finalize(&order(
            "#PDV1001",
            SaleSource::Counter,
            m(dec!(42)),
            vec![PaymentLine::new(PaymentMethod::Cash, m(dec!(50)))],
        ))
        .unwrap();
    checkout
        .finalize(&order(
            "#IFD2034",
            SaleSource::IFood,
            m(dec!(89.90)),
            vec![PaymentLine::new(PaymentMethod::Card, m(dec!(89.90)))],
        ))
        .unwrap();
    checkout
        .finalize(&order(
            "#WPP0012",
            SaleSource::WhatsApp,
            m(dec!(38)),
            vec![
                PaymentLine::new(PaymentMethod::Pix, m(dec!(18))),
                PaymentLine::new(PaymentMethod::Cash, m(dec!(20))),
            ],
        ))
        .unwrap();
    desk.withdraw(m(dec!(30)), WithdrawalCategory::Purchase, Some("Compra de gelo".into()))
        .unwrap();
    desk.deposit(m(dec!(10)), Some("Troco".into())).unwrap();

    // 100 + 42 + 20 - 30 + 10
    let expected = desk.initiate_close().unwrap();
    assert_eq!(expected, m(dec!(142)));

    // No movements while counting.
    assert!(matches!(
        desk.deposit(m(dec!(1)), None),
        Err(DeskError::Domain(DomainError::InvariantViolation(_)))
    ));

    let report = desk.confirm_close(m(dec!(145))).unwrap();
    assert_eq!(report.status, ClosingStatus::Surplus);
    assert_eq!(report.difference, m(dec!(3)));
    assert_eq!(report.totals.cash_collections, m(dec!(62)));
    assert_eq!(report.totals.card_collections, m(dec!(89.90)));
    assert_eq!(report.totals.pix_collections, m(dec!(18)));
    assert_eq!(report.totals.withdrawals, m(dec!(30)));
    assert_eq!(report.totals.deposits, m(dec!(10)));

    assert!(matches!(
        desk.withdraw(m(dec!(1)), WithdrawalCategory::Voucher, None),
        Err(DeskError::Domain(DomainError::RegisterNotOpen))
    ));
    assert!(matches!(
        desk.confirm_close(m(dec!(0))),
        Err(DeskError::Domain(DomainError::RegisterNotOpen))
    ));

    let history = history.load();
    assert_eq!(history.len(), 3);
    assert_eq!(
        history.filter(&HistoryFilter::new().source(SaleSource::IFood)).len(),
        1
    );
    let revenue: Money = history.totals_by_source().unwrap().iter().map(|t| t.revenue).sum();
    assert_eq!(revenue, m(dec!(169.90)));
}

#[test]
fn fresh_services_see_persisted_state() {
    let storage = Arc::new(InMemoryStorage::new());
    {
        let (desk, history) = services(&storage);
        desk.open(m(dec!(50))).unwrap();
        Checkout::new(&desk, &history)
            .finalize(&order(
                "#ZD0788",
                SaleSource::ZeDelivery,
                m(dec!(42.50)),
                vec![PaymentLine::new(PaymentMethod::Cash, m(dec!(42.50)))],
            ))
            .unwrap();
    }

    let (desk, history) = services(&storage);
    let register = desk.current().unwrap();
    assert!(register.is_open());
    assert_eq!(register.current_balance(), Some(m(dec!(92.50))));
    assert_eq!(history.load().len(), 1);

    let err = desk
        .withdraw(m(dec!(100)), WithdrawalCategory::Payment, None)
        .unwrap_err();
    assert_eq!(
        err.as_domain(),
        Some(&DomainError::insufficient_funds(m(dec!(100)), m(dec!(92.50))))
    );
}

#[test]
fn legacy_open_register_keeps_trading_after_upgrade() {
    let storage = Arc::new(InMemoryStorage::new());
    storage
        .set_item(
            LEGACY_REGISTER_KEY,
            r#"{"isOpen":true,"openedAmount":200,"openingTimestamp":"29/07/2024, 08:00"}"#,
        )
        .unwrap();

    let (desk, _) = services(&storage);
    let withdrawn = desk
        .withdraw(m(dec!(20)), WithdrawalCategory::Voucher, None)
        .unwrap();
    assert_eq!(withdrawn.balance_after, m(dec!(180)));

    let report = {
        desk.initiate_close().unwrap();
        desk.confirm_close(m(dec!(180))).unwrap()
    };
    assert_eq!(report.opening_amount, m(dec!(200)));
    assert_eq!(report.status, ClosingStatus::Balanced);
    assert!(storage.get_item(LEGACY_REGISTER_KEY).unwrap().is_none());
}

#[derive(Debug, Clone)]
enum Movement {
    Withdraw(i64),
    Deposit(i64),
    Collect(i64, PaymentMethod),
}

fn movement() -> impl Strategy<Value = Movement> {
    prop_oneof![
        (1i64..20_000).prop_map(Movement::Withdraw),
        (1i64..20_000).prop_map(Movement::Deposit),
        (1i64..20_000, prop_oneof![
            Just(PaymentMethod::Cash),
            Just(PaymentMethod::Card),
            Just(PaymentMethod::Pix),
        ])
            .prop_map(|(cents, method)| Movement::Collect(cents, method)),
    ]
}

proptest! {
    /// Property: after any sequence of movements, the persisted balance equals
    /// opening + deposits + cash collections - withdrawals, and never goes negative.
    #[test]
    fn persisted_balance_follows_the_movements(
        opening in 0i64..50_000,
        movements in prop::collection::vec(movement(), 0..25)
    ) {
        let storage = Arc::new(InMemoryStorage::new());
        let (desk, _) = services(&storage);
        desk.open(Money::from_cents(opening)).unwrap();

        let mut balance = opening;
        for mv in movements {
            match mv {
                Movement::Withdraw(cents) => {
                    let result =
                        desk.withdraw(Money::from_cents(cents), WithdrawalCategory::Purchase, None);
                    if cents > balance {
                        prop_assert!(result.is_err());
                    } else {
                        prop_assert!(result.is_ok());
                        balance -= cents;
                    }
                }
                Movement::Deposit(cents) => {
                    desk.deposit(Money::from_cents(cents), None).unwrap();
                    balance += cents;
                }
                Movement::Collect(cents, method) => {
                    desk.collect(Money::from_cents(cents), method).unwrap();
                    if method == PaymentMethod::Cash {
                        balance += cents;
                    }
                }
            }
        }

        let snapshot = desk.snapshot();
        prop_assert_eq!(snapshot.current_balance, Some(Money::from_cents(balance)));
        prop_assert!(balance >= 0);
    }
}
