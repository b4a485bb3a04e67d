//! Finalizing counter sales and deliveries.
//!
//! A sale is settled first; only an accepted settlement reaches the till, as
//! one collection per payment method (cash first), saved as a single batch.
//! The history entry is appended after the till accepted the collections.

use serde::Serialize;
use tracing::{error, info};

use tillbook_core::{DomainError, Money};
use tillbook_register::{CollectPayment, RegisterCommand};
use tillbook_sales::{FinalizeSale, SalesHistoryEntry, Settlement, settle};

use crate::desk::{DeskError, RegisterDesk, RegisterEnvelope};
use crate::history_store::SalesHistoryStore;
use crate::ledger_store::{LedgerStore, StoreError};

/// What the operator sees after a sale went through.
#[derive(Debug, Clone, Serialize)]
pub struct SaleReceipt {
    pub entry: SalesHistoryEntry,
    pub settlement: Settlement,
    /// Till balance after the cash portion was collected.
    pub till_balance: Option<Money>,
    #[serde(skip)]
    pub collections: Vec<RegisterEnvelope>,
}

impl SaleReceipt {
    pub fn change(&self) -> Money {
        self.settlement.change
    }
}

pub struct Checkout<'a, L, H> {
    desk: &'a RegisterDesk<L>,
    history: &'a H,
}

impl<'a, L, H> Checkout<'a, L, H>
where
    L: LedgerStore,
    H: SalesHistoryStore,
{
    pub fn new(desk: &'a RegisterDesk<L>, history: &'a H) -> Self {
        Self { desk, history }
    }

    /// Settle the sale, collect it on the till and record it in the history.
    ///
    /// Validation, short payment, a closed register, a pending close, a
    /// duplicate order id and an unreadable history all reject the sale before
    /// anything is written.
    pub fn finalize(&self, sale: &FinalizeSale) -> Result<SaleReceipt, DeskError> {
        sale.validate()?;
        let settlement = settle(sale.total()?, &sale.payments)?;
        let entry = sale.to_history_entry()?;

        let history = self.history.try_load().map_err(StoreError::from)?;
        if history.entries().iter().any(|e| e.order_id == entry.order_id) {
            return Err(DomainError::conflict(format!(
                "order {} was already finalized",
                entry.order_id
            ))
            .into());
        }

        let register_id = self.desk.register_id();
        let commands: Vec<_> = settlement
            .collections()
            .into_iter()
            .map(|line| {
                RegisterCommand::CollectPayment(CollectPayment {
                    register_id,
                    amount: line.amount,
                    method: line.method,
                    occurred_at: sale.occurred_at,
                })
            })
            .collect();
        let collections = self.desk.dispatch_all(&commands)?;

        if let Err(err) = self.history.append(entry.clone()) {
            error!(
                order_id = %entry.order_id,
                error = %err,
                "payment collected but sale not recorded in history"
            );
            return Err(err.into());
        }

        let till_balance = self.desk.snapshot().current_balance;
        info!(
            order_id = %entry.order_id,
            source = ?entry.source,
            total = %settlement.total,
            cash = %settlement.cash_applied,
            change = %settlement.change,
            "sale finalized"
        );

        Ok(SaleReceipt {
            entry,
            settlement,
            till_balance,
            collections,
        })
    }
}
