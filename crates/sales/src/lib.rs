//! Sales module: order items, split-payment settlement and the sales history.
//!
//! Pure domain logic only. Applying a settlement to the till and persisting the
//! history is done by the infrastructure layer.

pub mod history;
pub mod order;
pub mod payment;

pub use history::{
    HistoryFilter, SaleSource, SaleStatus, SalesHistory, SalesHistoryEntry, SourceTotals,
};
pub use order::{FinalizeSale, OrderId, OrderItem, items_summary, order_total};
pub use payment::{PaymentLine, Settlement, settle};
