//! Register Ledger (cash till bookkeeping).
//!
//! Pure domain logic only: the till's session lifecycle, the movements that
//! change its physical cash balance, and the closing reconciliation. No IO; the
//! infrastructure crate persists [`RegisterSnapshot`]s.

pub mod register;
pub mod session;
pub mod snapshot;

pub use register::{
    CancelClose, CashDeposited, CashRegister, CashWithdrawn, CloseCancelled, CloseInitiated,
    CollectPayment, ConfirmClose, DepositCash, InitiateClose, OpenRegister, PaymentCollected,
    RegisterClosed, RegisterCommand, RegisterEvent, RegisterOpened, WithdrawCash,
};
pub use session::{
    ClosingReport, ClosingStatus, OpenSession, PaymentMethod, PendingClose, SessionTotals,
    WithdrawalCategory,
};
pub use snapshot::RegisterSnapshot;
