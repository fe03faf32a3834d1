//! Cash register sessions and reconciliation.
//!
//! A session is an operator's shift at a till: it opens with a cash
//! float, accumulates an append-only log of movements (withdrawals,
//! supplies and settled payments) and closes with declared counts per
//! payment method. Expected totals are always derived from the log.
//!
//! - [`SessionLifecycle`] opens, closes and soft-deletes sessions
//! - [`MovementRecorder`] appends and removes movements
//! - [`ReconciliationEngine`] computes expected values and variances
//! - [`CashRegisterService`] ties them together behind [`AppResult`](caixa_shared::AppResult)

mod cache;
mod error;
mod lifecycle;
mod memory;
mod reconciliation;
mod recorder;
mod service;
mod store;
mod types;

#[cfg(test)]
mod reconciliation_props;
#[cfg(test)]
mod tests;

pub use cache::OpenSessionCache;
pub use error::CashError;
pub use lifecycle::{SessionLifecycle, validate_declared_values};
pub use memory::InMemoryLedgerStore;
pub use reconciliation::{ReconciliationEngine, compare, expected_values, find_cash_method};
pub use recorder::{MovementRecorder, require_positive};
pub use service::CashRegisterService;
pub use store::LedgerStore;
pub use types::{
    CashSession, CloseSessionInput, ClosingDeclaredValue, DeclaredValue, ExpectedValueRow,
    LedgerMovement, MovementKind, NewCashSession, NewMovement, PaymentMethod, RecordState,
    SessionStatus, VarianceRow,
};
