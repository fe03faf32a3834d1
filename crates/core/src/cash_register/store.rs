//! Persistence port for the cash register.

use caixa_shared::types::{CashSessionId, MovementId, TenantId};

use super::error::CashError;
use super::types::{
    CashSession, CloseSessionInput, ClosingDeclaredValue, LedgerMovement, NewCashSession,
    NewMovement, PaymentMethod,
};

/// Repository trait for cash session and movement persistence.
///
/// Implemented in memory here and over PostgreSQL by the db crate.
/// Every write method is a single atomic unit: either all of its effects
/// become visible or none do. State checks that guard a write
/// (session open, not deleted) are re-evaluated inside that unit, under
/// the session's lock.
pub trait LedgerStore: Send + Sync {
    /// Creates an open session and assigns the next per-tenant sequence number.
    fn create_session(
        &self,
        input: NewCashSession,
    ) -> impl std::future::Future<Output = Result<CashSession, CashError>> + Send;

    /// Finds a session by ID, including soft-deleted ones.
    fn find_session(
        &self,
        id: CashSessionId,
    ) -> impl std::future::Future<Output = Result<Option<CashSession>, CashError>> + Send;

    /// Lists open, active sessions for a tenant ordered by opening time.
    fn list_open_sessions(
        &self,
        tenant_id: TenantId,
    ) -> impl std::future::Future<Output = Result<Vec<CashSession>, CashError>> + Send;

    /// Appends a movement with the next per-session sequence number.
    ///
    /// Fails with `SessionNotFound`, `SessionClosed` or `SessionDeleted`
    /// without writing anything when the session cannot accept it, and with
    /// `PaymentMethodNotFound` when a payment names an unknown method.
    fn append_movement(
        &self,
        input: NewMovement,
    ) -> impl std::future::Future<Output = Result<LedgerMovement, CashError>> + Send;

    /// Finds a movement by ID, including removed ones.
    fn find_movement(
        &self,
        id: MovementId,
    ) -> impl std::future::Future<Output = Result<Option<LedgerMovement>, CashError>> + Send;

    /// Lists every movement of a session ordered by sequence number.
    fn list_movements(
        &self,
        session_id: CashSessionId,
    ) -> impl std::future::Future<Output = Result<Vec<LedgerMovement>, CashError>> + Send;

    /// Soft-deletes an active movement.
    fn remove_movement(
        &self,
        id: MovementId,
    ) -> impl std::future::Future<Output = Result<LedgerMovement, CashError>> + Send;

    /// Inserts the declared values and flips the session to closed.
    fn close_session(
        &self,
        input: CloseSessionInput,
    ) -> impl std::future::Future<Output = Result<CashSession, CashError>> + Send;

    /// Soft-deletes an active session in either status.
    fn delete_session(
        &self,
        id: CashSessionId,
    ) -> impl std::future::Future<Output = Result<CashSession, CashError>> + Send;

    /// Declared values recorded when the session was closed.
    fn declared_values(
        &self,
        session_id: CashSessionId,
    ) -> impl std::future::Future<Output = Result<Vec<ClosingDeclaredValue>, CashError>> + Send;

    /// Read-only payment-method catalog.
    fn payment_methods(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<PaymentMethod>, CashError>> + Send;
}
