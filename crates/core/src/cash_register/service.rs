//! Cash register facade.
//!
//! Wires the lifecycle manager, movement recorder and reconciliation
//! engine over one [`LedgerStore`] and maps domain errors into
//! [`AppError`](caixa_shared::AppError) for callers.

use std::sync::Arc;

use caixa_shared::types::{
    CashSessionId, MovementId, PaymentMethodId, PaymentReferenceId, TenantId, UserId,
};
use caixa_shared::{AppResult, CashRegisterConfig};
use rust_decimal::Decimal;
use tracing::debug;

use super::cache::OpenSessionCache;
use super::lifecycle::SessionLifecycle;
use super::reconciliation::ReconciliationEngine;
use super::recorder::MovementRecorder;
use super::store::LedgerStore;
use super::types::{
    CashSession, ClosingDeclaredValue, DeclaredValue, ExpectedValueRow, LedgerMovement,
    VarianceRow,
};

/// Entry point for every cash register operation.
pub struct CashRegisterService<S: LedgerStore> {
    store: Arc<S>,
    lifecycle: SessionLifecycle<S>,
    recorder: MovementRecorder<S>,
    reconciliation: ReconciliationEngine<S>,
    cache: OpenSessionCache,
}

impl<S: LedgerStore> CashRegisterService<S> {
    /// Creates a service with a cache sized from `config`.
    #[must_use]
    pub fn new(store: Arc<S>, config: &CashRegisterConfig) -> Self {
        Self {
            lifecycle: SessionLifecycle::new(Arc::clone(&store)),
            recorder: MovementRecorder::new(Arc::clone(&store)),
            reconciliation: ReconciliationEngine::new(
                Arc::clone(&store),
                config.cash_method_code.clone(),
            ),
            cache: OpenSessionCache::from_config(config),
            store,
        }
    }

    /// Opens a session for an operator.
    ///
    /// # Errors
    ///
    /// Validation error if `opening_amount` is negative.
    pub async fn open_session(
        &self,
        tenant_id: TenantId,
        operator_id: UserId,
        opening_amount: Decimal,
        opening_note: Option<String>,
    ) -> AppResult<CashSession> {
        let session = self
            .lifecycle
            .open_session(tenant_id, operator_id, opening_amount, opening_note)
            .await?;
        self.cache.insert(tenant_id, operator_id, session.id);
        Ok(session)
    }

    /// Lists a tenant's open sessions.
    ///
    /// # Errors
    ///
    /// Persistence error if the store fails.
    pub async fn list_open_sessions(&self, tenant_id: TenantId) -> AppResult<Vec<CashSession>> {
        Ok(self.lifecycle.list_open_sessions(tenant_id).await?)
    }

    /// Fetches a session by ID.
    ///
    /// # Errors
    ///
    /// Not found if the ID is unknown.
    pub async fn get_session(&self, session_id: CashSessionId) -> AppResult<CashSession> {
        Ok(self.lifecycle.get_session(session_id).await?)
    }

    /// Returns the operator's most recently opened open session, if any.
    ///
    /// # Errors
    ///
    /// Persistence error if the store fails.
    pub async fn current_session(
        &self,
        tenant_id: TenantId,
        operator_id: UserId,
    ) -> AppResult<Option<CashSession>> {
        if let Some(session_id) = self.cache.get(tenant_id, operator_id) {
            if let Some(session) = self.store.find_session(session_id).await?
                && session.is_open()
            {
                debug!(%session_id, %operator_id, "Open session cache hit");
                return Ok(Some(session));
            }
            self.cache.invalidate_session(tenant_id, operator_id, session_id);
        }

        let latest = self
            .lifecycle
            .list_open_sessions(tenant_id)
            .await?
            .into_iter()
            .filter(|s| s.operator_id == operator_id)
            .max_by(|a, b| {
                a.opened_at
                    .cmp(&b.opened_at)
                    .then(a.sequence_number.cmp(&b.sequence_number))
            });

        if let Some(session) = &latest {
            self.cache.insert(tenant_id, operator_id, session.id);
        }
        Ok(latest)
    }

    /// Records a withdrawal (sangria).
    ///
    /// # Errors
    ///
    /// Validation error for `amount <= 0`; invalid state for a closed or deleted session.
    pub async fn record_withdrawal(
        &self,
        session_id: CashSessionId,
        amount: Decimal,
        note: Option<String>,
        authorized_by: UserId,
    ) -> AppResult<LedgerMovement> {
        Ok(self
            .recorder
            .record_withdrawal(session_id, amount, note, authorized_by)
            .await?)
    }

    /// Records a supply (suprimento).
    ///
    /// # Errors
    ///
    /// Validation error for `amount <= 0`; invalid state for a closed or deleted session.
    pub async fn record_supply(
        &self,
        session_id: CashSessionId,
        amount: Decimal,
        note: Option<String>,
        authorized_by: UserId,
    ) -> AppResult<LedgerMovement> {
        Ok(self
            .recorder
            .record_supply(session_id, amount, note, authorized_by)
            .await?)
    }

    /// Records a settled payment against a session.
    ///
    /// # Errors
    ///
    /// Validation error for `amount <= 0`; invalid state for a closed or
    /// deleted session; not found for an unknown payment method.
    pub async fn record_payment(
        &self,
        session_id: CashSessionId,
        payment_method_id: PaymentMethodId,
        amount: Decimal,
        payment_reference_id: PaymentReferenceId,
    ) -> AppResult<LedgerMovement> {
        Ok(self
            .recorder
            .record_payment(session_id, payment_method_id, amount, payment_reference_id)
            .await?)
    }

    /// Soft-deletes a movement.
    ///
    /// # Errors
    ///
    /// Not found if the movement is unknown or already removed.
    pub async fn remove_movement(&self, movement_id: MovementId) -> AppResult<()> {
        self.recorder.remove_movement(movement_id).await?;
        Ok(())
    }

    /// Lists a session's movements.
    ///
    /// # Errors
    ///
    /// Not found if the session is unknown.
    pub async fn list_movements(
        &self,
        session_id: CashSessionId,
        include_removed: bool,
    ) -> AppResult<Vec<LedgerMovement>> {
        Ok(self
            .recorder
            .list_movements(session_id, include_removed)
            .await?)
    }

    /// Expected value per payment method for a session.
    ///
    /// # Errors
    ///
    /// Not found if the session is unknown or the cash method is not in the catalog.
    pub async fn compute_expected_values(
        &self,
        session_id: CashSessionId,
    ) -> AppResult<Vec<ExpectedValueRow>> {
        Ok(self
            .reconciliation
            .compute_expected_values(session_id)
            .await?)
    }

    /// Variance rows for a set of declared counts. Writes nothing.
    ///
    /// # Errors
    ///
    /// Not found if the session or a declared payment method is unknown.
    pub async fn compare_at_close(
        &self,
        session_id: CashSessionId,
        declared: &[DeclaredValue],
    ) -> AppResult<Vec<VarianceRow>> {
        Ok(self
            .reconciliation
            .compare_at_close(session_id, declared)
            .await?)
    }

    /// Closes a session and persists the declared counts.
    ///
    /// # Errors
    ///
    /// Validation error for negative or duplicate declarations; invalid
    /// state if the session is already closed or deleted.
    pub async fn close_session(
        &self,
        session_id: CashSessionId,
        closing_note: Option<String>,
        declared: Vec<DeclaredValue>,
    ) -> AppResult<()> {
        let session = self
            .lifecycle
            .close_session(session_id, closing_note, declared)
            .await?;
        self.cache
            .invalidate_session(session.tenant_id, session.operator_id, session.id);
        Ok(())
    }

    /// Variance report from the counts persisted at close.
    ///
    /// # Errors
    ///
    /// Invalid state if the session is still open.
    pub async fn closing_report(&self, session_id: CashSessionId) -> AppResult<Vec<VarianceRow>> {
        Ok(self.reconciliation.closing_report(session_id).await?)
    }

    /// Declared counts persisted at close.
    ///
    /// # Errors
    ///
    /// Not found if the session is unknown.
    pub async fn declared_values(
        &self,
        session_id: CashSessionId,
    ) -> AppResult<Vec<ClosingDeclaredValue>> {
        Ok(self.lifecycle.declared_values(session_id).await?)
    }

    /// Soft-deletes a session.
    ///
    /// # Errors
    ///
    /// Not found if the session is unknown or already deleted.
    pub async fn delete_session(&self, session_id: CashSessionId) -> AppResult<()> {
        let session = self.lifecycle.delete_session(session_id).await?;
        self.cache
            .invalidate_session(session.tenant_id, session.operator_id, session.id);
        Ok(())
    }
}
