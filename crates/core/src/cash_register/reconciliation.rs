//! Reconciliation engine.
//!
//! Expected totals per payment method are a pure fold over the active
//! movement log:
//! - payments add to their own method
//! - supplies add to the cash method
//! - withdrawals subtract from the cash method
//! - the opening float is the cash baseline
//!
//! The store-facing [`ReconciliationEngine`] only loads data and delegates
//! to [`expected_values`] and [`compare`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use caixa_shared::types::{CashSessionId, PaymentMethodId};
use rust_decimal::Decimal;
use tracing::warn;

use super::error::CashError;
use super::store::LedgerStore;
use super::types::{
    CashSession, DeclaredValue, ExpectedValueRow, LedgerMovement, PaymentMethod, SessionStatus,
    VarianceRow,
};

/// Finds the catalog entry designated as cash (case-insensitive code match).
#[must_use]
pub fn find_cash_method<'a>(
    catalog: &'a [PaymentMethod],
    cash_method_code: &str,
) -> Option<&'a PaymentMethod> {
    catalog
        .iter()
        .find(|pm| pm.code.eq_ignore_ascii_case(cash_method_code))
}

/// Computes expected values for a session from its movement log.
///
/// Soft-deleted movements are ignored. Methods without any contribution
/// are omitted; the cash row is present when the opening float is non-zero
/// or any supply/withdrawal is active. Rows are ordered by method code.
///
/// # Errors
///
/// - `CashMethodNotConfigured` if there is a cash contribution but no
///   catalog entry matches `cash_method_code`
/// - `PaymentMethodNotFound` if a payment names a method missing from the catalog
/// - `TotalOverflow` if a running total leaves the decimal range
pub fn expected_values(
    session: &CashSession,
    movements: &[LedgerMovement],
    catalog: &[PaymentMethod],
    cash_method_code: &str,
) -> Result<Vec<ExpectedValueRow>, CashError> {
    let mut totals: HashMap<PaymentMethodId, Decimal> = HashMap::new();
    let mut cash: Option<Decimal> = (!session.opening_amount.is_zero()).then_some(session.opening_amount);

    for movement in movements.iter().filter(|m| m.record_state.is_active()) {
        if movement.targets_cash() {
            accumulate(cash.get_or_insert(Decimal::ZERO), movement.signed_amount(), || {
                cash_method_code.to_string()
            })?;
        } else if let Some(pm) = movement.payment_method_id {
            accumulate(
                totals.entry(pm).or_insert(Decimal::ZERO),
                movement.signed_amount(),
                || pm.to_string(),
            )?;
        }
    }

    if let Some(cash_total) = cash {
        let cash_method = find_cash_method(catalog, cash_method_code)
            .ok_or_else(|| CashError::CashMethodNotConfigured(cash_method_code.to_string()))?;
        accumulate(
            totals.entry(cash_method.id).or_insert(Decimal::ZERO),
            cash_total,
            || cash_method.code.clone(),
        )?;
    }

    let by_id: HashMap<PaymentMethodId, &PaymentMethod> =
        catalog.iter().map(|pm| (pm.id, pm)).collect();

    let mut rows = totals
        .into_iter()
        .map(|(id, expected)| {
            let pm = by_id
                .get(&id)
                .ok_or(CashError::PaymentMethodNotFound(id))?;
            Ok(ExpectedValueRow {
                payment_method_id: id,
                code: pm.code.clone(),
                name: pm.name.clone(),
                expected,
            })
        })
        .collect::<Result<Vec<_>, CashError>>()?;

    rows.sort_by(|a, b| a.code.cmp(&b.code).then(a.payment_method_id.cmp(&b.payment_method_id)));
    Ok(rows)
}

/// Left-joins expected rows against declared counts.
///
/// A method with an expected row but no declaration is compared against
/// zero; a declared method with no expected row is compared against an
/// expected zero. Declarations for the same method are summed.
///
/// # Errors
///
/// Returns `PaymentMethodNotFound` if a declared method is not in the catalog
/// and `TotalOverflow` if a sum or difference leaves the decimal range.
pub fn compare(
    expected: &[ExpectedValueRow],
    declared: &[DeclaredValue],
    catalog: &[PaymentMethod],
) -> Result<Vec<VarianceRow>, CashError> {
    let mut declared_by_method: BTreeMap<PaymentMethodId, Decimal> = BTreeMap::new();
    for value in declared {
        let id = value.payment_method_id;
        accumulate(
            declared_by_method.entry(id).or_insert(Decimal::ZERO),
            value.amount,
            || id.to_string(),
        )?;
    }

    let mut rows: Vec<VarianceRow> = expected
        .iter()
        .map(|row| {
            let declared = declared_by_method
                .remove(&row.payment_method_id)
                .unwrap_or(Decimal::ZERO);
            let difference = declared
                .checked_sub(row.expected)
                .ok_or_else(|| CashError::TotalOverflow(row.code.clone()))?;
            Ok(VarianceRow {
                payment_method_id: row.payment_method_id,
                code: row.code.clone(),
                name: row.name.clone(),
                expected: row.expected,
                declared,
                difference,
            })
        })
        .collect::<Result<_, CashError>>()?;

    for (id, declared) in declared_by_method {
        let pm = catalog
            .iter()
            .find(|pm| pm.id == id)
            .ok_or(CashError::PaymentMethodNotFound(id))?;
        rows.push(VarianceRow {
            payment_method_id: id,
            code: pm.code.clone(),
            name: pm.name.clone(),
            expected: Decimal::ZERO,
            declared,
            difference: declared,
        });
    }

    rows.sort_by(|a, b| a.code.cmp(&b.code).then(a.payment_method_id.cmp(&b.payment_method_id)));
    Ok(rows)
}

fn accumulate(
    total: &mut Decimal,
    amount: Decimal,
    label: impl FnOnce() -> String,
) -> Result<(), CashError> {
    *total = total
        .checked_add(amount)
        .ok_or_else(|| CashError::TotalOverflow(label()))?;
    Ok(())
}

/// Store-backed reconciliation.
pub struct ReconciliationEngine<S: LedgerStore> {
    store: Arc<S>,
    cash_method_code: String,
}

impl<S: LedgerStore> ReconciliationEngine<S> {
    /// Creates an engine that credits cash movements to `cash_method_code`.
    #[must_use]
    pub fn new(store: Arc<S>, cash_method_code: impl Into<String>) -> Self {
        Self {
            store,
            cash_method_code: cash_method_code.into(),
        }
    }

    /// Computes expected values per payment method for a session.
    ///
    /// Works for open and closed sessions alike.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound`, a catalog lookup error, or a persistence error.
    pub async fn compute_expected_values(
        &self,
        session_id: CashSessionId,
    ) -> Result<Vec<ExpectedValueRow>, CashError> {
        let session = self.load_session(session_id).await?;
        let movements = self.store.list_movements(session_id).await?;
        let catalog = self.store.payment_methods().await?;

        expected_values(&session, &movements, &catalog, &self.cash_method_code)
    }

    /// Compares expected values against operator-declared counts.
    ///
    /// Advisory only; nothing is written and closing is never blocked.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound`, a catalog lookup error, or a persistence error.
    pub async fn compare_at_close(
        &self,
        session_id: CashSessionId,
        declared: &[DeclaredValue],
    ) -> Result<Vec<VarianceRow>, CashError> {
        let session = self.load_session(session_id).await?;
        let movements = self.store.list_movements(session_id).await?;
        let catalog = self.store.payment_methods().await?;

        let expected = expected_values(&session, &movements, &catalog, &self.cash_method_code)?;
        let rows = compare(&expected, declared, &catalog)?;
        log_variances(session_id, &rows);
        Ok(rows)
    }

    /// Compares a closed session's expected values with the counts persisted at close.
    ///
    /// # Errors
    ///
    /// Returns `SessionStillOpen` if the session has not been closed yet.
    pub async fn closing_report(
        &self,
        session_id: CashSessionId,
    ) -> Result<Vec<VarianceRow>, CashError> {
        let session = self.load_session(session_id).await?;
        if session.status != SessionStatus::Closed {
            return Err(CashError::SessionStillOpen(session_id));
        }

        let declared: Vec<DeclaredValue> = self
            .store
            .declared_values(session_id)
            .await?
            .into_iter()
            .map(|row| DeclaredValue::new(row.payment_method_id, row.amount))
            .collect();

        self.compare_at_close(session_id, &declared).await
    }

    async fn load_session(&self, session_id: CashSessionId) -> Result<CashSession, CashError> {
        self.store
            .find_session(session_id)
            .await?
            .ok_or(CashError::SessionNotFound(session_id))
    }
}

fn log_variances(session_id: CashSessionId, rows: &[VarianceRow]) {
    for row in rows.iter().filter(|r| !r.is_balanced()) {
        warn!(
            session_id = %session_id,
            payment_method = %row.code,
            expected = %row.expected,
            declared = %row.declared,
            difference = %row.difference,
            "Cash session variance"
        );
    }
}
