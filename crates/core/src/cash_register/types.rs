//! Domain types for cash-drawer sessions, movements and reconciliation.

use caixa_shared::types::{
    CashSessionId, MovementId, PaymentMethodId, PaymentReferenceId, PositiveAmount, TenantId,
    UserId,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::CashError;

/// Lifecycle status of a cash session.
///
/// `Open --close--> Closed` is the only transition; `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Accepting movements.
    Open,
    /// Closed with declared counts recorded.
    Closed,
}

/// Administrative soft-delete facet, orthogonal to the session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordState {
    /// Visible and counted.
    #[default]
    Active,
    /// Soft-deleted; kept for audit, excluded from listings and totals.
    Deleted,
}

impl RecordState {
    /// Returns true for `Active`.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Kind of a ledger movement. The direction of the amount is implied by the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    /// Cash removed from the till ("sangria").
    Withdrawal,
    /// Cash injected into the till ("suprimento").
    Supply,
    /// Settled payment posted by the order subsystem.
    Payment,
}

/// One cash-drawer working period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashSession {
    /// Session ID.
    pub id: CashSessionId,
    /// Human-facing number, increasing per tenant.
    pub sequence_number: i64,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Operator who opened the session.
    pub operator_id: UserId,
    /// When the session was opened.
    pub opened_at: DateTime<Utc>,
    /// When the session was closed; set iff `status == Closed`.
    pub closed_at: Option<DateTime<Utc>>,
    /// Float declared by the operator at opening.
    pub opening_amount: Decimal,
    /// Optional note entered at opening.
    pub opening_note: Option<String>,
    /// Optional note entered at closing.
    pub closing_note: Option<String>,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Soft-delete state.
    pub record_state: RecordState,
}

impl CashSession {
    /// Returns true if the session is open and not soft-deleted.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open && self.record_state.is_active()
    }

    /// Checks that movements may be appended to this session.
    ///
    /// # Errors
    ///
    /// Returns `SessionDeleted` or `SessionClosed` when the session cannot
    /// accept writes.
    pub fn ensure_open(&self) -> Result<(), CashError> {
        if !self.record_state.is_active() {
            return Err(CashError::SessionDeleted(self.id));
        }
        if self.status == SessionStatus::Closed {
            return Err(CashError::SessionClosed(self.id));
        }
        Ok(())
    }
}

/// One atomic cash-drawer event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerMovement {
    /// Movement ID.
    pub id: MovementId,
    /// Owning session.
    pub session_id: CashSessionId,
    /// Dense per-session number starting at 1.
    pub sequence_number: i64,
    /// Movement kind.
    pub kind: MovementKind,
    /// Payment method; always set for payments.
    pub payment_method_id: Option<PaymentMethodId>,
    /// Unsigned amount.
    pub amount: PositiveAmount,
    /// Free-form note.
    pub note: Option<String>,
    /// External payment record, for payments only.
    pub payment_reference_id: Option<PaymentReferenceId>,
    /// User who authorized a manual movement.
    pub authorized_by: Option<UserId>,
    /// Soft-delete state.
    pub record_state: RecordState,
    /// When the movement was recorded.
    pub created_at: DateTime<Utc>,
}

impl LedgerMovement {
    /// Contribution of this movement to its payment method's expected total.
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        match self.kind {
            MovementKind::Withdrawal => -self.amount.get(),
            MovementKind::Supply | MovementKind::Payment => self.amount.get(),
        }
    }

    /// Returns true if the movement affects the cash method rather than its own.
    #[must_use]
    pub const fn targets_cash(&self) -> bool {
        matches!(self.kind, MovementKind::Withdrawal | MovementKind::Supply)
    }
}

/// Entry in the read-only payment-method catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    /// Payment method ID.
    pub id: PaymentMethodId,
    /// Short code (e.g. "CASH", "CARD").
    pub code: String,
    /// Display name.
    pub name: String,
}

impl PaymentMethod {
    /// Creates a catalog entry with a fresh ID.
    #[must_use]
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: PaymentMethodId::new(),
            code: code.into(),
            name: name.into(),
        }
    }
}

/// Operator-counted amount for one payment method, as submitted at close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredValue {
    /// Payment method counted.
    pub payment_method_id: PaymentMethodId,
    /// Counted amount.
    pub amount: Decimal,
}

impl DeclaredValue {
    /// Creates a declared value.
    #[must_use]
    pub const fn new(payment_method_id: PaymentMethodId, amount: Decimal) -> Self {
        Self {
            payment_method_id,
            amount,
        }
    }
}

/// Declared value persisted with a session's close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosingDeclaredValue {
    /// Closed session.
    pub session_id: CashSessionId,
    /// Payment method counted.
    pub payment_method_id: PaymentMethodId,
    /// Counted amount.
    pub amount: Decimal,
}

/// Expected balance for one payment method, derived from the movement log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedValueRow {
    /// Payment method ID.
    pub payment_method_id: PaymentMethodId,
    /// Payment method code.
    pub code: String,
    /// Payment method display name.
    pub name: String,
    /// Expected amount.
    pub expected: Decimal,
}

/// Expected vs. declared comparison for one payment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarianceRow {
    /// Payment method ID.
    pub payment_method_id: PaymentMethodId,
    /// Payment method code.
    pub code: String,
    /// Payment method display name.
    pub name: String,
    /// Amount derived from movements.
    pub expected: Decimal,
    /// Amount counted by the operator (zero when not declared).
    pub declared: Decimal,
    /// `declared - expected`; negative means the drawer is short.
    pub difference: Decimal,
}

impl VarianceRow {
    /// Returns true when declared and expected agree.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.difference.is_zero()
    }
}

/// Store input for a new session.
#[derive(Debug, Clone)]
pub struct NewCashSession {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Operator opening the session.
    pub operator_id: UserId,
    /// Opening float, already validated as non-negative.
    pub opening_amount: Decimal,
    /// Optional opening note.
    pub opening_note: Option<String>,
}

/// Store input for a new movement. The sequence number is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewMovement {
    /// Target session.
    pub session_id: CashSessionId,
    /// Movement kind.
    pub kind: MovementKind,
    /// Payment method, for payments.
    pub payment_method_id: Option<PaymentMethodId>,
    /// Unsigned amount.
    pub amount: PositiveAmount,
    /// Optional note.
    pub note: Option<String>,
    /// External payment record, for payments.
    pub payment_reference_id: Option<PaymentReferenceId>,
    /// Authorizing user, for manual movements.
    pub authorized_by: Option<UserId>,
}

impl NewMovement {
    /// Manual cash removal.
    #[must_use]
    pub fn withdrawal(
        session_id: CashSessionId,
        amount: PositiveAmount,
        note: Option<String>,
        authorized_by: UserId,
    ) -> Self {
        Self::manual(MovementKind::Withdrawal, session_id, amount, note, authorized_by)
    }

    /// Manual cash injection.
    #[must_use]
    pub fn supply(
        session_id: CashSessionId,
        amount: PositiveAmount,
        note: Option<String>,
        authorized_by: UserId,
    ) -> Self {
        Self::manual(MovementKind::Supply, session_id, amount, note, authorized_by)
    }

    /// Settled payment forwarded by the order subsystem.
    #[must_use]
    pub const fn payment(
        session_id: CashSessionId,
        payment_method_id: PaymentMethodId,
        amount: PositiveAmount,
        payment_reference_id: PaymentReferenceId,
    ) -> Self {
        Self {
            session_id,
            kind: MovementKind::Payment,
            payment_method_id: Some(payment_method_id),
            amount,
            note: None,
            payment_reference_id: Some(payment_reference_id),
            authorized_by: None,
        }
    }

    fn manual(
        kind: MovementKind,
        session_id: CashSessionId,
        amount: PositiveAmount,
        note: Option<String>,
        authorized_by: UserId,
    ) -> Self {
        Self {
            session_id,
            kind,
            payment_method_id: None,
            amount,
            note,
            payment_reference_id: None,
            authorized_by: Some(authorized_by),
        }
    }
}

/// Store input for closing a session.
#[derive(Debug, Clone)]
pub struct CloseSessionInput {
    /// Session to close.
    pub session_id: CashSessionId,
    /// Optional closing note.
    pub closing_note: Option<String>,
    /// Declared counts, already validated (non-negative, unique per method).
    pub declared_values: Vec<DeclaredValue>,
}
