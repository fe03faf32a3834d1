//! Cash register repository for database operations.
//!
//! Implements the core `LedgerStore` over PostgreSQL. Writes that depend
//! on session state take a `FOR UPDATE` lock on the session row and
//! re-check the state inside the same transaction.

use std::collections::HashSet;

use caixa_core::cash_register::{
    CashError, CashSession, CloseSessionInput, ClosingDeclaredValue, LedgerMovement, LedgerStore,
    MovementKind, NewCashSession, NewMovement, PaymentMethod, RecordState, SessionStatus,
};
use caixa_shared::types::{
    CashSessionId, MovementId, PaymentMethodId, PaymentReferenceId, PositiveAmount, TenantId,
    UserId,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbBackend, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, Statement,
    TransactionTrait,
};
use tracing::{debug, error};
use uuid::Uuid;

use crate::entities::{
    cash_closing_declared_values, cash_movements, cash_sessions, payment_methods,
    sea_orm_active_enums::{
        CashMovementKind as DbMovementKind, CashSessionStatus as DbSessionStatus,
        RecordState as DbRecordState,
    },
};

/// Atomically issues the next session number for a tenant.
const NEXT_SESSION_NUMBER_SQL: &str = r"
INSERT INTO cash_register_counters (tenant_id, last_session_number)
VALUES ($1, 1)
ON CONFLICT (tenant_id)
DO UPDATE SET last_session_number = cash_register_counters.last_session_number + 1
RETURNING last_session_number
";

/// Inserts a catalog entry unless its code is already taken.
const INSERT_PAYMENT_METHOD_SQL: &str = r"
INSERT INTO payment_methods (id, code, name)
VALUES ($1, $2, $3)
ON CONFLICT (code) DO NOTHING
";

/// PostgreSQL-backed ledger store.
#[derive(Debug, Clone)]
pub struct CashRegisterRepository {
    db: DatabaseConnection,
}

impl CashRegisterRepository {
    /// Creates a new cash register repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the catalog entry with `code`, creating it if missing.
    ///
    /// Safe to call concurrently: the insert skips an existing code and the
    /// entry is then read back, so every caller sees the same row.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the database operation fails.
    pub async fn ensure_payment_method(
        &self,
        code: &str,
        name: &str,
    ) -> Result<PaymentMethod, CashError> {
        let inserted = self
            .db
            .execute(Statement::from_sql_and_values(
                DbBackend::Postgres,
                INSERT_PAYMENT_METHOD_SQL,
                [
                    PaymentMethodId::new().into_inner().into(),
                    code.into(),
                    name.into(),
                ],
            ))
            .await
            .map_err(persistence)?
            .rows_affected();

        let model = payment_methods::Entity::find()
            .filter(payment_methods::Column::Code.eq(code))
            .one(&self.db)
            .await
            .map_err(persistence)?
            .ok_or_else(|| CashError::persistence(format!("payment method {code} vanished")))?;

        if inserted > 0 {
            debug!(code, payment_method_id = %model.id, "Payment method created");
        }
        Ok(payment_method_to_domain(model))
    }

    async fn next_session_number(
        txn: &DatabaseTransaction,
        tenant_id: TenantId,
    ) -> Result<i64, CashError> {
        let row = txn
            .query_one(Statement::from_sql_and_values(
                DbBackend::Postgres,
                NEXT_SESSION_NUMBER_SQL,
                [tenant_id.into_inner().into()],
            ))
            .await
            .map_err(persistence)?
            .ok_or_else(|| CashError::persistence("session counter upsert returned no row"))?;

        row.try_get::<i64>("", "last_session_number")
            .map_err(persistence)
    }

    async fn lock_session(
        txn: &DatabaseTransaction,
        session_id: CashSessionId,
    ) -> Result<cash_sessions::Model, CashError> {
        cash_sessions::Entity::find_by_id(session_id.into_inner())
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(persistence)?
            .ok_or(CashError::SessionNotFound(session_id))
    }

    async fn known_payment_methods(
        txn: &DatabaseTransaction,
        ids: Vec<Uuid>,
    ) -> Result<HashSet<Uuid>, CashError> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }

        let found = payment_methods::Entity::find()
            .filter(payment_methods::Column::Id.is_in(ids))
            .all(txn)
            .await
            .map_err(persistence)?;

        Ok(found.into_iter().map(|pm| pm.id).collect())
    }
}

impl LedgerStore for CashRegisterRepository {
    async fn create_session(&self, input: NewCashSession) -> Result<CashSession, CashError> {
        let txn = self.db.begin().await.map_err(persistence)?;
        let sequence_number = Self::next_session_number(&txn, input.tenant_id).await?;
        let now = Utc::now().into();

        let model = cash_sessions::ActiveModel {
            id: Set(CashSessionId::new().into_inner()),
            tenant_id: Set(input.tenant_id.into_inner()),
            sequence_number: Set(sequence_number),
            operator_id: Set(input.operator_id.into_inner()),
            opened_at: Set(now),
            closed_at: Set(None),
            opening_amount: Set(input.opening_amount),
            opening_note: Set(input.opening_note),
            closing_note: Set(None),
            status: Set(DbSessionStatus::Open),
            record_state: Set(DbRecordState::Active),
            last_movement_number: Set(0),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(persistence)?;

        txn.commit().await.map_err(persistence)?;
        Ok(session_to_domain(model))
    }

    async fn find_session(&self, id: CashSessionId) -> Result<Option<CashSession>, CashError> {
        let model = cash_sessions::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(persistence)?;

        Ok(model.map(session_to_domain))
    }

    async fn list_open_sessions(&self, tenant_id: TenantId) -> Result<Vec<CashSession>, CashError> {
        let models = cash_sessions::Entity::find()
            .filter(cash_sessions::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(cash_sessions::Column::Status.eq(DbSessionStatus::Open))
            .filter(cash_sessions::Column::RecordState.eq(DbRecordState::Active))
            .order_by_asc(cash_sessions::Column::OpenedAt)
            .order_by_asc(cash_sessions::Column::SequenceNumber)
            .all(&self.db)
            .await
            .map_err(persistence)?;

        Ok(models.into_iter().map(session_to_domain).collect())
    }

    async fn append_movement(&self, input: NewMovement) -> Result<LedgerMovement, CashError> {
        let txn = self.db.begin().await.map_err(persistence)?;

        let session = Self::lock_session(&txn, input.session_id).await?;
        session_to_domain(session.clone()).ensure_open()?;

        if input.kind == MovementKind::Payment {
            let method = input
                .payment_method_id
                .ok_or_else(|| CashError::persistence("payment movement without payment method"))?;
            let known = Self::known_payment_methods(&txn, vec![method.into_inner()]).await?;
            if !known.contains(&method.into_inner()) {
                return Err(CashError::PaymentMethodNotFound(method));
            }
        }

        let sequence_number = session.last_movement_number + 1;
        let now = Utc::now().into();

        let mut session: cash_sessions::ActiveModel = session.into();
        session.last_movement_number = Set(sequence_number);
        session.updated_at = Set(now);
        session.update(&txn).await.map_err(persistence)?;

        let model = cash_movements::ActiveModel {
            id: Set(MovementId::new().into_inner()),
            session_id: Set(input.session_id.into_inner()),
            sequence_number: Set(sequence_number),
            kind: Set(input.kind.into()),
            payment_method_id: Set(input.payment_method_id.map(PaymentMethodId::into_inner)),
            amount: Set(input.amount.get()),
            note: Set(input.note),
            payment_reference_id: Set(input
                .payment_reference_id
                .map(PaymentReferenceId::into_inner)),
            authorized_by: Set(input.authorized_by.map(UserId::into_inner)),
            record_state: Set(DbRecordState::Active),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(persistence)?;

        txn.commit().await.map_err(persistence)?;
        movement_to_domain(model)
    }

    async fn find_movement(&self, id: MovementId) -> Result<Option<LedgerMovement>, CashError> {
        cash_movements::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(persistence)?
            .map(movement_to_domain)
            .transpose()
    }

    async fn list_movements(
        &self,
        session_id: CashSessionId,
    ) -> Result<Vec<LedgerMovement>, CashError> {
        cash_movements::Entity::find()
            .filter(cash_movements::Column::SessionId.eq(session_id.into_inner()))
            .order_by_asc(cash_movements::Column::SequenceNumber)
            .all(&self.db)
            .await
            .map_err(persistence)?
            .into_iter()
            .map(movement_to_domain)
            .collect()
    }

    async fn remove_movement(&self, id: MovementId) -> Result<LedgerMovement, CashError> {
        let txn = self.db.begin().await.map_err(persistence)?;

        let model = cash_movements::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(persistence)?
            .filter(|m| m.record_state == DbRecordState::Active)
            .ok_or(CashError::MovementNotFound(id))?;

        let mut active: cash_movements::ActiveModel = model.into();
        active.record_state = Set(DbRecordState::Deleted);
        active.updated_at = Set(Utc::now().into());
        let model = active.update(&txn).await.map_err(persistence)?;

        txn.commit().await.map_err(persistence)?;
        movement_to_domain(model)
    }

    async fn close_session(&self, input: CloseSessionInput) -> Result<CashSession, CashError> {
        let txn = self.db.begin().await.map_err(persistence)?;

        let session = Self::lock_session(&txn, input.session_id).await?;
        session_to_domain(session.clone()).ensure_open()?;

        let ids: Vec<Uuid> = input
            .declared_values
            .iter()
            .map(|v| v.payment_method_id.into_inner())
            .collect();
        let known = Self::known_payment_methods(&txn, ids).await?;
        if let Some(unknown) = input
            .declared_values
            .iter()
            .find(|v| !known.contains(&v.payment_method_id.into_inner()))
        {
            return Err(CashError::PaymentMethodNotFound(unknown.payment_method_id));
        }

        let now = Utc::now().into();
        for value in &input.declared_values {
            cash_closing_declared_values::ActiveModel {
                session_id: Set(input.session_id.into_inner()),
                payment_method_id: Set(value.payment_method_id.into_inner()),
                amount: Set(value.amount),
                created_at: Set(now),
            }
            .insert(&txn)
            .await
            .map_err(persistence)?;
        }

        let mut active: cash_sessions::ActiveModel = session.into();
        active.status = Set(DbSessionStatus::Closed);
        active.closed_at = Set(Some(now));
        active.closing_note = Set(input.closing_note);
        active.updated_at = Set(now);
        let model = active.update(&txn).await.map_err(persistence)?;

        txn.commit().await.map_err(persistence)?;
        Ok(session_to_domain(model))
    }

    async fn delete_session(&self, id: CashSessionId) -> Result<CashSession, CashError> {
        let txn = self.db.begin().await.map_err(persistence)?;

        let session = Self::lock_session(&txn, id).await?;
        if session.record_state == DbRecordState::Deleted {
            return Err(CashError::SessionNotFound(id));
        }

        let mut active: cash_sessions::ActiveModel = session.into();
        active.record_state = Set(DbRecordState::Deleted);
        active.updated_at = Set(Utc::now().into());
        let model = active.update(&txn).await.map_err(persistence)?;

        txn.commit().await.map_err(persistence)?;
        Ok(session_to_domain(model))
    }

    async fn declared_values(
        &self,
        session_id: CashSessionId,
    ) -> Result<Vec<ClosingDeclaredValue>, CashError> {
        let models = cash_closing_declared_values::Entity::find()
            .filter(cash_closing_declared_values::Column::SessionId.eq(session_id.into_inner()))
            .order_by_asc(cash_closing_declared_values::Column::PaymentMethodId)
            .all(&self.db)
            .await
            .map_err(persistence)?;

        Ok(models.into_iter().map(declared_value_to_domain).collect())
    }

    async fn payment_methods(&self) -> Result<Vec<PaymentMethod>, CashError> {
        let models = payment_methods::Entity::find()
            .order_by_asc(payment_methods::Column::Code)
            .all(&self.db)
            .await
            .map_err(persistence)?;

        Ok(models.into_iter().map(payment_method_to_domain).collect())
    }
}

fn persistence(err: DbErr) -> CashError {
    error!(error = %err, "Ledger store query failed");
    CashError::persistence(err.to_string())
}

impl From<DbSessionStatus> for SessionStatus {
    fn from(status: DbSessionStatus) -> Self {
        match status {
            DbSessionStatus::Open => Self::Open,
            DbSessionStatus::Closed => Self::Closed,
        }
    }
}

impl From<DbRecordState> for RecordState {
    fn from(state: DbRecordState) -> Self {
        match state {
            DbRecordState::Active => Self::Active,
            DbRecordState::Deleted => Self::Deleted,
        }
    }
}

impl From<DbMovementKind> for MovementKind {
    fn from(kind: DbMovementKind) -> Self {
        match kind {
            DbMovementKind::Withdrawal => Self::Withdrawal,
            DbMovementKind::Supply => Self::Supply,
            DbMovementKind::Payment => Self::Payment,
        }
    }
}

impl From<MovementKind> for DbMovementKind {
    fn from(kind: MovementKind) -> Self {
        match kind {
            MovementKind::Withdrawal => Self::Withdrawal,
            MovementKind::Supply => Self::Supply,
            MovementKind::Payment => Self::Payment,
        }
    }
}

/// Convert a session row to the domain type.
fn session_to_domain(model: cash_sessions::Model) -> CashSession {
    CashSession {
        id: CashSessionId::from_uuid(model.id),
        sequence_number: model.sequence_number,
        tenant_id: TenantId::from_uuid(model.tenant_id),
        operator_id: UserId::from_uuid(model.operator_id),
        opened_at: model.opened_at.with_timezone(&Utc),
        closed_at: model.closed_at.map(|t| t.with_timezone(&Utc)),
        opening_amount: model.opening_amount,
        opening_note: model.opening_note,
        closing_note: model.closing_note,
        status: model.status.into(),
        record_state: model.record_state.into(),
    }
}

/// Convert a movement row to the domain type.
fn movement_to_domain(model: cash_movements::Model) -> Result<LedgerMovement, CashError> {
    let amount = PositiveAmount::new(model.amount).ok_or_else(|| {
        CashError::persistence(format!(
            "movement {} has non-positive amount {}",
            model.id, model.amount
        ))
    })?;

    Ok(LedgerMovement {
        id: MovementId::from_uuid(model.id),
        session_id: CashSessionId::from_uuid(model.session_id),
        sequence_number: model.sequence_number,
        kind: model.kind.into(),
        payment_method_id: model.payment_method_id.map(PaymentMethodId::from_uuid),
        amount,
        note: model.note,
        payment_reference_id: model.payment_reference_id.map(PaymentReferenceId::from_uuid),
        authorized_by: model.authorized_by.map(UserId::from_uuid),
        record_state: model.record_state.into(),
        created_at: model.created_at.with_timezone(&Utc),
    })
}

fn declared_value_to_domain(model: cash_closing_declared_values::Model) -> ClosingDeclaredValue {
    ClosingDeclaredValue {
        session_id: CashSessionId::from_uuid(model.session_id),
        payment_method_id: PaymentMethodId::from_uuid(model.payment_method_id),
        amount: model.amount,
    }
}

fn payment_method_to_domain(model: payment_methods::Model) -> PaymentMethod {
    PaymentMethod {
        id: PaymentMethodId::from_uuid(model.id),
        code: model.code,
        name: model.name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn session_model(status: DbSessionStatus, closed: bool) -> cash_sessions::Model {
        let now = Utc::now().into();
        cash_sessions::Model {
            id: Uuid::now_v7(),
            tenant_id: Uuid::now_v7(),
            sequence_number: 7,
            operator_id: Uuid::now_v7(),
            opened_at: now,
            closed_at: closed.then_some(now),
            opening_amount: dec!(100.0000),
            opening_note: Some("float".to_string()),
            closing_note: None,
            status,
            record_state: DbRecordState::Active,
            last_movement_number: 3,
            updated_at: now,
        }
    }

    fn movement_model(kind: DbMovementKind, amount: Decimal) -> cash_movements::Model {
        let now = Utc::now().into();
        cash_movements::Model {
            id: Uuid::now_v7(),
            session_id: Uuid::now_v7(),
            sequence_number: 1,
            kind,
            payment_method_id: None,
            amount,
            note: None,
            payment_reference_id: None,
            authorized_by: Some(Uuid::now_v7()),
            record_state: DbRecordState::Deleted,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_session_to_domain() {
        let model = session_model(DbSessionStatus::Closed, true);
        let session = session_to_domain(model.clone());

        assert_eq!(session.id.into_inner(), model.id);
        assert_eq!(session.sequence_number, 7);
        assert_eq!(session.status, SessionStatus::Closed);
        assert_eq!(session.record_state, RecordState::Active);
        assert!(session.closed_at.is_some());
        assert_eq!(session.opening_amount, dec!(100));
        assert!(!session.is_open());
    }

    #[test]
    fn test_open_session_to_domain() {
        let session = session_to_domain(session_model(DbSessionStatus::Open, false));
        assert!(session.is_open());
        assert!(session.closed_at.is_none());
    }

    #[test]
    fn test_movement_to_domain() {
        let model = movement_model(DbMovementKind::Withdrawal, dec!(30));
        let movement = movement_to_domain(model).unwrap();

        assert_eq!(movement.kind, MovementKind::Withdrawal);
        assert_eq!(movement.signed_amount(), dec!(-30));
        assert_eq!(movement.record_state, RecordState::Deleted);
        assert!(movement.authorized_by.is_some());
    }

    #[test]
    fn test_movement_with_zero_amount_is_rejected() {
        let model = movement_model(DbMovementKind::Supply, Decimal::ZERO);
        assert!(matches!(
            movement_to_domain(model),
            Err(CashError::Persistence(_))
        ));
    }

    #[test]
    fn test_movement_kind_conversion() {
        for kind in [
            MovementKind::Withdrawal,
            MovementKind::Supply,
            MovementKind::Payment,
        ] {
            let db: DbMovementKind = kind.into();
            assert_eq!(MovementKind::from(db), kind);
        }
    }
}
