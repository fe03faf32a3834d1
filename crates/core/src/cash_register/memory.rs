//! In-memory `LedgerStore`.
//!
//! Every operation runs inside one critical section of a single mutex,
//! which gives the same atomicity the PostgreSQL store gets from a
//! transaction holding the session row lock.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use caixa_shared::types::{CashSessionId, MovementId, PaymentMethodId, TenantId};
use chrono::Utc;

use super::error::CashError;
use super::store::LedgerStore;
use super::types::{
    CashSession, CloseSessionInput, ClosingDeclaredValue, LedgerMovement, MovementKind,
    NewCashSession, NewMovement, PaymentMethod, RecordState, SessionStatus,
};

#[derive(Default)]
struct State {
    sessions: HashMap<CashSessionId, CashSession>,
    tenant_counters: HashMap<TenantId, i64>,
    movements: HashMap<MovementId, LedgerMovement>,
    movement_counters: HashMap<CashSessionId, i64>,
    declared: HashMap<CashSessionId, Vec<ClosingDeclaredValue>>,
    payment_methods: Vec<PaymentMethod>,
}

impl State {
    fn has_payment_method(&self, id: PaymentMethodId) -> bool {
        self.payment_methods.iter().any(|pm| pm.id == id)
    }
}

/// Thread-safe in-memory ledger store.
#[derive(Default)]
pub struct InMemoryLedgerStore {
    state: Mutex<State>,
}

impl InMemoryLedgerStore {
    /// Creates an empty store with an empty payment-method catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with the given payment-method catalog.
    #[must_use]
    pub fn with_payment_methods(payment_methods: Vec<PaymentMethod>) -> Self {
        Self {
            state: Mutex::new(State {
                payment_methods,
                ..State::default()
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, CashError> {
        self.state
            .lock()
            .map_err(|_| CashError::persistence("in-memory ledger store lock poisoned"))
    }
}

impl LedgerStore for InMemoryLedgerStore {
    async fn create_session(&self, input: NewCashSession) -> Result<CashSession, CashError> {
        let mut state = self.lock()?;

        let counter = state.tenant_counters.entry(input.tenant_id).or_insert(0);
        *counter += 1;
        let sequence_number = *counter;

        let session = CashSession {
            id: CashSessionId::new(),
            sequence_number,
            tenant_id: input.tenant_id,
            operator_id: input.operator_id,
            opened_at: Utc::now(),
            closed_at: None,
            opening_amount: input.opening_amount,
            opening_note: input.opening_note,
            closing_note: None,
            status: SessionStatus::Open,
            record_state: RecordState::Active,
        };
        state.sessions.insert(session.id, session.clone());

        Ok(session)
    }

    async fn find_session(&self, id: CashSessionId) -> Result<Option<CashSession>, CashError> {
        Ok(self.lock()?.sessions.get(&id).cloned())
    }

    async fn list_open_sessions(&self, tenant_id: TenantId) -> Result<Vec<CashSession>, CashError> {
        let state = self.lock()?;
        let mut sessions: Vec<CashSession> = state
            .sessions
            .values()
            .filter(|s| s.tenant_id == tenant_id && s.is_open())
            .cloned()
            .collect();
        sessions.sort_by(|a, b| {
            a.opened_at
                .cmp(&b.opened_at)
                .then(a.sequence_number.cmp(&b.sequence_number))
        });
        Ok(sessions)
    }

    async fn append_movement(&self, input: NewMovement) -> Result<LedgerMovement, CashError> {
        let mut state = self.lock()?;

        state
            .sessions
            .get(&input.session_id)
            .ok_or(CashError::SessionNotFound(input.session_id))?
            .ensure_open()?;

        if input.kind == MovementKind::Payment
            && let Some(pm) = input.payment_method_id
            && !state.has_payment_method(pm)
        {
            return Err(CashError::PaymentMethodNotFound(pm));
        }

        let counter = state.movement_counters.entry(input.session_id).or_insert(0);
        *counter += 1;
        let sequence_number = *counter;

        let movement = LedgerMovement {
            id: MovementId::new(),
            session_id: input.session_id,
            sequence_number,
            kind: input.kind,
            payment_method_id: input.payment_method_id,
            amount: input.amount,
            note: input.note,
            payment_reference_id: input.payment_reference_id,
            authorized_by: input.authorized_by,
            record_state: RecordState::Active,
            created_at: Utc::now(),
        };
        state.movements.insert(movement.id, movement.clone());

        Ok(movement)
    }

    async fn find_movement(&self, id: MovementId) -> Result<Option<LedgerMovement>, CashError> {
        Ok(self.lock()?.movements.get(&id).cloned())
    }

    async fn list_movements(
        &self,
        session_id: CashSessionId,
    ) -> Result<Vec<LedgerMovement>, CashError> {
        let state = self.lock()?;
        let mut movements: Vec<LedgerMovement> = state
            .movements
            .values()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect();
        movements.sort_by_key(|m| m.sequence_number);
        Ok(movements)
    }

    async fn remove_movement(&self, id: MovementId) -> Result<LedgerMovement, CashError> {
        let mut state = self.lock()?;
        let movement = state
            .movements
            .get_mut(&id)
            .filter(|m| m.record_state.is_active())
            .ok_or(CashError::MovementNotFound(id))?;

        movement.record_state = RecordState::Deleted;
        Ok(movement.clone())
    }

    async fn close_session(&self, input: CloseSessionInput) -> Result<CashSession, CashError> {
        let mut state = self.lock()?;

        state
            .sessions
            .get(&input.session_id)
            .ok_or(CashError::SessionNotFound(input.session_id))?
            .ensure_open()?;

        // Stage every declared row before touching the session so a bad row
        // leaves the store untouched.
        let mut rows = Vec::with_capacity(input.declared_values.len());
        for declared in &input.declared_values {
            if !state.has_payment_method(declared.payment_method_id) {
                return Err(CashError::PaymentMethodNotFound(declared.payment_method_id));
            }
            rows.push(ClosingDeclaredValue {
                session_id: input.session_id,
                payment_method_id: declared.payment_method_id,
                amount: declared.amount,
            });
        }

        state.declared.insert(input.session_id, rows);

        let session = state
            .sessions
            .get_mut(&input.session_id)
            .ok_or(CashError::SessionNotFound(input.session_id))?;
        session.status = SessionStatus::Closed;
        session.closed_at = Some(Utc::now());
        session.closing_note = input.closing_note;

        Ok(session.clone())
    }

    async fn delete_session(&self, id: CashSessionId) -> Result<CashSession, CashError> {
        let mut state = self.lock()?;
        let session = state
            .sessions
            .get_mut(&id)
            .filter(|s| s.record_state.is_active())
            .ok_or(CashError::SessionNotFound(id))?;

        session.record_state = RecordState::Deleted;
        Ok(session.clone())
    }

    async fn declared_values(
        &self,
        session_id: CashSessionId,
    ) -> Result<Vec<ClosingDeclaredValue>, CashError> {
        Ok(self
            .lock()?
            .declared
            .get(&session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn payment_methods(&self) -> Result<Vec<PaymentMethod>, CashError> {
        Ok(self.lock()?.payment_methods.clone())
    }
}
